// Metabase HTTP transport implementation
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::{Value, json};
use std::time::Duration;

use crate::application::metabase_api::{ApiRequest, MetabaseTransport, Method, SessionGrant};
use crate::domain::connection::Endpoint;
use crate::error::ApiError;

const SESSION_HEADER: &str = "X-Metabase-Session";
const RETRY_BACKOFF: Duration = Duration::from_millis(250);

#[derive(Debug, Clone)]
pub struct HttpTransport {
    strict: reqwest::Client,
    insecure: reqwest::Client,
    get_retries: u32,
}

#[derive(Debug, Deserialize)]
struct SessionResponse {
    id: String,
    #[serde(default)]
    expires_at: Option<DateTime<Utc>>,
}

impl HttpTransport {
    pub fn new(timeout: Duration, get_retries: u32) -> anyhow::Result<Self> {
        let strict = reqwest::Client::builder().timeout(timeout).build()?;
        // Only used for connections that opted in to self-signed certificates.
        let insecure = reqwest::Client::builder()
            .timeout(timeout)
            .danger_accept_invalid_certs(true)
            .build()?;
        Ok(Self {
            strict,
            insecure,
            get_retries,
        })
    }

    fn client(&self, endpoint: &Endpoint) -> &reqwest::Client {
        if endpoint.accept_invalid_certs {
            &self.insecure
        } else {
            &self.strict
        }
    }

    fn url(endpoint: &Endpoint, path: &str) -> String {
        format!("{}/api{}", endpoint.base_url, path)
    }

    async fn send_once(&self, endpoint: &Endpoint, token: &str, request: &ApiRequest) -> Result<Value, ApiError> {
        let url = Self::url(endpoint, &request.path);
        let client = self.client(endpoint);
        let builder = match request.method {
            Method::Get => client.get(&url),
            Method::Post => client.post(&url),
            Method::Put => client.put(&url),
        };
        let builder = builder.header(SESSION_HEADER, token);
        let builder = match &request.body {
            Some(body) => builder.json(body),
            None => builder,
        };

        let response = builder.send().await.map_err(transport_error)?;
        read_json(response).await
    }
}

fn transport_error(e: reqwest::Error) -> ApiError {
    ApiError::Transport {
        message: e.to_string(),
        timeout: e.is_timeout(),
    }
}

async fn read_json(response: reqwest::Response) -> Result<Value, ApiError> {
    let status = response.status();
    if status == StatusCode::UNAUTHORIZED {
        return Err(ApiError::Unauthorized);
    }

    let body = response.text().await.map_err(transport_error)?;
    if !status.is_success() {
        return Err(ApiError::Status {
            status: status.as_u16(),
            body,
        });
    }
    if body.trim().is_empty() {
        return Ok(Value::Null);
    }
    serde_json::from_str(&body).map_err(|e| ApiError::Decode(e.to_string()))
}

#[async_trait]
impl MetabaseTransport for HttpTransport {
    async fn login(&self, endpoint: &Endpoint, username: &str, password: &str) -> Result<SessionGrant, ApiError> {
        let response = self
            .client(endpoint)
            .post(Self::url(endpoint, "/session"))
            .json(&json!({ "username": username, "password": password }))
            .send()
            .await
            .map_err(transport_error)?;

        // Metabase answers bad credentials with 400 or 401 depending on version.
        if response.status() == StatusCode::BAD_REQUEST {
            return Err(ApiError::Unauthorized);
        }
        let value = read_json(response).await?;
        let session: SessionResponse =
            serde_json::from_value(value).map_err(|e| ApiError::Decode(e.to_string()))?;
        Ok(SessionGrant {
            token: session.id,
            expires_at: session.expires_at,
        })
    }

    async fn send(&self, endpoint: &Endpoint, token: &str, request: &ApiRequest) -> Result<Value, ApiError> {
        let attempts = if request.method.is_idempotent() {
            1 + self.get_retries
        } else {
            1
        };

        let mut attempt = 1;
        loop {
            match self.send_once(endpoint, token, request).await {
                Err(e) if e.is_transport() && attempt < attempts => {
                    tracing::warn!(
                        path = %request.path,
                        attempt,
                        error = %e,
                        "Metabase request failed, retrying"
                    );
                    tokio::time::sleep(RETRY_BACKOFF * attempt).await;
                    attempt += 1;
                }
                other => return other,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::State;
    use axum::http::{HeaderMap, StatusCode as AxumStatus};
    use axum::response::IntoResponse;
    use axum::routing::{get, post};
    use axum::{Json, Router};
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    async fn spawn(router: Router) -> Endpoint {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        Endpoint::new(&format!("http://{}/", addr), false)
    }

    async fn session(Json(body): Json<Value>) -> impl IntoResponse {
        if body["password"] == "pw" {
            (AxumStatus::OK, Json(json!({"id": "tok-1"})))
        } else {
            (AxumStatus::UNAUTHORIZED, Json(json!({"errors": {"password": "did not match"}})))
        }
    }

    async fn databases(headers: HeaderMap) -> impl IntoResponse {
        match headers.get(SESSION_HEADER).and_then(|v| v.to_str().ok()) {
            Some("tok-1") => (AxumStatus::OK, Json(json!({"data": [{"id": 1, "name": "Sample"}]}))),
            _ => (AxumStatus::UNAUTHORIZED, Json(json!("Unauthenticated"))),
        }
    }

    async fn flaky(State(hits): State<Arc<AtomicUsize>>) -> Json<Value> {
        if hits.fetch_add(1, Ordering::SeqCst) == 0 {
            tokio::time::sleep(Duration::from_millis(800)).await;
        }
        Json(json!({"ok": true}))
    }

    fn router(hits: Arc<AtomicUsize>) -> Router {
        Router::new()
            .route("/api/session", post(session))
            .route("/api/database", get(databases))
            .route("/api/flaky", get(flaky).post(flaky))
            .route("/api/broken", get(|| async { (AxumStatus::INTERNAL_SERVER_ERROR, "boom") }))
            .with_state(hits)
    }

    #[tokio::test]
    async fn test_login_and_authenticated_get() {
        let endpoint = spawn(router(Arc::default())).await;
        let transport = HttpTransport::new(Duration::from_secs(5), 0).unwrap();

        let grant = transport.login(&endpoint, "admin", "pw").await.unwrap();
        assert_eq!(grant.token, "tok-1");
        assert_eq!(grant.expires_at, None);

        let dbs = transport
            .send(&endpoint, &grant.token, &ApiRequest::get("/database"))
            .await
            .unwrap();
        assert_eq!(dbs["data"][0]["name"], "Sample");
    }

    #[tokio::test]
    async fn test_rejections_are_classified() {
        let endpoint = spawn(router(Arc::default())).await;
        let transport = HttpTransport::new(Duration::from_secs(5), 0).unwrap();

        assert_eq!(
            transport.login(&endpoint, "admin", "wrong").await.unwrap_err(),
            ApiError::Unauthorized
        );
        assert_eq!(
            transport
                .send(&endpoint, "stale", &ApiRequest::get("/database"))
                .await
                .unwrap_err(),
            ApiError::Unauthorized
        );
        assert_eq!(
            transport
                .send(&endpoint, "tok-1", &ApiRequest::get("/broken"))
                .await
                .unwrap_err(),
            ApiError::Status {
                status: 500,
                body: "boom".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_get_is_retried_after_timeout() {
        let hits = Arc::new(AtomicUsize::new(0));
        let endpoint = spawn(router(hits.clone())).await;
        let transport = HttpTransport::new(Duration::from_millis(300), 2).unwrap();

        let value = transport
            .send(&endpoint, "tok-1", &ApiRequest::get("/flaky"))
            .await
            .unwrap();
        assert_eq!(value["ok"], true);
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_create_is_never_retried() {
        let hits = Arc::new(AtomicUsize::new(0));
        let endpoint = spawn(router(hits.clone())).await;
        let transport = HttpTransport::new(Duration::from_millis(300), 2).unwrap();

        let err = transport
            .send(&endpoint, "tok-1", &ApiRequest::post("/flaky", json!({})))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Transport { timeout: true, .. }));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }
}
