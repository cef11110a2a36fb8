// Session lifecycle per connection, plus the authenticated API built on it
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::Mutex as AsyncMutex;

use crate::application::connection_store::ConnectionStore;
use crate::application::metabase_api::{ApiRequest, MetabaseApi, MetabaseTransport, SessionGrant};
use crate::domain::connection::Endpoint;
use crate::domain::metabase::{CardDefinition, DashboardDefinition, DashboardLayout};
use crate::error::{ApiError, AppError, AppResult};
use crate::infrastructure::crypto::CredentialCipher;

#[derive(Debug, Clone)]
struct CachedSession {
    endpoint: Endpoint,
    token: String,
    expires_at: DateTime<Utc>,
}

impl CachedSession {
    fn is_live(&self, now: DateTime<Utc>) -> bool {
        self.expires_at > now
    }
}

type Slot = Arc<AsyncMutex<Option<CachedSession>>>;

/// Hands out valid session tokens per connection name. Logins for one
/// connection are serialised: callers that queue behind a refresh reuse
/// the token it produced.
#[derive(Clone)]
pub struct SessionManager {
    store: Arc<dyn ConnectionStore>,
    cipher: Arc<CredentialCipher>,
    transport: Arc<dyn MetabaseTransport>,
    session_ttl: chrono::Duration,
    slots: Arc<Mutex<HashMap<String, Slot>>>,
}

impl SessionManager {
    pub fn new(
        store: Arc<dyn ConnectionStore>,
        cipher: Arc<CredentialCipher>,
        transport: Arc<dyn MetabaseTransport>,
        session_ttl: chrono::Duration,
    ) -> Self {
        Self {
            store,
            cipher,
            transport,
            session_ttl,
            slots: Arc::default(),
        }
    }

    fn slot(&self, connection: &str) -> Slot {
        let mut slots = self.slots.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        slots.entry(connection.to_string()).or_default().clone()
    }

    /// Check credentials without caching anything.
    pub async fn verify(
        &self,
        connection: &str,
        endpoint: &Endpoint,
        username: &str,
        password: &str,
    ) -> AppResult<SessionGrant> {
        self.transport
            .login(endpoint, username, password)
            .await
            .map_err(|e| login_error(connection, e))
    }

    /// Cache a session obtained elsewhere (e.g. while saving the connection).
    pub async fn prime(&self, connection: &str, endpoint: Endpoint, grant: SessionGrant) {
        let session = self.cache_entry(endpoint, grant);
        *self.slot(connection).lock().await = Some(session);
    }

    pub async fn forget(&self, connection: &str) {
        let slot = self.slots.lock().unwrap_or_else(|p| p.into_inner()).remove(connection);
        if let Some(slot) = slot {
            *slot.lock().await = None;
        }
    }

    pub async fn has_live_session(&self, connection: &str) -> bool {
        let slot = self.slots.lock().unwrap_or_else(|p| p.into_inner()).get(connection).cloned();
        match slot {
            Some(slot) => slot.lock().await.as_ref().is_some_and(|s| s.is_live(Utc::now())),
            None => false,
        }
    }

    /// Store calls are synchronous; run them on the blocking pool since the
    /// caller holds the connection's slot lock.
    async fn with_store<T, F>(&self, call: F) -> AppResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&dyn ConnectionStore) -> AppResult<T> + Send + 'static,
    {
        let store = Arc::clone(&self.store);
        tokio::task::spawn_blocking(move || call(store.as_ref()))
            .await
            .map_err(|e| AppError::Storage(format!("store task failed: {}", e)))?
    }

    fn cache_entry(&self, endpoint: Endpoint, grant: SessionGrant) -> CachedSession {
        CachedSession {
            endpoint,
            token: grant.token,
            expires_at: grant.expires_at.unwrap_or_else(|| Utc::now() + self.session_ttl),
        }
    }

    async fn login(&self, connection: &str) -> AppResult<CachedSession> {
        let name = connection.to_string();
        let Some(record) = self.with_store(move |store| store.get(&name)).await? else {
            // unknown names must not keep a slot
            self.slots.lock().unwrap_or_else(|p| p.into_inner()).remove(connection);
            return Err(AppError::ConnectionNotFound(connection.to_string()));
        };
        let endpoint = record.endpoint();
        let password = self.cipher.decrypt(&record.password_encrypted)?;

        tracing::info!(connection, url = %endpoint.base_url, "logging in to Metabase");
        let result = self.transport.login(&endpoint, &record.username, &password).await;
        drop(password);

        let connected = match &result {
            Ok(_) => Some(true),
            Err(ApiError::Unauthorized) => Some(false),
            Err(_) => None,
        };
        if let Some(connected) = connected {
            let name = connection.to_string();
            self.with_store(move |store| store.set_connected(&name, connected)).await?;
        }

        match result {
            Ok(grant) => Ok(self.cache_entry(endpoint, grant)),
            Err(e) => Err(login_error(connection, e)),
        }
    }

    /// A live session, logging in lazily when none is cached or it expired.
    async fn session(&self, connection: &str) -> AppResult<CachedSession> {
        let slot = self.slot(connection);
        let mut guard = slot.lock().await;
        if let Some(session) = guard.as_ref().filter(|s| s.is_live(Utc::now())) {
            return Ok(session.clone());
        }
        let session = self.login(connection).await?;
        *guard = Some(session.clone());
        Ok(session)
    }

    /// Replace a token the server rejected. If another caller already
    /// replaced it, that newer session is returned without logging in.
    async fn refresh(&self, connection: &str, rejected_token: &str) -> AppResult<CachedSession> {
        let slot = self.slot(connection);
        let mut guard = slot.lock().await;
        if let Some(session) = guard
            .as_ref()
            .filter(|s| s.token != rejected_token && s.is_live(Utc::now()))
        {
            return Ok(session.clone());
        }
        *guard = None;
        let session = self.login(connection).await?;
        *guard = Some(session.clone());
        Ok(session)
    }

    async fn invalidate(&self, connection: &str, rejected_token: &str) {
        let slot = self.slot(connection);
        let mut guard = slot.lock().await;
        if guard.as_ref().is_some_and(|s| s.token == rejected_token) {
            *guard = None;
        }
    }

    /// Send one request on behalf of `connection`. A 401 triggers exactly
    /// one re-login and one retry; a second 401 is an auth failure.
    pub async fn execute(&self, connection: &str, request: &ApiRequest) -> AppResult<Value> {
        let session = self.session(connection).await?;
        match self.transport.send(&session.endpoint, &session.token, request).await {
            Err(ApiError::Unauthorized) => {
                tracing::info!(connection, path = %request.path, "session rejected, re-authenticating");
                let fresh = self.refresh(connection, &session.token).await?;
                match self.transport.send(&fresh.endpoint, &fresh.token, request).await {
                    Err(ApiError::Unauthorized) => {
                        self.invalidate(connection, &fresh.token).await;
                        Err(AppError::Auth {
                            connection: connection.to_string(),
                            message: "session rejected again after re-authentication".to_string(),
                        })
                    }
                    other => Ok(other?),
                }
            }
            other => Ok(other?),
        }
    }

    pub async fn base_url(&self, connection: &str) -> AppResult<String> {
        Ok(self.session(connection).await?.endpoint.base_url)
    }

    /// Typed API bound to one connection.
    pub async fn api(&self, connection: &str) -> AppResult<MetabaseSession> {
        let base_url = self.base_url(connection).await?;
        Ok(MetabaseSession {
            sessions: self.clone(),
            connection: connection.to_string(),
            base_url,
        })
    }
}

fn login_error(connection: &str, e: ApiError) -> AppError {
    match e {
        ApiError::Unauthorized => AppError::Auth {
            connection: connection.to_string(),
            message: "credentials rejected".to_string(),
        },
        other => AppError::Api(other),
    }
}

fn object_id(value: &Value) -> AppResult<i64> {
    value
        .get("id")
        .and_then(Value::as_i64)
        .ok_or_else(|| AppError::Api(ApiError::Decode("response carries no numeric id".to_string())))
}

/// Some endpoints return a bare array, newer versions wrap it in `data`.
fn items(value: Value) -> Vec<Value> {
    match value {
        Value::Array(items) => items,
        Value::Object(mut obj) => match obj.remove("data") {
            Some(Value::Array(items)) => items,
            _ => Vec::new(),
        },
        _ => Vec::new(),
    }
}

/// `MetabaseApi` over a `SessionManager`; every call goes through the
/// bounded re-authentication in `SessionManager::execute`.
#[derive(Clone)]
pub struct MetabaseSession {
    sessions: SessionManager,
    connection: String,
    base_url: String,
}

impl MetabaseSession {
    async fn call(&self, request: ApiRequest) -> AppResult<Value> {
        self.sessions.execute(&self.connection, &request).await
    }
}

#[async_trait]
impl MetabaseApi for MetabaseSession {
    fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn list_databases(&self) -> AppResult<Value> {
        self.call(ApiRequest::get("/database")).await
    }

    async fn list_collections(&self) -> AppResult<Value> {
        self.call(ApiRequest::get("/collection")).await
    }

    async fn find_card(&self, database_id: i64, name: &str) -> AppResult<Option<i64>> {
        let cards = self
            .call(ApiRequest::get(format!("/card?f=database&model_id={}", database_id)))
            .await?;
        Ok(items(cards)
            .iter()
            .filter(|card| card.get("name").and_then(Value::as_str) == Some(name))
            .filter(|card| !card.get("archived").and_then(Value::as_bool).unwrap_or(false))
            .find_map(|card| card.get("id").and_then(Value::as_i64)))
    }

    async fn create_card(&self, card: &CardDefinition) -> AppResult<i64> {
        let created = self
            .call(ApiRequest::post("/card", serde_json::to_value(card).map_err(decode_err)?))
            .await?;
        object_id(&created)
    }

    async fn update_card(&self, card_id: i64, card: &CardDefinition) -> AppResult<()> {
        self.call(ApiRequest::put(
            format!("/card/{}", card_id),
            serde_json::to_value(card).map_err(decode_err)?,
        ))
        .await?;
        Ok(())
    }

    async fn find_dashboard(&self, collection_id: Option<i64>, marker: &str) -> AppResult<Option<i64>> {
        let collection = collection_id.map_or_else(|| "root".to_string(), |id| id.to_string());
        let listing = self
            .call(ApiRequest::get(format!(
                "/collection/{}/items?models={}",
                collection,
                urlencoding::encode("dashboard")
            )))
            .await?;
        Ok(items(listing)
            .iter()
            .filter(|item| {
                item.get("description")
                    .and_then(Value::as_str)
                    .is_some_and(|d| d.contains(marker))
            })
            .find_map(|item| item.get("id").and_then(Value::as_i64)))
    }

    async fn create_dashboard(&self, dashboard: &DashboardDefinition) -> AppResult<i64> {
        let created = self
            .call(ApiRequest::post(
                "/dashboard",
                serde_json::to_value(dashboard).map_err(decode_err)?,
            ))
            .await?;
        object_id(&created)
    }

    async fn update_dashboard(&self, dashboard_id: i64, layout: &DashboardLayout) -> AppResult<()> {
        self.call(ApiRequest::put(
            format!("/dashboard/{}", dashboard_id),
            serde_json::to_value(layout).map_err(decode_err)?,
        ))
        .await?;
        Ok(())
    }
}

fn decode_err(e: serde_json::Error) -> AppError {
    AppError::Api(ApiError::Decode(e.to_string()))
}
