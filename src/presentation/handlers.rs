// HTTP request handlers
use crate::application::dashboard_service::CreateDashboardRequest;
use crate::domain::connection::{ConnectionInput, ConnectionSummary};
use crate::domain::provision::ProvisionResult;
use crate::domain::validation::ValidationResult;
use crate::error::AppError;
use crate::presentation::app_state::AppState;
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde_json::{Value, json};
use std::sync::Arc;

/// Health check endpoint
pub async fn health_check() -> &'static str {
    "ok"
}

/// Service banner
pub async fn root() -> Json<Value> {
    Json(json!({
        "service": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
        "status": "running",
    }))
}

pub async fn save_connection(
    State(state): State<Arc<AppState>>,
    Json(input): Json<ConnectionInput>,
) -> Result<(StatusCode, Json<ConnectionSummary>), AppError> {
    let summary = state.connection_service.save(input).await?;
    Ok((StatusCode::CREATED, Json(summary)))
}

pub async fn list_connections(State(state): State<Arc<AppState>>) -> Result<Json<Vec<ConnectionSummary>>, AppError> {
    Ok(Json(state.connection_service.list()?))
}

pub async fn get_connection(
    Path(name): Path<String>,
    State(state): State<Arc<AppState>>,
) -> Result<Json<ConnectionSummary>, AppError> {
    Ok(Json(state.connection_service.get(&name).await?))
}

pub async fn delete_connection(
    Path(name): Path<String>,
    State(state): State<Arc<AppState>>,
) -> Result<StatusCode, AppError> {
    state.connection_service.delete(&name).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Databases visible to the connection, as Metabase returns them
pub async fn list_databases(
    Path(name): Path<String>,
    State(state): State<Arc<AppState>>,
) -> Result<Json<Value>, AppError> {
    Ok(Json(state.connection_service.list_databases(&name).await?))
}

/// Collections visible to the connection, as Metabase returns them
pub async fn list_collections(
    Path(name): Path<String>,
    State(state): State<Arc<AppState>>,
) -> Result<Json<Value>, AppError> {
    Ok(Json(state.connection_service.list_collections(&name).await?))
}

/// Validate a spec without touching Metabase. Always 200; validity is in the body.
pub async fn validate_spec(State(state): State<Arc<AppState>>, Json(raw): Json<Value>) -> Json<ValidationResult> {
    Json(state.dashboard_service.validate(&raw))
}

pub async fn create_dashboard(
    State(state): State<Arc<AppState>>,
    Json(request): Json<CreateDashboardRequest>,
) -> Result<Json<ProvisionResult>, AppError> {
    Ok(Json(state.dashboard_service.create_dashboard(request).await?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::connection_service::ConnectionService;
    use crate::application::dashboard_service::DashboardService;
    use crate::application::session_manager::SessionManager;
    use crate::application::session_manager::tests::{MemoryStore, ScriptedTransport, cipher};

    fn state() -> Arc<AppState> {
        let store = Arc::new(MemoryStore::default());
        let cipher = cipher();
        let sessions = SessionManager::new(
            store.clone(),
            cipher.clone(),
            Arc::new(ScriptedTransport::default()),
            chrono::Duration::hours(1),
        );
        Arc::new(AppState {
            connection_service: ConnectionService::new(store, cipher, sessions.clone()),
            dashboard_service: DashboardService::new(sessions),
        })
    }

    #[tokio::test]
    async fn test_validate_reports_in_body() {
        let Json(result) = validate_spec(State(state()), Json(json!({"meta": {}, "sections": []}))).await;
        assert!(!result.valid);
        assert_eq!(result.summary.sections_count, 0);
        assert_eq!(result.summary.components_count, 0);
        assert_eq!(result.summary.queries_count, 0);
    }

    #[tokio::test]
    async fn test_connection_lifecycle() {
        let state = state();
        let input: ConnectionInput = serde_json::from_value(json!({
            "url": "http://localhost:3001",
            "username": "admin@example.com",
            "password": "pw"
        }))
        .unwrap();

        let (status, Json(summary)) = save_connection(State(state.clone()), Json(input)).await.unwrap();
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(summary.name, "default");

        let Json(listed) = list_connections(State(state.clone())).await.unwrap();
        assert_eq!(listed.len(), 1);

        let status = delete_connection(Path("default".to_string()), State(state.clone()))
            .await
            .unwrap();
        assert_eq!(status, StatusCode::NO_CONTENT);

        let err = get_connection(Path("default".to_string()), State(state)).await.unwrap_err();
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
    }
}
