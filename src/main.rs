// Main entry point - Dependency injection and server setup
mod application;
mod domain;
mod error;
mod infrastructure;
mod presentation;

use std::{net::SocketAddr, sync::Arc};
use axum::{
    Router,
    routing::{get, post},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing_subscriber::EnvFilter;

use crate::application::connection_service::ConnectionService;
use crate::application::dashboard_service::DashboardService;
use crate::application::session_manager::SessionManager;
use crate::infrastructure::config::load_app_config;
use crate::infrastructure::crypto::CredentialCipher;
use crate::infrastructure::metabase_client::HttpTransport;
use crate::infrastructure::sqlite_store::SqliteConnectionStore;
use crate::presentation::app_state::AppState;
use crate::presentation::handlers::{
    create_dashboard, delete_connection, get_connection, health_check, list_collections, list_connections,
    list_databases, root, save_connection, validate_spec,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // Load configuration
    let config = load_app_config()?;

    // Credentials key lives outside the database
    let cipher = Arc::new(match &config.security.encryption_key {
        Some(key) => CredentialCipher::from_base64(key)?,
        None => CredentialCipher::load_or_create(&config.security.key_path)?,
    });

    // Create adapters (infrastructure layer)
    let store = Arc::new(SqliteConnectionStore::open(&config.storage.database_path)?);
    let transport = Arc::new(HttpTransport::new(
        config.metabase.request_timeout(),
        config.metabase.get_retries,
    )?);

    // Create services (application layer)
    let sessions = SessionManager::new(store.clone(), cipher.clone(), transport, config.metabase.session_ttl());
    let connection_service = ConnectionService::new(store, cipher, sessions.clone());
    let dashboard_service = DashboardService::new(sessions);

    // Create application state
    let state = Arc::new(AppState {
        connection_service,
        dashboard_service,
    });

    // Build router (presentation layer)
    let router = Router::new()
        .route("/", get(root))
        .route("/healthz", get(health_check))
        .route("/connections", get(list_connections).post(save_connection))
        .route("/connections/:name", get(get_connection).delete(delete_connection))
        .route("/connections/:name/databases", get(list_databases))
        .route("/connections/:name/collections", get(list_collections))
        .route("/validate", post(validate_spec))
        .route("/create-dashboard", post(create_dashboard))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state);

    // Start server
    let addr: SocketAddr = config.server.bind_addr.parse()?;
    tracing::info!(%addr, database = %config.storage.database_path.display(), "starting dashboard-creator");

    axum::serve(tokio::net::TcpListener::bind(addr).await?, router).await?;

    Ok(())
}
