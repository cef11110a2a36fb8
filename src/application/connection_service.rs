// Connection service - saved Metabase credentials and proxied listings
use chrono::Utc;
use serde_json::Value;
use std::sync::Arc;

use crate::application::connection_store::ConnectionStore;
use crate::application::metabase_api::MetabaseApi;
use crate::application::session_manager::SessionManager;
use crate::domain::connection::{ConnectionInput, ConnectionRecord, ConnectionSummary, Endpoint};
use crate::error::{AppError, AppResult};
use crate::infrastructure::crypto::CredentialCipher;

#[derive(Clone)]
pub struct ConnectionService {
    store: Arc<dyn ConnectionStore>,
    cipher: Arc<CredentialCipher>,
    sessions: SessionManager,
}

impl ConnectionService {
    pub fn new(store: Arc<dyn ConnectionStore>, cipher: Arc<CredentialCipher>, sessions: SessionManager) -> Self {
        Self {
            store,
            cipher,
            sessions,
        }
    }

    /// Verify the credentials with a login, then persist them encrypted.
    /// The session from the check is kept for later calls.
    pub async fn save(&self, input: ConnectionInput) -> AppResult<ConnectionSummary> {
        let name = input.name.trim().to_string();
        if name.is_empty() {
            return Err(AppError::BadRequest("connection name must not be empty".to_string()));
        }
        if input.url.trim().is_empty() {
            return Err(AppError::BadRequest("url must not be empty".to_string()));
        }

        let endpoint = Endpoint::new(input.url.trim(), input.accept_invalid_certs);
        let grant = self
            .sessions
            .verify(&name, &endpoint, &input.username, &input.password)
            .await
            .map_err(|e| AppError::BadRequest(format!("Could not connect to Metabase: {}", e)))?;

        let record = ConnectionRecord {
            name: name.clone(),
            url: endpoint.base_url.clone(),
            username: input.username,
            password_encrypted: self.cipher.encrypt(&input.password)?,
            accept_invalid_certs: input.accept_invalid_certs,
            is_connected: true,
            updated_at: Utc::now(),
        };
        self.store.upsert(&record)?;
        self.sessions.prime(&name, endpoint, grant).await;

        tracing::info!(connection = %name, url = %record.url, "saved connection");
        Ok(ConnectionSummary::from(&record))
    }

    pub fn list(&self) -> AppResult<Vec<ConnectionSummary>> {
        Ok(self.store.list()?.iter().map(ConnectionSummary::from).collect())
    }

    /// A live cached session also counts as connected.
    pub async fn get(&self, name: &str) -> AppResult<ConnectionSummary> {
        let record = self
            .store
            .get(name)?
            .ok_or_else(|| AppError::ConnectionNotFound(name.to_string()))?;
        let mut summary = ConnectionSummary::from(&record);
        summary.is_connected |= self.sessions.has_live_session(name).await;
        Ok(summary)
    }

    pub async fn delete(&self, name: &str) -> AppResult<()> {
        if !self.store.delete(name)? {
            return Err(AppError::ConnectionNotFound(name.to_string()));
        }
        self.sessions.forget(name).await;
        tracing::info!(connection = %name, "deleted connection");
        Ok(())
    }

    pub async fn list_databases(&self, name: &str) -> AppResult<Value> {
        self.sessions.api(name).await?.list_databases().await
    }

    pub async fn list_collections(&self, name: &str) -> AppResult<Value> {
        self.sessions.api(name).await?.list_collections().await
    }
}
