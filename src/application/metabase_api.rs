// Ports onto the Metabase REST API
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::domain::connection::Endpoint;
use crate::domain::metabase::{CardDefinition, DashboardDefinition, DashboardLayout};
use crate::error::{ApiError, AppResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Put,
}

impl Method {
    /// Safe to repeat after a transport failure.
    pub fn is_idempotent(&self) -> bool {
        matches!(self, Method::Get)
    }
}

/// One call relative to `{base_url}/api`.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub body: Option<Value>,
}

impl ApiRequest {
    pub fn get(path: impl Into<String>) -> Self {
        Self {
            method: Method::Get,
            path: path.into(),
            body: None,
        }
    }

    pub fn post(path: impl Into<String>, body: Value) -> Self {
        Self {
            method: Method::Post,
            path: path.into(),
            body: Some(body),
        }
    }

    pub fn put(path: impl Into<String>, body: Value) -> Self {
        Self {
            method: Method::Put,
            path: path.into(),
            body: Some(body),
        }
    }
}

/// Result of a successful login.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionGrant {
    pub token: String,
    /// Expiry reported by the server, when it reports one.
    pub expires_at: Option<DateTime<Utc>>,
}

/// Raw, unauthenticated-aware HTTP access to a Metabase instance.
#[async_trait]
pub trait MetabaseTransport: Send + Sync {
    async fn login(
        &self,
        endpoint: &Endpoint,
        username: &str,
        password: &str,
    ) -> Result<SessionGrant, ApiError>;

    /// Send one request with a session token. A 401 must surface as
    /// `ApiError::Unauthorized`.
    async fn send(&self, endpoint: &Endpoint, token: &str, request: &ApiRequest) -> Result<Value, ApiError>;
}

/// Typed operations the provisioners need, already bound to one
/// authenticated connection.
#[async_trait]
pub trait MetabaseApi: Send + Sync {
    fn base_url(&self) -> &str;

    async fn list_databases(&self) -> AppResult<Value>;

    async fn list_collections(&self) -> AppResult<Value>;

    /// Id of the card named `name` on `database_id`, if one exists.
    async fn find_card(&self, database_id: i64, name: &str) -> AppResult<Option<i64>>;

    async fn create_card(&self, card: &CardDefinition) -> AppResult<i64>;

    async fn update_card(&self, card_id: i64, card: &CardDefinition) -> AppResult<()>;

    /// Id of the dashboard in `collection_id` (root when `None`) whose
    /// description carries `marker`.
    async fn find_dashboard(&self, collection_id: Option<i64>, marker: &str) -> AppResult<Option<i64>>;

    async fn create_dashboard(&self, dashboard: &DashboardDefinition) -> AppResult<i64>;

    async fn update_dashboard(&self, dashboard_id: i64, layout: &DashboardLayout) -> AppResult<()>;
}
