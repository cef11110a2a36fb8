// Connection domain model
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const DEFAULT_CONNECTION: &str = "default";

pub fn default_connection_name() -> String {
    DEFAULT_CONNECTION.to_string()
}

/// Persisted connection. The password is only ever held encrypted here.
#[derive(Debug, Clone, PartialEq)]
pub struct ConnectionRecord {
    pub name: String,
    pub url: String,
    pub username: String,
    pub password_encrypted: String,
    pub accept_invalid_certs: bool,
    pub is_connected: bool,
    pub updated_at: DateTime<Utc>,
}

/// Connection as returned to callers, password omitted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConnectionSummary {
    pub name: String,
    pub url: String,
    pub username: String,
    pub accept_invalid_certs: bool,
    pub is_connected: bool,
}

impl From<&ConnectionRecord> for ConnectionSummary {
    fn from(record: &ConnectionRecord) -> Self {
        Self {
            name: record.name.clone(),
            url: record.url.clone(),
            username: record.username.clone(),
            accept_invalid_certs: record.accept_invalid_certs,
            is_connected: record.is_connected,
        }
    }
}

/// Credentials submitted when saving a connection. No `Debug`, it holds a password.
#[derive(Clone, Deserialize)]
pub struct ConnectionInput {
    #[serde(default = "default_connection_name")]
    pub name: String,
    pub url: String,
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub accept_invalid_certs: bool,
}

/// Where and how to reach one Metabase instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub base_url: String,
    pub accept_invalid_certs: bool,
}

impl Endpoint {
    pub fn new(base_url: &str, accept_invalid_certs: bool) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            accept_invalid_certs,
        }
    }
}

impl ConnectionRecord {
    pub fn endpoint(&self) -> Endpoint {
        Endpoint::new(&self.url, self.accept_invalid_certs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_input_defaults() {
        let input: ConnectionInput = serde_json::from_value(serde_json::json!({
            "url": "http://localhost:3001/",
            "username": "admin@example.com",
            "password": "secret"
        }))
        .unwrap();
        assert_eq!(input.name, "default");
        assert!(!input.accept_invalid_certs);
        assert_eq!(Endpoint::new(&input.url, false).base_url, "http://localhost:3001");
    }
}
