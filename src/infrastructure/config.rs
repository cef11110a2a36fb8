use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default)]
    pub storage: StorageSettings,
    #[serde(default)]
    pub security: SecuritySettings,
    #[serde(default)]
    pub metabase: MetabaseSettings,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerSettings {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StorageSettings {
    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SecuritySettings {
    /// Base64-encoded 32-byte key; takes precedence over `key_path`.
    #[serde(default)]
    pub encryption_key: Option<String>,
    #[serde(default = "default_key_path")]
    pub key_path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct MetabaseSettings {
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_get_retries")]
    pub get_retries: u32,
    #[serde(default = "default_session_ttl_secs")]
    pub session_ttl_secs: i64,
}

fn default_bind_addr() -> String {
    "0.0.0.0:8000".to_string()
}

fn default_database_path() -> PathBuf {
    PathBuf::from("./data/app.db")
}

fn default_key_path() -> PathBuf {
    PathBuf::from("./data/connection.key")
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_get_retries() -> u32 {
    2
}

fn default_session_ttl_secs() -> i64 {
    14 * 24 * 60 * 60
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
        }
    }
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
        }
    }
}

impl Default for SecuritySettings {
    fn default() -> Self {
        Self {
            encryption_key: None,
            key_path: default_key_path(),
        }
    }
}

impl Default for MetabaseSettings {
    fn default() -> Self {
        Self {
            request_timeout_secs: default_request_timeout_secs(),
            get_retries: default_get_retries(),
            session_ttl_secs: default_session_ttl_secs(),
        }
    }
}

impl MetabaseSettings {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn session_ttl(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.session_ttl_secs)
    }
}

/// `config/app.{toml,yaml,json}` if present, overridden by
/// `DASHBOARD_CREATOR__SECTION__KEY` environment variables.
pub fn load_app_config() -> anyhow::Result<AppConfig> {
    let settings = config::Config::builder()
        .add_source(config::File::with_name("config/app").required(false))
        .add_source(
            config::Environment::with_prefix("DASHBOARD_CREATOR")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        )
        .build()?;

    Ok(settings.try_deserialize()?)
}
