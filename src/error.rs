// Error taxonomy shared by every layer
use thiserror::Error;

/// Failure of a single outbound call to the Metabase API.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ApiError {
    #[error("Metabase rejected the session (401)")]
    Unauthorized,
    #[error("Metabase returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("transport error: {message}")]
    Transport { message: String, timeout: bool },
    #[error("unexpected Metabase response: {0}")]
    Decode(String),
}

impl ApiError {
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport { .. })
    }
}

/// A spec value outside the supported vocabulary or grid.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{id}: {reason}")]
pub struct MappingError {
    pub id: String,
    pub reason: String,
}

impl MappingError {
    pub fn new(id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("invalid spec: {}", .0.join("; "))]
    InvalidSpec(Vec<String>),
    #[error("authentication failed for connection '{connection}': {message}")]
    Auth { connection: String, message: String },
    #[error("connection '{0}' not found")]
    ConnectionNotFound(String),
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error("no queries could be provisioned: {}", .0.join("; "))]
    NoQueriesProvisioned(Vec<String>),
    #[error("{0}")]
    BadRequest(String),
    #[error("storage failure: {0}")]
    Storage(String),
    #[error("credential encryption failure: {0}")]
    Crypto(String),
}

impl From<rusqlite::Error> for AppError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Storage(value.to_string())
    }
}

pub type AppResult<T> = Result<T, AppError>;
