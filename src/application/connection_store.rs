// Persistence port for named connections
use crate::domain::connection::ConnectionRecord;
use crate::error::AppResult;

/// Keyed by connection name. Implementations serialise writes per name.
///
/// Calls block the current thread. Async callers that hold a lock across
/// them go through `spawn_blocking` (see `SessionManager::login`).
pub trait ConnectionStore: Send + Sync {
    fn upsert(&self, record: &ConnectionRecord) -> AppResult<()>;

    fn get(&self, name: &str) -> AppResult<Option<ConnectionRecord>>;

    fn list(&self) -> AppResult<Vec<ConnectionRecord>>;

    /// Returns false when no such connection existed.
    fn delete(&self, name: &str) -> AppResult<bool>;

    fn set_connected(&self, name: &str, connected: bool) -> AppResult<()>;
}
