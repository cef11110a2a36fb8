// SQLite-backed connection store
use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, Row, params};
use std::fs;
use std::path::Path;
use std::sync::Mutex;

use crate::application::connection_store::ConnectionStore;
use crate::domain::connection::ConnectionRecord;
use crate::error::{AppError, AppResult};

const SCHEMA_SQL: &str = "
CREATE TABLE IF NOT EXISTS connections (
    name TEXT PRIMARY KEY,
    url TEXT NOT NULL,
    username TEXT NOT NULL,
    password_encrypted TEXT NOT NULL,
    accept_invalid_certs INTEGER NOT NULL DEFAULT 0,
    is_connected INTEGER NOT NULL DEFAULT 0,
    updated_at TEXT NOT NULL
);
";

const SELECT_COLUMNS: &str =
    "SELECT name, url, username, password_encrypted, accept_invalid_certs, is_connected, updated_at FROM connections";

/// Every statement runs under one lock, so writes to a name never interleave.
#[derive(Debug)]
pub struct SqliteConnectionStore {
    conn: Mutex<Connection>,
}

impl SqliteConnectionStore {
    pub fn open(path: &Path) -> AppResult<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| AppError::Storage(e.to_string()))?;
        }
        Self::init(Connection::open(path)?)
    }

    #[cfg(test)]
    pub fn open_in_memory() -> AppResult<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> AppResult<Self> {
        conn.execute_batch(SCHEMA_SQL)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn with_conn<T>(&self, f: impl FnOnce(&Connection) -> rusqlite::Result<T>) -> AppResult<T> {
        let conn = self
            .conn
            .lock()
            .map_err(|_| AppError::Storage("connection store mutex poisoned".to_string()))?;
        Ok(f(&conn)?)
    }
}

fn row_to_record(row: &Row<'_>) -> rusqlite::Result<ConnectionRecord> {
    let updated_at: String = row.get(6)?;
    let updated_at = DateTime::parse_from_rfc3339(&updated_at)
        .map(|t| t.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now());
    Ok(ConnectionRecord {
        name: row.get(0)?,
        url: row.get(1)?,
        username: row.get(2)?,
        password_encrypted: row.get(3)?,
        accept_invalid_certs: row.get(4)?,
        is_connected: row.get(5)?,
        updated_at,
    })
}

impl ConnectionStore for SqliteConnectionStore {
    fn upsert(&self, record: &ConnectionRecord) -> AppResult<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO connections (
                   name, url, username, password_encrypted, accept_invalid_certs, is_connected, updated_at
                 ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                 ON CONFLICT(name) DO UPDATE SET
                   url = excluded.url,
                   username = excluded.username,
                   password_encrypted = excluded.password_encrypted,
                   accept_invalid_certs = excluded.accept_invalid_certs,
                   is_connected = excluded.is_connected,
                   updated_at = excluded.updated_at",
                params![
                    record.name,
                    record.url,
                    record.username,
                    record.password_encrypted,
                    record.accept_invalid_certs,
                    record.is_connected,
                    record.updated_at.to_rfc3339(),
                ],
            )
            .map(|_| ())
        })
    }

    fn get(&self, name: &str) -> AppResult<Option<ConnectionRecord>> {
        self.with_conn(|conn| {
            conn.query_row(
                &format!("{} WHERE name = ?1", SELECT_COLUMNS),
                params![name],
                row_to_record,
            )
            .optional()
        })
    }

    fn list(&self) -> AppResult<Vec<ConnectionRecord>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!("{} ORDER BY name", SELECT_COLUMNS))?;
            let rows = stmt.query_map([], row_to_record)?;
            rows.collect()
        })
    }

    fn delete(&self, name: &str) -> AppResult<bool> {
        self.with_conn(|conn| {
            conn.execute("DELETE FROM connections WHERE name = ?1", params![name])
                .map(|n| n > 0)
        })
    }

    fn set_connected(&self, name: &str, connected: bool) -> AppResult<()> {
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE connections SET is_connected = ?2, updated_at = ?3 WHERE name = ?1",
                params![name, connected, Utc::now().to_rfc3339()],
            )
            .map(|_| ())
        })
    }
}
