// src/dedup/sqlite.rs
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use super::SeenStore;
use crate::error::StorageError;

/// Durable store; survives restarts.
pub struct SqliteSeenStore {
    conn: Mutex<Connection>,
}

impl SqliteSeenStore {
    /// Open (or create) the database at `path`, creating parent directories.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(path)?;
        Self::with_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self, StorageError> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self, StorageError> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS seen_articles (
                fingerprint TEXT PRIMARY KEY,
                first_seen TEXT NOT NULL
            )",
            [],
        )?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, StorageError> {
        self.conn.lock().map_err(|_| StorageError::Poisoned)
    }

    pub fn first_seen(&self, fingerprint: &str) -> Result<Option<DateTime<Utc>>, StorageError> {
        let conn = self.conn()?;
        let raw: Option<String> = conn
            .query_row(
                "SELECT first_seen FROM seen_articles WHERE fingerprint = ?1",
                params![fingerprint],
                |row| row.get(0),
            )
            .optional()?;
        Ok(raw
            .and_then(|s| DateTime::parse_from_rfc3339(&s).ok())
            .map(|dt| dt.with_timezone(&Utc)))
    }
}

impl SeenStore for SqliteSeenStore {
    fn is_new(&self, fingerprint: &str) -> Result<bool, StorageError> {
        let conn = self.conn()?;
        let hit: Option<i64> = conn
            .query_row(
                "SELECT 1 FROM seen_articles WHERE fingerprint = ?1",
                params![fingerprint],
                |row| row.get(0),
            )
            .optional()?;
        Ok(hit.is_none())
    }

    fn mark_seen(&self, fingerprint: &str, at: DateTime<Utc>) -> Result<(), StorageError> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT OR IGNORE INTO seen_articles (fingerprint, first_seen) VALUES (?1, ?2)",
            params![fingerprint, at.to_rfc3339()],
        )?;
        Ok(())
    }

    fn reset(&self) -> Result<(), StorageError> {
        let conn = self.conn()?;
        let n = conn.execute("DELETE FROM seen_articles", [])?;
        tracing::info!(removed = n, "seen store reset");
        Ok(())
    }

    fn len(&self) -> Result<usize, StorageError> {
        let conn = self.conn()?;
        let n: i64 = conn.query_row("SELECT COUNT(*) FROM seen_articles", [], |row| row.get(0))?;
        Ok(usize::try_from(n).unwrap_or(0))
    }
}
