// src/dedup/mod.rs
//! Seen-article store keyed by fingerprint.
//!
//! Entries are append-only: recording a fingerprint twice keeps the first
//! timestamp, and only an explicit [`SeenStore::reset`] removes anything.

pub mod memory;
pub mod sqlite;

use chrono::{DateTime, Utc};

use crate::error::StorageError;

pub use memory::MemorySeenStore;
pub use sqlite::SqliteSeenStore;

pub trait SeenStore: Send + Sync {
    fn is_new(&self, fingerprint: &str) -> Result<bool, StorageError>;

    /// Call only after the article was delivered.
    fn mark_seen(&self, fingerprint: &str, at: DateTime<Utc>) -> Result<(), StorageError>;

    /// Wipe all state. Testing/maintenance only.
    fn reset(&self) -> Result<(), StorageError>;

    fn len(&self) -> Result<usize, StorageError>;

    fn is_empty(&self) -> Result<bool, StorageError> {
        Ok(self.len()? == 0)
    }
}
