// src/dedup/memory.rs
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Mutex;

use super::SeenStore;
use crate::error::StorageError;

/// Process-local store. State is lost on exit.
#[derive(Debug, Default)]
pub struct MemorySeenStore {
    seen: Mutex<HashMap<String, DateTime<Utc>>>,
}

impl MemorySeenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn first_seen(&self, fingerprint: &str) -> Option<DateTime<Utc>> {
        self.seen.lock().ok()?.get(fingerprint).copied()
    }
}

impl SeenStore for MemorySeenStore {
    fn is_new(&self, fingerprint: &str) -> Result<bool, StorageError> {
        let g = self.seen.lock().map_err(|_| StorageError::Poisoned)?;
        Ok(!g.contains_key(fingerprint))
    }

    fn mark_seen(&self, fingerprint: &str, at: DateTime<Utc>) -> Result<(), StorageError> {
        let mut g = self.seen.lock().map_err(|_| StorageError::Poisoned)?;
        g.entry(fingerprint.to_string()).or_insert(at);
        Ok(())
    }

    fn reset(&self) -> Result<(), StorageError> {
        self.seen.lock().map_err(|_| StorageError::Poisoned)?.clear();
        Ok(())
    }

    fn len(&self) -> Result<usize, StorageError> {
        Ok(self.seen.lock().map_err(|_| StorageError::Poisoned)?.len())
    }
}
