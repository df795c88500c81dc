// src/error.rs
//! Error taxonomy of the monitoring pipeline.
//!
//! Each variant family maps to one recovery policy in the orchestrator:
//! fetch errors skip a source, parse errors drop one candidate, storage
//! errors abort the run and delivery errors leave the article for next run.

use thiserror::Error;

/// Whole-source failure: the adapter could not produce any candidates.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request to {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("request to {url} timed out")]
    Timeout { url: String },
    #[error("{url} answered with HTTP {status}")]
    Status { url: String, status: u16 },
    #[error("could not parse response from {url}: {reason}")]
    Parse { url: String, reason: String },
    #[error("source misconfigured: {0}")]
    Config(String),
}

impl FetchError {
    pub(crate) fn from_reqwest(url: &str, err: reqwest::Error) -> Self {
        if err.is_timeout() {
            FetchError::Timeout {
                url: url.to_string(),
            }
        } else if let Some(status) = err.status() {
            FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            }
        } else {
            FetchError::Http {
                url: url.to_string(),
                source: err,
            }
        }
    }
}

/// One malformed candidate; siblings from the same fetch are unaffected.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("[{source_id}] dropped candidate: {reason}")]
pub struct ParseError {
    pub source_id: String,
    pub reason: String,
}

impl ParseError {
    pub fn new(source_id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            source_id: source_id.into(),
            reason: reason.into(),
        }
    }
}

/// The seen-article store could not be read or written.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("sqlite: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("store lock poisoned")]
    Poisoned,
}

/// The sink refused or never received a message.
#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("sink request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("sink rejected message (status {status}): {description}")]
    Rejected { status: u16, description: String },
    #[error("sink not configured: {0}")]
    NotConfigured(String),
}

/// Errors that abort a whole run.
#[derive(Debug, Error)]
pub enum MonitorError {
    #[error("dedup store failure: {0}")]
    Storage(#[from] StorageError),
}
