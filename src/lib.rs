// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod article;
pub mod classify;
pub mod cli;
pub mod config;
pub mod deadline;
pub mod dedup;
pub mod error;
pub mod ingest;
pub mod normalize;
pub mod notify;
pub mod pipeline;
pub mod telemetry;

// ---- Re-exports for stable public API ----
pub use crate::article::{Article, ProcessedArticle, GENERAL_CATEGORY};
pub use crate::classify::{CategoryConfig, CategoryTable, Classification, ClassifierHandle};
pub use crate::config::AppConfig;
pub use crate::deadline::{Deadline, Urgency};
pub use crate::dedup::{MemorySeenStore, SeenStore, SqliteSeenStore};
pub use crate::error::{DeliveryError, FetchError, MonitorError, ParseError, StorageError};
pub use crate::ingest::{FetchOutcome, SourceAdapter};
pub use crate::normalize::{ContentNormalizer, ExtractionMethod};
pub use crate::notify::{NotificationDispatcher, NotificationSink, OutgoingMessage};
pub use crate::pipeline::{Monitor, RunSummary};
