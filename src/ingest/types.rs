// src/ingest/types.rs
use async_trait::async_trait;

use crate::article::Article;
use crate::error::{FetchError, ParseError};

/// What one fetch yields: either a whole-source failure, or per-candidate results.
pub type FetchOutcome = Result<Vec<Result<Article, ParseError>>, FetchError>;

/// A configured announcement source.
///
/// Adapters only produce candidates. They never touch the dedup store or the
/// sink, and every returned `Ok` article has a non-empty title and url (the
/// list page url when no detail page exists).
#[async_trait]
pub trait SourceAdapter: Send + Sync {
    async fn fetch(&self) -> FetchOutcome;

    fn id(&self) -> &str;
}
