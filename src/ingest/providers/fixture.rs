// src/ingest/providers/fixture.rs
//! Test fixture source. Never built from configuration.

use async_trait::async_trait;
use std::sync::Mutex;

use crate::article::Article;
use crate::error::{FetchError, ParseError};
use crate::ingest::types::{FetchOutcome, SourceAdapter};

enum Script {
    Items(Vec<Result<Article, ParseError>>),
    Fail(String),
}

/// Returns a fixed candidate list (or a fixed failure) on every fetch.
pub struct FixtureAdapter {
    id: String,
    script: Mutex<Script>,
}

impl FixtureAdapter {
    pub fn new(id: &str, articles: Vec<Article>) -> Self {
        Self::with_results(id, articles.into_iter().map(Ok).collect())
    }

    pub fn with_results(id: &str, results: Vec<Result<Article, ParseError>>) -> Self {
        Self {
            id: id.to_string(),
            script: Mutex::new(Script::Items(results)),
        }
    }

    /// Every fetch fails with `FetchError::Status { status: 503 }`.
    pub fn failing(id: &str, url: &str) -> Self {
        Self {
            id: id.to_string(),
            script: Mutex::new(Script::Fail(url.to_string())),
        }
    }

    /// Swap what the next fetch returns.
    pub fn set_articles(&self, articles: Vec<Article>) {
        if let Ok(mut g) = self.script.lock() {
            *g = Script::Items(articles.into_iter().map(Ok).collect());
        }
    }
}

#[async_trait]
impl SourceAdapter for FixtureAdapter {
    async fn fetch(&self) -> FetchOutcome {
        let g = self
            .script
            .lock()
            .map_err(|_| FetchError::Config(format!("fixture {} poisoned", self.id)))?;
        match &*g {
            Script::Items(items) => Ok(items.clone()),
            Script::Fail(url) => Err(FetchError::Status {
                url: url.clone(),
                status: 503,
            }),
        }
    }

    fn id(&self) -> &str {
        &self.id
    }
}
