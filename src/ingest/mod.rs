// src/ingest/mod.rs
pub mod providers;
pub mod types;

use anyhow::{Context, Result};
use metrics::histogram;
use reqwest::Client;
use std::time::{Duration, Instant};

use crate::article::Article;
use crate::config::{AppConfig, HttpConfig, SourceKind};
use crate::error::{FetchError, ParseError};
use providers::{board::BoardAdapter, rss::RssAdapter};
pub use types::{FetchOutcome, SourceAdapter};

/// One client for every source: bounded timeout, fixed User-Agent.
pub fn build_http_client(cfg: &HttpConfig) -> Result<Client> {
    Client::builder()
        .timeout(Duration::from_secs(cfg.timeout_secs.max(1)))
        .user_agent(cfg.user_agent.clone())
        .build()
        .context("building http client")
}

/// Adapters for every enabled source, in configuration order.
pub fn build_adapters(cfg: &AppConfig, client: &Client) -> Result<Vec<Box<dyn SourceAdapter>>> {
    let mut out: Vec<Box<dyn SourceAdapter>> = Vec::new();
    for src in &cfg.sources {
        if !src.enabled {
            tracing::info!(source = %src.id, "source disabled, skipping");
            continue;
        }
        let adapter: Box<dyn SourceAdapter> = match src.kind {
            SourceKind::Rss => Box::new(RssAdapter::from_url(&src.id, &src.url, client.clone())),
            SourceKind::Board => {
                let board = src
                    .board
                    .as_ref()
                    .with_context(|| format!("source {:?} has no board section", src.id))?;
                Box::new(
                    BoardAdapter::http(&src.id, &src.url, board, client.clone())
                        .with_context(|| format!("building board source {:?}", src.id))?,
                )
            }
        };
        out.push(adapter);
    }
    Ok(out)
}

/// GET `url` as text. Non-2xx and timeouts become `FetchError`s.
pub async fn get_text(client: &Client, url: &str) -> Result<String, FetchError> {
    let t0 = Instant::now();
    let resp = client
        .get(url)
        .send()
        .await
        .map_err(|e| FetchError::from_reqwest(url, e))?;
    let status = resp.status();
    if !status.is_success() {
        return Err(FetchError::Status {
            url: url.to_string(),
            status: status.as_u16(),
        });
    }
    let body = resp
        .text()
        .await
        .map_err(|e| FetchError::from_reqwest(url, e))?;
    histogram!("monitor_fetch_ms").record(t0.elapsed().as_secs_f64() * 1_000.0);
    Ok(body)
}

/// Enforce the adapter contract on a candidate: trimmed, non-empty title and url.
pub fn validate(source_id: &str, mut a: Article) -> Result<Article, ParseError> {
    a.title = crate::normalize::collapse_whitespace(&a.title);
    a.url = a.url.trim().to_string();
    if a.title.is_empty() {
        return Err(ParseError::new(source_id, "empty title"));
    }
    if a.url.is_empty() {
        return Err(ParseError::new(
            source_id,
            format!("empty url for {:?}", crate::notify::short(&a.title)),
        ));
    }
    if a.source.is_empty() {
        a.source = source_id.to_string();
    }
    Ok(a)
}
