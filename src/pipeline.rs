// src/pipeline.rs
//! One monitoring run: fetch → normalize → classify → dedupe → notify → persist.
//!
//! Sources are polled one after another and articles are handled in fetch
//! order. A fingerprint is recorded only after its notification was
//! accepted, so an undelivered article comes back on the next run.

use anyhow::Result;
use chrono::Utc;
use metrics::{counter, gauge};
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::article::{Article, ProcessedArticle};
use crate::classify::{CategoryTable, ClassifierHandle};
use crate::config::AppConfig;
use crate::dedup::SeenStore;
use crate::error::MonitorError;
use crate::ingest::{self, SourceAdapter};
use crate::normalize::ContentNormalizer;
use crate::notify::{short, MessageFormatter, NotificationDispatcher};
use crate::telemetry::ensure_metrics_described;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub sources_polled: usize,
    pub sources_failed: usize,
    /// Valid candidates (after validation).
    pub fetched: usize,
    /// Candidates dropped for parse/validation errors.
    pub dropped: usize,
    pub low_quality: usize,
    pub by_category: BTreeMap<String, usize>,
    pub deduplicated: usize,
    /// New "general" articles held back because general routing is off.
    pub general_skipped: usize,
    pub notified: usize,
    pub failed_delivery: usize,
    /// New articles a dry run would have sent.
    pub dry_run_skipped: usize,
    pub cancelled: bool,
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "sources={} (failed {}) fetched={} dropped={} low_quality={} deduplicated={} notified={} failed_delivery={}",
            self.sources_polled,
            self.sources_failed,
            self.fetched,
            self.dropped,
            self.low_quality,
            self.deduplicated,
            self.notified,
            self.failed_delivery
        )?;
        if self.general_skipped > 0 {
            write!(f, " general_skipped={}", self.general_skipped)?;
        }
        if self.dry_run_skipped > 0 {
            write!(f, " dry_run_skipped={}", self.dry_run_skipped)?;
        }
        if !self.by_category.is_empty() {
            let cats: Vec<String> = self
                .by_category
                .iter()
                .map(|(k, v)| format!("{k}:{v}"))
                .collect();
            write!(f, " categories=[{}]", cats.join(", "))?;
        }
        if self.cancelled {
            write!(f, " (cancelled)")?;
        }
        Ok(())
    }
}

pub struct Monitor {
    sources: Vec<Box<dyn SourceAdapter>>,
    normalizer: ContentNormalizer,
    classifier: ClassifierHandle,
    store: Arc<dyn SeenStore>,
    dispatcher: NotificationDispatcher,
    formatter: MessageFormatter,
    dry_run: bool,
    notify_general: bool,
    cancel: Arc<AtomicBool>,
}

impl Monitor {
    pub fn new(
        sources: Vec<Box<dyn SourceAdapter>>,
        normalizer: ContentNormalizer,
        classifier: ClassifierHandle,
        store: Arc<dyn SeenStore>,
        dispatcher: NotificationDispatcher,
        formatter: MessageFormatter,
    ) -> Self {
        Self {
            sources,
            normalizer,
            classifier,
            store,
            dispatcher,
            formatter,
            dry_run: false,
            notify_general: true,
            cancel: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Wire everything from config. Sources get one shared HTTP client.
    pub fn from_config(cfg: &AppConfig, store: Arc<dyn SeenStore>) -> Result<Self> {
        let client = ingest::build_http_client(&cfg.http)?;
        Ok(Self::new(
            ingest::build_adapters(cfg, &client)?,
            ContentNormalizer::from_config(&cfg.normalizer)?,
            ClassifierHandle::new(CategoryTable::from_config(cfg)),
            store,
            NotificationDispatcher::from_config(&cfg.notifier)?,
            MessageFormatter::from_config(cfg),
        )
        .with_general_notifications(cfg.classifier.notify_general))
    }

    /// Classify and dedupe, but never send or record.
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn with_general_notifications(mut self, enabled: bool) -> Self {
        self.notify_general = enabled;
        self
    }

    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    pub fn classifier(&self) -> &ClassifierHandle {
        &self.classifier
    }

    pub fn dispatcher(&self) -> &NotificationDispatcher {
        &self.dispatcher
    }

    pub fn source_ids(&self) -> Vec<&str> {
        self.sources.iter().map(|s| s.id()).collect()
    }

    /// Normalize, classify and fingerprint one validated article.
    pub fn process(&self, article: Article, table: &CategoryTable) -> ProcessedArticle {
        let normalized = self.normalizer.normalize(&article.raw_content);
        let class = table.classify(&article.title, &normalized.text);
        ProcessedArticle {
            fingerprint: article.fingerprint(),
            low_quality: normalized.is_low_quality(),
            extraction: normalized.method,
            normalized_content: normalized.text,
            category: class.category,
            confidence: class.confidence,
            article,
        }
    }

    fn cancelled(&self) -> bool {
        self.cancel.load(Ordering::SeqCst)
    }

    pub async fn run_once(&self) -> Result<RunSummary, MonitorError> {
        ensure_metrics_described();
        let table = self.classifier.snapshot();
        let mut summary = RunSummary::default();
        let mut handled: HashSet<String> = HashSet::new();

        'sources: for src in &self.sources {
            if self.cancelled() {
                summary.cancelled = true;
                break;
            }
            summary.sources_polled += 1;

            let results = match src.fetch().await {
                Ok(v) => v,
                Err(e) => {
                    tracing::warn!(error = %e, source = src.id(), "source fetch failed");
                    counter!("monitor_source_errors_total", "source" => src.id().to_string())
                        .increment(1);
                    summary.sources_failed += 1;
                    continue;
                }
            };
            tracing::debug!(source = src.id(), candidates = results.len(), "fetched");

            for res in results {
                if self.cancelled() {
                    summary.cancelled = true;
                    break 'sources;
                }

                let mut article = match res.and_then(|a| ingest::validate(src.id(), a)) {
                    Ok(a) => a,
                    Err(e) => {
                        tracing::warn!(source = %e.source_id, reason = %e.reason, "candidate dropped");
                        counter!("monitor_articles_dropped_total").increment(1);
                        summary.dropped += 1;
                        continue;
                    }
                };
                summary.fetched += 1;
                if article.published_at.is_none() {
                    article.published_at = Some(Utc::now());
                }

                let p = self.process(article, &table);
                if p.low_quality {
                    summary.low_quality += 1;
                    tracing::debug!(title = %short(&p.article.title), "no usable content");
                }
                *summary.by_category.entry(p.category.clone()).or_default() += 1;

                if !handled.insert(p.fingerprint.clone()) || !self.store.is_new(&p.fingerprint)? {
                    counter!("monitor_articles_deduplicated_total").increment(1);
                    summary.deduplicated += 1;
                    continue;
                }
                // Unrecorded, so a later category change can still route it.
                if p.is_general() && !self.notify_general {
                    tracing::debug!(title = %short(&p.article.title), "general article not routed");
                    summary.general_skipped += 1;
                    continue;
                }

                tracing::info!(
                    source = src.id(),
                    category = %p.category,
                    confidence = %format!("{:.3}", p.confidence),
                    title = %short(&p.article.title),
                    "new article"
                );
                let msg = self.formatter.format(&p, &table);

                if self.dry_run {
                    summary.dry_run_skipped += 1;
                    continue;
                }

                match self.dispatcher.send(&msg).await {
                    Ok(()) => {
                        self.store.mark_seen(&p.fingerprint, Utc::now())?;
                        summary.notified += 1;
                    }
                    // Logged by the dispatcher; left unmarked for the next run.
                    Err(_) => summary.failed_delivery += 1,
                }
            }
        }

        gauge!("monitor_last_run_ts").set(Utc::now().timestamp() as f64);
        tracing::info!(dry_run = self.dry_run, "run finished: {summary}");
        Ok(summary)
    }
}
