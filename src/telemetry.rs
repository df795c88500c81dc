// src/telemetry.rs
use anyhow::{Context, Result};
use metrics::{describe_counter, describe_gauge, describe_histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use once_cell::sync::OnceCell;
use std::net::SocketAddr;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

pub const ENV_LOG_JSON: &str = "MONITOR_LOG_JSON";

/// Install the global subscriber. `RUST_LOG` overrides the default `info`
/// filter; `MONITOR_LOG_JSON=1` switches to JSON lines.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let json = std::env::var(ENV_LOG_JSON).ok().is_some_and(|v| v == "1");

    let registry = tracing_subscriber::registry().with(filter);
    let res = if json {
        registry.with(fmt::layer().json()).try_init()
    } else {
        registry.with(fmt::layer().compact()).try_init()
    };
    if let Err(e) = res {
        eprintln!("tracing already initialized: {e}");
    }
}

/// Serve Prometheus metrics on `addr` (`/metrics` via the exporter's listener).
pub fn install_prometheus(addr: SocketAddr) -> Result<()> {
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .with_context(|| format!("installing prometheus exporter on {addr}"))?;
    tracing::info!(%addr, "prometheus exporter listening");
    Ok(())
}

/// One-time metrics registration (so series carry descriptions).
pub fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!(
            "monitor_articles_fetched_total",
            "Candidate articles returned by source adapters."
        );
        describe_counter!(
            "monitor_articles_dropped_total",
            "Candidates dropped for parse/validation errors."
        );
        describe_counter!(
            "monitor_articles_deduplicated_total",
            "Articles skipped because they were already notified."
        );
        describe_counter!(
            "monitor_notifications_sent_total",
            "Notifications accepted by the sink."
        );
        describe_counter!(
            "monitor_notifications_failed_total",
            "Notifications the sink refused or never received."
        );
        describe_counter!("monitor_source_errors_total", "Whole-source fetch failures.");
        describe_histogram!("monitor_fetch_ms", "HTTP fetch time in milliseconds.");
        describe_gauge!("monitor_last_run_ts", "Unix ts when the last run finished.");
    });
}
