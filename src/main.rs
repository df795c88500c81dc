//! Admission Monitor: binary entrypoint.
//! Loads config, wires the pipeline and runs it once or on an interval.

use admission_monitor::cli::Cli;
use admission_monitor::config::AppConfig;
use admission_monitor::dedup::{SeenStore, SqliteSeenStore};
use admission_monitor::pipeline::Monitor;
use admission_monitor::telemetry;
use anyhow::{Context, Result};
use clap::Parser;
use std::process::ExitCode;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;

#[tokio::main]
async fn main() -> ExitCode {
    // Load .env in local/dev; TELEGRAM_* and MONITOR_* may come from there.
    let _ = dotenvy::dotenv();
    telemetry::init_tracing();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %format!("{e:#}"), "monitor stopped");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    if let Some(addr) = cli.metrics_addr {
        telemetry::install_prometheus(addr)?;
    }

    let cfg = AppConfig::load_from(&cli.config)?;
    let store = Arc::new(
        SqliteSeenStore::open(&cfg.storage.path)
            .with_context(|| format!("opening seen store at {}", cfg.storage.path))?,
    );
    if cli.reset_state {
        store.reset().context("resetting seen store")?;
        tracing::warn!(path = %cfg.storage.path, "seen store cleared; every current article counts as new");
    }

    let monitor = Monitor::from_config(&cfg, store.clone())?.with_dry_run(cli.dry_run);
    monitor.classifier().track(&cli.config);
    tracing::info!(
        sources = ?monitor.source_ids(),
        sink = monitor.dispatcher().sink_name(),
        dry_run = cli.dry_run,
        seen = store.len().unwrap_or(0),
        "monitor ready"
    );

    if cli.probe_sink {
        monitor
            .dispatcher()
            .probe()
            .await
            .context("notification sink probe failed")?;
    }

    let cancel = monitor.cancel_flag();
    let wake = Arc::new(Notify::new());
    {
        let wake = Arc::clone(&wake);
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("interrupt received, stopping after the current article");
                cancel.store(true, Ordering::SeqCst);
                wake.notify_one();
            }
        });
    }

    loop {
        let summary = monitor.run_once().await?;
        let Some(secs) = cli.interval_secs else {
            break;
        };
        if summary.cancelled || monitor.cancel_flag().load(Ordering::SeqCst) {
            break;
        }

        tokio::select! {
            _ = tokio::time::sleep(Duration::from_secs(secs)) => {}
            _ = wake.notified() => break,
        }

        match monitor.classifier().reload_if_changed(&cli.config) {
            Ok(true) => tracing::info!("categories changed on disk, reloaded"),
            Ok(false) => {}
            Err(e) => tracing::warn!(error = %format!("{e:#}"), "category reload failed, keeping previous table"),
        }
    }
    Ok(())
}
