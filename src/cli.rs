// src/cli.rs
//! Command-line arguments. Every option also has an environment variable.

use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;

use crate::config::{DEFAULT_CONFIG_PATH, ENV_CONFIG_PATH};

/// Polls admission boards and feeds and notifies about new announcements.
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Path to the TOML config
    #[arg(short, long, env = ENV_CONFIG_PATH, default_value = DEFAULT_CONFIG_PATH)]
    pub config: PathBuf,

    /// Classify and dedupe, but never send or record anything
    #[arg(long, env = "MONITOR_DRY_RUN")]
    pub dry_run: bool,

    /// Clear the seen-article store before the first run (testing only)
    #[arg(long, env = "MONITOR_RESET_STATE")]
    pub reset_state: bool,

    /// Repeat every N seconds until interrupted; a single run when absent
    #[arg(long, env = "MONITOR_INTERVAL_SECS", value_parser = clap::value_parser!(u64).range(1..))]
    pub interval_secs: Option<u64>,

    /// Check the notification sink before the first run and exit on failure
    #[arg(long, env = "MONITOR_PROBE_SINK")]
    pub probe_sink: bool,

    /// Serve Prometheus metrics on this address
    #[arg(long, env = "MONITOR_METRICS_ADDR")]
    pub metrics_addr: Option<SocketAddr>,
}
