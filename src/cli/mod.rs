//! Command-line interface definitions.

pub mod check;
pub mod run;
pub mod snapshot;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Realtime market-index relay.
#[derive(Parser, Debug)]
#[command(name = "indexrelay")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file (optional; defaults apply when missing)
    #[arg(short, long, default_value = "config.toml", global = true)]
    pub config: PathBuf,

    /// Override log level (trace, debug, info, warn, error)
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the relay and stream snapshots to stdout as JSON lines
    Run(RunArgs),

    /// Fetch the current snapshot of one index within a time bound
    Snapshot(SnapshotArgs),

    /// Run diagnostic checks
    #[command(subcommand)]
    Check(CheckCommand),
}

/// Subcommands for `indexrelay check`
#[derive(Subcommand, Debug)]
pub enum CheckCommand {
    /// Validate configuration and print a summary
    Config,
}

/// Arguments for the `run` subcommand.
#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Use JSON log format instead of pretty
    #[arg(long)]
    pub json_logs: bool,

    /// Comma-separated index symbols, overriding the configured list
    #[arg(long)]
    pub indices: Option<String>,

    /// Seconds between status lines in the log
    #[arg(long, default_value_t = 30)]
    pub status_interval: u64,
}

/// Arguments for the `snapshot` subcommand.
#[derive(Parser, Debug)]
pub struct SnapshotArgs {
    /// Index symbol, e.g. VNINDEX
    #[arg(long)]
    pub index: String,

    /// How long to wait for data before answering "no data yet"
    #[arg(long, default_value_t = 1500)]
    pub wait_ms: u64,
}

/// Load configuration and apply global CLI overrides.
#[allow(clippy::result_large_err)]
pub(crate) fn load_config(cli: &Cli) -> crate::error::Result<crate::app::Config> {
    let mut config = crate::app::Config::load_or_default(&cli.config)?;
    if let Some(ref level) = cli.log_level {
        config.logging.level = level.clone();
    }
    Ok(config)
}
