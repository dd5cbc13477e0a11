//! CLI argument definitions using clap.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// GVIO Syncer - measurement synchronization core of a GNSS-Visual-Inertial
/// odometry node
#[derive(Parser, Debug)]
#[command(
    name = "gvio-syncer",
    author,
    version,
    about = "GNSS-Visual-Inertial measurement synchronization node",
    long_about = "Measurement-synchronization and dispatch core of a tightly-coupled \n\
                  GNSS-Visual-Inertial odometry node.\n\n\
                  Aligns IMU, visual feature, and GNSS observation streams into \n\
                  measurement bundles, calibrates the GNSS-local clock offset from \n\
                  pulse/trigger pairs, and publishes a high-rate dead-reckoned pose."
)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true, env = "GVIO_SYNCER_VERBOSE")]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log output format
    #[arg(
        long,
        value_enum,
        default_value = "pretty",
        global = true,
        env = "GVIO_SYNCER_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Replay a recorded session through the sync core
    Run(RunArgs),

    /// Validate a configuration file without running
    Validate(ValidateArgs),

    /// Display configuration information
    Info(InfoArgs),
}

/// Arguments for the `run` command
#[derive(Parser, Debug, Clone)]
pub struct RunArgs {
    /// Path to configuration file (TOML or JSON)
    #[arg(short, long, default_value = "config.toml", env = "GVIO_SYNCER_CONFIG")]
    pub config: PathBuf,

    /// Recorded session file (JSON lines, one record per message)
    #[arg(short, long, env = "GVIO_SYNCER_SESSION")]
    pub session: PathBuf,

    /// Maximum number of bundles to process (0 = unlimited)
    #[arg(long, default_value = "0", env = "GVIO_SYNCER_MAX_BUNDLES")]
    pub max_bundles: u64,

    /// Validate configuration and exit without running
    #[arg(long)]
    pub dry_run: bool,

    /// Metrics server port (0 = disabled)
    #[arg(long, default_value = "0", env = "GVIO_SYNCER_METRICS_PORT")]
    pub metrics_port: u16,
}

/// Arguments for the `validate` command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Path to configuration file to validate
    #[arg(short, long, default_value = "config.toml")]
    pub config: PathBuf,

    /// Output validation result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `info` command
#[derive(Parser, Debug)]
pub struct InfoArgs {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    pub config: PathBuf,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,

    /// Show topic assignments
    #[arg(long)]
    pub topics: bool,
}

/// Log output format
#[derive(ValueEnum, Clone, Debug, Default)]
pub enum LogFormat {
    /// JSON structured logging
    Json,
    /// Human-readable pretty format
    #[default]
    Pretty,
    /// Compact single-line format
    Compact,
}
