//! `run` command implementation: replay a recorded session.

use std::sync::Arc;

use anyhow::{Context, Result};
use observability::BundleStatsAggregator;
use sync_core::mock::RecordingEstimator;
use sync_core::{LogPublisher, SyncNode};
use tracing::info;

use crate::cli::RunArgs;
use crate::error::CliError;
use crate::replay::{feed, read_session, RecordCounts};

/// Execute the `run` command
pub fn run_replay(args: &RunArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration");

    // Validate config path
    if !args.config.exists() {
        return Err(CliError::config_not_found(args.config.display().to_string()).into());
    }

    // Load and parse configuration
    let blueprint = config_loader::ConfigLoader::load_from_path(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    info!(
        gnss = blueprint.gnss.enable,
        online_sync = blueprint.gnss.online_sync,
        num_of_cam = blueprint.estimator.num_of_cam,
        td = blueprint.estimator.td,
        "Configuration loaded"
    );

    // Dry run - just validate and exit
    if args.dry_run {
        info!("Dry run mode - configuration is valid, exiting");
        print_config_summary(&blueprint);
        return Ok(());
    }

    // Initialize metrics (optional)
    if args.metrics_port != 0 {
        observability::init_metrics_only(args.metrics_port)?;
        info!("Metrics endpoint available on port {}", args.metrics_port);
    }

    // Load the recorded session
    let records = read_session(&args.session).map_err(|e| {
        CliError::session_read(args.session.display().to_string(), e.to_string())
    })?;
    info!(records = records.len(), session = %args.session.display(), "Session loaded");

    // Wire the core around a recording estimator and a log publisher
    let estimator = Arc::new(RecordingEstimator::with_td(blueprint.estimator.td));
    let node = SyncNode::new(
        blueprint.to_core_config(),
        estimator.clone(),
        Arc::new(LogPublisher::new()),
    );

    // Replay, draining bundles inline for deterministic ordering
    let started = std::time::Instant::now();
    let mut stats = BundleStatsAggregator::new();
    let max_bundles = args.max_bundles;
    let counts = feed(&node, records, |meta| {
        observability::metrics::record_bundle_gauges(&meta);
        stats.update(&meta);
        max_bundles == 0 || stats.total_bundles < max_bundles
    });
    let elapsed = started.elapsed();

    info!(
        bundles = stats.total_bundles,
        records = counts.total(),
        duration_s = elapsed.as_secs_f64(),
        "Replay finished"
    );

    print_run_summary(&counts, &stats, elapsed, estimator.as_ref());
    Ok(())
}

/// Print configuration summary for dry-run mode
fn print_config_summary(blueprint: &contracts::NodeBlueprint) {
    println!("\n=== Configuration Summary ===\n");
    println!("GNSS:");
    println!("  Enabled: {}", blueprint.gnss.enable);
    println!("  Online sync: {}", blueprint.gnss.online_sync);
    println!("  Static offset: {} s", blueprint.gnss.local_time_diff);
    println!(
        "  Pairing window: {} s",
        blueprint.gnss.max_gnss_camera_delay
    );
    println!("\nEstimator:");
    println!("  Cameras: {}", blueprint.estimator.num_of_cam);
    println!("  Window size: {}", blueprint.estimator.window_size);
    println!("  td: {} s", blueprint.estimator.td);
    println!();
}

/// Print detailed replay statistics
fn print_run_summary(
    counts: &RecordCounts,
    stats: &BundleStatsAggregator,
    elapsed: std::time::Duration,
    estimator: &RecordingEstimator,
) {
    println!("\n=== Replay Statistics ===\n");
    println!("Records fed: {}", counts.total());
    println!("  IMU: {}", counts.imu);
    println!("  Feature frames: {}", counts.feature);
    println!("  GNSS epochs: {}", counts.gnss_meas);
    println!("  Ephemerides: {}", counts.ephem);
    println!("  Iono params: {}", counts.iono);
    println!("  Time pulses: {}", counts.time_pulse);
    println!("  Triggers: {}", counts.trigger);
    println!("  Restarts: {}", counts.restart);
    println!("Duration: {:.3} s", elapsed.as_secs_f64());

    println!("\nEstimator calls:");
    println!("  process_imu: {}", estimator.imu_calls().len());
    println!("  process_image: {}", estimator.image_count());
    println!("  process_gnss: {}", estimator.gnss_epochs().len());
    println!("  input_ephem: {}", estimator.ephem_count());

    println!();
    println!("{}", stats.summary());
}
