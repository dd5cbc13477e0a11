//! `info` command implementation.

use anyhow::{Context, Result};

use crate::cli::InfoArgs;

/// Execute the `info` command
pub fn run_info(args: &InfoArgs) -> Result<()> {
    let blueprint = config_loader::ConfigLoader::load_from_path(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    if args.json {
        let json = config_loader::ConfigLoader::to_json(&blueprint)
            .context("Failed to serialize configuration")?;
        println!("{json}");
        return Ok(());
    }

    println!("Configuration: {}", args.config.display());
    println!();
    println!("GNSS coupling:");
    println!("  enabled: {}", blueprint.gnss.enable);
    println!("  online sync: {}", blueprint.gnss.online_sync);
    println!("  static offset: {} s", blueprint.gnss.local_time_diff);
    println!(
        "  pairing window: {} s",
        blueprint.gnss.max_gnss_camera_delay
    );
    println!();
    println!("Estimator constants:");
    println!("  cameras: {}", blueprint.estimator.num_of_cam);
    println!("  window size: {}", blueprint.estimator.window_size);
    println!("  td: {} s", blueprint.estimator.td);

    if args.topics {
        println!();
        println!("Topics:");
        for (field, name) in blueprint.topics.all() {
            println!("  {field}: {name}");
        }
    }

    Ok(())
}
