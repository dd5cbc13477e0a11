//! `validate` command implementation.

use anyhow::{Context, Result};
use tracing::info;

use crate::cli::ValidateArgs;

/// Execute the `validate` command
pub fn run_validate(args: &ValidateArgs) -> Result<()> {
    if !args.config.exists() {
        anyhow::bail!("Configuration file not found: {}", args.config.display());
    }

    let result = config_loader::ConfigLoader::load_from_path(&args.config);

    match result {
        Ok(blueprint) => {
            if args.json {
                let json = config_loader::ConfigLoader::to_json(&blueprint)
                    .context("Failed to serialize configuration")?;
                println!("{json}");
            } else {
                info!(config = %args.config.display(), "Configuration is valid");
                println!("OK: {}", args.config.display());
            }
            Ok(())
        }
        Err(e) => {
            if args.json {
                println!(
                    "{}",
                    serde_json::json!({
                        "valid": false,
                        "error": e.to_string(),
                    })
                );
            }
            Err(e).with_context(|| format!("Invalid configuration: {}", args.config.display()))
        }
    }
}
