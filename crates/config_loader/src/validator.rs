//! Configuration validation.
//!
//! Rules:
//! - online_sync requires the GNSS path to be enabled
//! - max_gnss_camera_delay > 0
//! - num_of_cam >= 1, window_size >= 1
//! - topic names non-empty and globally unique

use std::collections::HashSet;

use contracts::{ContractError, NodeBlueprint};

/// Validate a NodeBlueprint
///
/// Returns the first error encountered, or Ok(()).
pub fn validate(blueprint: &NodeBlueprint) -> Result<(), ContractError> {
    validate_gnss(blueprint)?;
    validate_estimator(blueprint)?;
    validate_topics(blueprint)?;
    Ok(())
}

/// Validate the GNSS section
fn validate_gnss(blueprint: &NodeBlueprint) -> Result<(), ContractError> {
    let gnss = &blueprint.gnss;

    if gnss.online_sync && !gnss.enable {
        return Err(ContractError::config_validation(
            "gnss.online_sync",
            "online_sync requires the GNSS path to be enabled",
        ));
    }

    if gnss.max_gnss_camera_delay <= 0.0 {
        return Err(ContractError::config_validation(
            "gnss.max_gnss_camera_delay",
            format!(
                "max_gnss_camera_delay must be > 0, got {}",
                gnss.max_gnss_camera_delay
            ),
        ));
    }

    Ok(())
}

/// Validate estimator-shared constants
fn validate_estimator(blueprint: &NodeBlueprint) -> Result<(), ContractError> {
    let estimator = &blueprint.estimator;

    if estimator.num_of_cam < 1 {
        return Err(ContractError::config_validation(
            "estimator.num_of_cam",
            format!("num_of_cam must be >= 1, got {}", estimator.num_of_cam),
        ));
    }

    if estimator.window_size < 1 {
        return Err(ContractError::config_validation(
            "estimator.window_size",
            format!("window_size must be >= 1, got {}", estimator.window_size),
        ));
    }

    Ok(())
}

/// Validate topic names: non-empty, globally unique
fn validate_topics(blueprint: &NodeBlueprint) -> Result<(), ContractError> {
    let mut seen = HashSet::new();
    for (field, name) in blueprint.topics.all() {
        if name.is_empty() {
            return Err(ContractError::config_validation(
                format!("topics.{field}"),
                "topic name cannot be empty",
            ));
        }
        if !seen.insert(name.to_string()) {
            return Err(ContractError::config_validation(
                format!("topics.{field}"),
                format!("duplicate topic name '{name}'"),
            ));
        }
    }
    Ok(())
}
