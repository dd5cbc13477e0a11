//! Sensor message types consumed by the sync core.
//!
//! These mirror the transport-layer streams one-to-one; transport and
//! serialization themselves live outside this workspace.

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

/// Publication header attached to every outgoing message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Header {
    /// Timestamp (local sensor clock, seconds)
    pub stamp: f64,

    /// Reference frame of the published quantity
    pub frame_id: String,
}

impl Header {
    /// Header in the world frame
    pub fn world(stamp: f64) -> Self {
        Self {
            stamp,
            frame_id: "world".to_string(),
        }
    }
}

/// One inertial measurement (~200 Hz)
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ImuSample {
    /// Timestamp (local clock, seconds)
    pub t: f64,

    /// Linear acceleration (m/s², body frame)
    pub acc: Vector3<f64>,

    /// Angular velocity (rad/s, body frame)
    pub gyr: Vector3<f64>,
}

impl ImuSample {
    pub fn new(t: f64, acc: Vector3<f64>, gyr: Vector3<f64>) -> Self {
        Self { t, acc, gyr }
    }
}

/// One tracked feature observation
///
/// Coordinates are on the normalized image plane with `z ≡ 1`; the raw
/// pixel coordinate and pixel velocity ride along in extra channels.
/// `channel` encodes feature and camera id together:
/// `feature_id = channel / num_of_cam`, `camera_id = channel % num_of_cam`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct FeaturePoint {
    /// Combined feature/camera channel value
    pub channel: u32,

    /// Normalized-plane x
    pub x: f64,

    /// Normalized-plane y
    pub y: f64,

    /// Normalized-plane z, always 1
    pub z: f64,

    /// Pixel column
    pub u: f64,

    /// Pixel row
    pub v: f64,

    /// Pixel velocity x
    pub vx: f64,

    /// Pixel velocity y
    pub vy: f64,
}

/// One visual feature frame (~20 Hz before decimation)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureFrame {
    /// Exposure timestamp (local clock, seconds)
    pub t: f64,

    /// Tracked points of this frame
    pub points: Vec<FeaturePoint>,
}

/// Feature map handed to the estimator:
/// `feature_id -> [(camera_id, [x, y, z, u, v, vx, vy])]`
pub type FeatureMap = std::collections::HashMap<u32, Vec<(u32, [f64; 7])>>;
