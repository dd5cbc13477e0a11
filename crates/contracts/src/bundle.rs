//! MeasurementBundle - Sync core output
//!
//! One visual frame, the IMU slice spanning it, and optionally the
//! temporally-nearest GNSS observation epoch.

use serde::{Deserialize, Serialize};

use crate::{FeatureFrame, GnssObs, ImuSample};

/// Synchronized measurement bundle
///
/// The IMU slice covers `[previous frame, frame.t + td]`; its final element
/// is the straddling sample (first sample past the frame time), which also
/// remains in the ingest buffer for the next bundle.
#[derive(Debug, Clone)]
pub struct MeasurementBundle {
    /// IMU samples spanning the frame interval, straddling sample last
    pub imu: Vec<ImuSample>,

    /// The visual feature frame
    pub frame: FeatureFrame,

    /// Paired GNSS epoch, when one lies within the alignment window
    pub gnss: Option<Vec<GnssObs>>,

    /// Extraction metadata
    pub meta: BundleMeta,
}

/// Bundle metadata (for diagnostics and metrics)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BundleMeta {
    /// Frame timestamp (local clock, seconds)
    pub stamp: f64,

    /// Number of IMU samples in the slice (straddling sample included)
    pub imu_samples: usize,

    /// Whether a GNSS epoch was paired
    pub has_gnss: bool,

    /// |t_gnss − (t_feat + offset)| of the paired epoch (seconds)
    pub gnss_alignment_error: Option<f64>,

    /// Stale feature frames discarded while extracting this bundle
    pub stale_features_dropped: u32,

    /// Stale GNSS epochs discarded while extracting this bundle
    pub stale_gnss_dropped: u32,

    /// Dispatcher processing time (ms), filled after the estimator round
    pub processing_time_ms: f64,
}
