//! Bundle metrics aggregation.
//!
//! In-memory aggregation of `BundleMeta` records for run summaries; the
//! per-event Prometheus counters are emitted by the core at the drop and
//! dispatch sites themselves.

use contracts::BundleMeta;
use metrics::gauge;

/// Record per-bundle gauges from bundle metadata
///
/// Call once per processed bundle.
pub fn record_bundle_gauges(meta: &BundleMeta) {
    gauge!("gvio_syncer_last_bundle_stamp").set(meta.stamp);
    gauge!("gvio_syncer_last_bundle_imu_samples").set(meta.imu_samples as f64);
    if let Some(err) = meta.gnss_alignment_error {
        gauge!("gvio_syncer_last_gnss_alignment_error_ms").set(err * 1000.0);
    }
}

/// Bundle metrics aggregator
///
/// Aggregates metadata in memory for statistics and summary output.
#[derive(Debug, Clone, Default)]
pub struct BundleStatsAggregator {
    /// Total bundles
    pub total_bundles: u64,

    /// Bundles with a paired GNSS epoch
    pub bundles_with_gnss: u64,

    /// Stale feature frames discarded
    pub stale_features: u64,

    /// Stale GNSS epochs discarded
    pub stale_gnss: u64,

    /// IMU samples per bundle
    pub imu_stats: RunningStats,

    /// GNSS alignment error (ms)
    pub alignment_stats: RunningStats,

    /// Dispatcher processing time (ms)
    pub processing_stats: RunningStats,
}

impl BundleStatsAggregator {
    /// Create a new aggregator
    pub fn new() -> Self {
        Self::default()
    }

    /// Update aggregated statistics
    pub fn update(&mut self, meta: &BundleMeta) {
        self.total_bundles += 1;
        if meta.has_gnss {
            self.bundles_with_gnss += 1;
        }
        self.stale_features += meta.stale_features_dropped as u64;
        self.stale_gnss += meta.stale_gnss_dropped as u64;

        self.imu_stats.push(meta.imu_samples as f64);
        if let Some(err) = meta.gnss_alignment_error {
            self.alignment_stats.push(err * 1000.0);
        }
        self.processing_stats.push(meta.processing_time_ms);
    }

    /// Produce a summary report
    pub fn summary(&self) -> BundleSummary {
        BundleSummary {
            total_bundles: self.total_bundles,
            bundles_with_gnss: self.bundles_with_gnss,
            gnss_rate: if self.total_bundles > 0 {
                self.bundles_with_gnss as f64 / self.total_bundles as f64 * 100.0
            } else {
                0.0
            },
            stale_features: self.stale_features,
            stale_gnss: self.stale_gnss,
            imu_samples: StatsSummary::from(&self.imu_stats),
            alignment_error_ms: StatsSummary::from(&self.alignment_stats),
            processing_time_ms: StatsSummary::from(&self.processing_stats),
        }
    }

    /// Reset the aggregation
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Summary report
#[derive(Debug, Clone, Default)]
pub struct BundleSummary {
    pub total_bundles: u64,
    pub bundles_with_gnss: u64,
    pub gnss_rate: f64,
    pub stale_features: u64,
    pub stale_gnss: u64,
    pub imu_samples: StatsSummary,
    pub alignment_error_ms: StatsSummary,
    pub processing_time_ms: StatsSummary,
}

impl std::fmt::Display for BundleSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Bundle Summary ===")?;
        writeln!(f, "Total bundles: {}", self.total_bundles)?;
        writeln!(
            f,
            "Bundles with GNSS: {} ({:.2}%)",
            self.bundles_with_gnss, self.gnss_rate
        )?;
        writeln!(f, "Stale features dropped: {}", self.stale_features)?;
        writeln!(f, "Stale GNSS epochs dropped: {}", self.stale_gnss)?;
        writeln!(f, "IMU samples per bundle: {}", self.imu_samples)?;
        writeln!(f, "GNSS alignment error (ms): {}", self.alignment_error_ms)?;
        writeln!(f, "Processing time (ms): {}", self.processing_time_ms)?;
        Ok(())
    }
}

/// Statistics summary
#[derive(Debug, Clone, Default)]
pub struct StatsSummary {
    pub count: u64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std_dev: f64,
}

impl From<&RunningStats> for StatsSummary {
    fn from(stats: &RunningStats) -> Self {
        Self {
            count: stats.count(),
            min: stats.min(),
            max: stats.max(),
            mean: stats.mean(),
            std_dev: stats.std_dev(),
        }
    }
}

impl std::fmt::Display for StatsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.count == 0 {
            write!(f, "N/A")
        } else {
            write!(
                f,
                "min={:.3}, max={:.3}, mean={:.3}, std={:.3} (n={})",
                self.min, self.max, self.mean, self.std_dev, self.count
            )
        }
    }
}

/// Online statistics (Welford's algorithm)
#[derive(Debug, Clone, Default)]
pub struct RunningStats {
    count: u64,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
}

impl RunningStats {
    /// Push a new value
    pub fn push(&mut self, value: f64) {
        self.count += 1;

        if self.count == 1 {
            self.min = value;
            self.max = value;
            self.mean = value;
            self.m2 = 0.0;
        } else {
            self.min = self.min.min(value);
            self.max = self.max.max(value);

            let delta = value - self.mean;
            self.mean += delta / self.count as f64;
            let delta2 = value - self.mean;
            self.m2 += delta * delta2;
        }
    }

    /// Number of samples
    pub fn count(&self) -> u64 {
        self.count
    }

    /// Mean
    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.mean
        }
    }

    /// Variance
    pub fn variance(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            self.m2 / (self.count - 1) as f64
        }
    }

    /// Standard deviation
    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    /// Minimum
    pub fn min(&self) -> f64 {
        self.min
    }

    /// Maximum
    pub fn max(&self) -> f64 {
        self.max
    }
}
