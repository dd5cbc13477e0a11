//! GNSS↔local clock calibration.
//!
//! A receiver time pulse marks an instant on the GNSS clock; the exposure
//! trigger wired to it marks the same physical instant on the local sensor
//! clock. Their difference is the instantaneous clock offset. Drift over a
//! session is assumed small, so the offset is a scalar updated on every
//! pulse/trigger pair.

/// Clock-calibration state, guarded by the time lock of the node
#[derive(Debug, Clone, Copy)]
pub struct ClockCalibrator {
    /// `t_gnss ≈ t_local + time_offset`
    time_offset: f64,

    /// Whether the offset has been established
    valid: bool,

    /// GNSS time of the last pulse, waiting for its trigger
    pending_pulse: Option<f64>,
}

impl ClockCalibrator {
    /// Calibrator waiting for its first pulse/trigger pair
    pub fn online() -> Self {
        Self {
            time_offset: 0.0,
            valid: false,
            pending_pulse: None,
        }
    }

    /// Calibrator seeded with a static offset from configuration
    pub fn with_static_offset(offset: f64) -> Self {
        Self {
            time_offset: offset,
            valid: true,
            pending_pulse: None,
        }
    }

    /// Record a time pulse (GNSS seconds). A later pulse replaces an
    /// unconsumed one.
    pub fn record_pulse(&mut self, t_gnss: f64) {
        self.pending_pulse = Some(t_gnss);
    }

    /// Pair the pending pulse with a local trigger timestamp.
    ///
    /// Returns `Some((offset, first_fix))` when a pulse was pending; the
    /// pulse is consumed. A trigger with no pending pulse is a no-op.
    pub fn apply_trigger(&mut self, t_local: f64) -> Option<(f64, bool)> {
        let pulse = self.pending_pulse.take()?;
        self.time_offset = pulse - t_local;
        let first_fix = !self.valid;
        self.valid = true;
        Some((self.time_offset, first_fix))
    }

    /// Current offset, present once calibration has locked
    pub fn offset(&self) -> Option<f64> {
        self.valid.then_some(self.time_offset)
    }

    /// Whether the offset is usable
    pub fn is_valid(&self) -> bool {
        self.valid
    }
}
