//! Feature-rate decimation.
//!
//! The feature tracker runs at roughly twice the GNSS observation rate.
//! One of the two interleaved frame sub-sequences lies closer to the GNSS
//! epoch grid; once the clock offset is known and both a GNSS epoch and a
//! previous frame have been seen, the decimator locks onto that
//! sub-sequence by parity of the frame counter and drops the other one.

use metrics::counter;

/// Parity gate over incoming feature frames
#[derive(Debug, Clone, Copy)]
pub struct FeatureDecimator {
    /// −1 while undecided; afterwards the counter parity to drop
    skip_parity: i8,

    /// Frames seen so far (dropped ones included)
    counter: u64,

    /// GNSS-aligned timestamp of the previous frame, −1 before any
    last_feature_time: f64,

    /// Newest GNSS epoch time, −1 before any
    latest_gnss_time: f64,
}

impl FeatureDecimator {
    /// Gate for a GNSS-coupled node: undecided until parity locks
    pub fn phase_locked() -> Self {
        Self {
            skip_parity: -1,
            counter: 0,
            last_feature_time: -1.0,
            latest_gnss_time: -1.0,
        }
    }

    /// Gate for a pure VIO node: drops every even-counter frame from the
    /// start, no GNSS alignment involved
    pub fn fixed_parity() -> Self {
        Self {
            skip_parity: 0,
            ..Self::phase_locked()
        }
    }

    /// Record the newest GNSS epoch time (GNSS seconds)
    pub fn note_gnss(&mut self, t_gnss: f64) {
        self.latest_gnss_time = t_gnss;
    }

    /// Decide whether the arriving frame is kept.
    ///
    /// `time_offset` is the calibrated clock offset, if any; the parity
    /// decision is deferred until it is available.
    pub fn admit(&mut self, t_local: f64, time_offset: Option<f64>) -> bool {
        self.counter += 1;

        if self.skip_parity < 0 {
            if let Some(offset) = time_offset {
                let t = t_local + offset;

                if self.latest_gnss_time > 0.0 && self.last_feature_time > 0.0 {
                    let parity = (self.counter % 2) as i8;
                    if (t - self.latest_gnss_time).abs()
                        > (self.last_feature_time - self.latest_gnss_time).abs()
                    {
                        // current frame is the worse one: drop it and its parity class
                        self.skip_parity = parity;
                    } else {
                        // keep current, drop the other parity class
                        self.skip_parity = 1 - parity;
                    }
                }

                self.last_feature_time = t;
            }
        }

        let keep = self.skip_parity >= 0 && (self.counter % 2) as i8 != self.skip_parity;
        if !keep {
            counter!("gvio_syncer_features_decimated_total").increment(1);
        }
        keep
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_parity_halves_the_rate() {
        let mut dec = FeatureDecimator::fixed_parity();
        assert!(dec.admit(0.05, None));
        assert!(!dec.admit(0.10, None));
        assert!(dec.admit(0.15, None));
        assert!(!dec.admit(0.20, None));
    }

    #[test]
    fn undecided_gate_drops_frames() {
        let mut dec = FeatureDecimator::phase_locked();
        // no offset yet: parity cannot lock, frames are dropped
        assert!(!dec.admit(10.00, None));
        assert!(!dec.admit(10.05, None));
    }

    #[test]
    fn parity_locks_onto_gnss_grid() {
        // 20 Hz frames, 10 Hz GNSS, offset 0; base time kept positive so the
        // validity guards on "have we seen one yet" hold
        let mut dec = FeatureDecimator::phase_locked();
        dec.note_gnss(10.000);

        // counter 1: first frame, parity undecided (no previous frame)
        assert!(!dec.admit(10.000, Some(0.0)));

        // counter 2: |10.05-10.0| > |10.0-10.0| -> drop current class (even)
        assert!(!dec.admit(10.050, Some(0.0)));

        // even counters dropped, odd counters kept from here on
        assert!(dec.admit(10.100, Some(0.0))); // counter 3
        assert!(!dec.admit(10.150, Some(0.0))); // counter 4
        assert!(dec.admit(10.200, Some(0.0))); // counter 5
    }

    #[test]
    fn parity_keeps_current_when_closer() {
        let mut dec = FeatureDecimator::phase_locked();
        dec.note_gnss(10.050);

        // counter 1 at 10.000: no previous frame, dropped, becomes "previous"
        assert!(!dec.admit(10.000, Some(0.0)));

        // counter 2 at 10.050 sits on the epoch: |0| < |0.05| -> keep current
        // class (even), drop odd
        assert!(dec.admit(10.050, Some(0.0)));
        assert!(!dec.admit(10.100, Some(0.0))); // counter 3
        assert!(dec.admit(10.150, Some(0.0))); // counter 4
    }

    #[test]
    fn gnss_before_any_feature_leaves_gate_closed() {
        // Only epochs arrive: the previous-frame guard never passes and the
        // gate stays undecided
        let mut dec = FeatureDecimator::phase_locked();
        dec.note_gnss(10.0);
        dec.note_gnss(10.1);
        assert!(!dec.admit(10.15, Some(0.0)));
    }
}
