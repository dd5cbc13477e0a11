//! GNSS message types: raw observations, broadcast ephemerides, time pulses.
//!
//! Observation and ephemeris payloads are opaque to the sync core; only the
//! epoch timestamp participates in alignment. Everything else is forwarded
//! to the estimator untouched.

use serde::{Deserialize, Serialize};

/// Satellite time system of a receiver time pulse
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeSystem {
    Gps,
    Glo,
    Gal,
    Bds,
    /// Receiver could not identify the system
    None,
}

/// Hardware time pulse (PPS) emitted by the GNSS receiver
///
/// Marks an instant whose GNSS-clock value is known exactly; correlated with
/// a local exposure trigger it yields the GNSS↔local clock offset.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TimePulse {
    /// Week number in the pulse's own time system
    pub week: u32,

    /// Time of week (seconds)
    pub tow: f64,

    /// Time system the week/tow pair is expressed in
    pub time_sys: TimeSystem,

    /// Whether week/tow are UTC-based rather than system time
    pub utc_based: bool,
}

/// One per-satellite raw observation record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GnssObs {
    /// Observation time (continuous GPS seconds)
    pub time: f64,

    /// Satellite number
    pub sat: u32,

    /// Pseudorange (m)
    pub psr: f64,

    /// Doppler (Hz)
    pub dopp: f64,

    /// Carrier-to-noise density (dB-Hz)
    pub cn0: f64,
}

/// Timestamp of an observation epoch: the first record's time
pub fn epoch_time(epoch: &[GnssObs]) -> Option<f64> {
    epoch.first().map(|obs| obs.time)
}

/// GPS/Galileo/BeiDou broadcast ephemeris (Keplerian form)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BroadcastEphem {
    /// Satellite number
    pub sat: u32,

    /// Week of ephemeris reference epoch
    pub week: u32,

    /// Time of ephemeris (seconds of week)
    pub toe: f64,

    /// Time of clock (seconds of week)
    pub toc: f64,

    /// Clock bias, drift, drift rate
    pub af: [f64; 3],

    /// Satellite health flag
    pub health: u32,
}

/// GLONASS broadcast ephemeris (state-vector form)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GloEphem {
    /// Satellite number
    pub sat: u32,

    /// Ephemeris reference time (continuous GPS seconds)
    pub toe: f64,

    /// ECEF position (m)
    pub pos: [f64; 3],

    /// ECEF velocity (m/s)
    pub vel: [f64; 3],

    /// ECEF acceleration (m/s²)
    pub acc: [f64; 3],

    /// Clock offset (s)
    pub tau_n: f64,

    /// Relative frequency bias
    pub gamma: f64,

    /// Frequency channel number
    pub freq_slot: i32,
}

/// Broadcast orbital parameters, forwarded to the estimator as-is
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Ephemeris {
    /// GPS, Galileo or BeiDou broadcast record
    Broadcast(BroadcastEphem),

    /// GLONASS broadcast record
    Glonass(GloEphem),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn epoch_time_is_first_record() {
        let epoch = vec![
            GnssObs {
                time: 100.0,
                sat: 3,
                psr: 2.1e7,
                dopp: -310.0,
                cn0: 45.0,
            },
            GnssObs {
                time: 100.0,
                sat: 7,
                psr: 2.3e7,
                dopp: 125.0,
                cn0: 41.0,
            },
        ];
        assert_eq!(epoch_time(&epoch), Some(100.0));
        assert_eq!(epoch_time(&[]), None);
    }
}
