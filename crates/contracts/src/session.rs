//! Recorded session stream format.
//!
//! A session is a JSON-lines file of tagged records, one per received
//! message, in arrival order. It stands in for the live transport layer
//! during replay runs and integration tests.

use serde::{Deserialize, Serialize};

use crate::{BroadcastEphem, FeatureFrame, GloEphem, GnssObs, ImuSample, TimePulse};

/// One recorded transport message
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum SessionRecord {
    /// Inertial sample
    Imu(ImuSample),

    /// Visual feature frame
    Feature(FeatureFrame),

    /// Raw observation epoch
    GnssMeas(Vec<GnssObs>),

    /// GPS/Galileo/BeiDou broadcast ephemeris
    Ephem(BroadcastEphem),

    /// GLONASS broadcast ephemeris
    GloEphem(GloEphem),

    /// Broadcast ionospheric parameters
    IonoParams { t: f64, params: [f64; 8] },

    /// Receiver time pulse (PPS)
    TimePulse(TimePulse),

    /// Local exposure trigger
    Trigger { t: f64 },

    /// Restart signal
    Restart { engage: bool },
}
