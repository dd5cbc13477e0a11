//! GNSS time-scale conversions.
//!
//! Every receiver time pulse is reduced to one scalar: continuous GPS
//! seconds since the GPS epoch (1980-01-06 00:00:00). Week/tow pairs in
//! other system time scales are mapped through their fixed offsets to the
//! GPS week numbering; UTC-based pulses additionally get the leap-second
//! correction.

use contracts::{TimePulse, TimeSystem};

/// Seconds in one GNSS week
pub const SECONDS_PER_WEEK: f64 = 604800.0;

/// GST week 0 coincides with GPS week 1024 (1999-08-22)
const GAL_WEEK_OFFSET: u32 = 1024;

/// BDT week 0 coincides with GPS week 1356 (2006-01-01)
const BDS_WEEK_OFFSET: u32 = 1356;

/// BDT runs 14 s behind GPS time
const BDS_GPS_OFFSET: f64 = 14.0;

/// UTC leap-second table: (introduction date, cumulative GPS−UTC seconds),
/// newest first
const LEAP_SECONDS: &[((i32, u32, u32), f64)] = &[
    ((2017, 1, 1), 18.0),
    ((2015, 7, 1), 17.0),
    ((2012, 7, 1), 16.0),
    ((2009, 1, 1), 15.0),
    ((2006, 1, 1), 14.0),
    ((1999, 1, 1), 13.0),
    ((1997, 7, 1), 12.0),
    ((1996, 1, 1), 11.0),
    ((1994, 7, 1), 10.0),
    ((1993, 7, 1), 9.0),
    ((1992, 7, 1), 8.0),
    ((1991, 1, 1), 7.0),
    ((1990, 1, 1), 6.0),
    ((1988, 1, 1), 5.0),
    ((1985, 7, 1), 4.0),
    ((1983, 7, 1), 3.0),
    ((1982, 7, 1), 2.0),
    ((1981, 7, 1), 1.0),
];

/// GPS week/tow to continuous GPS seconds
pub fn gpst2sec(week: u32, tow: f64) -> f64 {
    week as f64 * SECONDS_PER_WEEK + tow
}

/// Galileo system time week/tow to continuous GPS seconds
pub fn gst2sec(week: u32, tow: f64) -> f64 {
    gpst2sec(week + GAL_WEEK_OFFSET, tow)
}

/// BeiDou time week/tow to continuous GPS seconds
pub fn bdt2sec(week: u32, tow: f64) -> f64 {
    gpst2sec(week + BDS_WEEK_OFFSET, tow) + BDS_GPS_OFFSET
}

/// UTC instant (expressed as seconds since the GPS epoch) to GPS time
pub fn utc2gpst(t_utc: f64) -> f64 {
    for &((y, m, d), leap) in LEAP_SECONDS {
        if t_utc >= civil_to_gps_seconds(y, m, d) {
            return t_utc + leap;
        }
    }
    t_utc
}

/// Reduce a receiver time pulse to continuous GPS seconds.
///
/// Returns None for an unidentified time system.
pub fn pulse_to_gps_seconds(pulse: &TimePulse) -> Option<f64> {
    let t = match pulse.time_sys {
        TimeSystem::None => return None,
        TimeSystem::Gal if !pulse.utc_based => gst2sec(pulse.week, pulse.tow),
        TimeSystem::Bds if !pulse.utc_based => bdt2sec(pulse.week, pulse.tow),
        _ => gpst2sec(pulse.week, pulse.tow),
    };

    if pulse.utc_based || pulse.time_sys == TimeSystem::Glo {
        Some(utc2gpst(t))
    } else {
        Some(t)
    }
}

/// Calendar date to seconds since the GPS epoch
fn civil_to_gps_seconds(year: i32, month: u32, day: u32) -> f64 {
    const GPS_EPOCH_DAYS: i64 = 3657; // days_from_civil(1980, 1, 6)
    ((days_from_civil(year, month, day) - GPS_EPOCH_DAYS) * 86400) as f64
}

/// Days since 1970-01-01 for a proleptic Gregorian date
fn days_from_civil(year: i32, month: u32, day: u32) -> i64 {
    let y = i64::from(year) - i64::from(month <= 2);
    let era = if y >= 0 { y } else { y - 399 } / 400;
    let yoe = y - era * 400;
    let mp = i64::from((month + 9) % 12);
    let doy = (153 * mp + 2) / 5 + i64::from(day) - 1;
    let doe = yoe * 365 + yoe / 4 - yoe / 100 + doy;
    era * 146097 + doe - 719468
}
