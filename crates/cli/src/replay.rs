//! Session replay: read recorded records and feed them to the node.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use contracts::{ContractError, SessionRecord};
use sync_core::SyncNode;
use tracing::debug;

/// Per-stream record counts of a replay run
#[derive(Debug, Clone, Copy, Default)]
pub struct RecordCounts {
    pub imu: u64,
    pub feature: u64,
    pub gnss_meas: u64,
    pub ephem: u64,
    pub iono: u64,
    pub time_pulse: u64,
    pub trigger: u64,
    pub restart: u64,
}

impl RecordCounts {
    pub fn total(&self) -> u64 {
        self.imu
            + self.feature
            + self.gnss_meas
            + self.ephem
            + self.iono
            + self.time_pulse
            + self.trigger
            + self.restart
    }

    fn note(&mut self, record: &SessionRecord) {
        match record {
            SessionRecord::Imu(_) => self.imu += 1,
            SessionRecord::Feature(_) => self.feature += 1,
            SessionRecord::GnssMeas(_) => self.gnss_meas += 1,
            SessionRecord::Ephem(_) | SessionRecord::GloEphem(_) => self.ephem += 1,
            SessionRecord::IonoParams { .. } => self.iono += 1,
            SessionRecord::TimePulse(_) => self.time_pulse += 1,
            SessionRecord::Trigger { .. } => self.trigger += 1,
            SessionRecord::Restart { .. } => self.restart += 1,
        }
    }
}

/// Read a JSON-lines session file.
///
/// Blank lines and `#` comment lines are skipped; any other malformed line
/// aborts with its line number.
pub fn read_session(path: &Path) -> Result<Vec<SessionRecord>, ContractError> {
    let file = File::open(path)?;
    let reader = BufReader::new(file);

    let mut records = Vec::new();
    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let record: SessionRecord = serde_json::from_str(trimmed)
            .map_err(|e| ContractError::session_parse(idx + 1, e.to_string()))?;
        records.push(record);
    }
    debug!(records = records.len(), "session loaded");
    Ok(records)
}

/// Feed records to the node in arrival order, draining bundles after each.
///
/// `on_bundle` receives every extracted bundle's metadata; returning false
/// stops the replay early (bundle budget reached).
pub fn feed<F>(node: &SyncNode, records: Vec<SessionRecord>, mut on_bundle: F) -> RecordCounts
where
    F: FnMut(contracts::BundleMeta) -> bool,
{
    let mut counts = RecordCounts::default();
    'replay: for record in records {
        counts.note(&record);
        node.apply(record);
        while let Some(meta) = node.try_process_one() {
            if !on_bundle(meta) {
                break 'replay;
            }
        }
    }
    counts
}
