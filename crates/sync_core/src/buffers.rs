//! Ingest buffers and measurement-bundle extraction.
//!
//! Three FIFO queues (IMU, feature frames, GNSS epochs) behind one mutex
//! and one condition variable. Sensor callbacks push and notify; the
//! dispatcher's worker re-evaluates `try_extract` on every wake-up.
//!
//! Ephemeris and iono records are not buffered here; callbacks forward
//! them straight to the estimator.

use std::collections::VecDeque;

use contracts::{
    epoch_time, BundleMeta, FeatureFrame, GnssObs, ImuSample, MeasurementBundle,
};
use metrics::{counter, histogram};
use tracing::warn;

use crate::decimator::FeatureDecimator;

/// Buffered ingest state, guarded by the node's buffer mutex
#[derive(Debug)]
pub struct IngestBuffers {
    imu: VecDeque<ImuSample>,
    feature: VecDeque<FeatureFrame>,
    gnss: VecDeque<Vec<GnssObs>>,

    /// Feature-rate gate (fed by both the feature and GNSS callbacks)
    decimator: FeatureDecimator,

    /// Timestamp fence for out-of-order IMU rejection
    last_imu_t: f64,

    /// Wake-ups that found the IMU stream lagging the next frame
    wait_count: u64,
}

impl IngestBuffers {
    pub fn new(decimator: FeatureDecimator) -> Self {
        Self {
            imu: VecDeque::new(),
            feature: VecDeque::new(),
            gnss: VecDeque::new(),
            decimator,
            last_imu_t: -1.0,
            wait_count: 0,
        }
    }

    /// Push an IMU sample. Out-of-order samples are dropped (warned once
    /// per occurrence) and leave the fence untouched.
    pub fn push_imu(&mut self, sample: ImuSample) -> bool {
        if sample.t <= self.last_imu_t {
            warn!(t = sample.t, fence = self.last_imu_t, "imu message in disorder");
            counter!("gvio_syncer_imu_out_of_order_total").increment(1);
            return false;
        }
        self.last_imu_t = sample.t;
        self.imu.push_back(sample);
        true
    }

    /// Push a feature frame through the decimation gate
    pub fn push_feature(&mut self, frame: FeatureFrame, time_offset: Option<f64>) -> bool {
        if !self.decimator.admit(frame.t, time_offset) {
            return false;
        }
        self.feature.push_back(frame);
        true
    }

    /// Push a GNSS observation epoch.
    ///
    /// The epoch time always feeds the decimator; the epoch itself is only
    /// buffered once the clock offset is valid (it cannot be aligned
    /// otherwise) and is dropped when empty.
    pub fn push_gnss(&mut self, epoch: Vec<GnssObs>, clock_valid: bool) -> bool {
        let Some(t) = epoch_time(&epoch) else {
            warn!("empty gnss observation epoch");
            return false;
        };
        self.decimator.note_gnss(t);

        if !clock_valid {
            counter!("gvio_syncer_gnss_dropped_unsynced_total").increment(1);
            return false;
        }
        self.gnss.push_back(epoch);
        true
    }

    /// Try to extract one measurement bundle.
    ///
    /// Returns None while the wake-up predicate does not hold: some queue
    /// empty, the IMU stream not yet past the next frame, or (GNSS enabled)
    /// no epoch in the pairing window and none newer.
    pub fn try_extract(
        &mut self,
        gnss_enabled: bool,
        max_delay: f64,
        time_offset: Option<f64>,
        td: f64,
    ) -> Option<MeasurementBundle> {
        if self.imu.is_empty() || self.feature.is_empty() || (gnss_enabled && self.gnss.is_empty())
        {
            return None;
        }

        // The newest IMU sample must be past the next frame, otherwise the
        // frame is not yet fully spanned
        if self.imu.back()?.t <= self.feature.front()?.t {
            self.wait_count += 1;
            return None;
        }

        let mut meta = BundleMeta::default();

        // Frames whose start the IMU stream missed can never be integrated
        let front_imu_t = self.imu.front()?.t;
        while self.feature.front().is_some_and(|f| f.t < front_imu_t) {
            warn!("throwing feature frame, should only happen at startup");
            counter!("gvio_syncer_stale_features_total").increment(1);
            meta.stale_features_dropped += 1;
            self.feature.pop_front();
        }
        let frame_t = self.feature.front()?.t;

        // Align the nearest GNSS epoch, discarding irrecoverably old ones
        let mut gnss_epoch = None;
        if gnss_enabled {
            let t_feat_gnss = frame_t + time_offset.unwrap_or(0.0);
            loop {
                let Some(front_t) = self.gnss.front().and_then(|e| epoch_time(e)) else {
                    warn!("waiting for gnss");
                    return None;
                };
                if front_t < t_feat_gnss - max_delay {
                    warn!(
                        gnss_t = front_t,
                        frame_t = t_feat_gnss,
                        "throwing gnss epoch, should only happen at startup"
                    );
                    counter!("gvio_syncer_stale_gnss_total").increment(1);
                    meta.stale_gnss_dropped += 1;
                    self.gnss.pop_front();
                    continue;
                }
                if (front_t - t_feat_gnss).abs() < max_delay {
                    let err = (front_t - t_feat_gnss).abs();
                    histogram!("gvio_syncer_gnss_alignment_error_ms").record(err * 1000.0);
                    meta.gnss_alignment_error = Some(err);
                    gnss_epoch = self.gnss.pop_front();
                }
                // An epoch beyond the window stays buffered; the frame goes
                // out GNSS-less
                break;
            }
        }

        let frame = self.feature.pop_front()?;
        let img_t = frame.t + td;

        // The spanning IMU slice, plus a copy of the straddling sample; the
        // original stays in the queue for the next bundle
        let mut imu = Vec::new();
        while self.imu.front().is_some_and(|s| s.t < img_t) {
            // unwrap is fine, the loop condition just saw the element
            imu.push(self.imu.pop_front().unwrap());
        }
        if let Some(straddle) = self.imu.front() {
            imu.push(*straddle);
        }
        if imu.is_empty() {
            warn!(frame_t, "no imu between two frames");
        }

        meta.stamp = frame.t;
        meta.imu_samples = imu.len();
        meta.has_gnss = gnss_epoch.is_some();

        Some(MeasurementBundle {
            imu,
            frame,
            gnss: gnss_epoch,
            meta,
        })
    }

    /// Restart: flush IMU and feature queues, reset the IMU fence.
    ///
    /// GNSS epochs and the decimator survive; both remain valid across an
    /// estimator reset.
    pub fn flush_for_restart(&mut self) {
        self.imu.clear();
        self.feature.clear();
        self.last_imu_t = 0.0;
    }

    /// Iterate buffered IMU samples (mechanizer replay)
    pub fn imu_samples(&self) -> impl Iterator<Item = &ImuSample> {
        self.imu.iter()
    }

    pub fn imu_len(&self) -> usize {
        self.imu.len()
    }

    pub fn feature_len(&self) -> usize {
        self.feature.len()
    }

    pub fn gnss_len(&self) -> usize {
        self.gnss.len()
    }

    pub fn wait_count(&self) -> u64 {
        self.wait_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Vector3;

    fn imu(t: f64) -> ImuSample {
        ImuSample::new(t, Vector3::new(0.0, 0.0, 9.81), Vector3::zeros())
    }

    fn frame(t: f64) -> FeatureFrame {
        FeatureFrame { t, points: vec![] }
    }

    fn epoch(t: f64) -> Vec<GnssObs> {
        vec![GnssObs {
            time: t,
            sat: 5,
            psr: 2.2e7,
            dopp: 0.0,
            cn0: 44.0,
        }]
    }

    fn vio_buffers() -> IngestBuffers {
        IngestBuffers::new(FeatureDecimator::fixed_parity())
    }

    #[test]
    fn out_of_order_imu_is_dropped() {
        let mut buf = vio_buffers();
        assert!(buf.push_imu(imu(1.00)));
        assert!(!buf.push_imu(imu(0.99)));
        assert!(!buf.push_imu(imu(1.00)));
        assert_eq!(buf.imu_len(), 1);
        // fence unchanged by the rejects
        assert!(buf.push_imu(imu(1.01)));
    }

    #[test]
    fn empty_increment_does_not_mutate_queues() {
        let mut buf = vio_buffers();
        buf.push_imu(imu(0.00));
        buf.push_imu(imu(0.01));
        // no feature yet: predicate fails, nothing consumed
        assert!(buf.try_extract(false, 0.05, None, 0.0).is_none());
        assert_eq!(buf.imu_len(), 2);
        assert_eq!(buf.feature_len(), 0);
        assert_eq!(buf.gnss_len(), 0);
    }

    #[test]
    fn waits_until_imu_passes_the_frame() {
        let mut buf = vio_buffers();
        buf.push_feature(frame(0.015), None);
        buf.push_imu(imu(0.00));
        buf.push_imu(imu(0.01));
        // newest imu (0.01) <= frame (0.015): keep waiting
        assert!(buf.try_extract(false, 0.05, None, 0.0).is_none());
        assert_eq!(buf.wait_count(), 1);
        assert_eq!(buf.feature_len(), 1);

        buf.push_imu(imu(0.02));
        let bundle = buf.try_extract(false, 0.05, None, 0.0).unwrap();
        assert_eq!(bundle.frame.t, 0.015);
    }

    #[test]
    fn slice_brackets_the_frame_and_keeps_the_straddler() {
        let mut buf = vio_buffers();
        for k in 0..4 {
            buf.push_imu(imu(k as f64 * 0.01));
        }
        buf.push_feature(frame(0.015), None);

        let bundle = buf.try_extract(false, 0.05, None, 0.0).unwrap();
        let ts: Vec<f64> = bundle.imu.iter().map(|s| s.t).collect();
        assert_eq!(ts, vec![0.00, 0.01, 0.02]);
        // straddling sample (0.02) still queued for the next bundle
        assert_eq!(buf.imu_len(), 2);
        assert_eq!(buf.imu_samples().next().unwrap().t, 0.02);
        assert_eq!(bundle.meta.imu_samples, 3);
    }

    #[test]
    fn stale_features_are_discarded() {
        let mut buf = vio_buffers();
        buf.push_feature(frame(0.005), None);
        // counter parity drops every other frame; feed a filler
        assert!(!buf.push_feature(frame(0.006), None));
        buf.push_feature(frame(0.030), None);
        buf.push_imu(imu(0.02));
        buf.push_imu(imu(0.04));

        let bundle = buf.try_extract(false, 0.05, None, 0.0).unwrap();
        assert_eq!(bundle.frame.t, 0.030);
        assert_eq!(bundle.meta.stale_features_dropped, 1);
    }

    #[test]
    fn stale_gnss_epochs_are_skipped_and_nearest_paired() {
        let mut buf = IngestBuffers::new(FeatureDecimator::fixed_parity());
        for e in [epoch(9.80), epoch(9.94), epoch(10.02)] {
            assert!(buf.push_gnss(e, true));
        }
        buf.push_feature(frame(10.00), Some(0.0));
        buf.push_imu(imu(9.99));
        buf.push_imu(imu(10.01));

        let bundle = buf.try_extract(true, 0.05, Some(0.0), 0.0).unwrap();
        let paired = bundle.gnss.expect("epoch within the window");
        assert_eq!(paired[0].time, 10.02);
        assert_eq!(bundle.meta.stale_gnss_dropped, 2);
        assert!(bundle.meta.gnss_alignment_error.unwrap() < 0.05);
        assert_eq!(buf.gnss_len(), 0);
    }

    #[test]
    fn future_epoch_stays_buffered_and_frame_goes_out_alone() {
        let mut buf = IngestBuffers::new(FeatureDecimator::fixed_parity());
        buf.push_gnss(epoch(10.20), true);
        buf.push_feature(frame(10.00), Some(0.0));
        buf.push_imu(imu(9.99));
        buf.push_imu(imu(10.01));

        let bundle = buf.try_extract(true, 0.05, Some(0.0), 0.0).unwrap();
        assert!(bundle.gnss.is_none());
        assert_eq!(buf.gnss_len(), 1);
    }

    #[test]
    fn gnss_outage_blocks_extraction() {
        let mut buf = IngestBuffers::new(FeatureDecimator::fixed_parity());
        buf.push_feature(frame(10.00), Some(0.0));
        buf.push_imu(imu(9.99));
        buf.push_imu(imu(10.01));

        // gnss enabled, empty buffer: dispatcher keeps waiting
        assert!(buf.try_extract(true, 0.05, Some(0.0), 0.0).is_none());
        assert_eq!(buf.feature_len(), 1);
    }

    #[test]
    fn unsynced_gnss_is_dropped_but_feeds_the_decimator() {
        let mut buf = IngestBuffers::new(FeatureDecimator::phase_locked());
        assert!(!buf.push_gnss(epoch(100.0), false));
        assert_eq!(buf.gnss_len(), 0);
        // the epoch time reached the decimator regardless
        assert!(!buf.push_feature(frame(99.98), Some(0.0)));
        // second frame: parity can now lock against the recorded epoch
        buf.push_feature(frame(100.03), Some(0.0));
    }

    #[test]
    fn empty_epoch_is_rejected() {
        let mut buf = vio_buffers();
        assert!(!buf.push_gnss(vec![], true));
    }

    #[test]
    fn restart_flushes_imu_and_features_only() {
        let mut buf = IngestBuffers::new(FeatureDecimator::fixed_parity());
        for k in 0..5 {
            buf.push_imu(imu(k as f64 * 0.01));
        }
        buf.push_feature(frame(0.015), None);
        buf.push_gnss(epoch(0.02), true);

        buf.flush_for_restart();
        assert_eq!(buf.imu_len(), 0);
        assert_eq!(buf.feature_len(), 0);
        assert_eq!(buf.gnss_len(), 1);

        // fence reset: pre-restart timestamps are accepted again
        assert!(buf.push_imu(imu(0.01)));
    }

    #[test]
    fn td_shifts_the_slice_boundary() {
        let mut buf = vio_buffers();
        for k in 0..5 {
            buf.push_imu(imu(k as f64 * 0.01));
        }
        buf.push_feature(frame(0.015), None);

        let bundle = buf.try_extract(false, 0.05, None, 0.01).unwrap();
        // boundary at 0.025: samples below move, 0.03 straddles
        let ts: Vec<f64> = bundle.imu.iter().map(|s| s.t).collect();
        assert_eq!(ts, vec![0.00, 0.01, 0.02, 0.03]);
        assert_eq!(buf.imu_len(), 2);
    }
}
