//! Node context: owned core state, sensor callbacks, worker lifecycle.
//!
//! All mutable state lives in one `SyncNode` value shared between the
//! transport callbacks and the dispatcher worker. Lock order is fixed:
//! buffer lock, then estimator lock, then mechanizer lock; the clock lock
//! is a leaf acquired only for short reads/writes.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::thread::JoinHandle;

use contracts::{
    CoreConfig, Ephemeris, Estimator, FeatureFrame, GnssObs, Header, ImuSample,
    MeasurementBundle, OdometryPublisher, SessionRecord, TimePulse,
};
use metrics::counter;
use tracing::{debug, info, warn};

use crate::buffers::IngestBuffers;
use crate::clock::ClockCalibrator;
use crate::decimator::FeatureDecimator;
use crate::mechanizer::ImuMechanizer;
use crate::time::pulse_to_gps_seconds;

/// Dispatcher time cursor, guarded by the estimator lock
#[derive(Debug, Default)]
pub(crate) struct ProcCursor {
    /// Where the estimator's IMU integration stopped; None before the
    /// first sample and after a restart
    pub current_time: Option<f64>,
}

/// The measurement-synchronization node
pub struct SyncNode {
    pub(crate) cfg: CoreConfig,
    pub(crate) estimator: Arc<dyn Estimator>,
    pub(crate) publisher: Arc<dyn OdometryPublisher>,

    pub(crate) buf: Mutex<IngestBuffers>,
    pub(crate) con: Condvar,
    pub(crate) clock: Mutex<ClockCalibrator>,
    pub(crate) proc: Mutex<ProcCursor>,
    pub(crate) mech: Mutex<ImuMechanizer>,

    /// Mirror of the estimator's nonlinear phase, read by the high-rate
    /// publisher without taking the estimator lock
    pub(crate) nonlinear: AtomicBool,

    running: AtomicBool,
}

impl SyncNode {
    /// Build a node around an estimator and a publication backend
    pub fn new(
        cfg: CoreConfig,
        estimator: Arc<dyn Estimator>,
        publisher: Arc<dyn OdometryPublisher>,
    ) -> Arc<Self> {
        let decimator = if cfg.gnss_enabled {
            FeatureDecimator::phase_locked()
        } else {
            FeatureDecimator::fixed_parity()
        };

        let clock = if cfg.gnss_enabled && !cfg.online_sync {
            info!(
                offset_s = cfg.local_time_diff,
                "using static gnss-local time offset"
            );
            estimator.input_gnss_time_diff(cfg.local_time_diff);
            ClockCalibrator::with_static_offset(cfg.local_time_diff)
        } else {
            ClockCalibrator::online()
        };

        Arc::new(Self {
            cfg,
            estimator,
            publisher,
            buf: Mutex::new(IngestBuffers::new(decimator)),
            con: Condvar::new(),
            clock: Mutex::new(clock),
            proc: Mutex::new(ProcCursor::default()),
            mech: Mutex::new(ImuMechanizer::new()),
            nonlinear: AtomicBool::new(false),
            running: AtomicBool::new(true),
        })
    }

    // ===== Sensor callbacks =====

    /// IMU stream (~200 Hz): buffer the sample, then mechanize and publish
    /// the high-rate pose inline
    pub fn on_imu(&self, sample: ImuSample) {
        {
            let mut buf = self.buf.lock().unwrap();
            if !buf.push_imu(sample) {
                return;
            }
        }
        self.con.notify_one();

        let mut mech = self.mech.lock().unwrap();
        mech.propagate(&sample, self.estimator.gravity());
        if self.nonlinear.load(Ordering::SeqCst) {
            let header = Header::world(sample.t);
            self.publisher.publish_latest_odometry(
                mech.position(),
                mech.orientation(),
                mech.velocity(),
                &header,
            );
            counter!("gvio_syncer_highrate_odometry_total").increment(1);
        }
    }

    /// Feature stream (~20 Hz), decimated to the GNSS cadence
    pub fn on_feature(&self, frame: FeatureFrame) {
        let admitted = {
            let mut buf = self.buf.lock().unwrap();
            let offset = self.clock.lock().unwrap().offset();
            buf.push_feature(frame, offset)
        };
        if admitted {
            self.con.notify_one();
        }
    }

    /// GNSS raw-measurement stream (~10 Hz)
    pub fn on_gnss_meas(&self, epoch: Vec<GnssObs>) {
        let buffered = {
            let mut buf = self.buf.lock().unwrap();
            let clock_valid = self.clock.lock().unwrap().is_valid();
            buf.push_gnss(epoch, clock_valid)
        };
        if buffered {
            self.con.notify_one();
        }
    }

    /// Broadcast ephemeris streams, forwarded without buffering
    pub fn on_ephem(&self, ephem: Ephemeris) {
        self.estimator.input_ephem(ephem);
    }

    /// Broadcast ionospheric parameters, forwarded without buffering
    pub fn on_iono_params(&self, t: f64, params: [f64; 8]) {
        self.estimator.input_iono_params(t, params);
    }

    /// Receiver time pulse (PPS)
    pub fn on_time_pulse(&self, pulse: TimePulse) {
        let Some(t_gnss) = pulse_to_gps_seconds(&pulse) else {
            warn!(system = ?pulse.time_sys, "unknown time system in time pulse");
            return;
        };
        self.clock.lock().unwrap().record_pulse(t_gnss);
    }

    /// Local exposure trigger paired with the last pulse
    pub fn on_local_trigger(&self, t_local: f64) {
        let mut clock = self.clock.lock().unwrap();
        if let Some((offset, first_fix)) = clock.apply_trigger(t_local) {
            self.estimator.input_gnss_time_diff(offset);
            if first_fix {
                info!(
                    offset_s = offset,
                    "time difference between gnss and local sensor calibrated"
                );
            }
        }
    }

    /// Restart stream: flush volatile state and re-initialize the estimator
    pub fn on_restart(&self, engage: bool) {
        if !engage {
            return;
        }
        warn!("restarting the estimator");
        counter!("gvio_syncer_restarts_total").increment(1);

        {
            let mut buf = self.buf.lock().unwrap();
            buf.flush_for_restart();
        }
        {
            let mut cursor = self.proc.lock().unwrap();
            self.estimator.clear_state();
            self.estimator.set_parameter();
            cursor.current_time = None;
        }
        {
            let mut mech = self.mech.lock().unwrap();
            mech.deinitialize();
        }
        self.nonlinear.store(false, Ordering::SeqCst);
    }

    /// Dispatch one recorded transport message to its callback
    pub fn apply(&self, record: SessionRecord) {
        match record {
            SessionRecord::Imu(sample) => self.on_imu(sample),
            SessionRecord::Feature(frame) => self.on_feature(frame),
            SessionRecord::GnssMeas(epoch) => self.on_gnss_meas(epoch),
            SessionRecord::Ephem(ephem) => self.on_ephem(Ephemeris::Broadcast(ephem)),
            SessionRecord::GloEphem(ephem) => self.on_ephem(Ephemeris::Glonass(ephem)),
            SessionRecord::IonoParams { t, params } => self.on_iono_params(t, params),
            SessionRecord::TimePulse(pulse) => self.on_time_pulse(pulse),
            SessionRecord::Trigger { t } => self.on_local_trigger(t),
            SessionRecord::Restart { engage } => self.on_restart(engage),
        }
    }

    // ===== Worker lifecycle =====

    /// Spawn the dispatcher worker thread
    pub fn spawn_worker(self: Arc<Self>) -> JoinHandle<()> {
        std::thread::Builder::new()
            .name("measurement-dispatch".to_string())
            .spawn(move || self.run_worker())
            .expect("failed to spawn dispatcher worker")
    }

    /// Stop the worker at its next wake-up
    pub fn shutdown(&self) {
        self.running.store(false, Ordering::SeqCst);
        self.con.notify_all();
    }

    fn run_worker(&self) {
        info!("measurement dispatcher started");
        while let Some(bundle) = self.next_bundle() {
            self.process_bundle(bundle);
        }
        info!("measurement dispatcher stopped");
    }

    /// Block on the condition variable until a bundle can be extracted or
    /// shutdown is requested
    fn next_bundle(&self) -> Option<MeasurementBundle> {
        let mut buf = self.buf.lock().unwrap();
        loop {
            if !self.running.load(Ordering::SeqCst) {
                return None;
            }
            let offset = self.clock.lock().unwrap().offset();
            if let Some(bundle) = buf.try_extract(
                self.cfg.gnss_enabled,
                self.cfg.max_gnss_camera_delay,
                offset,
                self.estimator.td(),
            ) {
                debug!(
                    stamp = bundle.frame.t,
                    imu = bundle.imu.len(),
                    gnss = bundle.gnss.is_some(),
                    "bundle extracted"
                );
                return Some(bundle);
            }
            buf = self.con.wait(buf).unwrap();
        }
    }

    /// Non-blocking variant of the worker step, for replay and tests
    pub fn try_process_one(&self) -> Option<contracts::BundleMeta> {
        let bundle = {
            let mut buf = self.buf.lock().unwrap();
            let offset = self.clock.lock().unwrap().offset();
            buf.try_extract(
                self.cfg.gnss_enabled,
                self.cfg.max_gnss_camera_delay,
                offset,
                self.estimator.td(),
            )?
        };
        Some(self.process_bundle(bundle))
    }

    /// Calibrated clock offset, if any
    pub fn time_offset(&self) -> Option<f64> {
        self.clock.lock().unwrap().offset()
    }
}
