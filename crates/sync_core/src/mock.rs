//! Recording doubles for the estimator and publisher interfaces.
//!
//! Used by the replay runner and the test suites; no optimization happens
//! here, every call is just recorded so the dispatch behavior can be
//! asserted from outside.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use contracts::{
    Ephemeris, Estimator, FeatureMap, GnssObs, Header, OdometryPublisher, SolverFlag, WindowState,
};
use nalgebra::{UnitQuaternion, Vector3};

/// One recorded `process_imu` call
#[derive(Debug, Clone, Copy)]
pub struct ImuCall {
    pub dt: f64,
    pub acc: Vector3<f64>,
    pub gyr: Vector3<f64>,
}

#[derive(Debug, Default)]
struct Recorded {
    imu_calls: Vec<ImuCall>,
    gnss_epochs: Vec<Vec<GnssObs>>,
    images: Vec<(FeatureMap, Header)>,
    ephem_count: usize,
    iono_params: Vec<(f64, [f64; 8])>,
    time_diffs: Vec<f64>,
    clear_count: usize,
    set_parameter_count: usize,
}

/// Estimator double that records every call
pub struct RecordingEstimator {
    recorded: Mutex<Recorded>,
    solver_flag: Mutex<SolverFlag>,
    window_state: Mutex<WindowState>,
    gravity: Mutex<Vector3<f64>>,
    td: f64,
}

impl RecordingEstimator {
    pub fn new() -> Self {
        Self::with_td(0.0)
    }

    pub fn with_td(td: f64) -> Self {
        Self {
            recorded: Mutex::new(Recorded::default()),
            solver_flag: Mutex::new(SolverFlag::Initial),
            window_state: Mutex::new(WindowState::default()),
            gravity: Mutex::new(Vector3::zeros()),
            td,
        }
    }

    /// Flip the solver phase (a real estimator does this after
    /// initialization converges)
    pub fn set_solver_flag(&self, flag: SolverFlag) {
        *self.solver_flag.lock().unwrap() = flag;
    }

    pub fn set_window_state(&self, state: WindowState) {
        *self.window_state.lock().unwrap() = state;
    }

    pub fn set_gravity(&self, g: Vector3<f64>) {
        *self.gravity.lock().unwrap() = g;
    }

    pub fn imu_calls(&self) -> Vec<ImuCall> {
        self.recorded.lock().unwrap().imu_calls.clone()
    }

    pub fn gnss_epochs(&self) -> Vec<Vec<GnssObs>> {
        self.recorded.lock().unwrap().gnss_epochs.clone()
    }

    pub fn image_stamps(&self) -> Vec<f64> {
        self.recorded
            .lock()
            .unwrap()
            .images
            .iter()
            .map(|(_, header)| header.stamp)
            .collect()
    }

    pub fn image_count(&self) -> usize {
        self.recorded.lock().unwrap().images.len()
    }

    pub fn last_image(&self) -> Option<(FeatureMap, Header)> {
        self.recorded.lock().unwrap().images.last().cloned()
    }

    pub fn ephem_count(&self) -> usize {
        self.recorded.lock().unwrap().ephem_count
    }

    pub fn iono_params(&self) -> Vec<(f64, [f64; 8])> {
        self.recorded.lock().unwrap().iono_params.clone()
    }

    pub fn time_diffs(&self) -> Vec<f64> {
        self.recorded.lock().unwrap().time_diffs.clone()
    }

    pub fn clear_count(&self) -> usize {
        self.recorded.lock().unwrap().clear_count
    }

    pub fn set_parameter_count(&self) -> usize {
        self.recorded.lock().unwrap().set_parameter_count
    }
}

impl Default for RecordingEstimator {
    fn default() -> Self {
        Self::new()
    }
}

impl Estimator for RecordingEstimator {
    fn process_imu(&self, dt: f64, acc: Vector3<f64>, gyr: Vector3<f64>) {
        self.recorded
            .lock()
            .unwrap()
            .imu_calls
            .push(ImuCall { dt, acc, gyr });
    }

    fn process_gnss(&self, epoch: &[GnssObs]) {
        self.recorded
            .lock()
            .unwrap()
            .gnss_epochs
            .push(epoch.to_vec());
    }

    fn process_image(&self, image: FeatureMap, header: Header) {
        self.recorded.lock().unwrap().images.push((image, header));
    }

    fn input_ephem(&self, _ephem: Ephemeris) {
        self.recorded.lock().unwrap().ephem_count += 1;
    }

    fn input_iono_params(&self, t: f64, params: [f64; 8]) {
        self.recorded.lock().unwrap().iono_params.push((t, params));
    }

    fn input_gnss_time_diff(&self, offset: f64) {
        self.recorded.lock().unwrap().time_diffs.push(offset);
    }

    fn clear_state(&self) {
        let mut recorded = self.recorded.lock().unwrap();
        recorded.clear_count += 1;
        *self.solver_flag.lock().unwrap() = SolverFlag::Initial;
    }

    fn set_parameter(&self) {
        self.recorded.lock().unwrap().set_parameter_count += 1;
    }

    fn solver_flag(&self) -> SolverFlag {
        *self.solver_flag.lock().unwrap()
    }

    fn gravity(&self) -> Vector3<f64> {
        *self.gravity.lock().unwrap()
    }

    fn latest_window_state(&self) -> WindowState {
        *self.window_state.lock().unwrap()
    }

    fn td(&self) -> f64 {
        self.td
    }
}

/// High-rate pose snapshot captured by the recording publisher
#[derive(Debug, Clone, Copy)]
pub struct PoseSnapshot {
    pub stamp: f64,
    pub p: Vector3<f64>,
    pub q: UnitQuaternion<f64>,
    pub v: Vector3<f64>,
}

/// Publisher double that counts every channel
#[derive(Debug, Default)]
pub struct RecordingPublisher {
    latest_odometry: Mutex<Vec<PoseSnapshot>>,
    odometry_count: AtomicUsize,
    key_poses_count: AtomicUsize,
    camera_pose_count: AtomicUsize,
    point_cloud_count: AtomicUsize,
    tf_count: AtomicUsize,
    keyframe_count: AtomicUsize,
}

impl RecordingPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn latest_odometry(&self) -> Vec<PoseSnapshot> {
        self.latest_odometry.lock().unwrap().clone()
    }

    pub fn latest_odometry_count(&self) -> usize {
        self.latest_odometry.lock().unwrap().len()
    }

    pub fn odometry_count(&self) -> usize {
        self.odometry_count.load(Ordering::SeqCst)
    }

    pub fn keyframe_count(&self) -> usize {
        self.keyframe_count.load(Ordering::SeqCst)
    }
}

impl OdometryPublisher for RecordingPublisher {
    fn publish_latest_odometry(
        &self,
        p: Vector3<f64>,
        q: UnitQuaternion<f64>,
        v: Vector3<f64>,
        header: &Header,
    ) {
        self.latest_odometry.lock().unwrap().push(PoseSnapshot {
            stamp: header.stamp,
            p,
            q,
            v,
        });
    }

    fn publish_odometry(&self, _estimator: &dyn Estimator, _header: &Header) {
        self.odometry_count.fetch_add(1, Ordering::SeqCst);
    }

    fn publish_key_poses(&self, _estimator: &dyn Estimator, _header: &Header) {
        self.key_poses_count.fetch_add(1, Ordering::SeqCst);
    }

    fn publish_camera_pose(&self, _estimator: &dyn Estimator, _header: &Header) {
        self.camera_pose_count.fetch_add(1, Ordering::SeqCst);
    }

    fn publish_point_cloud(&self, _estimator: &dyn Estimator, _header: &Header) {
        self.point_cloud_count.fetch_add(1, Ordering::SeqCst);
    }

    fn publish_tf(&self, _estimator: &dyn Estimator, _header: &Header) {
        self.tf_count.fetch_add(1, Ordering::SeqCst);
    }

    fn publish_keyframe(&self, _estimator: &dyn Estimator) {
        self.keyframe_count.fetch_add(1, Ordering::SeqCst);
    }
}
