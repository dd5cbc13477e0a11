//! Estimator capability interface.
//!
//! The sliding-window estimator lives outside this workspace; the sync core
//! only sees this trait. Implementations carry their own interior
//! synchronization: ephemeris and iono inputs arrive straight from sensor
//! callbacks while the dispatcher is driving the processing methods.

use nalgebra::{UnitQuaternion, Vector3};

use crate::{Ephemeris, FeatureMap, GnssObs, Header};

/// Phase of the nonlinear solver
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolverFlag {
    /// Still collecting measurements / linear initialization
    Initial,
    /// Fully initialized, nonlinear optimization active
    NonLinear,
}

/// Tail state of the sliding window, used to reseed the IMU mechanizer
/// after every optimization.
#[derive(Debug, Clone, Copy)]
pub struct WindowState {
    /// Position (world frame, m)
    pub p: Vector3<f64>,

    /// Orientation (body to world)
    pub q: UnitQuaternion<f64>,

    /// Velocity (world frame, m/s)
    pub v: Vector3<f64>,

    /// Accelerometer bias (m/s²)
    pub ba: Vector3<f64>,

    /// Gyroscope bias (rad/s)
    pub bg: Vector3<f64>,

    /// Last integrated acceleration measurement
    pub acc: Vector3<f64>,

    /// Last integrated angular velocity measurement
    pub gyr: Vector3<f64>,
}

impl Default for WindowState {
    fn default() -> Self {
        Self {
            p: Vector3::zeros(),
            q: UnitQuaternion::identity(),
            v: Vector3::zeros(),
            ba: Vector3::zeros(),
            bg: Vector3::zeros(),
            acc: Vector3::zeros(),
            gyr: Vector3::zeros(),
        }
    }
}

/// Capabilities the sync core requires from the downstream estimator
pub trait Estimator: Send + Sync {
    /// Integrate one IMU measurement into the current pre-integration segment
    fn process_imu(&self, dt: f64, acc: Vector3<f64>, gyr: Vector3<f64>);

    /// Ingest one GNSS observation epoch
    fn process_gnss(&self, epoch: &[GnssObs]);

    /// Run one optimization round on a visual frame
    fn process_image(&self, image: FeatureMap, header: Header);

    /// Store a broadcast ephemeris record
    fn input_ephem(&self, ephem: Ephemeris);

    /// Store broadcast ionospheric parameters
    fn input_iono_params(&self, t: f64, params: [f64; 8]);

    /// Report the calibrated GNSS↔local clock offset
    fn input_gnss_time_diff(&self, offset: f64);

    /// Drop all state, returning to the uninitialized phase
    fn clear_state(&self);

    /// (Re)load extrinsics and noise parameters
    fn set_parameter(&self);

    /// Current solver phase
    fn solver_flag(&self) -> SolverFlag;

    /// Gravity vector in the world frame
    fn gravity(&self) -> Vector3<f64>;

    /// Latest sliding-window state (reseed source for the mechanizer)
    fn latest_window_state(&self) -> WindowState;

    /// Camera-IMU time offset (seconds)
    fn td(&self) -> f64;
}
