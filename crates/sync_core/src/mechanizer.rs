//! High-rate IMU mechanization.
//!
//! Mid-point integration of orientation, velocity and position between
//! estimator updates. The state is reseeded from the sliding-window tail
//! after every optimization and the still-buffered IMU samples are replayed
//! on top, so the high-rate pose stays consistent with the optimized one.

use contracts::{ImuSample, WindowState};
use nalgebra::{UnitQuaternion, Vector3};

/// Dead-reckoning state driven by the IMU callback
#[derive(Debug, Clone, Copy)]
pub struct ImuMechanizer {
    /// Timestamp of the most recently integrated sample
    latest_time: f64,

    /// Position (world frame)
    p: Vector3<f64>,

    /// Orientation (body to world)
    q: UnitQuaternion<f64>,

    /// Velocity (world frame)
    v: Vector3<f64>,

    /// Accelerometer bias
    ba: Vector3<f64>,

    /// Gyroscope bias
    bg: Vector3<f64>,

    /// Previous acceleration measurement
    acc_0: Vector3<f64>,

    /// Previous angular-velocity measurement
    gyr_0: Vector3<f64>,

    /// Whether the first sample has latched `latest_time`
    initialized: bool,
}

impl ImuMechanizer {
    pub fn new() -> Self {
        Self {
            latest_time: 0.0,
            p: Vector3::zeros(),
            q: UnitQuaternion::identity(),
            v: Vector3::zeros(),
            ba: Vector3::zeros(),
            bg: Vector3::zeros(),
            acc_0: Vector3::zeros(),
            gyr_0: Vector3::zeros(),
            initialized: false,
        }
    }

    /// Mid-point integrate one IMU sample.
    ///
    /// The first sample after (re)initialization only latches the clock.
    pub fn propagate(&mut self, sample: &ImuSample, gravity: Vector3<f64>) {
        if !self.initialized {
            self.latest_time = sample.t;
            self.acc_0 = sample.acc;
            self.gyr_0 = sample.gyr;
            self.initialized = true;
            return;
        }

        let dt = sample.t - self.latest_time;
        self.latest_time = sample.t;

        let un_acc_0 = self.q * (self.acc_0 - self.ba) - gravity;
        let un_gyr = 0.5 * (self.gyr_0 + sample.gyr) - self.bg;

        self.q *= UnitQuaternion::from_scaled_axis(un_gyr * dt);

        let un_acc_1 = self.q * (sample.acc - self.ba) - gravity;
        let un_acc = 0.5 * (un_acc_0 + un_acc_1);

        self.p += self.v * dt + un_acc * (0.5 * dt * dt);
        self.v += un_acc * dt;

        self.acc_0 = sample.acc;
        self.gyr_0 = sample.gyr;
    }

    /// Adopt the sliding-window tail state after an optimization.
    ///
    /// `t_window_end` is the dispatcher's time cursor, i.e. where the
    /// estimator's integration stopped.
    pub fn reseed(&mut self, state: &WindowState, t_window_end: f64) {
        self.latest_time = t_window_end;
        self.p = state.p;
        self.q = state.q;
        self.v = state.v;
        self.ba = state.ba;
        self.bg = state.bg;
        self.acc_0 = state.acc;
        self.gyr_0 = state.gyr;
        self.initialized = true;
    }

    /// Replay buffered samples on top of a freshly reseeded state
    pub fn replay<'a>(
        &mut self,
        samples: impl Iterator<Item = &'a ImuSample>,
        gravity: Vector3<f64>,
    ) {
        for sample in samples {
            self.propagate(sample, gravity);
        }
    }

    /// Forget the integration state (restart path)
    pub fn deinitialize(&mut self) {
        self.initialized = false;
    }

    pub fn position(&self) -> Vector3<f64> {
        self.p
    }

    pub fn orientation(&self) -> UnitQuaternion<f64> {
        self.q
    }

    pub fn velocity(&self) -> Vector3<f64> {
        self.v
    }

    pub fn latest_time(&self) -> f64 {
        self.latest_time
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }
}

impl Default for ImuMechanizer {
    fn default() -> Self {
        Self::new()
    }
}
