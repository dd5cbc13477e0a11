//! Output publication interface.
//!
//! Mirrors the publication set of the odometry node: one high-rate channel
//! fed from the IMU callback and six per-optimization channels fed from the
//! dispatcher. Rendering/transport backends implement this trait.

use nalgebra::{UnitQuaternion, Vector3};

use crate::{Estimator, Header};

/// Publication surface of the odometry node
pub trait OdometryPublisher: Send + Sync {
    /// High-rate dead-reckoned pose, published per IMU sample once the
    /// estimator is in the nonlinear phase
    fn publish_latest_odometry(
        &self,
        p: Vector3<f64>,
        q: UnitQuaternion<f64>,
        v: Vector3<f64>,
        header: &Header,
    );

    /// Optimized odometry after each round
    fn publish_odometry(&self, estimator: &dyn Estimator, header: &Header);

    /// Poses of the sliding-window keyframes
    fn publish_key_poses(&self, estimator: &dyn Estimator, header: &Header);

    /// Latest camera pose
    fn publish_camera_pose(&self, estimator: &dyn Estimator, header: &Header);

    /// Triangulated landmark cloud
    fn publish_point_cloud(&self, estimator: &dyn Estimator, header: &Header);

    /// Transform frames (world → body, body → camera)
    fn publish_tf(&self, estimator: &dyn Estimator, header: &Header);

    /// Keyframe marker for downstream consumers
    fn publish_keyframe(&self, estimator: &dyn Estimator);
}
