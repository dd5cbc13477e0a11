//! LogPublisher - publishes via tracing.
//!
//! Default backend when no transport is attached (replay runs, smoke
//! tests): every channel becomes a structured log line.

use contracts::{Estimator, Header, OdometryPublisher, SolverFlag};
use nalgebra::{UnitQuaternion, Vector3};
use tracing::{debug, info, trace};

/// Publisher that logs summaries instead of sending messages
pub struct LogPublisher;

impl LogPublisher {
    pub fn new() -> Self {
        Self
    }
}

impl Default for LogPublisher {
    fn default() -> Self {
        Self::new()
    }
}

impl OdometryPublisher for LogPublisher {
    fn publish_latest_odometry(
        &self,
        p: Vector3<f64>,
        q: UnitQuaternion<f64>,
        v: Vector3<f64>,
        header: &Header,
    ) {
        trace!(
            stamp = header.stamp,
            px = p.x,
            py = p.y,
            pz = p.z,
            qw = q.w,
            speed = v.norm(),
            "high-rate odometry"
        );
    }

    fn publish_odometry(&self, estimator: &dyn Estimator, header: &Header) {
        let state = estimator.latest_window_state();
        info!(
            stamp = header.stamp,
            px = state.p.x,
            py = state.p.y,
            pz = state.p.z,
            speed = state.v.norm(),
            nonlinear = estimator.solver_flag() == SolverFlag::NonLinear,
            "odometry"
        );
    }

    fn publish_key_poses(&self, _estimator: &dyn Estimator, header: &Header) {
        debug!(stamp = header.stamp, "key poses");
    }

    fn publish_camera_pose(&self, _estimator: &dyn Estimator, header: &Header) {
        debug!(stamp = header.stamp, "camera pose");
    }

    fn publish_point_cloud(&self, _estimator: &dyn Estimator, header: &Header) {
        debug!(stamp = header.stamp, "point cloud");
    }

    fn publish_tf(&self, _estimator: &dyn Estimator, header: &Header) {
        trace!(stamp = header.stamp, "tf");
    }

    fn publish_keyframe(&self, _estimator: &dyn Estimator) {
        debug!("keyframe");
    }
}
