//! Bundle dispatch: drive the estimator with one measurement bundle.
//!
//! The only writer of the estimator's processing methods. IMU samples are
//! fed in timestamp order; the straddling sample is linearly interpolated
//! onto the frame time and its original stays buffered for the next bundle.

use std::sync::atomic::Ordering;
use std::time::Instant;

use contracts::{
    BundleMeta, Estimator, FeatureFrame, FeatureMap, Header, MeasurementBundle, SolverFlag,
};
use metrics::{counter, histogram};
use nalgebra::Vector3;
use tracing::debug;

use crate::node::SyncNode;

impl SyncNode {
    /// Process one bundle end-to-end and return its metadata
    pub(crate) fn process_bundle(&self, bundle: MeasurementBundle) -> BundleMeta {
        let started = Instant::now();
        let MeasurementBundle {
            imu,
            frame,
            gnss,
            mut meta,
        } = bundle;
        let img_t = frame.t + self.estimator.td();

        let (t_window_end, nonlinear) = {
            let mut cursor = self.proc.lock().unwrap();

            // Integrate the IMU slice; running (acc, gyr) carry the last
            // processed measurement for the interpolation step
            let mut acc = Vector3::zeros();
            let mut gyr = Vector3::zeros();
            for sample in &imu {
                if sample.t <= img_t {
                    let Some(current) = cursor.current_time else {
                        // first sample after startup/restart anchors the
                        // cursor, nothing to integrate yet
                        cursor.current_time = Some(sample.t);
                        acc = sample.acc;
                        gyr = sample.gyr;
                        continue;
                    };
                    let dt = sample.t - current;
                    assert!(dt >= 0.0, "imu sample behind the time cursor");
                    cursor.current_time = Some(sample.t);
                    acc = sample.acc;
                    gyr = sample.gyr;
                    self.estimator.process_imu(dt, acc, gyr);
                } else {
                    // straddling sample: interpolate onto the frame time
                    let current = *cursor.current_time.get_or_insert(img_t);
                    let dt_1 = img_t - current;
                    let dt_2 = sample.t - img_t;
                    cursor.current_time = Some(img_t);
                    assert!(dt_1 >= 0.0, "frame time behind the time cursor");
                    assert!(dt_2 >= 0.0, "straddling sample before the frame");
                    assert!(dt_1 + dt_2 > 0.0, "degenerate interpolation span");
                    let w1 = dt_2 / (dt_1 + dt_2);
                    let w2 = dt_1 / (dt_1 + dt_2);
                    acc = acc * w1 + sample.acc * w2;
                    gyr = gyr * w1 + sample.gyr * w2;
                    self.estimator.process_imu(dt_1, acc, gyr);
                }
            }

            if let Some(epoch) = &gnss {
                self.estimator.process_gnss(epoch);
            }

            debug!(
                stamp = frame.t,
                points = frame.points.len(),
                "processing vision frame"
            );
            let image = build_feature_map(&frame, self.cfg.num_of_cam);
            let header = Header::world(frame.t);
            self.estimator.process_image(image, header.clone());

            let est: &dyn Estimator = self.estimator.as_ref();
            self.publisher.publish_odometry(est, &header);
            self.publisher.publish_key_poses(est, &header);
            self.publisher.publish_camera_pose(est, &header);
            self.publisher.publish_point_cloud(est, &header);
            self.publisher.publish_tf(est, &header);
            self.publisher.publish_keyframe(est);

            let nonlinear = self.estimator.solver_flag() == SolverFlag::NonLinear;
            self.nonlinear.store(nonlinear, Ordering::SeqCst);

            (cursor.current_time, nonlinear)
        };

        // Re-anchor the high-rate mechanizer on the optimized window tail
        // and replay the IMU samples the estimator has not consumed yet
        if nonlinear {
            if let Some(t_end) = t_window_end {
                let state = self.estimator.latest_window_state();
                let gravity = self.estimator.gravity();
                let buf = self.buf.lock().unwrap();
                let mut mech = self.mech.lock().unwrap();
                mech.reseed(&state, t_end);
                mech.replay(buf.imu_samples(), gravity);
            }
        }

        meta.processing_time_ms = started.elapsed().as_secs_f64() * 1000.0;
        let status = if meta.has_gnss { "gnss" } else { "vision_only" };
        counter!("gvio_syncer_bundles_total", "status" => status).increment(1);
        histogram!("gvio_syncer_bundle_imu_samples").record(meta.imu_samples as f64);
        histogram!("gvio_syncer_processing_time_ms").record(meta.processing_time_ms);
        meta
    }
}

/// Decode the channel layout into the estimator's feature map:
/// `feature_id -> [(camera_id, [x, y, z, u, v, vx, vy])]`
pub(crate) fn build_feature_map(frame: &FeatureFrame, num_of_cam: u32) -> FeatureMap {
    let mut image = FeatureMap::new();
    for point in &frame.points {
        let feature_id = point.channel / num_of_cam;
        let camera_id = point.channel % num_of_cam;
        assert!(point.z == 1.0, "feature depth must be normalized to 1");
        image.entry(feature_id).or_default().push((
            camera_id,
            [
                point.x, point.y, point.z, point.u, point.v, point.vx, point.vy,
            ],
        ));
    }
    image
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use contracts::{CoreConfig, FeaturePoint, ImuSample, SolverFlag, WindowState};
    use nalgebra::Vector3;

    use super::*;
    use crate::mock::{RecordingEstimator, RecordingPublisher};

    fn vio_config() -> CoreConfig {
        CoreConfig {
            gnss_enabled: false,
            online_sync: false,
            local_time_diff: 0.0,
            max_gnss_camera_delay: 0.05,
            num_of_cam: 1,
        }
    }

    fn imu(t: f64, az: f64) -> ImuSample {
        ImuSample::new(t, Vector3::new(0.0, 0.0, az), Vector3::zeros())
    }

    fn frame(t: f64) -> contracts::FeatureFrame {
        contracts::FeatureFrame { t, points: vec![] }
    }

    fn point(channel: u32) -> FeaturePoint {
        FeaturePoint {
            channel,
            x: 0.1,
            y: 0.2,
            z: 1.0,
            u: 320.0,
            v: 240.0,
            vx: 1.0,
            vy: -1.0,
        }
    }

    #[test]
    fn straddling_sample_is_interpolated() {
        let estimator = Arc::new(RecordingEstimator::new());
        let publisher = Arc::new(RecordingPublisher::new());
        let node = crate::SyncNode::new(vio_config(), estimator.clone(), publisher);

        node.on_imu(imu(0.00, 10.0));
        node.on_imu(imu(0.01, 10.0));
        node.on_imu(imu(0.02, 20.0));
        node.on_feature(frame(0.015));

        let meta = node.try_process_one().expect("bundle ready");
        assert_eq!(meta.imu_samples, 3);

        // the first sample only anchors the cursor, so two calls remain
        let calls = estimator.imu_calls();
        assert_eq!(calls.len(), 2);
        assert!((calls[0].dt - 0.01).abs() < 1e-12);
        // straddling sample: dt = 0.005, acceleration midway between 10 and 20
        assert!((calls[1].dt - 0.005).abs() < 1e-12);
        assert!((calls[1].acc - Vector3::new(0.0, 0.0, 15.0)).norm() < 1e-9);
    }

    #[test]
    fn imu_time_strictly_increases_across_bundles() {
        let estimator = Arc::new(RecordingEstimator::new());
        let publisher = Arc::new(RecordingPublisher::new());
        let node = crate::SyncNode::new(vio_config(), estimator.clone(), publisher);

        for k in 0..12 {
            node.on_imu(imu(k as f64 * 0.01, 9.81));
        }
        // decimation keeps odd-counter frames: 0.015 and 0.075
        node.on_feature(frame(0.015));
        node.on_feature(frame(0.045));
        node.on_feature(frame(0.075));

        let mut metas = vec![];
        while let Some(meta) = node.try_process_one() {
            metas.push(meta);
        }
        assert_eq!(metas.len(), 2);
        assert_eq!(estimator.image_stamps(), vec![0.015, 0.075]);

        // reconstruct integrated time from dt increments: strictly
        // non-retreating, with the straddle landing exactly on the frames
        let mut t = 0.0;
        let mut maxima = vec![];
        for call in estimator.imu_calls() {
            assert!(call.dt >= 0.0);
            t += call.dt;
            maxima.push(t);
        }
        assert!(maxima.windows(2).all(|w| w[0] <= w[1]));
        assert!((t - 0.075).abs() < 1e-12);
    }

    #[test]
    fn gnss_epoch_is_forwarded_with_the_bundle() {
        let cfg = CoreConfig {
            gnss_enabled: true,
            online_sync: true,
            ..vio_config()
        };
        let estimator = Arc::new(RecordingEstimator::new());
        let publisher = Arc::new(RecordingPublisher::new());
        let node = crate::SyncNode::new(cfg, estimator.clone(), publisher);

        // calibrate the clock so epochs are buffered; offset = 0
        node.on_time_pulse(contracts::TimePulse {
            week: 0,
            tow: 0.0,
            time_sys: contracts::TimeSystem::Gps,
            utc_based: false,
        });
        node.on_local_trigger(0.0);

        node.on_gnss_meas(vec![contracts::GnssObs {
            time: 10.0,
            sat: 12,
            psr: 2.0e7,
            dopp: 100.0,
            cn0: 47.0,
        }]);
        node.on_imu(imu(9.98, 9.81));
        // undecided parity needs a previous frame before it can lock
        node.on_feature(frame(9.95));
        node.on_feature(frame(10.00));
        node.on_imu(imu(10.02, 9.81));

        node.try_process_one().expect("bundle ready");
        let epochs = estimator.gnss_epochs();
        assert_eq!(epochs.len(), 1);
        assert_eq!(epochs[0][0].sat, 12);
    }

    #[test]
    fn nonlinear_phase_reseeds_the_mechanizer() {
        let estimator = Arc::new(RecordingEstimator::new());
        let publisher = Arc::new(RecordingPublisher::new());
        let node = crate::SyncNode::new(vio_config(), estimator.clone(), publisher);

        estimator.set_solver_flag(SolverFlag::NonLinear);
        estimator.set_window_state(WindowState {
            p: Vector3::new(1.0, 2.0, 3.0),
            ..WindowState::default()
        });

        for k in 0..4 {
            node.on_imu(imu(k as f64 * 0.01, 0.0));
        }
        node.on_feature(frame(0.015));
        node.try_process_one().expect("bundle ready");

        let mech = node.mech.lock().unwrap();
        // reseeded at the cursor (frame time), then replayed over the
        // buffered tail (0.02, 0.03)
        assert_eq!(mech.latest_time(), 0.03);
        assert!(mech.is_initialized());
    }

    #[test]
    fn feature_map_decodes_channels() {
        let frame = contracts::FeatureFrame {
            t: 1.0,
            points: vec![point(0), point(1), point(2)],
        };
        let image = build_feature_map(&frame, 2);

        // channels 0,1 -> feature 0 on cameras 0,1; channel 2 -> feature 1
        assert_eq!(image.len(), 2);
        assert_eq!(image[&0].len(), 2);
        assert_eq!(image[&0][0].0, 0);
        assert_eq!(image[&0][1].0, 1);
        assert_eq!(image[&1][0].0, 0);
        assert_eq!(image[&1][0].1[2], 1.0);
    }

    #[test]
    #[should_panic(expected = "normalized")]
    fn denormalized_feature_depth_is_fatal() {
        let frame = contracts::FeatureFrame {
            t: 1.0,
            points: vec![FeaturePoint {
                z: 0.5,
                ..point(0)
            }],
        };
        build_feature_map(&frame, 1);
    }
}
