//! # Integration Tests
//!
//! End-to-end tests over the full sync core.
//!
//! Responsibilities:
//! - Simulated GNSS-VIO sessions (clock calibration, decimation, pairing)
//! - Restart behavior across the whole node
//! - Config-to-node wiring

#[cfg(test)]
mod e2e {
    use std::sync::Arc;

    use contracts::{
        CoreConfig, FeatureFrame, GnssObs, ImuSample, SessionRecord, SolverFlag, TimePulse,
        TimeSystem,
    };
    use nalgebra::Vector3;
    use observability::BundleStatsAggregator;
    use sync_core::mock::{RecordingEstimator, RecordingPublisher};
    use sync_core::SyncNode;

    /// Clock offset used by the simulated sessions: t_gnss = t_local + 5
    const OFFSET: f64 = 5.0;

    fn gnss_config() -> CoreConfig {
        CoreConfig {
            gnss_enabled: true,
            online_sync: true,
            local_time_diff: 0.0,
            max_gnss_camera_delay: 0.05,
            num_of_cam: 1,
        }
    }

    fn imu_record(t: f64) -> SessionRecord {
        SessionRecord::Imu(ImuSample::new(
            t,
            Vector3::new(0.0, 0.0, 9.81),
            Vector3::zeros(),
        ))
    }

    fn feature_record(t: f64) -> SessionRecord {
        SessionRecord::Feature(FeatureFrame { t, points: vec![] })
    }

    fn gnss_record(t_gnss: f64) -> SessionRecord {
        SessionRecord::GnssMeas(vec![GnssObs {
            time: t_gnss,
            sat: 8,
            psr: 2.15e7,
            dopp: -250.0,
            cn0: 43.0,
        }])
    }

    /// Simulated session: 100 Hz IMU from 99.99, 20 Hz features from 100.00,
    /// 10 Hz GNSS epochs aligned with the even frames, clock pre-calibrated
    /// by one pulse/trigger pair.
    fn simulated_session() -> Vec<SessionRecord> {
        let mut timed: Vec<(f64, u8, SessionRecord)> = Vec::new();

        // calibration pair: pulse at GPS 104.0, trigger at local 99.0
        timed.push((
            98.9,
            0,
            SessionRecord::TimePulse(TimePulse {
                week: 0,
                tow: 99.0 + OFFSET,
                time_sys: TimeSystem::Gps,
                utc_based: false,
            }),
        ));
        timed.push((99.0, 1, SessionRecord::Trigger { t: 99.0 }));

        for k in 0..=70 {
            let t = 99.99 + 0.01 * k as f64;
            timed.push((t, 2, imu_record(t)));
        }
        for j in 0..=11 {
            let t = 100.00 + 0.05 * j as f64;
            timed.push((t, 1, feature_record(t)));
        }
        for m in 0..=5 {
            let t_local = 100.00 + 0.1 * m as f64;
            timed.push((t_local, 0, gnss_record(t_local + OFFSET)));
        }

        // arrival order: by time, GNSS before feature before IMU on ties
        timed.sort_by(|a, b| (a.0, a.1).partial_cmp(&(b.0, b.1)).unwrap());
        timed.into_iter().map(|(_, _, record)| record).collect()
    }

    fn drain(node: &SyncNode, stats: &mut BundleStatsAggregator) {
        while let Some(meta) = node.try_process_one() {
            stats.update(&meta);
        }
    }

    #[test]
    fn gnss_session_end_to_end() {
        let estimator = Arc::new(RecordingEstimator::new());
        let publisher = Arc::new(RecordingPublisher::new());
        let node = SyncNode::new(gnss_config(), estimator.clone(), publisher);

        let mut stats = BundleStatsAggregator::new();
        for record in simulated_session() {
            node.apply(record);
            drain(&node, &mut stats);
        }

        // clock calibrated from the pulse/trigger pair
        let offset = node.time_offset().expect("calibrated");
        assert!((offset - OFFSET).abs() < 1e-9);
        assert_eq!(estimator.time_diffs().len(), 1);

        // parity lock keeps the odd-counter frames riding the epoch grid
        let stamps = estimator.image_stamps();
        let expected = [100.10, 100.20, 100.30, 100.40, 100.50];
        assert_eq!(stamps.len(), expected.len());
        for (stamp, want) in stamps.iter().zip(expected) {
            assert!((stamp - want).abs() < 1e-9, "stamp {stamp} vs {want}");
        }
        assert_eq!(stats.total_bundles, 5);

        // every bundle pairs an epoch within the window
        assert_eq!(stats.bundles_with_gnss, 5);
        let epochs = estimator.gnss_epochs();
        assert_eq!(epochs.len(), 5);
        for (epoch, want) in epochs.iter().zip([105.10, 105.20, 105.30, 105.40, 105.50]) {
            assert!((epoch[0].time - want).abs() < 1e-9);
        }
        assert!(stats.alignment_stats.max() < 50.0); // ms

        // only the epoch preceding the first kept frame was stale
        assert_eq!(stats.stale_gnss, 1);

        // integrated IMU time advances strictly onto each frame stamp
        let mut t = 99.99;
        for call in estimator.imu_calls() {
            assert!(call.dt >= 0.0);
            t += call.dt;
        }
        assert!((t - 100.50).abs() < 1e-9);
    }

    #[test]
    fn high_rate_pose_flows_once_nonlinear() {
        let estimator = Arc::new(RecordingEstimator::new());
        let publisher = Arc::new(RecordingPublisher::new());
        let node = SyncNode::new(gnss_config(), estimator.clone(), publisher.clone());

        estimator.set_solver_flag(SolverFlag::NonLinear);
        estimator.set_gravity(Vector3::new(0.0, 0.0, 9.81));

        let mut stats = BundleStatsAggregator::new();
        for record in simulated_session() {
            node.apply(record);
            drain(&node, &mut stats);
        }
        assert!(stats.total_bundles > 0);

        // once the first optimization flips the mirror, every IMU callback
        // publishes, advancing monotonically in IMU time
        let poses = publisher.latest_odometry();
        assert!(!poses.is_empty());
        assert!(poses.windows(2).all(|w| w[0].stamp < w[1].stamp));

        // per-optimization channels fire once per bundle
        assert_eq!(publisher.odometry_count() as u64, stats.total_bundles);
        assert_eq!(publisher.keyframe_count() as u64, stats.total_bundles);
    }

    #[test]
    fn restart_mid_session_recovers_with_fresh_data() {
        let estimator = Arc::new(RecordingEstimator::new());
        let publisher = Arc::new(RecordingPublisher::new());
        let node = SyncNode::new(gnss_config(), estimator.clone(), publisher);

        let mut stats = BundleStatsAggregator::new();
        for record in simulated_session() {
            node.apply(record);
            drain(&node, &mut stats);
        }
        let images_before = estimator.image_count();
        let offset = node.time_offset().unwrap();

        node.apply(SessionRecord::Restart { engage: true });
        assert_eq!(estimator.clear_count(), 1);
        // calibration survives the restart
        assert_eq!(node.time_offset(), Some(offset));

        // fresh streams after the restart produce bundles again; the parity
        // lock also survived, so the same sub-sequence is kept
        let mut timed: Vec<SessionRecord> = Vec::new();
        for k in 0..=30 {
            timed.push(imu_record(101.00 + 0.01 * k as f64));
        }
        for record in timed {
            node.apply(record);
        }
        node.apply(gnss_record(101.05 + OFFSET));
        // counters continue at 13: 101.05 is counter 13 (kept parity)
        node.apply(feature_record(101.05));
        node.apply(feature_record(101.10));
        drain(&node, &mut stats);

        assert!(estimator.image_count() > images_before);
        // post-restart bundles only contain post-restart IMU time: the
        // cursor restarted from the first fresh sample
        let stamps = estimator.image_stamps();
        assert!(stamps.iter().any(|&s| s >= 101.0));
    }

    #[test]
    fn ephemeris_and_iono_bypass_the_buffers() {
        let estimator = Arc::new(RecordingEstimator::new());
        let publisher = Arc::new(RecordingPublisher::new());
        let node = SyncNode::new(gnss_config(), estimator.clone(), publisher);

        node.apply(SessionRecord::Ephem(contracts::BroadcastEphem {
            sat: 12,
            week: 2000,
            toe: 432000.0,
            toc: 432000.0,
            af: [1e-5, 1e-12, 0.0],
            health: 0,
        }));
        node.apply(SessionRecord::GloEphem(contracts::GloEphem {
            sat: 70,
            toe: 2000.0 * 604800.0,
            pos: [1.5e7, 1.0e7, 1.8e7],
            vel: [1.0e3, -2.0e3, 0.5e3],
            acc: [0.0; 3],
            tau_n: -1e-6,
            gamma: 0.0,
            freq_slot: -2,
        }));
        node.apply(SessionRecord::IonoParams {
            t: 100.0,
            params: [1e-8, 2e-8, -1e-7, 6e-8, 9e4, 1.3e5, -6e4, -4e5],
        });

        // forwarded immediately, no bundle required
        assert_eq!(estimator.ephem_count(), 2);
        assert_eq!(estimator.iono_params().len(), 1);
    }

    #[test]
    fn blueprint_wires_a_runnable_node() {
        let toml = r#"
[gnss]
enable = false

[estimator]
num_of_cam = 1
td = 0.0
"#;
        let blueprint =
            config_loader::ConfigLoader::load_from_str(toml, config_loader::ConfigFormat::Toml)
                .unwrap();

        let estimator = Arc::new(RecordingEstimator::with_td(blueprint.estimator.td));
        let publisher = Arc::new(RecordingPublisher::new());
        let node = SyncNode::new(blueprint.to_core_config(), estimator.clone(), publisher);

        node.apply(imu_record(0.00));
        node.apply(imu_record(0.01));
        node.apply(imu_record(0.02));
        node.apply(feature_record(0.015));
        assert!(node.try_process_one().is_some());
        assert_eq!(estimator.image_count(), 1);
    }
}
