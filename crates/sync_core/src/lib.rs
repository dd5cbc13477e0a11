//! # Sync Core
//!
//! Measurement synchronization and dispatch core of the GNSS–Visual–Inertial
//! odometry node.
//!
//! Responsibilities:
//! - GNSS↔local clock calibration from pulse/trigger pairs
//! - Ingest buffering of IMU / feature / GNSS streams
//! - Feature-rate decimation onto the GNSS epoch grid
//! - Bundle extraction (frame + spanning IMU slice + nearest epoch)
//! - Estimator dispatch with straddling-sample interpolation
//! - High-rate IMU mechanization between optimizations
//!
//! ## Usage
//!
//! ```ignore
//! use sync_core::SyncNode;
//!
//! let node = SyncNode::new(config, estimator, publisher);
//! let worker = node.spawn_worker();
//!
//! // transport callbacks:
//! node.on_imu(sample);
//! node.on_feature(frame);
//!
//! node.shutdown();
//! worker.join().unwrap();
//! ```

mod buffers;
mod clock;
mod decimator;
mod dispatcher;
mod mechanizer;
pub mod mock;
mod node;
mod publish;
pub mod time;

pub use buffers::IngestBuffers;
pub use clock::ClockCalibrator;
pub use decimator::FeatureDecimator;
pub use mechanizer::ImuMechanizer;
pub use node::SyncNode;
pub use publish::LogPublisher;

// Re-export contract types used at every call site
pub use contracts::{CoreConfig, MeasurementBundle, SessionRecord};
