//! # Contracts
//!
//! Frozen interface contracts (ICD), defining inter-module data structures and traits.
//! All business crates can only depend on this crate, reverse dependencies are prohibited.
//!
//! ## Time Model
//! - Local sensor clock: seconds (f64), per-stream monotonic
//! - GNSS clock: continuous GPS seconds since the GPS epoch (1980-01-06)
//! - A scalar `time_offset` relates the two: `t_gnss ≈ t_local + time_offset`

mod blueprint;
mod bundle;
mod error;
mod estimator;
mod gnss;
mod msg;
mod publish;
mod session;

pub use blueprint::*;
pub use bundle::*;
pub use error::*;
pub use estimator::*;
pub use gnss::*;
pub use msg::*;
pub use publish::*;
pub use session::*;
