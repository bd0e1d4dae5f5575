//! Driving Event Classifier
//!
//! Turns raw motion samples into typed driving events:
//! - Orientation tracking (device frame -> heading-aligned frame)
//! - Yaw-rate smoothing and heading integration
//! - Threshold classification of braking, acceleration, cornering,
//!   overspeed, and too-fast-for-turn events

mod classifier;
mod config;
mod error;
mod filter;
mod orientation;
mod sample;

pub use classifier::{classify, ClassifierState, Detection, EventClassifier, EventKind};
pub use config::ClassifierConfig;
pub use error::ClassifierError;
pub use filter::YawRateFilter;
pub use orientation::{wrap_pi, HorizontalAccel, Quaternion, Vec3};
pub use sample::{Rotation, Sample};

/// Samples at or below this speed (m/s) are never classified
pub const STATIONARY_SPEED_MPS: f64 = 2.0;

/// Minimum speed (m/s) for longitudinal events (brake / accel)
pub const LONGITUDINAL_MIN_SPEED_MPS: f64 = 4.0;

/// Minimum speed (m/s) for the yaw-rate based turn estimate
pub const TURN_MIN_SPEED_MPS: f64 = 6.0;
