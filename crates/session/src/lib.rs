//! Driving Session Aggregation
//!
//! Owns everything recorded during one trip:
//! - Recording lifecycle (start, pause, resume, stop, discard)
//! - Classifier state and event enrichment with the last GPS fix
//! - Distance accumulation and elapsed-time clock
//! - Final summary: score, per-type counts, polyline, bounding box

mod aggregator;
mod clock;
mod distance;
mod event;
mod profile;
mod scoring;
mod speed;
mod summary;

pub use aggregator::{CompletedSession, LiveStatus, SessionAggregator, SessionConfig, SessionStatus};
pub use clock::ElapsedClock;
pub use distance::{DistanceAccumulator, NOISE_FLOOR_M};
pub use event::{DrivingEvent, LocationFix, MotionReading};
pub use profile::{DriverTotals, ScorePoint};
pub use scoring::{score, EventCounts, EventTally};
pub use speed::SpeedCell;
pub use summary::{format_duration, SessionSummary, Visibility};

use thiserror::Error;

/// Session lifecycle errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SessionError {
    #[error("A session is already {0}")]
    AlreadyActive(SessionStatus),

    #[error("Cannot {action} a session that is {from}")]
    InvalidTransition {
        from: SessionStatus,
        action: &'static str,
    },

    #[error("Session is {0}, input rejected")]
    NotRecording(SessionStatus),

    #[error("Invalid location fix: {0}")]
    InvalidFix(String),

    #[error("Invalid motion sample: {0}")]
    InvalidSample(String),
}
