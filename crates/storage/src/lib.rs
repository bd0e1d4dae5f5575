//! Storage Layer
//!
//! Append-only session log keyed by session id. Every batch append is
//! atomic: either all rows commit or none do. A finished session is
//! committed as one unit: samples, events, track and summary together.

mod repository;
mod sqlite;

pub use repository::Repository;
pub use sqlite::SqliteRepository;

use std::future::Future;

use event_classifier::Sample;
use geo_track::{BoundingBox, LatLng, TrackPoint};
use session::{CompletedSession, DrivingEvent, SessionSummary};
use thiserror::Error;
use uuid::Uuid;

/// Storage errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("Record not found")]
    NotFound,
    #[error("Serialization error: {0}")]
    SerializationError(String),
    #[error("Invalid record in batch: {0}")]
    InvalidRecord(String),
}

impl From<sqlx::Error> for StorageError {
    fn from(err: sqlx::Error) -> Self {
        StorageError::DatabaseError(err.to_string())
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        StorageError::SerializationError(err.to_string())
    }
}

/// Inclusive timestamp range in milliseconds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeRange {
    pub from_ts: i64,
    pub to_ts: i64,
}

impl TimeRange {
    pub fn new(from_ts: i64, to_ts: i64) -> Self {
        Self { from_ts, to_ts }
    }

    /// Whole timeline
    pub fn all() -> Self {
        Self::new(i64::MIN, i64::MAX)
    }

    pub fn contains(&self, ts: i64) -> bool {
        ts >= self.from_ts && ts <= self.to_ts
    }
}

/// Rows written by [`SessionLog::commit_session`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CommitCounts {
    pub samples: usize,
    pub events: usize,
    pub track_points: usize,
}

/// Transactional session log
pub trait SessionLog: Send + Sync {
    /// Append samples atomically, returning the number of rows written
    fn append_samples(&self, session_id: Uuid, samples: &[Sample]) -> impl Future<Output = Result<usize, StorageError>> + Send;

    fn append_events(&self, session_id: Uuid, events: &[DrivingEvent]) -> impl Future<Output = Result<usize, StorageError>> + Send;

    fn append_track(&self, session_id: Uuid, points: &[TrackPoint]) -> impl Future<Output = Result<usize, StorageError>> + Send;

    fn save_summary(&self, summary: &SessionSummary) -> impl Future<Output = Result<(), StorageError>> + Send;

    /// Store every batch of a finished session and its summary in one
    /// commit. On error nothing of the session is visible.
    fn commit_session(&self, session: &CompletedSession) -> impl Future<Output = Result<CommitCounts, StorageError>> + Send;

    /// Samples of one session within `range`, ordered by timestamp
    fn samples_in(&self, session_id: Uuid, range: TimeRange) -> impl Future<Output = Result<Vec<Sample>, StorageError>> + Send;

    fn events_in(&self, session_id: Uuid, range: TimeRange) -> impl Future<Output = Result<Vec<DrivingEvent>, StorageError>> + Send;

    fn track_in(&self, session_id: Uuid, range: TimeRange) -> impl Future<Output = Result<Vec<TrackPoint>, StorageError>> + Send;

    /// Located event points of every session inside `bbox`
    fn event_points_in(&self, bbox: BoundingBox) -> impl Future<Output = Result<Vec<LatLng>, StorageError>> + Send;

    /// Stored summaries, newest first, optionally for one owner
    fn summaries(&self, owner_id: Option<&str>) -> impl Future<Output = Result<Vec<SessionSummary>, StorageError>> + Send;
}

pub(crate) fn check_session(session: &CompletedSession) -> Result<(), StorageError> {
    check_samples(&session.samples)?;
    check_events(&session.events)?;
    check_track(&session.track)
}

pub(crate) fn check_samples(samples: &[Sample]) -> Result<(), StorageError> {
    for s in samples {
        if !s.is_finite() {
            return Err(StorageError::InvalidRecord(format!("sample at ts={} is non-finite", s.ts)));
        }
    }
    Ok(())
}

pub(crate) fn check_events(events: &[DrivingEvent]) -> Result<(), StorageError> {
    for e in events {
        if !(e.value.is_finite() && e.lat.is_finite() && e.lng.is_finite()) {
            return Err(StorageError::InvalidRecord(format!("{} event at ts={} is non-finite", e.kind, e.ts)));
        }
    }
    Ok(())
}

pub(crate) fn check_track(points: &[TrackPoint]) -> Result<(), StorageError> {
    for p in points {
        if !p.position().is_finite() {
            return Err(StorageError::InvalidRecord(format!("track point at ts={} is non-finite", p.ts)));
        }
    }
    Ok(())
}
