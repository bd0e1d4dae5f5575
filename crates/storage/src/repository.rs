//! In-memory session log

use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard};

use event_classifier::Sample;
use geo_track::{BoundingBox, LatLng, TrackPoint};
use session::{CompletedSession, DrivingEvent, SessionSummary};
use tracing::{debug, info};
use uuid::Uuid;

use crate::{check_events, check_samples, check_session, check_track, CommitCounts, SessionLog, StorageError, TimeRange};

#[derive(Debug, Default)]
struct SessionRows {
    samples: Vec<Sample>,
    events: Vec<DrivingEvent>,
    track: Vec<TrackPoint>,
}

#[derive(Debug, Default)]
struct Tables {
    sessions: HashMap<Uuid, SessionRows>,
    /// Insertion order, used for retention
    order: VecDeque<Uuid>,
    summaries: Vec<SessionSummary>,
}

impl Tables {
    fn rows_mut(&mut self, session_id: Uuid, max_sessions: usize) -> &mut SessionRows {
        if !self.sessions.contains_key(&session_id) {
            while self.order.len() >= max_sessions {
                match self.order.pop_front() {
                    Some(evicted) => {
                        info!(
                            "Retention limit {} reached, dropping raw rows of session {}",
                            max_sessions, evicted
                        );
                        self.sessions.remove(&evicted);
                    }
                    None => break,
                }
            }
            self.order.push_back(session_id);
        }
        self.sessions.entry(session_id).or_default()
    }

    fn put_summary(&mut self, summary: &SessionSummary) {
        self.summaries.retain(|s| s.session_id != summary.session_id);
        self.summaries.push(summary.clone());
    }
}

/// Speed and yaw rate as stored: non-finite readings become 0
fn stored_sample(s: &Sample) -> Sample {
    Sample {
        speed: s.effective_speed(),
        rotation_rate_z: s.effective_yaw_rate(),
        ..*s
    }
}

/// Mutex-guarded session log. Each batch is validated in full before any
/// row is committed, and committed under a single lock.
///
/// Raw rows are kept for at most `max_sessions` sessions. Past that the
/// oldest session's samples, events and track are dropped (logged at
/// `info`): its range reads return `NotFound` and its events no longer
/// show up in hotspot queries. Summaries are never evicted.
pub struct Repository {
    tables: Mutex<Tables>,
    /// Raw session logs kept before the oldest is evicted
    max_sessions: usize,
}

impl Repository {
    pub fn new() -> Self {
        Self::with_retention(1_000)
    }

    pub fn with_retention(max_sessions: usize) -> Self {
        info!("Creating in-memory repository (retention: {} sessions)", max_sessions);
        Self {
            tables: Mutex::new(Tables::default()),
            max_sessions: max_sessions.max(1),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, Tables>, StorageError> {
        self.tables
            .lock()
            .map_err(|e| StorageError::DatabaseError(format!("Lock error: {}", e)))
    }

    /// Number of sessions with raw rows
    pub fn session_count(&self) -> usize {
        self.tables.lock().map(|t| t.sessions.len()).unwrap_or(0)
    }

    pub fn summary_count(&self) -> usize {
        self.tables.lock().map(|t| t.summaries.len()).unwrap_or(0)
    }

    /// Clear all data (for testing)
    pub fn clear(&self) {
        if let Ok(mut tables) = self.tables.lock() {
            *tables = Tables::default();
        }
    }
}

impl Default for Repository {
    fn default() -> Self {
        Self::new()
    }
}

fn in_range<T: Copy>(rows: &[T], range: TimeRange, ts: impl Fn(&T) -> i64) -> Vec<T> {
    let mut out: Vec<T> = rows.iter().filter(|r| range.contains(ts(*r))).copied().collect();
    out.sort_by_key(|r| ts(r));
    out
}

impl SessionLog for Repository {
    async fn append_samples(&self, session_id: Uuid, samples: &[Sample]) -> Result<usize, StorageError> {
        check_samples(samples)?;
        let mut tables = self.lock()?;
        tables
            .rows_mut(session_id, self.max_sessions)
            .samples
            .extend(samples.iter().map(stored_sample));
        debug!("Appended {} samples to {}", samples.len(), session_id);
        Ok(samples.len())
    }

    async fn append_events(&self, session_id: Uuid, events: &[DrivingEvent]) -> Result<usize, StorageError> {
        check_events(events)?;
        let mut tables = self.lock()?;
        tables.rows_mut(session_id, self.max_sessions).events.extend_from_slice(events);
        debug!("Appended {} events to {}", events.len(), session_id);
        Ok(events.len())
    }

    async fn append_track(&self, session_id: Uuid, points: &[TrackPoint]) -> Result<usize, StorageError> {
        check_track(points)?;
        let mut tables = self.lock()?;
        tables.rows_mut(session_id, self.max_sessions).track.extend_from_slice(points);
        debug!("Appended {} track points to {}", points.len(), session_id);
        Ok(points.len())
    }

    async fn save_summary(&self, summary: &SessionSummary) -> Result<(), StorageError> {
        self.lock()?.put_summary(summary);
        Ok(())
    }

    async fn commit_session(&self, session: &CompletedSession) -> Result<CommitCounts, StorageError> {
        check_session(session)?;
        let mut tables = self.lock()?;
        let rows = tables.rows_mut(session.id, self.max_sessions);
        rows.samples.extend(session.samples.iter().map(stored_sample));
        rows.events.extend_from_slice(&session.events);
        rows.track.extend_from_slice(&session.track);
        tables.put_summary(&session.summary);

        let counts = CommitCounts {
            samples: session.samples.len(),
            events: session.events.len(),
            track_points: session.track.len(),
        };
        debug!("Committed session {}: {:?}", session.id, counts);
        Ok(counts)
    }

    async fn samples_in(&self, session_id: Uuid, range: TimeRange) -> Result<Vec<Sample>, StorageError> {
        let tables = self.lock()?;
        let rows = tables.sessions.get(&session_id).ok_or(StorageError::NotFound)?;
        Ok(in_range(&rows.samples, range, |s| s.ts))
    }

    async fn events_in(&self, session_id: Uuid, range: TimeRange) -> Result<Vec<DrivingEvent>, StorageError> {
        let tables = self.lock()?;
        let rows = tables.sessions.get(&session_id).ok_or(StorageError::NotFound)?;
        Ok(in_range(&rows.events, range, |e| e.ts))
    }

    async fn track_in(&self, session_id: Uuid, range: TimeRange) -> Result<Vec<TrackPoint>, StorageError> {
        let tables = self.lock()?;
        let rows = tables.sessions.get(&session_id).ok_or(StorageError::NotFound)?;
        Ok(in_range(&rows.track, range, |p| p.ts))
    }

    async fn event_points_in(&self, bbox: BoundingBox) -> Result<Vec<LatLng>, StorageError> {
        let tables = self.lock()?;
        let mut events: Vec<&DrivingEvent> = tables
            .sessions
            .values()
            .flat_map(|rows| rows.events.iter())
            .filter(|e| e.has_fix() && bbox.contains(e.position()))
            .collect();
        events.sort_by_key(|e| e.ts);
        Ok(events.into_iter().map(|e| e.position()).collect())
    }

    async fn summaries(&self, owner_id: Option<&str>) -> Result<Vec<SessionSummary>, StorageError> {
        let tables = self.lock()?;
        let mut out: Vec<SessionSummary> = tables
            .summaries
            .iter()
            .filter(|s| owner_id.map_or(true, |o| s.owner_id.as_deref() == Some(o)))
            .cloned()
            .collect();
        out.sort_by(|a, b| b.started_at.cmp(&a.started_at));
        Ok(out)
    }
}
