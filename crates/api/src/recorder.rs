//! Persist and publish a finished session

use cloud_sync::SummaryPublisher;
use geo_track::LatLng;
use serde::Serialize;
use session::{CompletedSession, SessionSummary};
use storage::{CommitCounts, SessionLog};
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::ApiError;
use crate::AppState;

/// Rows committed per table
#[derive(Debug, Clone, Copy, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedCounts {
    pub samples: usize,
    pub events: usize,
    pub track_points: usize,
}

impl From<CommitCounts> for PersistedCounts {
    fn from(c: CommitCounts) -> Self {
        Self {
            samples: c.samples,
            events: c.events,
            track_points: c.track_points,
        }
    }
}

/// Outcome of stopping a session
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StopResponse {
    pub summary: SessionSummary,
    pub duration_label: String,
    /// Track resampled for display
    pub rendered_polyline: Vec<LatLng>,
    pub persisted: PersistedCounts,
    pub published: bool,
    pub event_points_published: usize,
}

/// Outcome of retrying pending sessions
#[derive(Debug, Serialize)]
pub struct FlushResponse {
    pub flushed: Vec<Uuid>,
    pub pending: usize,
}

/// Commit the session as one unit, then publish.
///
/// When the commit fails the session goes to the pending queue and the
/// error names it; [`flush_pending`] retries it later. A publish failure
/// only logs: the session is already stored locally.
pub async fn finish_session(state: &AppState, completed: CompletedSession) -> Result<StopResponse, ApiError> {
    let persisted = match state.store.commit_session(&completed).await {
        Ok(counts) => PersistedCounts::from(counts),
        Err(e) => {
            let session_id = completed.id;
            let mut pending = state.pending.lock().await;
            pending.push(completed);
            warn!(
                "Session {} not persisted, {} pending: {}",
                session_id,
                pending.len(),
                e
            );
            return Err(ApiError::NotPersisted { session_id, source: e });
        }
    };
    metrics::counter!("telemetry_sessions_completed_total").increment(1);

    let CompletedSession { id, events, summary, .. } = completed;
    info!(
        "Session {} persisted: {} samples, {} events, {} track points",
        id, persisted.samples, persisted.events, persisted.track_points
    );

    let published = match state.publisher.publish_summary(&summary).await {
        Ok(()) => true,
        Err(e) => {
            warn!("Summary for session {} not published: {}", id, e);
            false
        }
    };

    let event_points_published = if published {
        state
            .publisher
            .publish_event_points(&summary, &events)
            .await
            .unwrap_or_else(|e| {
                warn!("Event points for session {} not published: {}", id, e);
                0
            })
    } else {
        0
    };

    Ok(StopResponse {
        duration_label: summary.duration_label(),
        rendered_polyline: summary.render_polyline(state.config.session.resample_step_m),
        summary,
        persisted,
        published,
        event_points_published,
    })
}

/// Retry every pending session in stop order. Sessions that fail again
/// stay queued.
pub async fn flush_pending(state: &AppState) -> FlushResponse {
    let queued = std::mem::take(&mut *state.pending.lock().await);
    let mut flushed = Vec::new();
    for completed in queued {
        let id = completed.id;
        if finish_session(state, completed).await.is_ok() {
            flushed.push(id);
        }
    }

    let pending = state.pending.lock().await.len();
    if !flushed.is_empty() || pending > 0 {
        info!("Flushed {} pending sessions, {} still pending", flushed.len(), pending);
    }
    FlushResponse { flushed, pending }
}
