//! Live Session Routes

use axum::{extract::State, Json};
use event_classifier::Sample;
use serde::{Deserialize, Serialize};
use session::{DrivingEvent, LiveStatus, LocationFix, MotionReading, SessionError, SessionStatus};
use tracing::debug;
use uuid::Uuid;

use super::now_ms;
use crate::error::ApiError;
use crate::recorder::{finish_session, flush_pending, FlushResponse, StopResponse};
use crate::SharedState;

/// Optional body for lifecycle transitions
#[derive(Debug, Default, Deserialize)]
pub struct ControlRequest {
    /// Transition time (ms); the server clock when omitted
    pub ts: Option<i64>,
}

fn transition_ts(body: Option<Json<ControlRequest>>) -> i64 {
    body.and_then(|Json(b)| b.ts).unwrap_or_else(now_ms)
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransitionResponse {
    pub session_id: Option<Uuid>,
    pub status: SessionStatus,
}

#[derive(Debug, Deserialize)]
pub struct SamplesRequest {
    pub samples: Vec<Sample>,
}

#[derive(Debug, Deserialize)]
pub struct MotionRequest {
    pub readings: Vec<MotionReading>,
}

#[derive(Debug, Serialize)]
pub struct IngestResponse {
    pub accepted: usize,
    pub events: Vec<DrivingEvent>,
}

#[derive(Debug, Deserialize)]
pub struct FixesRequest {
    pub fixes: Vec<LocationFix>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FixesResponse {
    pub accepted: usize,
    pub speed_mps: f64,
}

/// Live status of the current session
pub async fn get_status(State(state): State<SharedState>) -> Json<LiveStatus> {
    let recorder = state.recorder.lock().await;
    Json(recorder.live_status(now_ms()))
}

pub async fn start(
    State(state): State<SharedState>,
    body: Option<Json<ControlRequest>>,
) -> Result<Json<TransitionResponse>, ApiError> {
    let mut recorder = state.recorder.lock().await;
    let id = recorder.start(transition_ts(body))?;
    Ok(Json(TransitionResponse {
        session_id: Some(id),
        status: recorder.status(),
    }))
}

pub async fn pause(
    State(state): State<SharedState>,
    body: Option<Json<ControlRequest>>,
) -> Result<Json<TransitionResponse>, ApiError> {
    let mut recorder = state.recorder.lock().await;
    recorder.pause(transition_ts(body))?;
    Ok(Json(TransitionResponse {
        session_id: recorder.session_id(),
        status: recorder.status(),
    }))
}

pub async fn resume(
    State(state): State<SharedState>,
    body: Option<Json<ControlRequest>>,
) -> Result<Json<TransitionResponse>, ApiError> {
    let mut recorder = state.recorder.lock().await;
    recorder.resume(transition_ts(body))?;
    Ok(Json(TransitionResponse {
        session_id: recorder.session_id(),
        status: recorder.status(),
    }))
}

/// Stop, then persist and publish outside the recorder lock
pub async fn stop(
    State(state): State<SharedState>,
    body: Option<Json<ControlRequest>>,
) -> Result<Json<StopResponse>, ApiError> {
    let completed = state.recorder.lock().await.stop(transition_ts(body))?;
    Ok(Json(finish_session(&state, completed).await?))
}

/// Retry sessions whose commit failed at stop
pub async fn flush(State(state): State<SharedState>) -> Json<FlushResponse> {
    Json(flush_pending(&state).await)
}

/// Abandon the current session; nothing is stored
pub async fn discard(State(state): State<SharedState>) -> Result<Json<TransitionResponse>, ApiError> {
    let mut recorder = state.recorder.lock().await;
    let id = recorder.discard()?;
    Ok(Json(TransitionResponse {
        session_id: Some(id),
        status: recorder.status(),
    }))
}

fn record_ingest(accepted: usize, events: &[DrivingEvent]) {
    metrics::counter!("telemetry_samples_total").increment(accepted as u64);
    for e in events {
        metrics::counter!("telemetry_events_total", "type" => e.kind.as_str()).increment(1);
    }
    debug!("Ingested {} samples, {} events", accepted, events.len());
}

fn check_samples(mut samples: impl Iterator<Item = Sample>) -> Result<(), ApiError> {
    match samples.find(|s| !s.is_finite()) {
        Some(bad) => Err(SessionError::InvalidSample(format!("non-finite values at ts={}", bad.ts)).into()),
        None => Ok(()),
    }
}

/// Classify a batch of samples carrying their own speed. A non-finite
/// sample rejects the whole batch before anything is classified.
pub async fn post_samples(
    State(state): State<SharedState>,
    Json(request): Json<SamplesRequest>,
) -> Result<Json<IngestResponse>, ApiError> {
    check_samples(request.samples.iter().copied())?;
    let mut recorder = state.recorder.lock().await;
    let mut events = Vec::new();
    for sample in &request.samples {
        events.extend(recorder.ingest(sample)?);
    }
    drop(recorder);

    record_ingest(request.samples.len(), &events);
    Ok(Json(IngestResponse {
        accepted: request.samples.len(),
        events,
    }))
}

/// Classify raw motion readings using the last speed from the location feed
pub async fn post_motion(
    State(state): State<SharedState>,
    Json(request): Json<MotionRequest>,
) -> Result<Json<IngestResponse>, ApiError> {
    check_samples(request.readings.iter().map(|r| r.with_speed(0.0)))?;
    let mut recorder = state.recorder.lock().await;
    let mut events = Vec::new();
    for reading in &request.readings {
        events.extend(recorder.ingest_motion(*reading)?);
    }
    drop(recorder);

    record_ingest(request.readings.len(), &events);
    Ok(Json(IngestResponse {
        accepted: request.readings.len(),
        events,
    }))
}

/// Record location fixes. The batch is checked up front so a bad fix
/// leaves the track untouched.
pub async fn post_fixes(
    State(state): State<SharedState>,
    Json(request): Json<FixesRequest>,
) -> Result<Json<FixesResponse>, ApiError> {
    if let Some(bad) = request.fixes.iter().find(|f| !f.position().is_finite()) {
        return Err(SessionError::InvalidFix(format!("({}, {}) at ts={}", bad.lat, bad.lng, bad.ts)).into());
    }

    let mut recorder = state.recorder.lock().await;
    for fix in &request.fixes {
        recorder.record_fix(*fix)?;
    }

    Ok(Json(FixesResponse {
        accepted: request.fixes.len(),
        speed_mps: recorder.speed_cell().load(),
    }))
}
