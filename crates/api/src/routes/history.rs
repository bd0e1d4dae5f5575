//! Session History Routes

use axum::{
    extract::{Path, Query, State},
    Json,
};
use event_classifier::Sample;
use geo_track::TrackPoint;
use serde::{Deserialize, Serialize};
use session::{DrivingEvent, SessionSummary};
use storage::{SessionLog, TimeRange};
use uuid::Uuid;

use crate::error::ApiError;
use crate::SharedState;

/// Inclusive timestamp window, open-ended when a bound is missing
#[derive(Debug, Default, Deserialize)]
pub struct RangeQuery {
    pub from: Option<i64>,
    pub to: Option<i64>,
}

impl RangeQuery {
    fn range(&self) -> Result<TimeRange, ApiError> {
        let range = TimeRange::new(self.from.unwrap_or(i64::MIN), self.to.unwrap_or(i64::MAX));
        if range.from_ts > range.to_ts {
            return Err(ApiError::BadRequest(format!("from {} is after to {}", range.from_ts, range.to_ts)));
        }
        Ok(range)
    }
}

/// Rows of one session
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RowsResponse<T> {
    pub session_id: Uuid,
    pub data: Vec<T>,
    pub count: usize,
}

impl<T> RowsResponse<T> {
    fn new(session_id: Uuid, data: Vec<T>) -> Self {
        Self {
            session_id,
            count: data.len(),
            data,
        }
    }
}

pub async fn get_events(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Query(params): Query<RangeQuery>,
) -> Result<Json<RowsResponse<DrivingEvent>>, ApiError> {
    let events = state.store.events_in(id, params.range()?).await?;
    Ok(Json(RowsResponse::new(id, events)))
}

pub async fn get_samples(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Query(params): Query<RangeQuery>,
) -> Result<Json<RowsResponse<Sample>>, ApiError> {
    let samples = state.store.samples_in(id, params.range()?).await?;
    Ok(Json(RowsResponse::new(id, samples)))
}

pub async fn get_track(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Query(params): Query<RangeQuery>,
) -> Result<Json<RowsResponse<TrackPoint>>, ApiError> {
    let track = state.store.track_in(id, params.range()?).await?;
    Ok(Json(RowsResponse::new(id, track)))
}

#[derive(Debug, Deserialize)]
pub struct SessionListQuery {
    pub owner: Option<String>,
    #[serde(default = "default_limit")]
    pub limit: usize,
}

fn default_limit() -> usize {
    50
}

#[derive(Debug, Serialize)]
pub struct SessionListResponse {
    pub data: Vec<SessionSummary>,
    pub count: usize,
}

/// Stored summaries, newest first
pub async fn list_sessions(
    State(state): State<SharedState>,
    Query(params): Query<SessionListQuery>,
) -> Result<Json<SessionListResponse>, ApiError> {
    let mut data = state.store.summaries(params.owner.as_deref()).await?;
    data.truncate(params.limit.min(500));
    Ok(Json(SessionListResponse { count: data.len(), data }))
}
