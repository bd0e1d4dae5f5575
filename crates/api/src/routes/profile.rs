//! Driver Profile Routes

use axum::{extract::State, Json};
use chrono::{DateTime, Utc};
use serde::Serialize;
use session::DriverTotals;
use storage::SessionLog;
use uuid::Uuid;

use crate::error::ApiError;
use crate::SharedState;

/// One row of the run history
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSummary {
    pub session_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub duration_label: String,
    pub distance_mi: f64,
    pub score: f64,
    pub total_events: usize,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileResponse {
    pub owner_id: Option<String>,
    pub totals: DriverTotals,
    /// Newest first
    pub runs: Vec<RunSummary>,
}

/// Lifetime totals for the configured owner
pub async fn get_profile(State(state): State<SharedState>) -> Result<Json<ProfileResponse>, ApiError> {
    let owner_id = state.config.session.owner_id.clone();
    let summaries = state.store.summaries(owner_id.as_deref()).await?;

    let runs = summaries
        .iter()
        .map(|s| RunSummary {
            session_id: s.session_id,
            started_at: s.started_at,
            duration_label: s.duration_label(),
            distance_mi: s.distance_mi,
            score: s.score,
            total_events: s.total_events(),
        })
        .collect();

    Ok(Json(ProfileResponse {
        owner_id,
        totals: DriverTotals::from_summaries(&summaries),
        runs,
    }))
}
