//! Immutable trip summary handed to persistence and publishing

use std::fmt;

use chrono::{DateTime, Utc};
use geo_track::{resample, BoundingBox, LatLng};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::scoring::EventCounts;

/// Who may see a published summary
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    Private,
    Friends,
    #[default]
    Public,
}

impl fmt::Display for Visibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Visibility::Private => "private",
            Visibility::Friends => "friends",
            Visibility::Public => "public",
        };
        f.write_str(s)
    }
}

/// Final record of one trip
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    pub session_id: Uuid,
    pub owner_id: Option<String>,
    pub started_at: DateTime<Utc>,
    pub duration_sec: u64,
    pub distance_mi: f64,
    pub score: f64,
    pub event_counts: EventCounts,
    /// Recorded track, one vertex per GPS fix
    pub polyline: Vec<LatLng>,
    pub bbox: Option<BoundingBox>,
    pub visibility: Visibility,
}

impl SessionSummary {
    /// Polyline densified for rendering
    pub fn render_polyline(&self, step_m: f64) -> Vec<LatLng> {
        resample(&self.polyline, step_m)
    }

    pub fn total_events(&self) -> usize {
        self.event_counts.total()
    }

    pub fn duration_label(&self) -> String {
        format_duration(self.duration_sec)
    }
}

/// `"{m}m {s}s"` duration label
pub fn format_duration(sec: u64) -> String {
    format!("{}m {}s", sec / 60, sec % 60)
}
