//! Lifetime totals across a driver's trips

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::summary::SessionSummary;

/// One point of the score-over-time series
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScorePoint {
    pub started_at: DateTime<Utc>,
    pub score: f64,
}

/// Profile KPIs
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DriverTotals {
    pub total_runs: usize,
    /// Mean of finite scores, 0 when there are none
    pub avg_score: f64,
    pub total_miles: f64,
    /// Oldest first
    pub score_series: Vec<ScorePoint>,
}

impl DriverTotals {
    pub fn from_summaries(summaries: &[SessionSummary]) -> Self {
        let scores: Vec<f64> = summaries
            .iter()
            .map(|s| s.score)
            .filter(|s| s.is_finite())
            .collect();

        let avg_score = if scores.is_empty() {
            0.0
        } else {
            scores.iter().sum::<f64>() / scores.len() as f64
        };

        let total_miles = summaries
            .iter()
            .map(|s| s.distance_mi)
            .filter(|d| d.is_finite())
            .sum();

        let mut score_series: Vec<ScorePoint> = summaries
            .iter()
            .filter(|s| s.score.is_finite())
            .map(|s| ScorePoint {
                started_at: s.started_at,
                score: s.score,
            })
            .collect();
        score_series.sort_by_key(|p| p.started_at);

        Self {
            total_runs: summaries.len(),
            avg_score,
            total_miles,
            score_series,
        }
    }
}
