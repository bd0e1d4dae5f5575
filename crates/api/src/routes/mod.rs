//! HTTP route handlers

pub mod history;
pub mod hotspots;
pub mod profile;
pub mod session;

/// Server clock in epoch milliseconds
pub(crate) fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
