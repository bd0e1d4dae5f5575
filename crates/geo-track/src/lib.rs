//! GPS Track Geometry
//!
//! Provides the geometric primitives shared by trip summaries, feed rendering,
//! and hotspot display:
//! - Haversine great-circle distance
//! - Axis-aligned bounding boxes over lat/lng
//! - Maximum-segment-length polyline resampling

mod bbox;
mod distance;
mod resample;

pub use bbox::BoundingBox;
pub use distance::{haversine_m, meters_to_miles, EARTH_RADIUS_M, METERS_PER_MILE};
pub use resample::{resample, DEFAULT_STEP_M};

use serde::{Deserialize, Serialize};

/// A latitude/longitude pair in decimal degrees
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

impl LatLng {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Both coordinates are finite numbers
    pub fn is_finite(&self) -> bool {
        self.lat.is_finite() && self.lng.is_finite()
    }
}

/// Timestamped GPS fix belonging to a session track
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrackPoint {
    /// Milliseconds since epoch
    pub ts: i64,
    pub lat: f64,
    pub lng: f64,
}

impl TrackPoint {
    pub fn new(ts: i64, lat: f64, lng: f64) -> Self {
        Self { ts, lat, lng }
    }

    pub fn position(&self) -> LatLng {
        LatLng::new(self.lat, self.lng)
    }
}

impl From<TrackPoint> for LatLng {
    fn from(p: TrackPoint) -> Self {
        p.position()
    }
}
