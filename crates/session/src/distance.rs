//! Trip distance accumulation

use geo_track::{haversine_m, meters_to_miles, LatLng};

/// Increments at or below this many meters are GPS jitter
pub const NOISE_FLOOR_M: f64 = 0.5;

/// Running great-circle distance over consecutive fixes
#[derive(Debug, Clone, Copy, Default)]
pub struct DistanceAccumulator {
    last: Option<LatLng>,
    miles: f64,
}

impl DistanceAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a fix and return the increment counted (meters)
    pub fn push(&mut self, fix: LatLng) -> f64 {
        let counted = match self.last {
            Some(prev) => {
                let d = haversine_m(prev, fix);
                if d > NOISE_FLOOR_M {
                    self.miles += meters_to_miles(d);
                    d
                } else {
                    0.0
                }
            }
            None => 0.0,
        };
        self.last = Some(fix);
        counted
    }

    pub fn miles(&self) -> f64 {
        self.miles
    }

    pub fn last_fix(&self) -> Option<LatLng> {
        self.last
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
