//! Session-level event and feed input types

use event_classifier::{Detection, EventKind, Rotation, Sample};
use geo_track::{LatLng, TrackPoint};
use serde::{Deserialize, Serialize};

/// Classified event stamped with the position it happened at
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DrivingEvent {
    pub ts: i64,
    #[serde(rename = "type")]
    pub kind: EventKind,
    pub value: f64,
    /// Last known fix, `0.0` when no fix had arrived yet
    pub lat: f64,
    pub lng: f64,
}

impl DrivingEvent {
    pub fn from_detection(detection: Detection, fix: Option<LatLng>) -> Self {
        let pos = fix.unwrap_or_default();
        Self {
            ts: detection.ts,
            kind: detection.kind,
            value: detection.value,
            lat: pos.lat,
            lng: pos.lng,
        }
    }

    /// Whether the event carries a real position instead of the `(0, 0)` placeholder
    pub fn has_fix(&self) -> bool {
        !(self.lat == 0.0 && self.lng == 0.0)
    }

    pub fn position(&self) -> LatLng {
        LatLng::new(self.lat, self.lng)
    }
}

/// Location feed update
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LocationFix {
    pub ts: i64,
    pub lat: f64,
    pub lng: f64,
    /// Reported ground speed (m/s), if the provider had one
    #[serde(default)]
    pub speed: Option<f64>,
}

impl LocationFix {
    pub fn position(&self) -> LatLng {
        LatLng::new(self.lat, self.lng)
    }

    pub fn track_point(&self) -> TrackPoint {
        TrackPoint::new(self.ts, self.lat, self.lng)
    }
}

/// Motion feed update without speed; the session supplies the last known speed
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MotionReading {
    pub ts: i64,
    pub ax: f64,
    pub ay: f64,
    pub az: f64,
    #[serde(default)]
    pub rotation_rate_z: f64,
    #[serde(default)]
    pub rotation: Rotation,
}

impl MotionReading {
    pub fn with_speed(self, speed: f64) -> Sample {
        Sample {
            ts: self.ts,
            ax: self.ax,
            ay: self.ay,
            az: self.az,
            speed,
            rotation_rate_z: self.rotation_rate_z,
            rotation: self.rotation,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_without_fix() {
        let detection = Detection {
            ts: 10,
            kind: EventKind::HardBrake,
            value: -7.0,
        };
        let event = DrivingEvent::from_detection(detection, None);
        assert_eq!((event.lat, event.lng), (0.0, 0.0));
        assert!(!event.has_fix());

        let located = DrivingEvent::from_detection(detection, Some(LatLng::new(34.1, -118.8)));
        assert!(located.has_fix());
    }

    #[test]
    fn test_event_wire_format() {
        let event = DrivingEvent {
            ts: 1,
            kind: EventKind::TooFastTurn,
            value: 3.2,
            lat: 1.0,
            lng: 2.0,
        };
        let json = serde_json::to_value(event).unwrap();
        assert_eq!(json["type"], "too_fast_turn");
        assert_eq!(json["lng"], 2.0);
    }
}
