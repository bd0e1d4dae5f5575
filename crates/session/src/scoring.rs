//! Trip scoring and per-type event aggregation

use std::collections::BTreeMap;

use event_classifier::EventKind;
use geo_track::LatLng;
use serde::{Deserialize, Serialize};

use crate::event::DrivingEvent;

/// Safety score in `[0, 100]`: 100 minus 100 per event-per-minute.
///
/// A zero-length trip scores 100 when clean and 0 otherwise.
pub fn score(total_events: usize, duration_sec: u64) -> f64 {
    if duration_sec == 0 {
        return if total_events == 0 { 100.0 } else { 0.0 };
    }
    let events_per_minute = total_events as f64 / (duration_sec as f64 / 60.0);
    100.0 * (1.0 - events_per_minute).clamp(0.0, 1.0)
}

/// Count and locations for one event type
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EventTally {
    pub count: usize,
    #[serde(alias = "coords")]
    pub coordinates: Vec<LatLng>,
}

/// Events grouped by type
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventCounts(BTreeMap<EventKind, EventTally>);

impl EventCounts {
    /// Group events by type; only located events contribute coordinates
    pub fn from_events<'a, I>(events: I) -> Self
    where
        I: IntoIterator<Item = &'a DrivingEvent>,
    {
        let mut counts = BTreeMap::<EventKind, EventTally>::new();
        for event in events {
            let tally = counts.entry(event.kind).or_default();
            tally.count += 1;
            if event.has_fix() {
                tally.coordinates.push(event.position());
            }
        }
        Self(counts)
    }

    pub fn get(&self, kind: EventKind) -> Option<&EventTally> {
        self.0.get(&kind)
    }

    /// Count for a type, 0 when none occurred
    pub fn count(&self, kind: EventKind) -> usize {
        self.0.get(&kind).map_or(0, |t| t.count)
    }

    pub fn total(&self) -> usize {
        self.0.values().map(|t| t.count).sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&EventKind, &EventTally)> {
        self.0.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
