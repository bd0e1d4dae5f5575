//! Session lifecycle state machine

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use event_classifier::{ClassifierConfig, EventClassifier, Sample};
use geo_track::{BoundingBox, TrackPoint};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::clock::ElapsedClock;
use crate::distance::DistanceAccumulator;
use crate::event::{DrivingEvent, LocationFix, MotionReading};
use crate::scoring::{score, EventCounts};
use crate::speed::SpeedCell;
use crate::summary::{SessionSummary, Visibility};
use crate::SessionError;

/// Recording lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Idle,
    Recording,
    Paused,
    Stopped,
}

impl SessionStatus {
    /// Recording or paused
    pub fn is_active(&self) -> bool {
        matches!(self, SessionStatus::Recording | SessionStatus::Paused)
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SessionStatus::Idle => "idle",
            SessionStatus::Recording => "recording",
            SessionStatus::Paused => "paused",
            SessionStatus::Stopped => "stopped",
        };
        f.write_str(s)
    }
}

/// Per-session settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub classifier: ClassifierConfig,
    pub visibility: Visibility,
    /// Owner recorded on the summary
    pub owner_id: Option<String>,
}

/// Buffers of the trip being recorded
#[derive(Debug)]
struct ActiveSession {
    id: Uuid,
    started_at_ms: i64,
    samples: Vec<Sample>,
    events: Vec<DrivingEvent>,
    track: Vec<TrackPoint>,
    clock: ElapsedClock,
    distance: DistanceAccumulator,
}

/// Everything a finished trip produced
#[derive(Debug, Clone)]
pub struct CompletedSession {
    pub id: Uuid,
    pub samples: Vec<Sample>,
    pub events: Vec<DrivingEvent>,
    pub track: Vec<TrackPoint>,
    pub summary: SessionSummary,
}

/// Point-in-time view of the current session
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LiveStatus {
    pub session_id: Option<Uuid>,
    pub status: SessionStatus,
    pub elapsed_sec: u64,
    pub distance_mi: f64,
    pub event_count: usize,
    pub speed_mps: f64,
}

/// Owns classifier state and buffers for one device's trips.
///
/// Input is accepted only while `Recording`; once `pause`, `stop`, or
/// `discard` returns, no further sample reaches the classifier.
pub struct SessionAggregator {
    config: SessionConfig,
    status: SessionStatus,
    classifier: EventClassifier,
    speed: Arc<SpeedCell>,
    active: Option<ActiveSession>,
}

impl SessionAggregator {
    pub fn new(config: SessionConfig) -> Self {
        Self {
            classifier: EventClassifier::new(config.classifier.clone()),
            config,
            status: SessionStatus::Idle,
            speed: Arc::new(SpeedCell::new()),
            active: None,
        }
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn session_id(&self) -> Option<Uuid> {
        self.active.as_ref().map(|s| s.id)
    }

    /// Speed cell written by the location feed
    pub fn speed_cell(&self) -> Arc<SpeedCell> {
        self.speed.clone()
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Begin a new trip
    pub fn start(&mut self, now_ms: i64) -> Result<Uuid, SessionError> {
        if self.status.is_active() {
            return Err(SessionError::AlreadyActive(self.status));
        }

        let id = Uuid::new_v4();
        self.classifier.reset(now_ms);
        self.speed.store(None);
        self.active = Some(ActiveSession {
            id,
            started_at_ms: now_ms,
            samples: Vec::new(),
            events: Vec::new(),
            track: Vec::new(),
            clock: ElapsedClock::started(now_ms),
            distance: DistanceAccumulator::new(),
        });
        self.status = SessionStatus::Recording;

        info!("Session {} started", id);
        Ok(id)
    }

    pub fn pause(&mut self, now_ms: i64) -> Result<(), SessionError> {
        let session = self.require(SessionStatus::Recording, "pause")?;
        session.clock.pause(now_ms);
        let id = session.id;
        self.status = SessionStatus::Paused;
        info!("Session {} paused", id);
        Ok(())
    }

    pub fn resume(&mut self, now_ms: i64) -> Result<(), SessionError> {
        let session = self.require(SessionStatus::Paused, "resume")?;
        session.clock.resume(now_ms);
        let id = session.id;
        self.status = SessionStatus::Recording;
        info!("Session {} resumed", id);
        Ok(())
    }

    /// Classify a sample and buffer it with any events it produced
    pub fn ingest(&mut self, sample: &Sample) -> Result<Vec<DrivingEvent>, SessionError> {
        if self.status != SessionStatus::Recording {
            debug!("Sample at ts={} rejected: session {}", sample.ts, self.status);
            return Err(SessionError::NotRecording(self.status));
        }
        if !sample.is_finite() {
            warn!("Dropping non-finite sample at ts={}", sample.ts);
            return Err(SessionError::InvalidSample(format!("non-finite values at ts={}", sample.ts)));
        }
        let session = self
            .active
            .as_mut()
            .ok_or(SessionError::NotRecording(self.status))?;

        let fix = session.distance.last_fix();
        let events: Vec<DrivingEvent> = self
            .classifier
            .ingest(sample)
            .into_iter()
            .map(|d| DrivingEvent::from_detection(d, fix))
            .collect();

        session.samples.push(*sample);
        session.events.extend_from_slice(&events);
        Ok(events)
    }

    /// Ingest a motion reading using the last known speed
    pub fn ingest_motion(&mut self, reading: MotionReading) -> Result<Vec<DrivingEvent>, SessionError> {
        let sample = reading.with_speed(self.speed.load());
        self.ingest(&sample)
    }

    /// Record a GPS fix: speed cell, track, and distance
    pub fn record_fix(&mut self, fix: LocationFix) -> Result<(), SessionError> {
        if self.status != SessionStatus::Recording {
            return Err(SessionError::NotRecording(self.status));
        }
        if !fix.position().is_finite() {
            warn!("Dropping non-finite fix at ts={}", fix.ts);
            return Err(SessionError::InvalidFix(format!("({}, {})", fix.lat, fix.lng)));
        }
        let session = self
            .active
            .as_mut()
            .ok_or(SessionError::NotRecording(self.status))?;

        self.speed.store(fix.speed);
        session.track.push(fix.track_point());
        session.distance.push(fix.position());
        Ok(())
    }

    /// Finish the trip and compute its summary
    pub fn stop(&mut self, now_ms: i64) -> Result<CompletedSession, SessionError> {
        if !self.status.is_active() {
            return Err(SessionError::InvalidTransition {
                from: self.status,
                action: "stop",
            });
        }
        let mut session = self.active.take().ok_or(SessionError::InvalidTransition {
            from: self.status,
            action: "stop",
        })?;
        self.status = SessionStatus::Stopped;

        session.clock.pause(now_ms);
        let duration_sec = session.clock.elapsed_sec(now_ms);
        let polyline = session.track.iter().map(|p| p.position()).collect::<Vec<_>>();

        let summary = SessionSummary {
            session_id: session.id,
            owner_id: self.config.owner_id.clone(),
            started_at: DateTime::<Utc>::from_timestamp_millis(session.started_at_ms).unwrap_or_default(),
            duration_sec,
            distance_mi: session.distance.miles(),
            score: score(session.events.len(), duration_sec),
            event_counts: EventCounts::from_events(&session.events),
            bbox: BoundingBox::enclosing(polyline.iter().copied()),
            polyline,
            visibility: self.config.visibility,
        };

        info!(
            "Session {} stopped: {}s, {:.2} mi, {} events, score {:.0}",
            session.id,
            duration_sec,
            summary.distance_mi,
            session.events.len(),
            summary.score
        );

        Ok(CompletedSession {
            id: session.id,
            samples: session.samples,
            events: session.events,
            track: session.track,
            summary,
        })
    }

    /// Abandon the current trip without producing a summary
    pub fn discard(&mut self) -> Result<Uuid, SessionError> {
        if !self.status.is_active() {
            return Err(SessionError::InvalidTransition {
                from: self.status,
                action: "discard",
            });
        }
        let session = self.active.take().ok_or(SessionError::InvalidTransition {
            from: self.status,
            action: "discard",
        })?;
        self.status = SessionStatus::Idle;
        warn!("Session {} discarded with {} samples", session.id, session.samples.len());
        Ok(session.id)
    }

    pub fn live_status(&self, now_ms: i64) -> LiveStatus {
        let active = self.active.as_ref();
        LiveStatus {
            session_id: active.map(|s| s.id),
            status: self.status,
            elapsed_sec: active.map_or(0, |s| s.clock.elapsed_sec(now_ms)),
            distance_mi: active.map_or(0.0, |s| s.distance.miles()),
            event_count: active.map_or(0, |s| s.events.len()),
            speed_mps: self.speed.load(),
        }
    }

    fn require(&mut self, expected: SessionStatus, action: &'static str) -> Result<&mut ActiveSession, SessionError> {
        let from = self.status;
        if from != expected {
            return Err(SessionError::InvalidTransition { from, action });
        }
        self.active
            .as_mut()
            .ok_or(SessionError::InvalidTransition { from, action })
    }
}

impl Default for SessionAggregator {
    fn default() -> Self {
        Self::new(SessionConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use event_classifier::EventKind;

    fn fix(ts: i64, lat: f64, lng: f64, speed: f64) -> LocationFix {
        LocationFix {
            ts,
            lat,
            lng,
            speed: Some(speed),
        }
    }

    fn braking(ts: i64) -> Sample {
        Sample::level(ts, -7.0, 0.0, 9.81, 10.0)
    }

    #[test]
    fn test_lifecycle_transitions() {
        let mut agg = SessionAggregator::default();
        assert_eq!(agg.status(), SessionStatus::Idle);

        agg.start(0).unwrap();
        assert_eq!(agg.status(), SessionStatus::Recording);
        assert!(matches!(agg.start(10), Err(SessionError::AlreadyActive(SessionStatus::Recording))));

        agg.pause(1_000).unwrap();
        assert_eq!(agg.status(), SessionStatus::Paused);
        assert!(agg.pause(1_100).is_err());

        agg.resume(2_000).unwrap();
        assert_eq!(agg.status(), SessionStatus::Recording);
        assert!(agg.resume(2_100).is_err());

        agg.stop(3_000).unwrap();
        assert_eq!(agg.status(), SessionStatus::Stopped);
        assert!(agg.stop(3_100).is_err());

        // A new trip may start after the last one stopped
        agg.start(4_000).unwrap();
    }

    #[test]
    fn test_input_rejected_unless_recording() {
        let mut agg = SessionAggregator::default();
        assert_eq!(
            agg.ingest(&braking(100)),
            Err(SessionError::NotRecording(SessionStatus::Idle))
        );

        agg.start(0).unwrap();
        agg.pause(50).unwrap();
        assert_eq!(
            agg.ingest(&braking(100)),
            Err(SessionError::NotRecording(SessionStatus::Paused))
        );
        assert!(agg.record_fix(fix(100, 34.0, -118.0, 10.0)).is_err());

        agg.stop(200).unwrap();
        assert!(agg.ingest(&braking(300)).is_err());
    }

    #[test]
    fn test_events_carry_last_fix() {
        let mut agg = SessionAggregator::default();
        agg.start(0).unwrap();

        let events = agg.ingest(&braking(100)).unwrap();
        assert_eq!(events.len(), 1);
        assert!(!events[0].has_fix());

        agg.record_fix(fix(150, 34.1596, -118.8172, 10.0)).unwrap();
        let events = agg.ingest(&braking(200)).unwrap();
        assert_eq!(events[0].kind, EventKind::HardBrake);
        assert_eq!((events[0].lat, events[0].lng), (34.1596, -118.8172));
    }

    #[test]
    fn test_motion_uses_last_known_speed() {
        let mut agg = SessionAggregator::default();
        agg.start(0).unwrap();

        let reading = MotionReading {
            ts: 100,
            ax: -7.0,
            ay: 0.0,
            az: 9.81,
            rotation_rate_z: 0.0,
            rotation: Default::default(),
        };
        // No fix yet: speed 0, nothing classified
        assert!(agg.ingest_motion(reading).unwrap().is_empty());

        agg.record_fix(fix(150, 34.0, -118.0, 12.0)).unwrap();
        let events = agg.ingest_motion(MotionReading { ts: 200, ..reading }).unwrap();
        assert_eq!(events.len(), 1);
    }

    #[test]
    fn test_classifier_state_survives_pause() {
        let mut agg = SessionAggregator::default();
        agg.start(0).unwrap();

        let mut turning = Sample::level(100, 0.0, 0.0, 9.81, 15.0);
        turning.rotation_rate_z = 0.1;
        agg.ingest(&turning).unwrap();
        let before = *agg.classifier.state();

        agg.pause(200).unwrap();
        agg.resume(5_000).unwrap();
        assert_eq!(*agg.classifier.state(), before);
    }

    #[test]
    fn test_start_resets_classifier_state() {
        let mut agg = SessionAggregator::default();
        agg.start(0).unwrap();
        let mut turning = Sample::level(100, 0.0, 0.0, 9.81, 15.0);
        turning.rotation_rate_z = 0.5;
        agg.ingest(&turning).unwrap();
        agg.stop(1_000).unwrap();

        agg.start(2_000).unwrap();
        assert_eq!(agg.classifier.state().yaw_ema, 0.0);
        assert_eq!(agg.classifier.state().last_sample_ts, 2_000);
        assert_eq!(agg.live_status(2_000).event_count, 0);
    }

    #[test]
    fn test_summary_contents() {
        let mut agg = SessionAggregator::new(SessionConfig {
            owner_id: Some("driver-7".to_string()),
            visibility: Visibility::Friends,
            ..Default::default()
        });
        agg.start(1_700_000_000_000).unwrap();
        let t0 = 1_700_000_000_000;

        agg.record_fix(fix(t0 + 1_000, 34.00, -118.00, 10.0)).unwrap();
        agg.ingest(&braking(t0 + 1_100)).unwrap();
        agg.record_fix(fix(t0 + 2_000, 34.01, -118.02, 10.0)).unwrap();
        agg.record_fix(fix(t0 + 3_000, 34.02, -118.01, 10.0)).unwrap();

        agg.pause(t0 + 60_000).unwrap();
        agg.resume(t0 + 600_000).unwrap();
        let done = agg.stop(t0 + 660_000).unwrap();
        let summary = &done.summary;

        // Paused time excluded
        assert_eq!(summary.duration_sec, 120);
        assert!((summary.score - 50.0).abs() < 1e-9);
        assert_eq!(summary.owner_id.as_deref(), Some("driver-7"));
        assert_eq!(summary.visibility, Visibility::Friends);
        assert_eq!(summary.event_counts.count(EventKind::HardBrake), 1);
        assert_eq!(summary.polyline.len(), 3);
        assert!(summary.distance_mi > 1.0);
        assert_eq!(summary.started_at.timestamp_millis(), t0);

        let bbox = summary.bbox.unwrap();
        assert_eq!(bbox.min_lat, 34.00);
        assert_eq!(bbox.max_lat, 34.02);
        assert_eq!(bbox.min_lng, -118.02);
        assert_eq!(bbox.max_lng, -118.00);

        assert_eq!(done.samples.len(), 1);
        assert_eq!(done.track.len(), 3);
    }

    #[test]
    fn test_empty_track_has_no_bbox() {
        let mut agg = SessionAggregator::default();
        agg.start(0).unwrap();
        let done = agg.stop(0).unwrap();
        assert!(done.summary.bbox.is_none());
        assert_eq!(done.summary.duration_sec, 0);
        assert_eq!(done.summary.score, 100.0);
    }

    #[test]
    fn test_stop_from_paused() {
        let mut agg = SessionAggregator::default();
        agg.start(0).unwrap();
        agg.pause(30_000).unwrap();
        let done = agg.stop(90_000).unwrap();
        assert_eq!(done.summary.duration_sec, 30);
    }

    #[test]
    fn test_discard() {
        let mut agg = SessionAggregator::default();
        assert!(agg.discard().is_err());

        let id = agg.start(0).unwrap();
        assert_eq!(agg.discard().unwrap(), id);
        assert_eq!(agg.status(), SessionStatus::Idle);
        assert!(agg.session_id().is_none());
    }

    #[test]
    fn test_non_finite_fix_rejected() {
        let mut agg = SessionAggregator::default();
        agg.start(0).unwrap();
        assert!(matches!(
            agg.record_fix(fix(10, f64::NAN, 0.0, 5.0)),
            Err(SessionError::InvalidFix(_))
        ));
        assert_eq!(agg.live_status(10).distance_mi, 0.0);
    }

    #[test]
    fn test_non_finite_sample_rejected() {
        let mut agg = SessionAggregator::default();
        agg.start(0).unwrap();
        agg.ingest(&Sample::level(100, 0.0, 0.0, 9.81, 10.0)).unwrap();

        let mut tilted = braking(200);
        tilted.rotation.alpha = f64::NAN;
        assert!(matches!(agg.ingest(&tilted), Err(SessionError::InvalidSample(_))));
        assert_eq!(agg.classifier.state().last_sample_ts, 100);

        let completed = agg.stop(1_000).unwrap();
        assert_eq!(completed.samples.len(), 1);
        assert!(completed.samples.iter().all(Sample::is_finite));
        assert!(completed.events.is_empty());
    }

    #[test]
    fn test_live_status() {
        let mut agg = SessionAggregator::default();
        let idle = agg.live_status(0);
        assert_eq!(idle.status, SessionStatus::Idle);
        assert!(idle.session_id.is_none());

        agg.start(0).unwrap();
        agg.record_fix(fix(500, 34.0, -118.0, 13.5)).unwrap();
        let live = agg.live_status(5_500);
        assert_eq!(live.elapsed_sec, 5);
        assert_eq!(live.speed_mps, 13.5);
    }
}
