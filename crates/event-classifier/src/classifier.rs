//! Event classification

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::ClassifierConfig;
use crate::filter::YawRateFilter;
use crate::orientation::{wrap_pi, HorizontalAccel, Vec3};
use crate::sample::Sample;
use crate::{LONGITUDINAL_MIN_SPEED_MPS, STATIONARY_SPEED_MPS, TURN_MIN_SPEED_MPS};

/// Driving event types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    HardBrake,
    RapidAccel,
    HardCorner,
    Overspeed,
    TooFastTurn,
}

impl EventKind {
    pub const ALL: [EventKind; 5] = [
        EventKind::HardBrake,
        EventKind::RapidAccel,
        EventKind::HardCorner,
        EventKind::Overspeed,
        EventKind::TooFastTurn,
    ];

    /// Wire name
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::HardBrake => "hard_brake",
            EventKind::RapidAccel => "rapid_accel",
            EventKind::HardCorner => "hard_corner",
            EventKind::Overspeed => "overspeed",
            EventKind::TooFastTurn => "too_fast_turn",
        }
    }

    /// Human readable label for feeds and alerts
    pub fn label(&self) -> &'static str {
        match self {
            EventKind::HardBrake => "Hard Brake",
            EventKind::RapidAccel => "Rapid Accel",
            EventKind::HardCorner => "Hard Turn",
            EventKind::Overspeed => "Overspeed",
            EventKind::TooFastTurn => "Too Fast For Turn",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.as_str() == s)
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One classified event, not yet tied to a position
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub ts: i64,
    pub kind: EventKind,
    /// Magnitude that crossed the threshold (m/s² or m/s for overspeed)
    pub value: f64,
}

/// Filter state carried between samples of one session
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ClassifierState {
    /// Smoothed yaw rate (rad/s)
    pub yaw_ema: f64,
    /// Integrated heading in `(-π, π]`
    pub heading_rad: f64,
    /// Timestamp of the previous sample (ms)
    pub last_sample_ts: i64,
}

impl ClassifierState {
    /// Fresh state whose time baseline is `ts`
    pub fn starting_at(ts: i64) -> Self {
        Self {
            last_sample_ts: ts,
            ..Default::default()
        }
    }
}

/// Classify one sample, advancing `state`.
///
/// Samples with a non-positive time step or at near-stationary speed are not
/// classified and leave the filter untouched; the time baseline always moves
/// to the sample's timestamp.
pub fn classify(sample: &Sample, config: &ClassifierConfig, state: &mut ClassifierState) -> Vec<Detection> {
    // An overflowing difference counts as a non-positive step
    let dt = sample
        .ts
        .checked_sub(state.last_sample_ts)
        .map_or(0.0, |d| d as f64 / 1000.0);
    let speed = sample.effective_speed();
    let mut detections = Vec::new();

    if dt > 0.0 && speed > STATIONARY_SPEED_MPS {
        let yaw = YawRateFilter::new(config.yaw_alpha).update(&mut state.yaw_ema, sample.effective_yaw_rate());
        state.heading_rad = wrap_pi(state.heading_rad + yaw * dt);

        let accel = HorizontalAccel::resolve(
            Vec3::new(sample.ax, sample.ay, sample.az),
            &sample.rotation,
            state.heading_rad,
        );

        let mut emit = |kind: EventKind, value: f64| {
            debug!("{} at ts={} value={:.2} speed={:.1}", kind, sample.ts, value, speed);
            detections.push(Detection {
                ts: sample.ts,
                kind,
                value,
            });
        };

        if speed >= LONGITUDINAL_MIN_SPEED_MPS {
            if accel.longitudinal < config.hard_brake_mps2 {
                emit(EventKind::HardBrake, accel.longitudinal);
            }
            if accel.longitudinal > config.rapid_accel_mps2 {
                emit(EventKind::RapidAccel, accel.longitudinal);
            }
        }

        // No speed gate here, unlike brake/accel
        let lateral = accel.lateral.abs();
        if lateral > config.lateral_mps2 {
            emit(EventKind::HardCorner, lateral);
        }

        if speed >= TURN_MIN_SPEED_MPS {
            let centripetal = speed * yaw.abs();
            if centripetal > config.lateral_mps2 {
                emit(EventKind::TooFastTurn, centripetal);
            }
        }

        if let Some(threshold) = config.overspeed_threshold() {
            if speed > threshold {
                emit(EventKind::Overspeed, speed);
            }
        }
    }

    state.last_sample_ts = sample.ts;
    detections
}

/// Classifier owning its thresholds and per-session state
#[derive(Debug, Clone)]
pub struct EventClassifier {
    config: ClassifierConfig,
    state: ClassifierState,
}

impl EventClassifier {
    pub fn new(config: ClassifierConfig) -> Self {
        Self {
            config,
            state: ClassifierState::default(),
        }
    }

    /// Classify the next sample in timestamp order
    pub fn ingest(&mut self, sample: &Sample) -> Vec<Detection> {
        classify(sample, &self.config, &mut self.state)
    }

    /// Drop filter state and restart the time baseline at `ts`
    pub fn reset(&mut self, ts: i64) {
        self.state = ClassifierState::starting_at(ts);
    }

    pub fn state(&self) -> &ClassifierState {
        &self.state
    }

    pub fn config(&self) -> &ClassifierConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sample::Rotation;
    use proptest::prelude::*;

    fn kinds(detections: &[Detection]) -> Vec<EventKind> {
        detections.iter().map(|d| d.kind).collect()
    }

    #[test]
    fn test_hard_brake_single_event() {
        let config = ClassifierConfig::default();
        let mut state = ClassifierState::starting_at(0);

        let detections = classify(&Sample::level(1000, -7.0, 0.0, 9.81, 10.0), &config, &mut state);

        assert_eq!(detections.len(), 1);
        assert_eq!(detections[0].kind, EventKind::HardBrake);
        assert_eq!(detections[0].ts, 1000);
        assert!((detections[0].value + 7.0).abs() < 1e-9);
    }

    #[test]
    fn test_extreme_timestamp_jump_is_skipped() {
        let config = ClassifierConfig::default();
        let mut state = ClassifierState::starting_at(1_700_000_000_000);
        let before = state;

        let detections = classify(&Sample::level(i64::MIN, -9.0, 0.0, 9.81, 20.0), &config, &mut state);

        assert!(detections.is_empty());
        assert_eq!(state.yaw_ema, before.yaw_ema);
        assert_eq!(state.heading_rad, before.heading_rad);
        assert_eq!(state.last_sample_ts, i64::MIN);

        // Forward overflow from the new baseline is skipped the same way
        let detections = classify(&Sample::level(i64::MAX, -9.0, 0.0, 9.81, 20.0), &config, &mut state);
        assert!(detections.is_empty());
        assert_eq!(state.last_sample_ts, i64::MAX);
    }

    #[test]
    fn test_rapid_accel() {
        let config = ClassifierConfig::default();
        let mut state = ClassifierState::starting_at(0);
        let detections = classify(&Sample::level(100, 4.0, 0.0, 9.81, 8.0), &config, &mut state);
        assert_eq!(kinds(&detections), vec![EventKind::RapidAccel]);
    }

    #[test]
    fn test_constant_speed_stream_is_quiet() {
        let config = ClassifierConfig::default();
        let mut state = ClassifierState::starting_at(0);

        for i in 1..=600 {
            let detections = classify(&Sample::level(i * 100, 0.0, 0.0, 9.81, 10.0), &config, &mut state);
            assert!(detections.is_empty(), "unexpected events at sample {}", i);
        }
    }

    #[test]
    fn test_longitudinal_events_need_four_mps() {
        let config = ClassifierConfig::default();
        let mut state = ClassifierState::starting_at(0);
        let detections = classify(&Sample::level(100, -9.0, 0.0, 9.81, 3.0), &config, &mut state);
        assert!(detections.is_empty());
    }

    #[test]
    fn test_hard_corner_has_no_speed_gate() {
        let config = ClassifierConfig::default();
        let mut state = ClassifierState::starting_at(0);
        // Above stationary cut-off but below the 4 m/s brake gate
        let detections = classify(&Sample::level(100, 0.0, 3.5, 9.81, 3.0), &config, &mut state);
        assert_eq!(kinds(&detections), vec![EventKind::HardCorner]);
        assert!((detections[0].value - 3.5).abs() < 1e-9);
    }

    #[test]
    fn test_stationary_samples_skipped() {
        let config = ClassifierConfig::default();
        let mut state = ClassifierState::starting_at(0);
        let mut sample = Sample::level(100, -9.0, 5.0, 9.81, 2.0);
        sample.rotation_rate_z = 1.0;

        assert!(classify(&sample, &config, &mut state).is_empty());
        assert_eq!(state.yaw_ema, 0.0);
        assert_eq!(state.last_sample_ts, 100);
    }

    #[test]
    fn test_non_finite_speed_treated_as_stationary() {
        let config = ClassifierConfig::default();
        let mut state = ClassifierState::starting_at(0);
        let sample = Sample::level(100, -9.0, 0.0, 9.81, f64::NAN);
        assert!(classify(&sample, &config, &mut state).is_empty());
        assert_eq!(state.last_sample_ts, 100);
    }

    #[test]
    fn test_backwards_time_skipped_but_baseline_advances() {
        let config = ClassifierConfig::default();
        let mut state = ClassifierState {
            yaw_ema: 0.2,
            heading_rad: 1.0,
            last_sample_ts: 5000,
        };

        let mut sample = Sample::level(4000, -9.0, 6.0, 9.81, 20.0);
        sample.rotation_rate_z = 2.0;

        assert!(classify(&sample, &config, &mut state).is_empty());
        assert_eq!(state.yaw_ema, 0.2);
        assert_eq!(state.heading_rad, 1.0);
        assert_eq!(state.last_sample_ts, 4000);

        // Next sample is measured against the new baseline
        sample.ts = 4100;
        assert!(!classify(&sample, &config, &mut state).is_empty());
    }

    #[test]
    fn test_too_fast_turn_from_yaw_rate() {
        let config = ClassifierConfig::default();
        let mut state = ClassifierState::starting_at(0);

        let mut sample = Sample::level(0, 0.0, 0.0, 9.81, 15.0);
        sample.rotation_rate_z = 1.0;

        let mut fired = None;
        for i in 1..=20 {
            sample.ts = i * 100;
            let detections = classify(&sample, &config, &mut state);
            if detections.iter().any(|d| d.kind == EventKind::TooFastTurn) {
                fired = Some(i);
                break;
            }
        }

        // 15 * yaw_ema > 3.0 once yaw_ema > 0.2: first sample already at 0.25
        assert_eq!(fired, Some(1));
    }

    #[test]
    fn test_too_fast_turn_needs_six_mps() {
        let config = ClassifierConfig::default();
        let mut state = ClassifierState {
            yaw_ema: 2.0,
            ..ClassifierState::starting_at(0)
        };
        let mut sample = Sample::level(100, 0.0, 0.0, 9.81, 5.5);
        sample.rotation_rate_z = 2.0;
        let detections = classify(&sample, &config, &mut state);
        assert!(!detections.iter().any(|d| d.kind == EventKind::TooFastTurn));
    }

    #[test]
    fn test_overspeed() {
        let config = ClassifierConfig::default().with_speed_limit(27.0, 0.1);
        let mut state = ClassifierState::starting_at(0);

        assert!(classify(&Sample::level(100, 0.0, 0.0, 9.81, 27.05), &config, &mut state).is_empty());

        let detections = classify(&Sample::level(200, 0.0, 0.0, 9.81, 28.0), &config, &mut state);
        assert_eq!(kinds(&detections), vec![EventKind::Overspeed]);
        assert_eq!(detections[0].value, 28.0);
    }

    #[test]
    fn test_overspeed_disabled_without_limit() {
        let config = ClassifierConfig::default();
        let mut state = ClassifierState::starting_at(0);
        assert!(classify(&Sample::level(100, 0.0, 0.0, 9.81, 60.0), &config, &mut state).is_empty());
    }

    #[test]
    fn test_multiple_kinds_same_sample() {
        let config = ClassifierConfig::default().with_speed_limit(10.0, 0.0);
        let mut state = ClassifierState::starting_at(0);
        let detections = classify(&Sample::level(100, -8.0, 4.0, 9.81, 12.0), &config, &mut state);
        assert_eq!(
            kinds(&detections),
            vec![EventKind::HardBrake, EventKind::HardCorner, EventKind::Overspeed]
        );
        assert!(detections.iter().all(|d| d.ts == 100));
    }

    #[test]
    fn test_tilted_device_reads_level_acceleration() {
        let config = ClassifierConfig::default();
        let mut state = ClassifierState::starting_at(0);

        // Device yawed a quarter turn, so its +y axis points backwards
        let mut sample = Sample::level(100, 0.0, 7.0, 0.0, 10.0);
        sample.rotation = Rotation {
            alpha: std::f64::consts::FRAC_PI_2,
            beta: 0.0,
            gamma: 0.0,
        };
        let detections = classify(&sample, &config, &mut state);
        assert_eq!(kinds(&detections), vec![EventKind::HardBrake]);
    }

    #[test]
    fn test_heading_integrates_and_wraps() {
        let config = ClassifierConfig {
            yaw_alpha: 1.0,
            ..Default::default()
        };
        let mut state = ClassifierState::starting_at(0);
        let mut sample = Sample::level(0, 0.0, 0.0, 9.81, 3.0);
        sample.rotation_rate_z = 1.0;

        for i in 1..=40 {
            sample.ts = i * 100;
            classify(&sample, &config, &mut state);
            assert!(state.heading_rad > -std::f64::consts::PI && state.heading_rad <= std::f64::consts::PI);
        }
        // 4 rad of rotation wraps to 4 - 2π
        assert!((state.heading_rad - (4.0 - 2.0 * std::f64::consts::PI)).abs() < 1e-9);
    }

    #[test]
    fn test_event_classifier_reset() {
        let mut classifier = EventClassifier::new(ClassifierConfig::default());
        let mut sample = Sample::level(100, 0.0, 0.0, 9.81, 10.0);
        sample.rotation_rate_z = 0.5;
        classifier.ingest(&sample);
        assert!(classifier.state().yaw_ema > 0.0);

        classifier.reset(5000);
        assert_eq!(*classifier.state(), ClassifierState::starting_at(5000));
    }

    #[test]
    fn test_event_kind_names() {
        for kind in EventKind::ALL {
            assert_eq!(EventKind::parse(kind.as_str()), Some(kind));
        }
        assert_eq!(EventKind::HardCorner.label(), "Hard Turn");
        assert_eq!(EventKind::parse("other"), None);
    }

    proptest! {
        #[test]
        fn prop_non_positive_dt_changes_nothing(
            yaw in -3.0f64..3.0,
            heading in -3.0f64..3.0,
            last in 1_000i64..1_000_000,
            back in 0i64..1_000,
            ax in -20.0f64..20.0,
            ay in -20.0f64..20.0,
            speed in 0.0f64..60.0,
            rate in -5.0f64..5.0,
        ) {
            let config = ClassifierConfig::default().with_speed_limit(10.0, 0.0);
            let mut state = ClassifierState { yaw_ema: yaw, heading_rad: heading, last_sample_ts: last };
            let mut sample = Sample::level(last - back, ax, ay, 9.81, speed);
            sample.rotation_rate_z = rate;

            let detections = classify(&sample, &config, &mut state);

            prop_assert!(detections.is_empty());
            prop_assert_eq!(state.yaw_ema, yaw);
            prop_assert_eq!(state.heading_rad, heading);
            prop_assert_eq!(state.last_sample_ts, last - back);
        }
    }
}
