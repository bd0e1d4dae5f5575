//! Motion sample input

use serde::{Deserialize, Serialize};

/// Device orientation as Euler angles (radians)
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Rotation {
    /// Rotation about Z (yaw)
    pub alpha: f64,
    /// Rotation about X (pitch)
    pub beta: f64,
    /// Rotation about Y (roll)
    pub gamma: f64,
}

/// One inertial sample as delivered by the motion sensor feed
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Sample {
    /// Milliseconds since epoch
    pub ts: i64,
    /// Device-frame acceleration (m/s²)
    pub ax: f64,
    pub ay: f64,
    pub az: f64,
    /// Ground speed in m/s, 0 when unknown
    #[serde(default)]
    pub speed: f64,
    /// Angular rate about the vertical axis (rad/s)
    #[serde(default)]
    pub rotation_rate_z: f64,
    #[serde(default)]
    pub rotation: Rotation,
}

impl Sample {
    /// Sample with level orientation and no rotation
    pub fn level(ts: i64, ax: f64, ay: f64, az: f64, speed: f64) -> Self {
        Self {
            ts,
            ax,
            ay,
            az,
            speed,
            rotation_rate_z: 0.0,
            rotation: Rotation::default(),
        }
    }

    /// Acceleration and orientation are all finite. Speed and yaw rate are
    /// excluded since they fall back to 0.
    pub fn is_finite(&self) -> bool {
        let r = self.rotation;
        [self.ax, self.ay, self.az, r.alpha, r.beta, r.gamma]
            .iter()
            .all(|v| v.is_finite())
    }

    /// Speed with non-finite readings mapped to 0
    pub fn effective_speed(&self) -> f64 {
        finite_or_zero(self.speed)
    }

    /// Yaw rate with non-finite readings mapped to 0
    pub fn effective_yaw_rate(&self) -> f64 {
        finite_or_zero(self.rotation_rate_z)
    }
}

fn finite_or_zero(v: f64) -> f64 {
    if v.is_finite() {
        v
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_finite_ignores_speed() {
        let mut s = Sample::level(0, 0.1, 0.2, 9.81, f64::NAN);
        s.rotation_rate_z = f64::INFINITY;
        assert!(s.is_finite());
        s.rotation.alpha = f64::NAN;
        assert!(!s.is_finite());
        s.rotation.alpha = 0.0;
        s.az = f64::NEG_INFINITY;
        assert!(!s.is_finite());
    }

    #[test]
    fn test_non_finite_speed_is_zero() {
        let mut s = Sample::level(0, 0.0, 0.0, 0.0, f64::NAN);
        assert_eq!(s.effective_speed(), 0.0);
        s.speed = f64::INFINITY;
        assert_eq!(s.effective_speed(), 0.0);
        s.speed = 12.5;
        assert_eq!(s.effective_speed(), 12.5);
    }

    #[test]
    fn test_missing_optional_fields_deserialize() {
        let s: Sample = serde_json::from_str(r#"{"ts": 1000, "ax": 0.1, "ay": -0.2, "az": 9.8}"#).unwrap();
        assert_eq!(s.ts, 1000);
        assert_eq!(s.speed, 0.0);
        assert_eq!(s.rotation_rate_z, 0.0);
        assert_eq!(s.rotation, Rotation::default());
    }

    #[test]
    fn test_wire_field_names() {
        let s: Sample = serde_json::from_str(
            r#"{"ts": 5, "ax": 0, "ay": 0, "az": 0, "speed": 3.0, "rotationRateZ": 0.4,
                "rotation": {"alpha": 0.1, "beta": 0.2, "gamma": 0.3}}"#,
        )
        .unwrap();
        assert_eq!(s.rotation_rate_z, 0.4);
        assert_eq!(s.rotation.gamma, 0.3);
    }
}
