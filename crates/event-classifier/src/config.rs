//! Classifier thresholds

use serde::{Deserialize, Serialize};

use crate::error::ClassifierError;

/// Event classification thresholds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    /// Longitudinal acceleration below this is a hard brake (m/s², negative)
    #[serde(alias = "hardBrakeMps2")]
    pub hard_brake_mps2: f64,

    /// Longitudinal acceleration above this is a rapid acceleration (m/s²)
    #[serde(alias = "rapidAccelMps2")]
    pub rapid_accel_mps2: f64,

    /// Lateral acceleration magnitude above this is a hard corner (m/s²)
    #[serde(alias = "lateralMps2")]
    pub lateral_mps2: f64,

    /// Yaw-rate EMA smoothing factor
    #[serde(alias = "yawAlpha")]
    pub yaw_alpha: f64,

    /// Posted speed limit (m/s); overspeed detection is off when unset
    #[serde(alias = "speedLimitMps")]
    pub speed_limit_mps: Option<f64>,

    /// Allowance above the limit before overspeed fires (m/s)
    #[serde(alias = "overspeedTolerance")]
    pub overspeed_tolerance: f64,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            hard_brake_mps2: -6.0,
            rapid_accel_mps2: 3.5,
            lateral_mps2: 3.0,
            yaw_alpha: 0.25,
            speed_limit_mps: None,
            overspeed_tolerance: 0.0,
        }
    }
}

impl ClassifierConfig {
    /// Create strict config (lower thresholds)
    pub fn strict() -> Self {
        Self {
            hard_brake_mps2: -4.5,
            rapid_accel_mps2: 2.5,
            lateral_mps2: 2.5,
            ..Default::default()
        }
    }

    /// Create lenient config (higher thresholds)
    pub fn lenient() -> Self {
        Self {
            hard_brake_mps2: -7.5,
            rapid_accel_mps2: 4.5,
            lateral_mps2: 4.0,
            ..Default::default()
        }
    }

    /// Enable overspeed detection for a limit and tolerance
    pub fn with_speed_limit(mut self, limit_mps: f64, tolerance: f64) -> Self {
        self.speed_limit_mps = Some(limit_mps);
        self.overspeed_tolerance = tolerance;
        self
    }

    /// Overspeed trigger point, if a limit is configured
    pub fn overspeed_threshold(&self) -> Option<f64> {
        self.speed_limit_mps.map(|limit| limit + self.overspeed_tolerance)
    }

    /// Check that thresholds are finite and sit on the right side of zero
    pub fn validate(&self) -> Result<(), ClassifierError> {
        check_range("hard_brake_mps2", self.hard_brake_mps2, (f64::MIN, 0.0))?;
        check_range("rapid_accel_mps2", self.rapid_accel_mps2, (0.0, f64::MAX))?;
        check_range("lateral_mps2", self.lateral_mps2, (0.0, f64::MAX))?;
        check_range("yaw_alpha", self.yaw_alpha, (0.0, 1.0))?;
        check_range("overspeed_tolerance", self.overspeed_tolerance, (0.0, f64::MAX))?;
        if let Some(limit) = self.speed_limit_mps {
            check_range("speed_limit_mps", limit, (0.0, f64::MAX))?;
        }
        Ok(())
    }
}

fn check_range(field: &'static str, value: f64, range: (f64, f64)) -> Result<(), ClassifierError> {
    if !value.is_finite() {
        return Err(ClassifierError::NonFinite { field, value });
    }
    if value < range.0 || value > range.1 {
        return Err(ClassifierError::OutOfRange {
            field,
            value,
            min: range.0,
            max: range.1,
        });
    }
    Ok(())
}
