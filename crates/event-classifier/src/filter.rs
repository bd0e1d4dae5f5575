//! Yaw-rate smoothing using an exponential moving average

/// EMA low-pass filter for the vertical-axis angular rate
#[derive(Debug, Clone, Copy)]
pub struct YawRateFilter {
    /// Smoothing factor (0-1, higher = more weight on recent)
    alpha: f64,
}

impl YawRateFilter {
    /// Create a filter, clamping `alpha` into `[0, 1]`
    pub fn new(alpha: f64) -> Self {
        Self {
            alpha: alpha.clamp(0.0, 1.0),
        }
    }

    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    /// Fold `raw` into `ema` and return the new average
    pub fn update(&self, ema: &mut f64, raw: f64) -> f64 {
        *ema += self.alpha * (raw - *ema);
        *ema
    }
}
