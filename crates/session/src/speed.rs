//! Last-known speed shared between the location and motion feeds

use std::sync::atomic::{AtomicU64, Ordering};

/// Lock-free last-writer-wins speed cell (m/s)
#[derive(Debug, Default)]
pub struct SpeedCell {
    bits: AtomicU64,
}

impl SpeedCell {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a reading; missing or non-finite speeds are stored as 0
    pub fn store(&self, speed: Option<f64>) {
        let v = speed.filter(|s| s.is_finite()).unwrap_or(0.0);
        self.bits.store(v.to_bits(), Ordering::Relaxed);
    }

    pub fn load(&self) -> f64 {
        f64::from_bits(self.bits.load(Ordering::Relaxed))
    }
}
