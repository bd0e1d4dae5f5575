//! Classifier Error Types

use thiserror::Error;

/// Errors raised while validating classifier configuration
#[derive(Debug, Clone, Error)]
pub enum ClassifierError {
    /// Threshold value is NaN or infinite
    #[error("{field} must be finite, got {value}")]
    NonFinite { field: &'static str, value: f64 },

    /// Threshold lies outside its allowed range
    #[error("{field} value {value} is out of range [{min}, {max}]")]
    OutOfRange {
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },
}
