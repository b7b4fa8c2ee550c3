//! Analysis error types.

use thiserror::Error;

/// Result type alias for analysis operations.
pub type AnalysisResult<T> = Result<T, AnalysisError>;

/// Errors that abort planning for a single plan family.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AnalysisError {
    #[error("insufficient usage history: {available_days:.1} days available, {required_days} required")]
    InsufficientData {
        available_days: f64,
        required_days: u32,
    },

    #[error("invalid usage sample: {0}")]
    InvalidSample(String),

    #[error("discount rate {0} must be in (0, 1)")]
    InvalidDiscountRate(f64),
}
