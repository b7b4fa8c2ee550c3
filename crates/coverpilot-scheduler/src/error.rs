//! Planning error types.

use thiserror::Error;

/// Errors that abort planning for one plan family.
#[derive(Debug, Error)]
pub enum PlanningError {
    #[error("family {0} is not configured")]
    NotConfigured(String),

    #[error("usage source error: {0}")]
    Source(#[from] coverpilot_core::SourceError),

    #[error("analysis error: {0}")]
    Analysis(#[from] coverpilot_analysis::AnalysisError),

    #[error("offering lookup failed: {0}")]
    Offering(#[from] coverpilot_core::ApiError),

    #[error("queue error: {0}")]
    Queue(#[from] coverpilot_queue::QueueError),
}

pub type PlanningResult<T> = Result<T, PlanningError>;
