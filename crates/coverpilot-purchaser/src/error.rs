//! Purchaser error types.

use thiserror::Error;

/// Errors that stop an execution cycle.
///
/// Failures of individual intents are outcomes, not errors; only the
/// queue itself becoming unusable aborts a cycle.
#[derive(Debug, Error)]
pub enum PurchaseError {
    #[error("queue error: {0}")]
    Queue(#[from] coverpilot_queue::QueueError),
}

pub type PurchaseResult<T> = Result<T, PurchaseError>;
