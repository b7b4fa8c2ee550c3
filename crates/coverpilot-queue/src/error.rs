//! Error types for the intent queue.

use thiserror::Error;

use crate::types::IntentState;

/// Result type alias for queue operations.
pub type QueueResult<T> = Result<T, QueueError>;

/// Errors that can occur during queue operations.
#[derive(Debug, Error)]
pub enum QueueError {
    #[error("failed to open queue database: {0}")]
    Open(String),

    #[error("transaction error: {0}")]
    Transaction(String),

    #[error("table error: {0}")]
    Table(String),

    #[error("read error: {0}")]
    Read(String),

    #[error("write error: {0}")]
    Write(String),

    #[error("serialization error: {0}")]
    Serialize(String),

    #[error("deserialization error: {0}")]
    Deserialize(String),

    /// The lease this receipt belonged to has expired or been replaced.
    #[error("stale receipt for intent {0}")]
    StaleReceipt(String),

    #[error("invalid intent: {0}")]
    InvalidIntent(String),

    #[error("intent cannot move from {from} to {to}")]
    InvalidTransition { from: IntentState, to: IntentState },
}
