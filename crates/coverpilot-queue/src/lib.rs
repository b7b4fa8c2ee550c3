//! coverpilot-queue — the hand-off between planning and execution.
//!
//! Backed by [redb](https://docs.rs/redb). Each queued intent is stored
//! under its client token with the exact JSON wire body, its lifecycle
//! state, receive count and lease deadline. Messages that exhaust their
//! deliveries move to a separate dead-letter table.
//!
//! # Lifecycle
//!
//! ```text
//! Planned ─► Queued ─┬─► Cancelled            (external delete, not leased)
//!                    ├─► Dequeued ─┬─► Executed
//!                    │             ├─► SkippedCapExceeded
//!                    │             ├─► Failed          (validation error)
//!                    │             ├─► FailedRetryable ─► Queued
//!                    │             └─► Queued          (lease expired)
//!                    └─► DeadLettered         (receives exhausted)
//! ```
//!
//! Delivery is at-least-once. A lease gives one consumer exclusive use of
//! a message until its visibility timeout passes; nothing orders messages
//! against each other.

pub mod error;
pub mod message;
pub mod store;
pub mod tables;
pub mod types;

pub use error::{QueueError, QueueResult};
pub use message::PurchaseIntent;
pub use store::{IntentQueue, QueueSettings};
pub use types::*;
