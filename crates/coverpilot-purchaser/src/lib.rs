//! coverpilot-purchaser — the execution half of the workflow.
//!
//! Drains the intent queue, re-checks every intent against live coverage,
//! and creates commitments through the [`CommitmentApi`]. The client token
//! carried by each intent makes creation idempotent across redeliveries.
//!
//! [`CommitmentApi`]: coverpilot_core::CommitmentApi

pub mod error;
pub mod executor;
pub mod ledger;
pub mod report;

pub use error::{PurchaseError, PurchaseResult};
pub use executor::{CycleLedger, PurchaseExecutor};
pub use ledger::{LedgerEntry, LocalLedger};
pub use report::ExecutionReport;
