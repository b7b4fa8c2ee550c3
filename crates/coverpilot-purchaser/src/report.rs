//! Execution reports.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use coverpilot_queue::{OutcomeStatus, PurchaseOutcome};

/// Outcomes of one execution cycle, grouped by status.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionReport {
    pub started_at: DateTime<Utc>,
    pub executed: Vec<PurchaseOutcome>,
    pub skipped: Vec<PurchaseOutcome>,
    /// Both retryable and terminal failures.
    pub failed: Vec<PurchaseOutcome>,
}

impl ExecutionReport {
    pub fn new(started_at: DateTime<Utc>) -> Self {
        Self {
            started_at,
            executed: Vec::new(),
            skipped: Vec::new(),
            failed: Vec::new(),
        }
    }

    pub fn record(&mut self, outcome: PurchaseOutcome) {
        match outcome.status {
            OutcomeStatus::Executed => self.executed.push(outcome),
            OutcomeStatus::SkippedCapExceeded => self.skipped.push(outcome),
            OutcomeStatus::FailedRetryable | OutcomeStatus::Failed => self.failed.push(outcome),
        }
    }

    pub fn total(&self) -> usize {
        self.executed.len() + self.skipped.len() + self.failed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }
}
