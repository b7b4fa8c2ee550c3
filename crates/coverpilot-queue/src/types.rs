//! Queue records and the intent lifecycle.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{QueueError, QueueResult};
use crate::message::PurchaseIntent;

/// Lifecycle state of a purchase intent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentState {
    Planned,
    Queued,
    Cancelled,
    Dequeued,
    Executed,
    SkippedCapExceeded,
    FailedRetryable,
    Failed,
    DeadLettered,
}

impl IntentState {
    /// States reachable in one step from `self`.
    pub fn successors(&self) -> &'static [IntentState] {
        use IntentState::*;
        match self {
            Planned => &[Queued],
            Queued => &[Cancelled, Dequeued, DeadLettered],
            // Queued again when the lease expires without a decision.
            Dequeued => &[Executed, SkippedCapExceeded, FailedRetryable, Failed, Queued],
            // Released after a failed attempt: still reviewable.
            FailedRetryable => &[Queued, Cancelled, DeadLettered],
            Cancelled | Executed | SkippedCapExceeded | Failed | DeadLettered => &[],
        }
    }

    pub fn can_transition_to(&self, next: IntentState) -> bool {
        self.successors().contains(&next)
    }

    pub fn is_terminal(&self) -> bool {
        self.successors().is_empty()
    }
}

impl fmt::Display for IntentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            IntentState::Planned => "planned",
            IntentState::Queued => "queued",
            IntentState::Cancelled => "cancelled",
            IntentState::Dequeued => "dequeued",
            IntentState::Executed => "executed",
            IntentState::SkippedCapExceeded => "skipped_cap_exceeded",
            IntentState::FailedRetryable => "failed_retryable",
            IntentState::Failed => "failed",
            IntentState::DeadLettered => "dead_lettered",
        };
        f.write_str(s)
    }
}

/// Result of executing one intent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeStatus {
    Executed,
    SkippedCapExceeded,
    FailedRetryable,
    Failed,
}

impl From<OutcomeStatus> for IntentState {
    fn from(status: OutcomeStatus) -> Self {
        match status {
            OutcomeStatus::Executed => IntentState::Executed,
            OutcomeStatus::SkippedCapExceeded => IntentState::SkippedCapExceeded,
            OutcomeStatus::FailedRetryable => IntentState::FailedRetryable,
            OutcomeStatus::Failed => IntentState::Failed,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PurchaseOutcome {
    pub client_token: Uuid,
    pub status: OutcomeStatus,
    pub plan_id: Option<String>,
    pub reason: Option<String>,
}

impl PurchaseOutcome {
    pub fn executed(client_token: Uuid, plan_id: Option<String>) -> Self {
        Self {
            client_token,
            status: OutcomeStatus::Executed,
            plan_id,
            reason: None,
        }
    }

    pub fn rejected(client_token: Uuid, status: OutcomeStatus, reason: impl Into<String>) -> Self {
        Self {
            client_token,
            status,
            plan_id: None,
            reason: Some(reason.into()),
        }
    }
}

/// A leased message handed to a consumer.
#[derive(Debug, Clone, PartialEq)]
pub struct Delivery {
    pub intent: PurchaseIntent,
    /// Proof of the current lease; required to delete or fail the message.
    pub receipt: Uuid,
    /// Deliveries so far, including this one.
    pub receive_count: u32,
}

/// Stored form of a live message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueRecord {
    /// Exact wire body as sent.
    pub body: String,
    pub state: IntentState,
    pub receive_count: u32,
    pub enqueued_at: DateTime<Utc>,
    /// Not deliverable before this instant (lease deadline while dequeued).
    pub visible_at: DateTime<Utc>,
    #[serde(default)]
    pub receipt: Option<Uuid>,
    #[serde(default)]
    pub last_error: Option<String>,
}

impl QueueRecord {
    /// A record for a freshly planned intent, not yet queued.
    pub fn planned(body: String, now: DateTime<Utc>) -> Self {
        Self {
            body,
            state: IntentState::Planned,
            receive_count: 0,
            enqueued_at: now,
            visible_at: now,
            receipt: None,
            last_error: None,
        }
    }

    /// Move to `next` if the lifecycle allows it.
    pub fn transition(&mut self, next: IntentState) -> QueueResult<()> {
        if !self.state.can_transition_to(next) {
            return Err(QueueError::InvalidTransition {
                from: self.state,
                to: next,
            });
        }
        self.state = next;
        Ok(())
    }

    /// Return a visible message to `Queued`: an expired lease, or a failed
    /// attempt whose lease deadline has passed.
    pub fn release(&mut self, now: DateTime<Utc>) -> QueueResult<()> {
        let releasable = matches!(self.state, IntentState::Dequeued | IntentState::FailedRetryable);
        if releasable && self.is_visible(now) {
            self.transition(IntentState::Queued)?;
            self.receipt = None;
        }
        Ok(())
    }

    pub fn is_leased(&self, now: DateTime<Utc>) -> bool {
        self.state == IntentState::Dequeued && self.visible_at > now
    }

    pub fn is_visible(&self, now: DateTime<Utc>) -> bool {
        self.visible_at <= now
    }

    /// Whether `receipt` is the receipt of the current lease.
    pub fn holds(&self, receipt: Uuid) -> bool {
        self.state == IntentState::Dequeued && self.receipt == Some(receipt)
    }
}

/// Listing entry for a live message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueuedIntent {
    pub intent: PurchaseIntent,
    pub state: IntentState,
    pub receive_count: u32,
    pub enqueued_at: DateTime<Utc>,
    pub visible_at: DateTime<Utc>,
    pub last_error: Option<String>,
}

/// A message that will not be delivered again.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeadLetter {
    pub client_token: String,
    pub body: String,
    pub receive_count: u32,
    pub reason: String,
    pub dead_lettered_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CancelOutcome {
    Cancelled,
    /// A consumer holds the lease; the purchase may already be in progress.
    InFlight,
    NotFound,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn queued_can_be_cancelled_or_dequeued() {
        assert!(IntentState::Planned.can_transition_to(IntentState::Queued));
        assert!(IntentState::Queued.can_transition_to(IntentState::Cancelled));
        assert!(IntentState::Queued.can_transition_to(IntentState::Dequeued));
        assert!(!IntentState::Dequeued.can_transition_to(IntentState::Cancelled));
        assert!(!IntentState::Planned.can_transition_to(IntentState::Executed));
    }

    #[test]
    fn retryable_failures_requeue_or_dead_letter() {
        assert!(IntentState::FailedRetryable.can_transition_to(IntentState::Queued));
        assert!(IntentState::FailedRetryable.can_transition_to(IntentState::Cancelled));
        assert!(IntentState::FailedRetryable.can_transition_to(IntentState::DeadLettered));
        assert!(!IntentState::FailedRetryable.is_terminal());
    }

    #[test]
    fn terminal_states_have_no_successors() {
        for s in [
            IntentState::Cancelled,
            IntentState::Executed,
            IntentState::SkippedCapExceeded,
            IntentState::Failed,
            IntentState::DeadLettered,
        ] {
            assert!(s.is_terminal(), "{s}");
        }
    }

    fn t0() -> DateTime<Utc> {
        use chrono::TimeZone;
        Utc.with_ymd_and_hms(2026, 10, 1, 0, 0, 0).unwrap()
    }

    #[test]
    fn record_refuses_edges_outside_the_lifecycle() {
        let mut record = QueueRecord::planned("{}".into(), t0());
        assert!(matches!(
            record.transition(IntentState::Dequeued),
            Err(QueueError::InvalidTransition {
                from: IntentState::Planned,
                to: IntentState::Dequeued
            })
        ));
        record.transition(IntentState::Queued).unwrap();
        record.transition(IntentState::Dequeued).unwrap();
        assert!(record.transition(IntentState::Cancelled).is_err());
        assert_eq!(record.state, IntentState::Dequeued);
    }

    #[test]
    fn release_only_returns_visible_messages() {
        let mut record = QueueRecord::planned("{}".into(), t0());
        record.transition(IntentState::Queued).unwrap();
        record.transition(IntentState::Dequeued).unwrap();
        record.receipt = Some(Uuid::new_v4());
        record.visible_at = t0() + chrono::Duration::minutes(15);

        record.release(t0()).unwrap();
        assert_eq!(record.state, IntentState::Dequeued);
        assert!(record.receipt.is_some());

        record.release(t0() + chrono::Duration::minutes(15)).unwrap();
        assert_eq!(record.state, IntentState::Queued);
        assert_eq!(record.receipt, None);
    }

    #[test]
    fn every_outcome_is_reachable_from_dequeued() {
        for status in [
            OutcomeStatus::Executed,
            OutcomeStatus::SkippedCapExceeded,
            OutcomeStatus::FailedRetryable,
            OutcomeStatus::Failed,
        ] {
            assert!(IntentState::Dequeued.can_transition_to(status.into()));
        }
    }
}
