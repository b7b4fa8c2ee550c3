//! `PurchaseIntent` — the queue message, serialized verbatim as the wire body.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use coverpilot_core::{CreatePlanRequest, PaymentOption, PlanFamily, PlannedPlan, Term};

use crate::error::{QueueError, QueueResult};

/// Decimal places commitments are rounded to ($0.001/h granularity).
pub const COMMITMENT_SCALE: u32 = 3;

/// Decimal places for upfront amounts (whole cents).
pub const UPFRONT_SCALE: u32 = 2;

/// A reviewable request to buy one commitment.
///
/// Field names and encodings are the queue wire contract: decimals travel
/// as strings, the timestamp as RFC 3339.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PurchaseIntent {
    pub client_token: Uuid,
    pub plan_family: PlanFamily,
    pub offering_id: String,
    /// Commitment in dollars per hour.
    pub commitment: Decimal,
    pub term_seconds: u64,
    pub payment_option: PaymentOption,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upfront_amount: Option<Decimal>,
    pub analysis_timestamp: DateTime<Utc>,
    pub coverage_at_analysis: f64,
    pub projected_coverage_after: f64,
}

impl PurchaseIntent {
    /// Build an intent for one planned slice with a fresh client token.
    ///
    /// The commitment is rounded to [`COMMITMENT_SCALE`] places; a slice
    /// that rounds to zero is rejected.
    pub fn build(
        plan_family: PlanFamily,
        offering_id: impl Into<String>,
        plan: &PlannedPlan,
        analysis_timestamp: DateTime<Utc>,
        coverage_at_analysis: f64,
        projected_coverage_after: f64,
    ) -> QueueResult<Self> {
        let commitment = Decimal::from_f64(plan.commitment_per_hour)
            .ok_or_else(|| {
                QueueError::InvalidIntent(format!(
                    "commitment {} is not representable",
                    plan.commitment_per_hour
                ))
            })?
            .round_dp(COMMITMENT_SCALE);
        if commitment <= Decimal::ZERO {
            return Err(QueueError::InvalidIntent(format!(
                "commitment {} rounds to zero",
                plan.commitment_per_hour
            )));
        }

        Ok(Self {
            client_token: Uuid::new_v4(),
            plan_family,
            offering_id: offering_id.into(),
            commitment,
            term_seconds: plan.term.seconds(),
            payment_option: plan.payment_option,
            upfront_amount: upfront_amount(commitment, plan.term, plan.payment_option),
            analysis_timestamp,
            coverage_at_analysis,
            projected_coverage_after,
        })
    }

    /// The term, if `term_seconds` is one the provider sells.
    pub fn term(&self) -> Option<Term> {
        Term::from_seconds(self.term_seconds)
    }

    /// Commitment as a float, for coverage arithmetic.
    pub fn commitment_per_hour(&self) -> f64 {
        self.commitment.to_f64().unwrap_or(0.0)
    }

    /// Check the fields a consumer relies on before acting.
    pub fn validate(&self) -> QueueResult<()> {
        if self.commitment <= Decimal::ZERO {
            return Err(QueueError::InvalidIntent(format!(
                "{}: non-positive commitment {}",
                self.client_token, self.commitment
            )));
        }
        if self.term().is_none() {
            return Err(QueueError::InvalidIntent(format!(
                "{}: unsupported term of {} seconds",
                self.client_token, self.term_seconds
            )));
        }
        if self.offering_id.is_empty() {
            return Err(QueueError::InvalidIntent(format!(
                "{}: empty offering id",
                self.client_token
            )));
        }
        Ok(())
    }

    /// The execution-API request for this intent.
    pub fn to_request(&self) -> CreatePlanRequest {
        CreatePlanRequest {
            offering_id: self.offering_id.clone(),
            commitment_per_hour: self.commitment,
            payment_option: self.payment_option,
            upfront_amount: self.upfront_amount,
            client_token: self.client_token,
        }
    }

    /// Serialize to the exact wire body stored in the queue.
    pub fn to_wire(&self) -> QueueResult<String> {
        serde_json::to_string(self).map_err(|e| QueueError::Serialize(e.to_string()))
    }

    /// Parse a wire body.
    pub fn from_wire(body: &str) -> QueueResult<Self> {
        serde_json::from_str(body).map_err(|e| QueueError::Deserialize(e.to_string()))
    }
}

/// Upfront payment due at purchase: the whole term for all-upfront, half
/// of it for partial-upfront.
fn upfront_amount(commitment: Decimal, term: Term, payment: PaymentOption) -> Option<Decimal> {
    let whole_term = commitment * Decimal::from(term.hours());
    match payment {
        PaymentOption::AllUpfront => Some(whole_term.round_dp(UPFRONT_SCALE)),
        PaymentOption::PartialUpfront => Some((whole_term / Decimal::TWO).round_dp(UPFRONT_SCALE)),
        PaymentOption::NoUpfront => None,
    }
}
