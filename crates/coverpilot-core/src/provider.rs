//! Collaborator traits — the boundary calls of both cycles.
//!
//! Usage data and the commitment-execution API live outside this
//! workspace. Both are injected as trait objects so the planning and
//! execution cycles can be driven by real clients, file exports, or test
//! doubles.

use rust_decimal::Decimal;
use uuid::Uuid;

use crate::error::{ApiError, SourceError};
use crate::types::{CurrentCoverage, Granularity, PaymentOption, PlanFamily, Term, UsageSample};

/// Read side: usage history and live coverage for a plan family.
pub trait UsageSource: Send + Sync {
    /// Spend samples covering the last `lookback_days`, oldest first.
    fn usage_series(
        &self,
        family: PlanFamily,
        lookback_days: u32,
        granularity: Granularity,
    ) -> Result<Vec<UsageSample>, SourceError>;

    /// Current coverage, commitments in force, and eligible hourly spend.
    fn current_coverage(&self, family: PlanFamily) -> Result<CurrentCoverage, SourceError>;

    /// Provider-recommended additional commitment per hour, if the
    /// provider has one for this family.
    fn recommended_commitment(
        &self,
        family: PlanFamily,
        lookback_days: u32,
    ) -> Result<Option<f64>, SourceError>;
}

/// Parameters of a single create-commitment call.
#[derive(Debug, Clone, PartialEq)]
pub struct CreatePlanRequest {
    pub offering_id: String,
    pub commitment_per_hour: Decimal,
    pub payment_option: PaymentOption,
    pub upfront_amount: Option<Decimal>,
    pub client_token: Uuid,
}

/// Write side: the commitment-execution API.
pub trait CommitmentApi: Send + Sync {
    /// Resolve the offering sold for a family/term/payment combination.
    fn find_offering(
        &self,
        family: PlanFamily,
        term: Term,
        payment_option: PaymentOption,
    ) -> Result<String, ApiError>;

    /// Create a commitment. Returns the new plan ID.
    fn create_plan(&self, request: &CreatePlanRequest) -> Result<String, ApiError>;
}
