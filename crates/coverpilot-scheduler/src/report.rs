//! Planning reports — what each cycle decided, per plan family.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use coverpilot_analysis::{CoverageSnapshot, DistributionSummary, OptimalCommitment};
use coverpilot_core::{PlanFamily, PlannedPlan};
use coverpilot_sizing::SizingOutcome;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanStatus {
    /// Intents were written to the queue.
    Queued,
    NoActionNeeded,
    /// Usage history too short to plan on; retried next cycle.
    InsufficientData,
    Error,
    /// Intents were built but, by configuration, not queued.
    DryRun,
}

/// Outcome of planning one family.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FamilyPlanReport {
    pub family: PlanFamily,
    pub strategy_used: String,
    pub status: PlanStatus,
    pub coverage_before: Option<CoverageSnapshot>,
    pub usage: Option<DistributionSummary>,
    pub recommended_commitment: Option<f64>,
    pub sizing_outcome: Option<SizingOutcome>,
    /// Commitment per hour already queued by earlier cycles.
    #[serde(default)]
    pub pending_commitment: f64,
    pub commitment_sized: f64,
    pub planned_plans: Vec<PlannedPlan>,
    /// Slices forfeited by the split or too small to express.
    pub dropped: Vec<PlannedPlan>,
    pub projected_coverage_after: Option<f64>,
    /// Advisory knee point; never acted on.
    pub optimal: Option<OptimalCommitment>,
    /// Client tokens of the intents built this cycle.
    pub intents: Vec<Uuid>,
    pub error: Option<String>,
}

impl FamilyPlanReport {
    pub(crate) fn new(family: PlanFamily, strategy_used: &str) -> Self {
        Self {
            family,
            strategy_used: strategy_used.to_string(),
            status: PlanStatus::NoActionNeeded,
            coverage_before: None,
            usage: None,
            recommended_commitment: None,
            sizing_outcome: None,
            pending_commitment: 0.0,
            commitment_sized: 0.0,
            planned_plans: Vec::new(),
            dropped: Vec::new(),
            projected_coverage_after: None,
            optimal: None,
            intents: Vec::new(),
            error: None,
        }
    }

    pub(crate) fn with_status(mut self, status: PlanStatus, error: impl Into<String>) -> Self {
        self.status = status;
        self.error = Some(error.into());
        self
    }
}

/// One planning cycle across all enabled families.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanningReport {
    pub started_at: DateTime<Utc>,
    pub dry_run: bool,
    pub families: Vec<FamilyPlanReport>,
}

impl PlanningReport {
    pub fn family(&self, family: PlanFamily) -> Option<&FamilyPlanReport> {
        self.families.iter().find(|f| f.family == family)
    }

    /// Intents written to the queue this cycle.
    pub fn queued_count(&self) -> usize {
        self.families
            .iter()
            .filter(|f| f.status == PlanStatus::Queued)
            .map(|f| f.intents.len())
            .sum()
    }

    pub fn has_errors(&self) -> bool {
        self.families.iter().any(|f| f.status == PlanStatus::Error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn queued_count_ignores_dry_run_families() {
        let mut queued = FamilyPlanReport::new(PlanFamily::Compute, "dichotomy");
        queued.status = PlanStatus::Queued;
        queued.intents = vec![Uuid::new_v4(), Uuid::new_v4()];
        let mut dry = FamilyPlanReport::new(PlanFamily::Database, "dichotomy");
        dry.status = PlanStatus::DryRun;
        dry.intents = vec![Uuid::new_v4()];

        let report = PlanningReport {
            started_at: Utc.with_ymd_and_hms(2026, 10, 1, 0, 0, 0).unwrap(),
            dry_run: false,
            families: vec![queued, dry],
        };
        assert_eq!(report.queued_count(), 2);
        assert!(!report.has_errors());
        assert_eq!(report.family(PlanFamily::Database).unwrap().status, PlanStatus::DryRun);
    }

    #[test]
    fn report_serializes_status_in_snake_case() {
        let r = FamilyPlanReport::new(PlanFamily::Sagemaker, "fixed")
            .with_status(PlanStatus::InsufficientData, "3.0 days available");
        let json = serde_json::to_value(&r).unwrap();
        assert_eq!(json["status"], "insufficient_data");
        assert_eq!(json["family"], "SAGEMAKER");
        assert_eq!(json["error"], "3.0 days available");
    }
}
