//! Purchase sizing strategies.

use serde::{Deserialize, Serialize};
use tracing::debug;

use coverpilot_analysis::CoverageSnapshot;
use coverpilot_core::config::StrategyConfig;

/// Everything a strategy may look at when sizing one family.
#[derive(Debug, Clone, Copy)]
pub struct SizingInput {
    /// Fresh coverage for this decision point.
    pub coverage: CoverageSnapshot,
    pub target_percent: f64,
    pub max_coverage_cap: f64,
    /// Commitment per hour recommended for this cycle.
    pub recommended_commitment: f64,
    /// Mean eligible spend per hour, for coverage projection.
    pub hourly_spend: f64,
    /// Commitment per hour already queued for this family and not yet
    /// bought. Projected as if it were in force.
    pub pending_commitment: f64,
}

impl SizingInput {
    /// Coverage after the pending intents and `commitment` are bought.
    fn projected(&self, commitment: f64) -> f64 {
        self.coverage
            .projected(self.pending_commitment.max(0.0) + commitment, self.hourly_spend)
    }

    /// Coverage this cycle starts from: effective plus pending.
    fn baseline(&self) -> f64 {
        self.projected(0.0)
    }
}

/// Why a strategy produced the commitment it did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SizingOutcome {
    /// A positive commitment was sized.
    Sized,
    /// Effective coverage already at or above the hard cap.
    AtCap,
    /// Nothing (or nothing usable) was recommended.
    NoRecommendation,
    /// Every candidate down to the minimum percent overshot the target.
    BelowMinimum,
}

/// Result of sizing one family.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SizingDecision {
    pub commitment_per_hour: f64,
    /// Share of the recommendation taken, where the strategy uses one.
    pub purchase_percent: Option<f64>,
    /// Candidates evaluated (only Dichotomy evaluates more than one).
    pub iterations: u32,
    pub outcome: SizingOutcome,
}

impl SizingDecision {
    fn zero(outcome: SizingOutcome, iterations: u32) -> Self {
        Self {
            commitment_per_hour: 0.0,
            purchase_percent: None,
            iterations,
            outcome,
        }
    }

    fn sized(commitment_per_hour: f64, purchase_percent: Option<f64>, iterations: u32) -> Self {
        if commitment_per_hour > 0.0 {
            Self {
                commitment_per_hour,
                purchase_percent,
                iterations,
                outcome: SizingOutcome::Sized,
            }
        } else {
            Self::zero(SizingOutcome::NoRecommendation, iterations)
        }
    }
}

/// A sizing capability. Implemented once over the configured strategy
/// enum so a cycle never mixes strategies.
pub trait PurchaseSizing {
    /// Short stable name used in logs and reports.
    fn name(&self) -> &'static str;

    /// Commitment per hour to buy this cycle, always `>= 0`.
    fn size(&self, input: &SizingInput) -> SizingDecision;
}

impl PurchaseSizing for StrategyConfig {
    fn name(&self) -> &'static str {
        match self {
            StrategyConfig::Fixed { .. } => "fixed",
            StrategyConfig::Dichotomy { .. } => "dichotomy",
            StrategyConfig::FollowProvider => "follow_provider",
        }
    }

    fn size(&self, input: &SizingInput) -> SizingDecision {
        let baseline = input.baseline();
        if baseline >= input.max_coverage_cap {
            debug!(
                strategy = self.name(),
                effective = input.coverage.effective_coverage_percent,
                pending = input.pending_commitment,
                baseline,
                cap = input.max_coverage_cap,
                "coverage at cap, sizing to zero"
            );
            return SizingDecision::zero(SizingOutcome::AtCap, 0);
        }
        let recommended = input.recommended_commitment;
        if !(recommended.is_finite() && recommended > 0.0) {
            return SizingDecision::zero(SizingOutcome::NoRecommendation, 0);
        }

        let decision = match *self {
            StrategyConfig::Fixed { max_purchase_percent } => {
                SizingDecision::sized(recommended * max_purchase_percent / 100.0, Some(max_purchase_percent), 1)
            }
            StrategyConfig::Dichotomy {
                max_purchase_percent,
                min_purchase_percent,
            } => size_dichotomy(input, max_purchase_percent, min_purchase_percent),
            StrategyConfig::FollowProvider => size_follow_provider(input),
        };

        debug!(
            strategy = self.name(),
            recommended,
            commitment = decision.commitment_per_hour,
            iterations = decision.iterations,
            outcome = ?decision.outcome,
            "sized purchase"
        );
        decision
    }
}

/// Halve the purchase percent until the projection lands at or under
/// the target, giving up once it drops below `min_percent`.
fn size_dichotomy(input: &SizingInput, max_percent: f64, min_percent: f64) -> SizingDecision {
    let mut percent = max_percent;
    let mut iterations = 0;

    while percent >= min_percent && percent > 0.0 {
        iterations += 1;
        let candidate = input.recommended_commitment * percent / 100.0;
        let projected = input.projected(candidate);
        if projected <= input.target_percent {
            return SizingDecision::sized(candidate, Some(percent), iterations);
        }
        debug!(percent, projected, target = input.target_percent, "candidate overshoots target");
        percent /= 2.0;
    }

    SizingDecision::zero(SizingOutcome::BelowMinimum, iterations)
}

/// Take the recommendation whole, scaled down to stay under the cap.
fn size_follow_provider(input: &SizingInput) -> SizingDecision {
    let recommended = input.recommended_commitment;
    let baseline = input.baseline();
    let projected = input.projected(recommended);

    if projected <= input.max_coverage_cap {
        return SizingDecision::sized(recommended, Some(100.0), 1);
    }

    // baseline < cap here, so the ratio is in [0, 1).
    let scale = if projected.is_finite() {
        (input.max_coverage_cap - baseline) / (projected - baseline)
    } else {
        0.0
    };
    SizingDecision::sized(recommended * scale, Some(scale * 100.0), 1)
}
