//! Knee-point optimizer — advisory commitment level.
//!
//! The knee is placed at the `100 * (1 - rate)` percentile of hourly
//! spend. Its value is scored against the lookback samples: each hour earns
//! `rate * min(spend, c)` and wastes `c - spend` when spend falls short of
//! the commitment (unused commitment has no salvage value).
//!
//! The result is reported, never executed.

use serde::{Deserialize, Serialize};

use crate::error::{AnalysisError, AnalysisResult};
use crate::spending::UsageDistribution;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OptimalCommitment {
    pub commitment_per_hour: f64,
    pub target_percentile: f64,
    pub discount_rate: f64,
    /// Net savings over the lookback samples had this level been held.
    pub projected_net_savings: f64,
    /// The discount rate was a configured default, not an observed one.
    pub estimated: bool,
}

/// Compute the knee-point commitment for `discount_rate` in `(0, 1)`.
///
/// `estimated` marks that the caller supplied a default rate because no
/// commitment is active yet; this function never picks a rate itself.
pub fn optimal_commitment(
    distribution: &UsageDistribution,
    discount_rate: f64,
    estimated: bool,
) -> AnalysisResult<OptimalCommitment> {
    if !(discount_rate > 0.0 && discount_rate < 1.0) {
        return Err(AnalysisError::InvalidDiscountRate(discount_rate));
    }

    let target_percentile = 100.0 * (1.0 - discount_rate);
    let commitment = distribution.percentile(target_percentile);

    Ok(OptimalCommitment {
        commitment_per_hour: commitment,
        target_percentile,
        discount_rate,
        projected_net_savings: net_savings_at(distribution, commitment, discount_rate),
        estimated,
    })
}

/// Net savings over the distribution's samples at a given commitment.
pub fn net_savings_at(distribution: &UsageDistribution, commitment: f64, discount_rate: f64) -> f64 {
    distribution
        .samples()
        .iter()
        .map(|&spend| spend.min(commitment) * discount_rate - (commitment - spend).max(0.0))
        .sum()
}
