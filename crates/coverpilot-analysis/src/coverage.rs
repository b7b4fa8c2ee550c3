//! Coverage calculator — effective coverage with renewal-window exclusion.
//!
//! A commitment expiring within the renewal window is treated as already
//! gone, so planning renews it proactively. Its share of the raw coverage
//! is proportional to its share of the active commitment value:
//!
//! ```text
//! effective = raw * (1 - expiring_value / total_active_value)
//! ```

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use coverpilot_core::ActiveCommitment;

/// Coverage at one decision point. Never carried across phases.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CoverageSnapshot {
    pub raw_coverage_percent: f64,
    /// Commitment per hour excluded because it expires within the window.
    pub excluded_expiring_value: f64,
    pub effective_coverage_percent: f64,
    pub as_of: DateTime<Utc>,
}

impl CoverageSnapshot {
    /// Effective coverage after adding `commitment` per hour.
    pub fn projected(&self, commitment: f64, hourly_spend: f64) -> f64 {
        projected_coverage(self.effective_coverage_percent, commitment, hourly_spend)
    }
}

/// Compute effective coverage, excluding commitments whose
/// `expires_at - as_of` is within `renewal_window_days`.
pub fn compute_effective_coverage(
    raw_coverage_percent: f64,
    active_commitments: &[ActiveCommitment],
    renewal_window_days: u32,
    as_of: DateTime<Utc>,
) -> CoverageSnapshot {
    let raw = if raw_coverage_percent.is_finite() {
        raw_coverage_percent.clamp(0.0, 100.0)
    } else {
        0.0
    };
    let window = Duration::days(i64::from(renewal_window_days));

    let mut total = 0.0;
    let mut expiring = 0.0;
    for c in active_commitments {
        if !(c.commitment_per_hour.is_finite() && c.commitment_per_hour > 0.0) {
            continue;
        }
        total += c.commitment_per_hour;
        if c.expires_at - as_of <= window {
            expiring += c.commitment_per_hour;
        }
    }

    let effective = if expiring > 0.0 {
        (raw * (1.0 - expiring / total)).clamp(0.0, raw)
    } else {
        raw
    };

    if expiring > 0.0 {
        debug!(
            raw,
            effective,
            excluded = expiring,
            window_days = renewal_window_days,
            "excluding commitments inside renewal window"
        );
    }

    CoverageSnapshot {
        raw_coverage_percent: raw,
        excluded_expiring_value: expiring,
        effective_coverage_percent: effective,
        as_of,
    }
}

/// Coverage after adding `commitment` per hour against `hourly_spend`.
///
/// With no spend to cover, any positive commitment projects to infinity.
pub fn projected_coverage(effective_percent: f64, commitment: f64, hourly_spend: f64) -> f64 {
    if commitment <= 0.0 {
        return effective_percent;
    }
    if hourly_spend <= 0.0 || !hourly_spend.is_finite() {
        return f64::INFINITY;
    }
    effective_percent + commitment / hourly_spend * 100.0
}
