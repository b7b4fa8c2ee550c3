//! Spending analyzer — summarizes a usage series into a distribution.
//!
//! Percentiles use linear interpolation between order statistics: with
//! `n` samples sorted ascending, `rank = p/100 * (n - 1)` and the result
//! interpolates between `s[floor(rank)]` and `s[ceil(rank)]`. Min and max
//! are exact sample values.

use chrono::Duration;
use serde::{Deserialize, Serialize};
use tracing::debug;

use coverpilot_core::{Granularity, UsageSample};

use crate::error::{AnalysisError, AnalysisResult};

/// Read-only summary of spend over a lookback window.
#[derive(Debug, Clone, PartialEq)]
pub struct UsageDistribution {
    /// Sample amounts, sorted ascending.
    sorted: Vec<f64>,
    mean: f64,
    lookback_days: u32,
    /// Span of history actually covered by the samples.
    history_days: f64,
}

/// Serializable headline numbers of a distribution, for reports.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DistributionSummary {
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub p50: f64,
    pub p90: f64,
    pub sample_count: usize,
    pub history_days: f64,
}

impl UsageDistribution {
    /// Build a distribution straight from amounts.
    ///
    /// Each amount is taken as one sample; `history_days` is left at the
    /// lookback length. Fails on an empty slice or invalid amounts.
    pub fn from_amounts(amounts: &[f64], lookback_days: u32) -> AnalysisResult<Self> {
        if amounts.is_empty() {
            return Err(AnalysisError::InsufficientData {
                available_days: 0.0,
                required_days: 1,
            });
        }
        validate_amounts(amounts.iter().copied())?;
        Ok(Self::build(amounts.to_vec(), lookback_days, f64::from(lookback_days)))
    }

    fn build(mut amounts: Vec<f64>, lookback_days: u32, history_days: f64) -> Self {
        amounts.sort_by(f64::total_cmp);
        let mean = amounts.iter().sum::<f64>() / amounts.len() as f64;
        Self {
            sorted: amounts,
            mean,
            lookback_days,
            history_days,
        }
    }

    /// Interpolated percentile, `p` clamped to `[0, 100]`.
    pub fn percentile(&self, p: f64) -> f64 {
        let p = if p.is_nan() { 0.0 } else { p.clamp(0.0, 100.0) };
        let n = self.sorted.len();
        if n == 1 {
            return self.sorted[0];
        }

        let rank = p / 100.0 * (n - 1) as f64;
        let lo = rank.floor() as usize;
        let hi = rank.ceil() as usize;
        let frac = rank - lo as f64;
        let (a, b) = (self.sorted[lo], self.sorted[hi]);
        // Clamp keeps float rounding from escaping the bracketing samples.
        (a + frac * (b - a)).clamp(a, b)
    }

    pub fn min(&self) -> f64 {
        self.sorted[0]
    }

    pub fn max(&self) -> f64 {
        self.sorted[self.sorted.len() - 1]
    }

    pub fn mean(&self) -> f64 {
        self.mean
    }

    pub fn sample_count(&self) -> usize {
        self.sorted.len()
    }

    pub fn lookback_days(&self) -> u32 {
        self.lookback_days
    }

    pub fn history_days(&self) -> f64 {
        self.history_days
    }

    /// Samples in ascending order.
    pub fn samples(&self) -> &[f64] {
        &self.sorted
    }

    pub fn summary(&self) -> DistributionSummary {
        DistributionSummary {
            min: self.min(),
            max: self.max(),
            mean: self.mean,
            p50: self.percentile(50.0),
            p90: self.percentile(90.0),
            sample_count: self.sorted.len(),
            history_days: self.history_days,
        }
    }
}

/// Turns raw usage series into distributions, enforcing a minimum history.
#[derive(Debug, Clone, Copy)]
pub struct SpendingAnalyzer {
    min_data_days: u32,
    granularity: Granularity,
}

impl SpendingAnalyzer {
    pub fn new(min_data_days: u32, granularity: Granularity) -> Self {
        Self {
            min_data_days,
            granularity,
        }
    }

    /// Summarize the samples falling in the last `lookback_days` before the
    /// newest sample.
    ///
    /// Fails with `InsufficientData` when the covered history is shorter
    /// than the configured minimum; the caller skips the family for this
    /// cycle.
    pub fn analyze(
        &self,
        samples: &[UsageSample],
        lookback_days: u32,
    ) -> AnalysisResult<UsageDistribution> {
        let Some(latest) = samples.iter().map(|s| s.timestamp).max() else {
            return Err(AnalysisError::InsufficientData {
                available_days: 0.0,
                required_days: self.min_data_days,
            });
        };
        let cutoff = latest - Duration::days(i64::from(lookback_days));

        let window: Vec<&UsageSample> = samples.iter().filter(|s| s.timestamp > cutoff).collect();
        let Some(earliest) = window.iter().map(|s| s.timestamp).min() else {
            debug!(lookback_days, "no samples inside lookback window");
            return Err(AnalysisError::InsufficientData {
                available_days: 0.0,
                required_days: self.min_data_days,
            });
        };
        validate_amounts(window.iter().map(|s| s.amount))?;

        let span_secs = (latest - earliest).num_seconds() + self.granularity.seconds();
        let history_days = span_secs as f64 / 86_400.0;

        if history_days < f64::from(self.min_data_days) {
            debug!(
                history_days,
                required = self.min_data_days,
                samples = window.len(),
                "usage history too short"
            );
            return Err(AnalysisError::InsufficientData {
                available_days: history_days,
                required_days: self.min_data_days,
            });
        }

        let amounts: Vec<f64> = window.iter().map(|s| s.amount).collect();
        let dist = UsageDistribution::build(amounts, lookback_days, history_days);
        debug!(
            samples = dist.sample_count(),
            min = dist.min(),
            max = dist.max(),
            mean = dist.mean(),
            "usage distribution computed"
        );
        Ok(dist)
    }
}

fn validate_amounts(amounts: impl Iterator<Item = f64>) -> AnalysisResult<()> {
    for amount in amounts {
        if !amount.is_finite() || amount < 0.0 {
            return Err(AnalysisError::InvalidSample(format!(
                "spend amount {amount} is not a non-negative number"
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, TimeZone, Utc};
    use coverpilot_core::PlanFamily;
    use proptest::prelude::*;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 9, 1, 0, 0, 0).unwrap()
    }

    fn hourly(amounts: &[f64]) -> Vec<UsageSample> {
        amounts
            .iter()
            .enumerate()
            .map(|(i, &amount)| UsageSample {
                timestamp: t0() + Duration::hours(i as i64),
                family: PlanFamily::Compute,
                amount,
            })
            .collect()
    }

    #[test]
    fn percentiles_interpolate_linearly() {
        let dist = UsageDistribution::from_amounts(&[10.0, 10.0, 10.0, 20.0, 20.0, 30.0], 30).unwrap();
        assert_eq!(dist.percentile(0.0), 10.0);
        assert_eq!(dist.percentile(50.0), 15.0);
        assert_eq!(dist.percentile(100.0), 30.0);
        // rank = 0.9 * 5 = 4.5 → halfway between 20 and 30.
        assert!((dist.percentile(90.0) - 25.0).abs() < 1e-9);
    }

    #[test]
    fn min_max_mean_are_exact() {
        let dist = UsageDistribution::from_amounts(&[3.0, 1.0, 2.0], 7).unwrap();
        assert_eq!(dist.min(), 1.0);
        assert_eq!(dist.max(), 3.0);
        assert_eq!(dist.mean(), 2.0);
        assert_eq!(dist.sample_count(), 3);
        assert_eq!(dist.samples(), &[1.0, 2.0, 3.0]);
    }

    #[test]
    fn single_sample_percentile() {
        let dist = UsageDistribution::from_amounts(&[4.2], 1).unwrap();
        assert_eq!(dist.percentile(1.0), 4.2);
        assert_eq!(dist.percentile(99.0), 4.2);
    }

    #[test]
    fn percentile_clamps_out_of_range() {
        let dist = UsageDistribution::from_amounts(&[1.0, 2.0], 1).unwrap();
        assert_eq!(dist.percentile(-5.0), 1.0);
        assert_eq!(dist.percentile(150.0), 2.0);
    }

    #[test]
    fn empty_amounts_rejected() {
        assert!(matches!(
            UsageDistribution::from_amounts(&[], 30),
            Err(AnalysisError::InsufficientData { .. })
        ));
    }

    #[test]
    fn negative_amount_rejected() {
        assert!(matches!(
            UsageDistribution::from_amounts(&[1.0, -1.0], 30),
            Err(AnalysisError::InvalidSample(_))
        ));
    }

    #[test]
    fn analyze_requires_minimum_history() {
        let analyzer = SpendingAnalyzer::new(2, Granularity::Hourly);
        // 24 hourly samples = exactly one day.
        let samples = hourly(&[1.0; 24]);
        let err = analyzer.analyze(&samples, 30).unwrap_err();
        match err {
            AnalysisError::InsufficientData {
                available_days,
                required_days,
            } => {
                assert!((available_days - 1.0).abs() < 1e-9);
                assert_eq!(required_days, 2);
            }
            other => panic!("expected InsufficientData, got {other:?}"),
        }
    }

    #[test]
    fn analyze_empty_series_is_insufficient() {
        let analyzer = SpendingAnalyzer::new(1, Granularity::Hourly);
        assert!(matches!(
            analyzer.analyze(&[], 30),
            Err(AnalysisError::InsufficientData { available_days, .. }) if available_days == 0.0
        ));
    }

    #[test]
    fn zero_day_lookback_is_insufficient() {
        // The window (latest - 0d, latest] holds nothing.
        let analyzer = SpendingAnalyzer::new(0, Granularity::Hourly);
        assert!(matches!(
            analyzer.analyze(&hourly(&[3.0]), 0),
            Err(AnalysisError::InsufficientData { available_days, required_days: 0 }) if available_days == 0.0
        ));
    }

    #[test]
    fn analyze_keeps_only_lookback_window() {
        let analyzer = SpendingAnalyzer::new(1, Granularity::Hourly);
        // 72 hours of data: first 24 hours at 100, last 48 at 1.
        let mut amounts = vec![100.0; 24];
        amounts.extend(vec![1.0; 48]);
        let dist = analyzer.analyze(&hourly(&amounts), 2).unwrap();
        assert_eq!(dist.sample_count(), 48);
        assert_eq!(dist.max(), 1.0);
        assert!((dist.history_days() - 2.0).abs() < 1e-9);
    }

    #[test]
    fn analyze_accepts_unordered_input() {
        let analyzer = SpendingAnalyzer::new(1, Granularity::Hourly);
        let mut samples = hourly(&[5.0; 30]);
        samples.reverse();
        let dist = analyzer.analyze(&samples, 30).unwrap();
        assert_eq!(dist.sample_count(), 30);
        assert_eq!(dist.percentile(50.0), 5.0);
    }

    #[test]
    fn daily_granularity_counts_days() {
        let analyzer = SpendingAnalyzer::new(14, Granularity::Daily);
        let samples: Vec<UsageSample> = (0..14)
            .map(|d| UsageSample {
                timestamp: t0() + Duration::days(d),
                family: PlanFamily::Database,
                amount: 2.0,
            })
            .collect();
        let dist = analyzer.analyze(&samples, 30).unwrap();
        assert!((dist.history_days() - 14.0).abs() < 1e-9);
    }

    #[test]
    fn summary_reports_headline_numbers() {
        let dist = UsageDistribution::from_amounts(&[1.0, 2.0, 3.0, 4.0, 5.0], 30).unwrap();
        let s = dist.summary();
        assert_eq!(s.p50, 3.0);
        assert_eq!(s.sample_count, 5);
    }

    proptest! {
        #[test]
        fn percentile_is_monotonic(
            amounts in prop::collection::vec(0.0f64..10_000.0, 1..200),
            p1 in 0.0f64..100.0,
            p2 in 0.0f64..100.0,
        ) {
            let dist = UsageDistribution::from_amounts(&amounts, 30).unwrap();
            let (lo, hi) = if p1 <= p2 { (p1, p2) } else { (p2, p1) };
            prop_assert!(dist.percentile(lo) <= dist.percentile(hi));
        }

        #[test]
        fn percentile_stays_within_min_max(
            amounts in prop::collection::vec(0.0f64..10_000.0, 1..200),
            p in 0.0f64..100.0,
        ) {
            let dist = UsageDistribution::from_amounts(&amounts, 30).unwrap();
            let v = dist.percentile(p);
            prop_assert!(v >= dist.min() && v <= dist.max());
        }
    }
}
