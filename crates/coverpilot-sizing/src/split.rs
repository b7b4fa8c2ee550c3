//! Purchase calculator — spreads a commitment over the term/payment mix.
//!
//! Slices below the per-plan minimum are forfeited: the remainder is not
//! redistributed to the surviving slices, so a family never buys more on
//! one term than its weight allows.

use serde::{Deserialize, Serialize};
use tracing::debug;

use coverpilot_core::PlannedPlan;
use coverpilot_core::config::TermWeight;

/// Plans to buy plus the slices that were too small to place.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SplitResult {
    pub plans: Vec<PlannedPlan>,
    pub dropped: Vec<PlannedPlan>,
}

impl SplitResult {
    pub fn total_planned(&self) -> f64 {
        self.plans.iter().map(|p| p.commitment_per_hour).sum()
    }

    pub fn total_dropped(&self) -> f64 {
        self.dropped.iter().map(|p| p.commitment_per_hour).sum()
    }
}

/// Multiply `total` by each weight, in weight order.
///
/// Weights are assumed to sum to ~1.0; validation happens at config load.
pub fn split(total: f64, weights: &[TermWeight], min_commitment_per_plan: f64) -> SplitResult {
    let mut result = SplitResult::default();
    if !(total.is_finite() && total > 0.0) {
        return result;
    }

    for w in weights {
        let slice = total * w.weight;
        if slice <= 0.0 {
            continue;
        }
        let plan = PlannedPlan {
            term: w.term,
            payment_option: w.payment_option,
            commitment_per_hour: slice,
        };
        if slice < min_commitment_per_plan {
            debug!(
                term = %w.term,
                payment = %w.payment_option,
                slice,
                min = min_commitment_per_plan,
                "dropping sub-minimum slice"
            );
            result.dropped.push(plan);
        } else {
            result.plans.push(plan);
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use coverpilot_core::{PaymentOption, Term};
    use proptest::prelude::*;

    fn weight(term: Term, payment_option: PaymentOption, weight: f64) -> TermWeight {
        TermWeight {
            term,
            payment_option,
            weight,
        }
    }

    fn mix() -> Vec<TermWeight> {
        vec![
            weight(Term::ThreeYears, PaymentOption::AllUpfront, 0.7),
            weight(Term::OneYear, PaymentOption::NoUpfront, 0.3),
        ]
    }

    #[test]
    fn splits_by_weight_in_order() {
        let r = split(10.0, &mix(), 0.001);
        assert_eq!(r.plans.len(), 2);
        assert_eq!(r.plans[0].term, Term::ThreeYears);
        assert!((r.plans[0].commitment_per_hour - 7.0).abs() < 1e-12);
        assert!((r.plans[1].commitment_per_hour - 3.0).abs() < 1e-12);
        assert!(r.dropped.is_empty());
    }

    #[test]
    fn sub_minimum_slice_is_forfeited() {
        // 0.3 * 1.0 = 0.3 < 0.5 → dropped, not moved to the 3-year slice.
        let r = split(1.0, &mix(), 0.5);
        assert_eq!(r.plans.len(), 1);
        assert!((r.plans[0].commitment_per_hour - 0.7).abs() < 1e-12);
        assert_eq!(r.dropped.len(), 1);
        assert_eq!(r.dropped[0].payment_option, PaymentOption::NoUpfront);
        assert!((r.total_dropped() - 0.3).abs() < 1e-12);
    }

    #[test]
    fn slice_equal_to_minimum_is_kept() {
        let r = split(1.0, &[weight(Term::OneYear, PaymentOption::NoUpfront, 1.0)], 1.0);
        assert_eq!(r.plans.len(), 1);
    }

    #[test]
    fn everything_below_minimum_yields_no_plans() {
        let r = split(0.01, &mix(), 1.0);
        assert!(r.plans.is_empty());
        assert_eq!(r.dropped.len(), 2);
    }

    #[test]
    fn zero_total_and_zero_weights_produce_nothing() {
        assert_eq!(split(0.0, &mix(), 0.0), SplitResult::default());
        let r = split(5.0, &[weight(Term::OneYear, PaymentOption::AllUpfront, 0.0)], 0.0);
        assert!(r.plans.is_empty() && r.dropped.is_empty());
    }

    fn arb_weights() -> impl Strategy<Value = Vec<TermWeight>> {
        prop::collection::vec(0.01f64..1.0, 1..6).prop_map(|raw| {
            let sum: f64 = raw.iter().sum();
            let terms = [Term::OneYear, Term::ThreeYears];
            let payments = [
                PaymentOption::AllUpfront,
                PaymentOption::PartialUpfront,
                PaymentOption::NoUpfront,
            ];
            raw.iter()
                .enumerate()
                .map(|(i, w)| weight(terms[i % 2], payments[i % 3], w / sum))
                .collect()
        })
    }

    proptest! {
        #[test]
        fn split_conserves_commitment(
            total in 0.0f64..500.0,
            weights in arb_weights(),
            min in 0.0f64..50.0,
        ) {
            let r = split(total, &weights, min);
            let expected = if total > 0.0 { total - r.total_dropped() } else { 0.0 };
            prop_assert!((r.total_planned() - expected).abs() <= 1e-9 * total.max(1.0));
            prop_assert!(r.plans.iter().all(|p| p.commitment_per_hour >= min));
            prop_assert!(r.dropped.iter().all(|p| p.commitment_per_hour < min));
        }
    }
}
