//! PurchaseExecutor — executes leased intents against live coverage.
//!
//! For each delivery:
//!
//! 1. Recompute effective coverage from the source. The coverage stored
//!    in the intent is never used for the cap check.
//! 2. Skip (and delete) the intent if buying it would project coverage
//!    above the hard cap.
//! 3. Otherwise create the commitment with the intent's client token.
//!
//! | API result           | Outcome              | Queue           |
//! |----------------------|----------------------|-----------------|
//! | plan ID              | `Executed`           | deleted         |
//! | duplicate token      | `Executed`           | deleted         |
//! | validation error     | `Failed`             | deleted         |
//! | transient / timeout  | `FailedRetryable`    | left for retry  |

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{debug, error, info, warn};

use coverpilot_analysis::compute_effective_coverage;
use coverpilot_core::config::{CoverageConfig, PurchaserConfig};
use coverpilot_core::{ApiError, CommitmentApi, CoverpilotConfig, PlanFamily, UsageSource};
use coverpilot_queue::{Delivery, IntentQueue, OutcomeStatus, PurchaseOutcome};

use crate::error::PurchaseResult;
use crate::report::ExecutionReport;

/// Commitment already bought per family during the current cycle.
///
/// Provider coverage figures lag purchases, so later intents of the same
/// family are projected on top of what this cycle already executed.
#[derive(Debug, Default, Clone)]
pub struct CycleLedger {
    executed: HashMap<PlanFamily, f64>,
}

impl CycleLedger {
    pub fn executed_for(&self, family: PlanFamily) -> f64 {
        self.executed.get(&family).copied().unwrap_or(0.0)
    }

    fn add(&mut self, family: PlanFamily, commitment: f64) {
        *self.executed.entry(family).or_insert(0.0) += commitment;
    }
}

pub struct PurchaseExecutor {
    coverage: CoverageConfig,
    purchaser: PurchaserConfig,
    source: Arc<dyn UsageSource>,
    api: Arc<dyn CommitmentApi>,
    queue: IntentQueue,
}

impl PurchaseExecutor {
    pub fn new(
        config: &CoverpilotConfig,
        source: Arc<dyn UsageSource>,
        api: Arc<dyn CommitmentApi>,
        queue: IntentQueue,
    ) -> Self {
        Self {
            coverage: config.coverage.clone(),
            purchaser: config.purchaser.clone(),
            source,
            api,
            queue,
        }
    }

    /// Drain every visible intent once.
    ///
    /// Returns `None` when the queue had nothing to deliver.
    pub fn run_cycle(&self, now: DateTime<Utc>) -> PurchaseResult<Option<ExecutionReport>> {
        let mut report = ExecutionReport::new(now);
        let mut cycle = CycleLedger::default();

        loop {
            let deliveries = self.queue.receive(self.purchaser.batch_size, now)?;
            if deliveries.is_empty() {
                break;
            }
            for delivery in &deliveries {
                let outcome = self.execute(delivery, &cycle, now);
                if outcome.status == OutcomeStatus::Executed {
                    cycle.add(delivery.intent.plan_family, delivery.intent.commitment_per_hour());
                }
                report.record(outcome);
            }
        }

        if report.is_empty() {
            debug!("no intents to execute");
            return Ok(None);
        }
        info!(
            executed = report.executed.len(),
            skipped = report.skipped.len(),
            failed = report.failed.len(),
            "execution cycle complete"
        );
        Ok(Some(report))
    }

    /// Execute one leased intent and settle it on the queue.
    pub fn execute(&self, delivery: &Delivery, cycle: &CycleLedger, now: DateTime<Utc>) -> PurchaseOutcome {
        let intent = &delivery.intent;
        let token = intent.client_token;

        if let Err(e) = intent.validate() {
            warn!(%token, error = %e, "rejecting invalid intent");
            return self.settle(delivery, PurchaseOutcome::rejected(token, OutcomeStatus::Failed, e.to_string()));
        }

        let live = match self.source.current_coverage(intent.plan_family) {
            Ok(live) => live,
            Err(e) => {
                return self.settle(
                    delivery,
                    PurchaseOutcome::rejected(token, OutcomeStatus::FailedRetryable, format!("coverage unavailable: {e}")),
                );
            }
        };
        if !(live.coverage_percent.is_finite() && live.hourly_spend.is_finite()) {
            warn!(
                %token,
                coverage = live.coverage_percent,
                hourly_spend = live.hourly_spend,
                "live coverage is not a number, deferring purchase"
            );
            return self.settle(
                delivery,
                PurchaseOutcome::rejected(
                    token,
                    OutcomeStatus::FailedRetryable,
                    "coverage unavailable: provider returned a non-finite figure".to_string(),
                ),
            );
        }
        let coverage = compute_effective_coverage(
            live.coverage_percent,
            &live.active_commitments,
            self.coverage.renewal_window_days,
            now,
        );
        let already = cycle.executed_for(intent.plan_family);
        let commitment = intent.commitment_per_hour();
        let projected = coverage.projected(already + commitment, live.hourly_spend);

        if projected > self.coverage.max_cap_percent {
            info!(
                %token,
                family = %intent.plan_family,
                at_analysis = intent.coverage_at_analysis,
                effective = coverage.effective_coverage_percent,
                projected,
                cap = self.coverage.max_cap_percent,
                "skipping purchase, cap would be exceeded"
            );
            return self.settle(
                delivery,
                PurchaseOutcome::rejected(
                    token,
                    OutcomeStatus::SkippedCapExceeded,
                    format!(
                        "projected coverage {projected:.2}% exceeds cap {:.2}%",
                        self.coverage.max_cap_percent
                    ),
                ),
            );
        }

        let outcome = match self.api.create_plan(&intent.to_request()) {
            Ok(plan_id) => {
                info!(
                    %token,
                    %plan_id,
                    family = %intent.plan_family,
                    commitment = %intent.commitment,
                    projected,
                    "commitment purchased"
                );
                PurchaseOutcome::executed(token, Some(plan_id))
            }
            Err(ApiError::DuplicateToken { plan_id }) => {
                info!(%token, ?plan_id, "commitment already purchased for this token");
                PurchaseOutcome::executed(token, plan_id)
            }
            Err(e) if e.is_retryable() => {
                warn!(%token, attempt = delivery.receive_count, error = %e, "purchase failed, will retry");
                PurchaseOutcome::rejected(token, OutcomeStatus::FailedRetryable, e.to_string())
            }
            Err(e) => {
                error!(%token, error = %e, "purchase rejected");
                PurchaseOutcome::rejected(token, OutcomeStatus::Failed, e.to_string())
            }
        };
        self.settle(delivery, outcome)
    }

    /// Delete the message for terminal outcomes; release it otherwise.
    fn settle(&self, delivery: &Delivery, outcome: PurchaseOutcome) -> PurchaseOutcome {
        let token = delivery.intent.client_token;
        let settled = match outcome.status {
            OutcomeStatus::FailedRetryable => {
                let reason = outcome.reason.as_deref().unwrap_or("retryable failure");
                self.queue.record_failure(token, delivery.receipt, reason)
            }
            status => self.queue.delete(token, delivery.receipt, status),
        };
        // A lost lease means another consumer owns the message now; the
        // client token keeps its purchase from happening twice.
        if let Err(e) = settled {
            warn!(%token, error = %e, "could not settle message");
        }
        outcome
    }

    /// Run execution cycles every `interval` until shutdown.
    pub async fn run(&self, interval: Duration, mut shutdown: tokio::sync::watch::Receiver<bool>) {
        info!(interval_secs = interval.as_secs(), "purchaser started");

        loop {
            tokio::select! {
                _ = tokio::time::sleep(interval) => {
                    if let Err(e) = self.run_cycle(Utc::now()) {
                        error!(error = %e, "execution cycle failed");
                    }
                }
                _ = shutdown.changed() => {
                    info!("purchaser shutting down");
                    break;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use chrono::TimeZone;
    use coverpilot_core::{
        CreatePlanRequest, CurrentCoverage, Granularity, PaymentOption, PlannedPlan, SourceError,
        Term, UsageSample,
    };
    use coverpilot_queue::{PurchaseIntent, QueueSettings};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 2, 0, 0, 0).unwrap()
    }

    struct Coverage(Mutex<Option<f64>>);

    impl UsageSource for Coverage {
        fn usage_series(&self, _: PlanFamily, _: u32, _: Granularity) -> Result<Vec<UsageSample>, SourceError> {
            Ok(Vec::new())
        }

        fn current_coverage(&self, _: PlanFamily) -> Result<CurrentCoverage, SourceError> {
            match *self.0.lock().unwrap() {
                Some(percent) => Ok(CurrentCoverage {
                    coverage_percent: percent,
                    active_commitments: Vec::new(),
                    hourly_spend: 100.0,
                }),
                None => Err(SourceError::Unavailable("throttled".into())),
            }
        }

        fn recommended_commitment(&self, _: PlanFamily, _: u32) -> Result<Option<f64>, SourceError> {
            Ok(None)
        }
    }

    /// Replays scripted responses, then succeeds.
    struct Scripted {
        responses: Mutex<Vec<Result<String, ApiError>>>,
        calls: Mutex<Vec<CreatePlanRequest>>,
    }

    impl Scripted {
        fn new(mut responses: Vec<Result<String, ApiError>>) -> Self {
            responses.reverse();
            Self {
                responses: Mutex::new(responses),
                calls: Mutex::new(Vec::new()),
            }
        }
    }

    impl CommitmentApi for Scripted {
        fn find_offering(&self, _: PlanFamily, _: Term, _: PaymentOption) -> Result<String, ApiError> {
            Ok("offer".into())
        }

        fn create_plan(&self, request: &CreatePlanRequest) -> Result<String, ApiError> {
            self.calls.lock().unwrap().push(request.clone());
            self.responses
                .lock()
                .unwrap()
                .pop()
                .unwrap_or_else(|| Ok(format!("plan-{}", request.client_token)))
        }
    }

    fn intent(commitment: f64) -> PurchaseIntent {
        PurchaseIntent::build(
            PlanFamily::Compute,
            "offer",
            &PlannedPlan {
                term: Term::OneYear,
                payment_option: PaymentOption::NoUpfront,
                commitment_per_hour: commitment,
            },
            now(),
            50.0,
            60.0,
        )
        .unwrap()
    }

    fn setup(coverage: Option<f64>, api: Arc<Scripted>) -> (PurchaseExecutor, IntentQueue) {
        let queue = IntentQueue::open_in_memory(QueueSettings::default()).unwrap();
        let executor = PurchaseExecutor::new(
            &CoverpilotConfig::default(),
            Arc::new(Coverage(Mutex::new(coverage))),
            api,
            queue.clone(),
        );
        (executor, queue)
    }

    #[test]
    fn empty_queue_is_silent() {
        let (executor, _) = setup(Some(50.0), Arc::new(Scripted::new(vec![])));
        assert!(executor.run_cycle(now()).unwrap().is_none());
    }

    #[test]
    fn executes_and_deletes() {
        let api = Arc::new(Scripted::new(vec![]));
        let (executor, queue) = setup(Some(50.0), api.clone());
        let i = intent(10.0);
        queue.send_at(&i, now()).unwrap();

        let report = executor.run_cycle(now()).unwrap().unwrap();
        assert_eq!(report.executed.len(), 1);
        assert_eq!(report.executed[0].plan_id, Some(format!("plan-{}", i.client_token)));
        assert!(queue.is_empty().unwrap());
        assert_eq!(api.calls.lock().unwrap()[0].client_token, i.client_token);
    }

    #[test]
    fn duplicate_token_counts_as_executed() {
        let api = Arc::new(Scripted::new(vec![Err(ApiError::DuplicateToken {
            plan_id: Some("plan-earlier".into()),
        })]));
        let (executor, queue) = setup(Some(50.0), api);
        queue.send_at(&intent(10.0), now()).unwrap();

        let report = executor.run_cycle(now()).unwrap().unwrap();
        assert_eq!(report.executed[0].plan_id.as_deref(), Some("plan-earlier"));
        assert!(queue.is_empty().unwrap());
    }

    #[test]
    fn validation_error_is_terminal() {
        let api = Arc::new(Scripted::new(vec![Err(ApiError::Validation("bad offering".into()))]));
        let (executor, queue) = setup(Some(50.0), api);
        queue.send_at(&intent(10.0), now()).unwrap();

        let report = executor.run_cycle(now()).unwrap().unwrap();
        assert_eq!(report.failed[0].status, OutcomeStatus::Failed);
        assert!(queue.is_empty().unwrap());
        assert!(queue.list_dead_letters().unwrap().is_empty());
    }

    #[test]
    fn transient_error_leaves_intent_queued() {
        let api = Arc::new(Scripted::new(vec![Err(ApiError::Transient("503".into()))]));
        let (executor, queue) = setup(Some(50.0), api);
        queue.send_at(&intent(10.0), now()).unwrap();

        let report = executor.run_cycle(now()).unwrap().unwrap();
        assert_eq!(report.failed[0].status, OutcomeStatus::FailedRetryable);
        assert_eq!(queue.len().unwrap(), 1);
    }

    #[test]
    fn unavailable_coverage_is_retryable_and_skips_the_api() {
        let api = Arc::new(Scripted::new(vec![]));
        let (executor, queue) = setup(None, api.clone());
        queue.send_at(&intent(10.0), now()).unwrap();

        let report = executor.run_cycle(now()).unwrap().unwrap();
        assert_eq!(report.failed[0].status, OutcomeStatus::FailedRetryable);
        assert!(api.calls.lock().unwrap().is_empty());
        assert_eq!(queue.len().unwrap(), 1);
    }

    #[test]
    fn non_finite_coverage_is_retryable_and_skips_the_api() {
        let api = Arc::new(Scripted::new(vec![]));
        let (executor, queue) = setup(Some(f64::NAN), api.clone());
        queue.send_at(&intent(90.0), now()).unwrap();

        let report = executor.run_cycle(now()).unwrap().unwrap();
        assert!(report.executed.is_empty());
        assert_eq!(report.failed[0].status, OutcomeStatus::FailedRetryable);
        assert!(report.failed[0].reason.as_deref().unwrap().starts_with("coverage unavailable"));
        assert!(api.calls.lock().unwrap().is_empty());
        assert_eq!(queue.len().unwrap(), 1);
    }

    #[test]
    fn cycle_ledger_guards_against_lagging_coverage() {
        let api = Arc::new(Scripted::new(vec![]));
        let (executor, queue) = setup(Some(70.0), api.clone());
        // Each fits alone (70 + 20 = 90), together they would reach 110.
        queue.send_at(&intent(20.0), now()).unwrap();
        queue.send_at(&intent(20.0), now() + chrono::Duration::seconds(1)).unwrap();

        let report = executor.run_cycle(now() + chrono::Duration::seconds(1)).unwrap().unwrap();
        assert_eq!(report.executed.len(), 1);
        assert_eq!(report.skipped.len(), 1);
        assert_eq!(api.calls.lock().unwrap().len(), 1);
    }

    #[test]
    fn projection_exactly_at_cap_is_allowed() {
        let (executor, queue) = setup(Some(85.0), Arc::new(Scripted::new(vec![])));
        queue.send_at(&intent(10.0), now()).unwrap();
        let report = executor.run_cycle(now()).unwrap().unwrap();
        assert_eq!(report.executed.len(), 1);
    }
}
