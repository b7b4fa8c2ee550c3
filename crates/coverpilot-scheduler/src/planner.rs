//! Planner — runs planning cycles and writes purchase intents.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{debug, error, info, warn};

use coverpilot_analysis::{
    AnalysisError, SpendingAnalyzer, compute_effective_coverage, optimal_commitment,
};
use coverpilot_core::config::FamilyConfig;
use coverpilot_core::{CommitmentApi, CoverpilotConfig, PlanFamily, UsageSource};
use coverpilot_queue::{IntentQueue, PurchaseIntent, QueueError};
use coverpilot_sizing::{PurchaseSizing, SizingInput, split};

use crate::error::{PlanningError, PlanningResult};
use crate::report::{FamilyPlanReport, PlanStatus, PlanningReport};

/// Turns usage history into queued purchase intents.
pub struct Planner {
    config: CoverpilotConfig,
    analyzer: SpendingAnalyzer,
    source: Arc<dyn UsageSource>,
    api: Arc<dyn CommitmentApi>,
    queue: IntentQueue,
}

impl Planner {
    pub fn new(
        config: CoverpilotConfig,
        source: Arc<dyn UsageSource>,
        api: Arc<dyn CommitmentApi>,
        queue: IntentQueue,
    ) -> Self {
        let analyzer = SpendingAnalyzer::new(config.scheduler.min_data_days, config.scheduler.granularity);
        Self {
            config,
            analyzer,
            source,
            api,
            queue,
        }
    }

    /// Plan every enabled family once.
    ///
    /// Never fails as a whole: per-family errors are logged and reported.
    pub fn plan_cycle(&self, now: DateTime<Utc>) -> PlanningReport {
        let strategy = self.config.scheduler.strategy.name();
        let mut families = Vec::new();

        for (family, family_config) in self.config.families.enabled() {
            let report = match self.plan_family(family, family_config, now) {
                Ok(report) => report,
                Err(PlanningError::Analysis(e @ AnalysisError::InsufficientData { .. })) => {
                    warn!(%family, error = %e, "skipping family this cycle");
                    FamilyPlanReport::new(family, strategy).with_status(PlanStatus::InsufficientData, e.to_string())
                }
                Err(e) => {
                    error!(%family, error = %e, "planning failed");
                    FamilyPlanReport::new(family, strategy).with_status(PlanStatus::Error, e.to_string())
                }
            };
            families.push(report);
        }

        let report = PlanningReport {
            started_at: now,
            dry_run: self.config.scheduler.dry_run,
            families,
        };
        info!(
            families = report.families.len(),
            queued = report.queued_count(),
            errors = report.has_errors(),
            "planning cycle complete"
        );
        report
    }

    /// Plan a single family, by name. Fails if it is not configured.
    pub fn plan_one(&self, family: PlanFamily, now: DateTime<Utc>) -> PlanningResult<FamilyPlanReport> {
        let family_config = self
            .config
            .families
            .get(family)
            .ok_or_else(|| PlanningError::NotConfigured(family.to_string()))?;
        self.plan_family(family, family_config, now)
    }

    fn plan_family(
        &self,
        family: PlanFamily,
        family_config: &FamilyConfig,
        now: DateTime<Utc>,
    ) -> PlanningResult<FamilyPlanReport> {
        let sched = &self.config.scheduler;
        let strategy = &sched.strategy;
        let mut report = FamilyPlanReport::new(family, strategy.name());

        let samples = self
            .source
            .usage_series(family, sched.lookback_days, sched.granularity)?;
        let distribution = self.analyzer.analyze(&samples, sched.lookback_days)?;
        report.usage = Some(distribution.summary());

        let live = self.source.current_coverage(family)?;
        let coverage = compute_effective_coverage(
            live.coverage_percent,
            &live.active_commitments,
            self.config.coverage.renewal_window_days,
            now,
        );
        report.coverage_before = Some(coverage);

        let (rate, estimated) = match family_config.discount_rate {
            Some(rate) => (rate, false),
            None => (sched.default_discount_rate, true),
        };
        let optimal = optimal_commitment(&distribution, rate, estimated)?;
        debug!(
            %family,
            commitment = optimal.commitment_per_hour,
            percentile = optimal.target_percentile,
            estimated,
            "knee point"
        );
        report.optimal = Some(optimal);

        let recommended = self.source.recommended_commitment(family, sched.lookback_days)?;
        report.recommended_commitment = recommended;

        let pending = self.pending_commitment(family)?;
        report.pending_commitment = pending;

        let hourly_spend = distribution.mean();
        let decision = strategy.size(&SizingInput {
            coverage,
            target_percent: self.config.coverage.target_percent,
            max_coverage_cap: self.config.coverage.max_cap_percent,
            recommended_commitment: recommended.unwrap_or(0.0),
            hourly_spend,
            pending_commitment: pending,
        });
        report.sizing_outcome = Some(decision.outcome);
        report.commitment_sized = decision.commitment_per_hour;

        if decision.commitment_per_hour <= 0.0 {
            info!(
                %family,
                effective = coverage.effective_coverage_percent,
                pending,
                outcome = ?decision.outcome,
                "no purchase needed"
            );
            return Ok(report);
        }

        let slices = split(
            decision.commitment_per_hour,
            &family_config.weights,
            sched.min_commitment_per_plan,
        );
        let mut dropped = slices.dropped;
        let mut planned = Vec::new();
        let mut intents = Vec::new();

        for plan in slices.plans {
            let offering_id = self.api.find_offering(family, plan.term, plan.payment_option)?;
            match PurchaseIntent::build(
                family,
                offering_id,
                &plan,
                now,
                coverage.effective_coverage_percent,
                0.0,
            ) {
                Ok(intent) => {
                    intents.push(intent);
                    planned.push(plan);
                }
                Err(QueueError::InvalidIntent(reason)) => {
                    debug!(%family, %reason, "slice too small to express");
                    dropped.push(plan);
                }
                Err(e) => return Err(e.into()),
            }
        }

        let total: f64 = intents.iter().map(PurchaseIntent::commitment_per_hour).sum();
        let projected = coverage.projected(pending + total, hourly_spend);
        for intent in &mut intents {
            intent.projected_coverage_after = projected;
        }

        report.planned_plans = planned;
        report.dropped = dropped;
        report.intents = intents.iter().map(|i| i.client_token).collect();

        if intents.is_empty() {
            info!(%family, sized = decision.commitment_per_hour, "every slice dropped");
            return Ok(report);
        }
        report.projected_coverage_after = Some(projected);

        if sched.dry_run {
            report.status = PlanStatus::DryRun;
            info!(
                %family,
                intents = intents.len(),
                commitment = total,
                projected,
                "dry run, intents not queued"
            );
            return Ok(report);
        }

        for intent in &intents {
            self.queue.send_at(intent, now)?;
        }
        report.status = PlanStatus::Queued;
        info!(
            %family,
            intents = intents.len(),
            commitment = total,
            before = coverage.effective_coverage_percent,
            projected,
            "purchase intents queued"
        );
        Ok(report)
    }

    /// Commitment per hour still on the queue for `family`, whether
    /// waiting, leased, or released after a failed attempt.
    fn pending_commitment(&self, family: PlanFamily) -> PlanningResult<f64> {
        let pending: f64 = self
            .queue
            .list_queued()?
            .iter()
            .filter(|q| q.intent.plan_family == family)
            .map(|q| q.intent.commitment_per_hour())
            .sum();
        if pending > 0.0 {
            debug!(%family, pending, "intents from earlier cycles still queued");
        }
        Ok(pending)
    }

    /// Run planning cycles every `interval` until shutdown.
    pub async fn run(&self, interval: Duration, mut shutdown: tokio::sync::watch::Receiver<bool>) {
        info!(interval_secs = interval.as_secs(), "planner started");

        loop {
            tokio::select! {
                _ = tokio::time::sleep(interval) => {
                    self.plan_cycle(Utc::now());
                }
                _ = shutdown.changed() => {
                    info!("planner shutting down");
                    break;
                }
            }
        }
    }
}
