//! Plain-text renderings of reports for the terminal.

use std::fmt::Write;

use coverpilot_purchaser::{ExecutionReport, LedgerEntry};
use coverpilot_queue::{DeadLetter, PurchaseOutcome, QueuedIntent};
use coverpilot_scheduler::{FamilyPlanReport, PlanStatus, PlanningReport};

fn percent(value: Option<f64>) -> String {
    match value {
        Some(v) if v.is_finite() => format!("{v:.1}%"),
        Some(_) => "∞".to_string(),
        None => "-".to_string(),
    }
}

fn status(status: PlanStatus) -> &'static str {
    match status {
        PlanStatus::Queued => "queued",
        PlanStatus::NoActionNeeded => "no action",
        PlanStatus::InsufficientData => "insufficient data",
        PlanStatus::Error => "error",
        PlanStatus::DryRun => "dry run",
    }
}

fn family_line(out: &mut String, f: &FamilyPlanReport) {
    let before = f.coverage_before.map(|c| c.effective_coverage_percent);
    let _ = writeln!(
        out,
        "{:<10} {:<18} coverage {} → {}  sized {:.3} $/h  [{}]",
        f.family.as_str(),
        status(f.status),
        percent(before),
        percent(f.projected_coverage_after),
        f.commitment_sized,
        f.strategy_used,
    );
    if f.pending_commitment > 0.0 {
        let _ = writeln!(out, "    ~ {:.3} $/h still queued from earlier cycles", f.pending_commitment);
    }
    for plan in &f.planned_plans {
        let _ = writeln!(
            out,
            "    + {:.3} $/h  {} {}",
            plan.commitment_per_hour, plan.term, plan.payment_option
        );
    }
    for plan in &f.dropped {
        let _ = writeln!(
            out,
            "    - {:.3} $/h  {} {} (below minimum)",
            plan.commitment_per_hour, plan.term, plan.payment_option
        );
    }
    if let Some(opt) = &f.optimal {
        let _ = writeln!(
            out,
            "    knee point {:.3} $/h at p{:.0}{}",
            opt.commitment_per_hour,
            opt.target_percentile,
            if opt.estimated { " (estimated rate)" } else { "" }
        );
    }
    if let Some(err) = &f.error {
        let _ = writeln!(out, "    ! {err}");
    }
}

pub fn planning_report(report: &PlanningReport) -> String {
    let mut out = String::new();
    if report.families.is_empty() {
        out.push_str("no plan families enabled\n");
        return out;
    }
    for f in &report.families {
        family_line(&mut out, f);
    }
    let _ = writeln!(out, "{} intent(s) queued", report.queued_count());
    out
}

fn outcome_line(out: &mut String, label: &str, o: &PurchaseOutcome) {
    let detail = o.plan_id.as_deref().or(o.reason.as_deref()).unwrap_or("");
    let _ = writeln!(out, "{label:<9} {}  {detail}", o.client_token);
}

pub fn execution_report(report: &ExecutionReport) -> String {
    let mut out = String::new();
    for o in &report.executed {
        outcome_line(&mut out, "executed", o);
    }
    for o in &report.skipped {
        outcome_line(&mut out, "skipped", o);
    }
    for o in &report.failed {
        outcome_line(&mut out, "failed", o);
    }
    let _ = writeln!(
        out,
        "{} executed, {} skipped, {} failed",
        report.executed.len(),
        report.skipped.len(),
        report.failed.len()
    );
    out
}

pub fn queued_intents(queued: &[QueuedIntent]) -> String {
    if queued.is_empty() {
        return "queue empty\n".to_string();
    }
    let mut out = String::new();
    for q in queued {
        let i = &q.intent;
        let term = i.term().map(|t| t.to_string()).unwrap_or_else(|| format!("{}s", i.term_seconds));
        let _ = writeln!(
            out,
            "{}  {:<9} {} $/h  {} {}  {} → {}  [{}, {} receive(s)]",
            i.client_token,
            i.plan_family.as_str(),
            i.commitment,
            term,
            i.payment_option,
            percent(Some(i.coverage_at_analysis)),
            percent(Some(i.projected_coverage_after)),
            q.state,
            q.receive_count,
        );
    }
    out
}

pub fn dead_letters(letters: &[DeadLetter]) -> String {
    if letters.is_empty() {
        return "no dead letters\n".to_string();
    }
    let mut out = String::new();
    for d in letters {
        let _ = writeln!(
            out,
            "{}  {} receive(s)  {}  {}",
            d.client_token,
            d.receive_count,
            d.dead_lettered_at.to_rfc3339(),
            d.reason
        );
    }
    out
}

pub fn ledger(entries: &[LedgerEntry]) -> String {
    if entries.is_empty() {
        return "no commitments recorded\n".to_string();
    }
    let mut out = String::new();
    for e in entries {
        let upfront = e.upfront_amount.map(|u| format!("  upfront ${u}")).unwrap_or_default();
        let _ = writeln!(
            out,
            "{}  {}  {} $/h  {}{}  {}",
            e.plan_id,
            e.offering_id,
            e.commitment_per_hour,
            e.payment_option,
            upfront,
            e.created_at.to_rfc3339()
        );
    }
    out
}
