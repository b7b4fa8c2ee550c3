use std::sync::Arc;

use chrono::Utc;

use coverpilot_core::PlanFamily;
use coverpilot_scheduler::{Planner, PlanningReport};

use super::{Context, print_json};
use crate::output;

pub fn plan(ctx: &Context, family: Option<PlanFamily>, dry_run: bool, format: &str) -> anyhow::Result<()> {
    let mut config = ctx.config.clone();
    config.scheduler.dry_run |= dry_run;
    let dry_run = config.scheduler.dry_run;

    let queue = ctx.open_queue()?;
    let ledger = ctx.open_ledger()?;
    let planner = Planner::new(config, ctx.source(), Arc::new(ledger), queue);

    let now = Utc::now();
    let report = match family {
        Some(family) => PlanningReport {
            started_at: now,
            dry_run,
            families: vec![planner.plan_one(family, now)?],
        },
        None => planner.plan_cycle(now),
    };

    if !print_json(format, &report)? {
        print!("{}", output::planning_report(&report));
    }
    Ok(())
}
