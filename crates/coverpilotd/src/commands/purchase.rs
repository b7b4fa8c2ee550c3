use std::sync::Arc;

use chrono::Utc;

use coverpilot_purchaser::PurchaseExecutor;

use super::{Context, print_json};
use crate::output;

pub fn purchase(ctx: &Context, format: &str) -> anyhow::Result<()> {
    let queue = ctx.open_queue()?;
    let ledger = ctx.open_ledger()?;
    let executor = PurchaseExecutor::new(&ctx.config, ctx.source(), Arc::new(ledger), queue);

    match executor.run_cycle(Utc::now())? {
        Some(report) => {
            if !print_json(format, &report)? {
                print!("{}", output::execution_report(&report));
            }
        }
        None => println!("queue empty, nothing to execute"),
    }
    Ok(())
}
