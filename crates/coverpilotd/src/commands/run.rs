use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tracing::info;

use coverpilot_purchaser::PurchaseExecutor;
use coverpilot_scheduler::Planner;

use super::Context;

pub async fn run(ctx: &Context, plan_interval: u64, purchase_interval: u64) -> anyhow::Result<()> {
    info!(dry_run = ctx.config.scheduler.dry_run, "Coverpilot daemon starting");

    // One handle per database: redb refuses a second open in-process.
    let queue = ctx.open_queue()?;
    let ledger = Arc::new(ctx.open_ledger()?);
    let source = ctx.source();

    let planner = Arc::new(Planner::new(
        ctx.config.clone(),
        source.clone(),
        ledger.clone(),
        queue.clone(),
    ));
    let executor = Arc::new(PurchaseExecutor::new(&ctx.config, source, ledger, queue));

    // ── Shutdown signal ────────────────────────────────────────

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let plan_shutdown = shutdown_rx.clone();
    let purchase_shutdown = shutdown_rx;

    // ── Start cycles ───────────────────────────────────────────

    let plan_handle = tokio::spawn(async move {
        planner
            .run(Duration::from_secs(plan_interval), plan_shutdown)
            .await;
    });
    let purchase_handle = tokio::spawn(async move {
        executor
            .run(Duration::from_secs(purchase_interval), purchase_shutdown)
            .await;
    });

    tokio::signal::ctrl_c().await?;
    info!("shutdown signal received");
    let _ = shutdown_tx.send(true);

    let _ = plan_handle.await;
    let _ = purchase_handle.await;

    info!("Coverpilot daemon stopped");
    Ok(())
}
