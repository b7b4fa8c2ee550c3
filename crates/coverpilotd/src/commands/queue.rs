use chrono::Utc;
use uuid::Uuid;

use coverpilot_queue::CancelOutcome;

use super::{Context, print_json};
use crate::output;

pub fn list(ctx: &Context, format: &str) -> anyhow::Result<()> {
    let queued = ctx.open_queue()?.list_queued()?;
    if !print_json(format, &queued)? {
        print!("{}", output::queued_intents(&queued));
    }
    Ok(())
}

pub fn cancel(ctx: &Context, client_token: Uuid) -> anyhow::Result<()> {
    match ctx.open_queue()?.cancel(client_token, Utc::now())? {
        CancelOutcome::Cancelled => println!("✓ cancelled {client_token}"),
        CancelOutcome::InFlight => {
            anyhow::bail!("{client_token} is being executed and can no longer be cancelled")
        }
        CancelOutcome::NotFound => anyhow::bail!("{client_token} is not in the queue"),
    }
    Ok(())
}

pub fn dead_letters(ctx: &Context, format: &str) -> anyhow::Result<()> {
    let letters = ctx.open_queue()?.list_dead_letters()?;
    if !print_json(format, &letters)? {
        print!("{}", output::dead_letters(&letters));
    }
    Ok(())
}

pub fn redrive(ctx: &Context, client_token: &str) -> anyhow::Result<()> {
    if ctx.open_queue()?.redrive_dead_letter(client_token, Utc::now())? {
        println!("✓ requeued {client_token}");
        Ok(())
    } else {
        anyhow::bail!("{client_token} is not in the dead-letter table")
    }
}
