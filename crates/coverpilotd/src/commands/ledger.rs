use super::{Context, print_json};
use crate::output;

pub fn list(ctx: &Context, format: &str) -> anyhow::Result<()> {
    let entries = ctx.open_ledger()?.list()?;
    if !print_json(format, &entries)? {
        print!("{}", output::ledger(&entries));
    }
    Ok(())
}
