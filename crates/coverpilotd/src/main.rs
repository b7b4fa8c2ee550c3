//! coverpilotd — the Coverpilot daemon.
//!
//! Runs the planning and execution cycles, either once (`plan`,
//! `purchase`) or on a schedule (`run`), and gives operators the review
//! window: list, cancel and redrive queued intents.
//!
//! # Usage
//!
//! ```text
//! coverpilotd --config coverpilot.toml --usage-file usage.json plan --dry-run
//! coverpilotd queue list
//! coverpilotd queue cancel 8c1f3f6e-4b8e-4d2a-9d65-2f0f8a8e1c11
//! coverpilotd run --plan-interval 86400 --purchase-interval 3600
//! ```

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use coverpilot_core::PlanFamily;

mod commands;
mod output;
mod source;

const DEFAULT_LOG_FILTER: &str = "info,coverpilot=debug";

#[derive(Parser)]
#[command(
    name = "coverpilotd",
    about = "Coverpilot — commitment coverage planning and purchasing",
    version,
    propagate_version = true
)]
struct Cli {
    /// Path to coverpilot.toml.
    #[arg(short, long, global = true, default_value = "coverpilot.toml")]
    config: PathBuf,

    /// Usage export read by every cycle.
    #[arg(long, global = true, default_value = "usage.json")]
    usage_file: PathBuf,

    /// Emit logs as JSON lines.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run one planning cycle and queue purchase intents.
    Plan {
        /// Plan a single family instead of every enabled one.
        #[arg(long)]
        family: Option<PlanFamily>,
        /// Build and report intents without queueing them.
        #[arg(long)]
        dry_run: bool,
        /// Output format: text or json
        #[arg(short, long, default_value = "text")]
        format: String,
    },
    /// Run one execution cycle over the queued intents.
    Purchase {
        #[arg(short, long, default_value = "text")]
        format: String,
    },
    /// Run both cycles on intervals until Ctrl-C.
    Run {
        /// Seconds between planning cycles.
        #[arg(long, default_value = "86400")]
        plan_interval: u64,
        /// Seconds between execution cycles.
        #[arg(long, default_value = "3600")]
        purchase_interval: u64,
    },
    /// Review the intent queue.
    Queue {
        #[command(subcommand)]
        action: QueueAction,
    },
    /// Commitments recorded by the local ledger.
    Ledger {
        #[arg(short, long, default_value = "text")]
        format: String,
    },
}

#[derive(Subcommand)]
enum QueueAction {
    /// List queued intents.
    List {
        #[arg(short, long, default_value = "text")]
        format: String,
    },
    /// Cancel a queued intent before it is executed.
    Cancel { client_token: Uuid },
    /// List dead-lettered intents.
    DeadLetters {
        #[arg(short, long, default_value = "text")]
        format: String,
    },
    /// Put a dead-lettered intent back on the queue.
    Redrive { client_token: String },
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.json);

    let ctx = commands::Context::load(&cli.config, &cli.usage_file)?;

    match cli.command {
        Command::Plan {
            family,
            dry_run,
            format,
        } => commands::plan::plan(&ctx, family, dry_run, &format),
        Command::Purchase { format } => commands::purchase::purchase(&ctx, &format),
        Command::Run {
            plan_interval,
            purchase_interval,
        } => commands::run::run(&ctx, plan_interval, purchase_interval).await,
        Command::Queue { action } => match action {
            QueueAction::List { format } => commands::queue::list(&ctx, &format),
            QueueAction::Cancel { client_token } => commands::queue::cancel(&ctx, client_token),
            QueueAction::DeadLetters { format } => commands::queue::dead_letters(&ctx, &format),
            QueueAction::Redrive { client_token } => commands::queue::redrive(&ctx, &client_token),
        },
        Command::Ledger { format } => commands::ledger::list(&ctx, &format),
    }
}
