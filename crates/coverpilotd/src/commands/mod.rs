pub mod ledger;
pub mod plan;
pub mod purchase;
pub mod queue;
pub mod run;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context as _;
use tracing::debug;

use coverpilot_core::CoverpilotConfig;
use coverpilot_purchaser::LocalLedger;
use coverpilot_queue::{IntentQueue, QueueSettings};

use crate::source::FileUsageSource;

/// Configuration and collaborator paths shared by every command.
pub struct Context {
    pub config: CoverpilotConfig,
    pub usage_file: PathBuf,
}

impl Context {
    pub fn load(config_path: &Path, usage_file: &Path) -> anyhow::Result<Self> {
        let config = CoverpilotConfig::from_file(config_path)
            .with_context(|| format!("loading {}", config_path.display()))?;
        debug!(path = ?config_path, families = config.families.enabled().len(), "configuration loaded");
        Ok(Self {
            config,
            usage_file: usage_file.to_path_buf(),
        })
    }

    fn ensure_data_dir(&self) -> anyhow::Result<()> {
        let dir = &self.config.storage.data_dir;
        std::fs::create_dir_all(dir).with_context(|| format!("creating data dir {}", dir.display()))
    }

    pub fn open_queue(&self) -> anyhow::Result<IntentQueue> {
        self.ensure_data_dir()?;
        let path = self.config.storage.queue_path();
        IntentQueue::open(&path, QueueSettings::from_config(&self.config.purchaser))
            .with_context(|| format!("opening queue {}", path.display()))
    }

    pub fn open_ledger(&self) -> anyhow::Result<LocalLedger> {
        self.ensure_data_dir()?;
        let path = self.config.storage.ledger_path();
        LocalLedger::open(&path).with_context(|| format!("opening ledger {}", path.display()))
    }

    pub fn source(&self) -> Arc<FileUsageSource> {
        Arc::new(FileUsageSource::new(&self.usage_file))
    }
}

/// Print `value` as pretty JSON when `format` asks for it.
///
/// Returns false when the caller should print text instead.
pub fn print_json<T: serde::Serialize>(format: &str, value: &T) -> anyhow::Result<bool> {
    if format == "json" {
        println!("{}", serde_json::to_string_pretty(value)?);
        Ok(true)
    } else {
        Ok(false)
    }
}
