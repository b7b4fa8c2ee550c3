//! coverpilot.toml configuration parser.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ConfigResult};
use crate::types::{Granularity, PaymentOption, PlanFamily, Term};

/// Longest lease a consumer may hold (12 hours).
pub const MAX_VISIBILITY_TIMEOUT_SECS: u64 = 43_200;

/// Tolerance on the sum of a family's term/payment weights.
pub const WEIGHT_SUM_TOLERANCE: f64 = 1e-4;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CoverpilotConfig {
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    #[serde(default)]
    pub coverage: CoverageConfig,
    #[serde(default)]
    pub purchaser: PurchaserConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub families: FamiliesConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    pub lookback_days: u32,
    /// Minimum usage history before a family may be planned.
    pub min_data_days: u32,
    pub granularity: Granularity,
    /// Slices smaller than this ($/h) are dropped by the split.
    pub min_commitment_per_plan: f64,
    /// Rate assumed by the knee-point report when no commitment is active.
    pub default_discount_rate: f64,
    /// Plan and report, but never write to the queue.
    pub dry_run: bool,
    pub strategy: StrategyConfig,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            lookback_days: 30,
            min_data_days: 14,
            granularity: Granularity::Hourly,
            min_commitment_per_plan: 0.001,
            default_discount_rate: 0.30,
            dry_run: false,
            strategy: StrategyConfig::default(),
        }
    }
}

/// Sizing strategy selection, chosen once per configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StrategyConfig {
    Fixed {
        max_purchase_percent: f64,
    },
    Dichotomy {
        max_purchase_percent: f64,
        min_purchase_percent: f64,
    },
    FollowProvider,
}

impl Default for StrategyConfig {
    fn default() -> Self {
        StrategyConfig::Dichotomy {
            max_purchase_percent: 50.0,
            min_purchase_percent: 1.0,
        }
    }
}

/// Coverage targets shared by both phases.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CoverageConfig {
    pub target_percent: f64,
    /// Hard cap: no purchase may project effective coverage above this.
    pub max_cap_percent: f64,
    pub renewal_window_days: u32,
}

impl Default for CoverageConfig {
    fn default() -> Self {
        Self {
            target_percent: 90.0,
            max_cap_percent: 95.0,
            renewal_window_days: 7,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PurchaserConfig {
    /// Deliveries before a message is dead-lettered.
    pub max_receives: u32,
    /// Lease length of a received message.
    pub visibility_timeout_secs: u64,
    /// Messages received per queue poll.
    pub batch_size: usize,
}

impl Default for PurchaserConfig {
    fn default() -> Self {
        Self {
            max_receives: 3,
            visibility_timeout_secs: 900,
            batch_size: 10,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub data_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("/var/lib/coverpilot"),
        }
    }
}

impl StorageConfig {
    pub fn queue_path(&self) -> PathBuf {
        self.data_dir.join("queue.redb")
    }

    pub fn ledger_path(&self) -> PathBuf {
        self.data_dir.join("ledger.redb")
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FamiliesConfig {
    pub compute: Option<FamilyConfig>,
    pub database: Option<FamilyConfig>,
    pub sagemaker: Option<FamilyConfig>,
}

impl FamiliesConfig {
    pub fn get(&self, family: PlanFamily) -> Option<&FamilyConfig> {
        match family {
            PlanFamily::Compute => self.compute.as_ref(),
            PlanFamily::Database => self.database.as_ref(),
            PlanFamily::Sagemaker => self.sagemaker.as_ref(),
        }
    }

    /// Families that are configured and enabled, in a fixed order.
    pub fn enabled(&self) -> Vec<(PlanFamily, &FamilyConfig)> {
        PlanFamily::ALL
            .into_iter()
            .filter_map(|f| self.get(f).filter(|c| c.enabled).map(|c| (f, c)))
            .collect()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FamilyConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Known discount rate for this family, if one has been observed.
    pub discount_rate: Option<f64>,
    #[serde(default)]
    pub weights: Vec<TermWeight>,
}

/// Share of a family's commitment placed on one term/payment combination.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TermWeight {
    pub term: Term,
    pub payment_option: PaymentOption,
    pub weight: f64,
}

fn default_true() -> bool {
    true
}

impl FamilyConfig {
    pub fn weight_sum(&self) -> f64 {
        self.weights.iter().map(|w| w.weight).sum()
    }
}

impl CoverpilotConfig {
    /// Load and validate a config file.
    pub fn from_file(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> ConfigResult<Self> {
        let config: CoverpilotConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }

    /// Check every cross-field constraint. Returns the first violation.
    pub fn validate(&self) -> ConfigResult<()> {
        let cov = &self.coverage;
        if !(cov.target_percent > 0.0 && cov.target_percent <= cov.max_cap_percent) {
            return invalid(format!(
                "coverage target {} must be in (0, max_cap_percent {}]",
                cov.target_percent, cov.max_cap_percent
            ));
        }
        if cov.max_cap_percent > 100.0 {
            return invalid(format!("max_cap_percent {} exceeds 100", cov.max_cap_percent));
        }

        let sched = &self.scheduler;
        if sched.lookback_days == 0 {
            return invalid("lookback_days must be positive".to_string());
        }
        if sched.min_data_days > sched.lookback_days {
            return invalid(format!(
                "min_data_days {} exceeds lookback_days {}",
                sched.min_data_days, sched.lookback_days
            ));
        }
        if !(sched.min_commitment_per_plan >= 0.0 && sched.min_commitment_per_plan.is_finite()) {
            return invalid("min_commitment_per_plan must be a non-negative number".to_string());
        }
        check_discount_rate("default_discount_rate", sched.default_discount_rate)?;

        match sched.strategy {
            StrategyConfig::Fixed { max_purchase_percent } => {
                check_percent("max_purchase_percent", max_purchase_percent)?;
            }
            StrategyConfig::Dichotomy {
                max_purchase_percent,
                min_purchase_percent,
            } => {
                check_percent("max_purchase_percent", max_purchase_percent)?;
                check_percent("min_purchase_percent", min_purchase_percent)?;
                if min_purchase_percent > max_purchase_percent {
                    return invalid(format!(
                        "min_purchase_percent {min_purchase_percent} exceeds max_purchase_percent {max_purchase_percent}"
                    ));
                }
            }
            StrategyConfig::FollowProvider => {}
        }

        let purchaser = &self.purchaser;
        if !(1..=10).contains(&purchaser.max_receives) {
            return invalid(format!(
                "max_receives {} must be between 1 and 10",
                purchaser.max_receives
            ));
        }
        if !(1..=MAX_VISIBILITY_TIMEOUT_SECS).contains(&purchaser.visibility_timeout_secs) {
            return invalid(format!(
                "visibility_timeout_secs {} must be between 1 and {MAX_VISIBILITY_TIMEOUT_SECS}",
                purchaser.visibility_timeout_secs
            ));
        }
        if purchaser.batch_size == 0 {
            return invalid("batch_size must be positive".to_string());
        }

        for (family, fc) in self.families.enabled() {
            if fc.weights.is_empty() {
                return invalid(format!("{family}: no term/payment weights configured"));
            }
            if let Some(w) = fc.weights.iter().find(|w| !(0.0..=1.0).contains(&w.weight)) {
                return invalid(format!("{family}: weight {} outside [0, 1]", w.weight));
            }
            let sum = fc.weight_sum();
            if (sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
                return invalid(format!("{family}: weights sum to {sum}, expected 1.0"));
            }
            if let Some(rate) = fc.discount_rate {
                check_discount_rate("discount_rate", rate)?;
            }
        }

        Ok(())
    }
}

fn invalid(msg: String) -> ConfigResult<()> {
    Err(ConfigError::Invalid(msg))
}

fn check_percent(name: &str, value: f64) -> ConfigResult<()> {
    if value > 0.0 && value <= 100.0 {
        Ok(())
    } else {
        invalid(format!("{name} {value} must be in (0, 100]"))
    }
}

fn check_discount_rate(name: &str, value: f64) -> ConfigResult<()> {
    if value > 0.0 && value < 1.0 {
        Ok(())
    } else {
        invalid(format!("{name} {value} must be in (0, 1)"))
    }
}
