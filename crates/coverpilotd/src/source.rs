//! FileUsageSource — usage data read from a JSON export.
//!
//! The file is re-read on every call so each cycle sees fresh coverage.
//!
//! ```json
//! {
//!   "families": {
//!     "COMPUTE": {
//!       "coverage_percent": 62.0,
//!       "hourly_spend": 110.0,
//!       "recommended_commitment": 25.0,
//!       "active_commitments": [
//!         { "plan_id": "sp-1", "commitment_per_hour": 40.0, "expires_at": "2027-01-01T00:00:00Z" }
//!       ],
//!       "usage": [ { "timestamp": "2026-09-30T23:00:00Z", "amount": 104.2 } ]
//!     }
//!   }
//! }
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::Deserialize;
use tracing::debug;

use coverpilot_core::{
    ActiveCommitment, CurrentCoverage, Granularity, PlanFamily, SourceError, UsageSample, UsageSource,
};

#[derive(Debug, Deserialize)]
struct UsageExport {
    #[serde(default)]
    families: BTreeMap<String, FamilyExport>,
}

#[derive(Debug, Deserialize)]
struct FamilyExport {
    coverage_percent: f64,
    hourly_spend: f64,
    #[serde(default)]
    recommended_commitment: Option<f64>,
    #[serde(default)]
    active_commitments: Vec<CommitmentExport>,
    #[serde(default)]
    usage: Vec<SampleExport>,
}

#[derive(Debug, Deserialize)]
struct CommitmentExport {
    plan_id: String,
    commitment_per_hour: f64,
    expires_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
struct SampleExport {
    timestamp: DateTime<Utc>,
    amount: f64,
}

pub struct FileUsageSource {
    path: PathBuf,
}

impl FileUsageSource {
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
        }
    }

    fn load(&self) -> Result<UsageExport, SourceError> {
        let content = std::fs::read_to_string(&self.path)
            .map_err(|e| SourceError::Unavailable(format!("{}: {e}", self.path.display())))?;
        serde_json::from_str(&content)
            .map_err(|e| SourceError::Malformed(format!("{}: {e}", self.path.display())))
    }

    fn with_family<T>(
        &self,
        family: PlanFamily,
        f: impl FnOnce(FamilyExport) -> Result<T, SourceError>,
    ) -> Result<T, SourceError> {
        let export = self.load()?;
        let found = export
            .families
            .into_iter()
            .find(|(name, _)| name.parse::<PlanFamily>().ok() == Some(family));
        match found {
            Some((_, data)) => f(data),
            None => Err(SourceError::Unavailable(format!("no usage exported for {family}"))),
        }
    }
}

impl UsageSource for FileUsageSource {
    fn usage_series(
        &self,
        family: PlanFamily,
        lookback_days: u32,
        granularity: Granularity,
    ) -> Result<Vec<UsageSample>, SourceError> {
        self.with_family(family, |data| {
            let mut samples: Vec<UsageSample> = data
                .usage
                .into_iter()
                .map(|s| UsageSample {
                    timestamp: s.timestamp,
                    family,
                    amount: s.amount,
                })
                .collect();
            samples.sort_by_key(|s| s.timestamp);

            if let Some(latest) = samples.last().map(|s| s.timestamp) {
                let cutoff = latest - Duration::days(i64::from(lookback_days));
                samples.retain(|s| s.timestamp > cutoff);
            }
            let samples = match granularity {
                Granularity::Hourly => samples,
                Granularity::Daily => daily_means(&samples, family),
            };
            debug!(%family, samples = samples.len(), path = ?self.path, "usage series loaded");
            Ok(samples)
        })
    }

    fn current_coverage(&self, family: PlanFamily) -> Result<CurrentCoverage, SourceError> {
        self.with_family(family, |data| {
            Ok(CurrentCoverage {
                coverage_percent: data.coverage_percent,
                active_commitments: data
                    .active_commitments
                    .into_iter()
                    .map(|c| ActiveCommitment {
                        plan_id: c.plan_id,
                        family,
                        commitment_per_hour: c.commitment_per_hour,
                        expires_at: c.expires_at,
                    })
                    .collect(),
                hourly_spend: data.hourly_spend,
            })
        })
    }

    fn recommended_commitment(&self, family: PlanFamily, _lookback_days: u32) -> Result<Option<f64>, SourceError> {
        self.with_family(family, |data| Ok(data.recommended_commitment))
    }
}

/// Average hourly samples into one sample per UTC day, stamped at midnight.
fn daily_means(samples: &[UsageSample], family: PlanFamily) -> Vec<UsageSample> {
    let mut days: BTreeMap<NaiveDate, (f64, u32)> = BTreeMap::new();
    for s in samples {
        let day = days.entry(s.timestamp.date_naive()).or_insert((0.0, 0));
        day.0 += s.amount;
        day.1 += 1;
    }
    days.into_iter()
        .map(|(date, (sum, count))| UsageSample {
            timestamp: date.and_time(chrono::NaiveTime::MIN).and_utc(),
            family,
            amount: sum / f64::from(count),
        })
        .collect()
}
