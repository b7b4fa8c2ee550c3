//! Shared types used across Coverpilot crates.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Seconds in a 365-day year, the unit commitment terms are sold in.
pub const SECONDS_PER_YEAR: u64 = 365 * 24 * 3600;

/// A class of eligible usage with its own commitment product.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PlanFamily {
    #[serde(alias = "compute")]
    Compute,
    #[serde(alias = "database")]
    Database,
    #[serde(alias = "sagemaker")]
    Sagemaker,
}

impl PlanFamily {
    pub const ALL: [PlanFamily; 3] = [PlanFamily::Compute, PlanFamily::Database, PlanFamily::Sagemaker];

    pub fn as_str(&self) -> &'static str {
        match self {
            PlanFamily::Compute => "COMPUTE",
            PlanFamily::Database => "DATABASE",
            PlanFamily::Sagemaker => "SAGEMAKER",
        }
    }
}

impl fmt::Display for PlanFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PlanFamily {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "compute" => Ok(PlanFamily::Compute),
            "database" => Ok(PlanFamily::Database),
            "sagemaker" => Ok(PlanFamily::Sagemaker),
            other => Err(format!("unknown plan family: {other}")),
        }
    }
}

/// Commitment term length.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Term {
    OneYear,
    ThreeYears,
}

impl Term {
    pub fn seconds(&self) -> u64 {
        match self {
            Term::OneYear => SECONDS_PER_YEAR,
            Term::ThreeYears => 3 * SECONDS_PER_YEAR,
        }
    }

    pub fn hours(&self) -> u64 {
        self.seconds() / 3600
    }

    pub fn from_seconds(seconds: u64) -> Option<Self> {
        match seconds {
            s if s == SECONDS_PER_YEAR => Some(Term::OneYear),
            s if s == 3 * SECONDS_PER_YEAR => Some(Term::ThreeYears),
            _ => None,
        }
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Term::OneYear => f.write_str("1y"),
            Term::ThreeYears => f.write_str("3y"),
        }
    }
}

/// How the commitment is paid for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentOption {
    #[serde(alias = "all_upfront")]
    AllUpfront,
    #[serde(alias = "partial_upfront")]
    PartialUpfront,
    #[serde(alias = "no_upfront")]
    NoUpfront,
}

impl PaymentOption {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentOption::AllUpfront => "ALL_UPFRONT",
            PaymentOption::PartialUpfront => "PARTIAL_UPFRONT",
            PaymentOption::NoUpfront => "NO_UPFRONT",
        }
    }
}

impl fmt::Display for PaymentOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Bucket size of the usage series requested from the data source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Granularity {
    #[default]
    Hourly,
    Daily,
}

impl Granularity {
    pub fn seconds(&self) -> i64 {
        match self {
            Granularity::Hourly => 3600,
            Granularity::Daily => 86_400,
        }
    }
}

/// Hourly spend for one plan family at one point in time.
///
/// Amounts are commitment-equivalent dollars per hour: the same unit a
/// commitment is expressed in.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UsageSample {
    pub timestamp: DateTime<Utc>,
    pub family: PlanFamily,
    pub amount: f64,
}

/// A commitment currently in force, as reported by the data source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActiveCommitment {
    pub plan_id: String,
    pub family: PlanFamily,
    pub commitment_per_hour: f64,
    pub expires_at: DateTime<Utc>,
}

/// Live coverage figures for one plan family.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrentCoverage {
    /// Provider-reported coverage (0–100).
    pub coverage_percent: f64,
    pub active_commitments: Vec<ActiveCommitment>,
    /// Current eligible spend per hour, used to project added commitments.
    pub hourly_spend: f64,
}

/// One slice of a split commitment.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlannedPlan {
    pub term: Term,
    pub payment_option: PaymentOption,
    pub commitment_per_hour: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn term_seconds_roundtrip() {
        assert_eq!(Term::OneYear.seconds(), 31_536_000);
        assert_eq!(Term::ThreeYears.seconds(), 94_608_000);
        assert_eq!(Term::from_seconds(94_608_000), Some(Term::ThreeYears));
        assert_eq!(Term::from_seconds(12), None);
        assert_eq!(Term::OneYear.hours(), 8760);
    }

    #[test]
    fn plan_family_wire_names() {
        let json = serde_json::to_string(&PlanFamily::Sagemaker).unwrap();
        assert_eq!(json, "\"SAGEMAKER\"");
        let back: PlanFamily = serde_json::from_str("\"compute\"").unwrap();
        assert_eq!(back, PlanFamily::Compute);
        assert_eq!("Database".parse::<PlanFamily>(), Ok(PlanFamily::Database));
        assert!("storage".parse::<PlanFamily>().is_err());
    }

    #[test]
    fn payment_option_wire_names() {
        let json = serde_json::to_string(&PaymentOption::PartialUpfront).unwrap();
        assert_eq!(json, "\"PARTIAL_UPFRONT\"");
        assert_eq!(PaymentOption::NoUpfront.to_string(), "NO_UPFRONT");
    }
}
