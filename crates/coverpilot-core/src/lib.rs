//! coverpilot-core — shared vocabulary for the Coverpilot crates.
//!
//! Holds the domain types every phase agrees on (plan families, terms,
//! payment options, usage samples), the collaborator traits through which
//! usage data is read and commitments are created, and the `coverpilot.toml`
//! configuration parser.

pub mod config;
pub mod error;
pub mod provider;
pub mod types;

pub use config::CoverpilotConfig;
pub use error::{ApiError, ConfigError, ConfigResult, SourceError};
pub use provider::{CommitmentApi, CreatePlanRequest, UsageSource};
pub use types::*;
