//! coverpilot-analysis — the read-only half of a planning cycle.
//!
//! ```text
//! usage samples ──► SpendingAnalyzer::analyze ──► UsageDistribution
//!                                                   │
//! live coverage ──► compute_effective_coverage ──► CoverageSnapshot
//!                                                   │
//!                   optimal_commitment (advisory) ◄─┘
//! ```
//!
//! Everything here is a pure function of its inputs. Nothing is cached:
//! a `CoverageSnapshot` must be recomputed at every decision point,
//! including at execution time.

pub mod coverage;
pub mod error;
pub mod knee;
pub mod spending;

pub use coverage::{CoverageSnapshot, compute_effective_coverage, projected_coverage};
pub use error::{AnalysisError, AnalysisResult};
pub use knee::{OptimalCommitment, net_savings_at, optimal_commitment};
pub use spending::{DistributionSummary, SpendingAnalyzer, UsageDistribution};
