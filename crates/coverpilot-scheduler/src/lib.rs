//! coverpilot-scheduler — the planning half of the workflow.
//!
//! One planning cycle walks every enabled plan family:
//!
//! ```text
//! usage series ─► distribution ─► fresh coverage ─► advisory knee point
//!       ─► sizing strategy ─► term/payment split ─► offering lookup
//!       ─► PurchaseIntent per slice ─► intent queue (unless dry run)
//! ```
//!
//! Families are independent: an error in one is recorded in the report
//! and the cycle moves on. Nothing is written to the queue for a family
//! until every one of its intents has been built.

pub mod error;
pub mod planner;
pub mod report;

pub use error::{PlanningError, PlanningResult};
pub use planner::Planner;
pub use report::{FamilyPlanReport, PlanStatus, PlanningReport};
