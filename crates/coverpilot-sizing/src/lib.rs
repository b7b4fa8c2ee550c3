//! coverpilot-sizing — how much to commit this cycle, and on which terms.
//!
//! # Components
//!
//! - **`strategy`** — `PurchaseSizing` implemented for every configured
//!   strategy (Fixed, Dichotomy, FollowProvider)
//! - **`split`** — spreads a sized commitment across the term/payment mix
//!
//! # Sizing contract
//!
//! ```text
//! projected(c) = effective_coverage + c / hourly_spend * 100
//!
//! effective_coverage >= cap  → 0            (every strategy)
//! Fixed                      → R * max%
//! Dichotomy                  → R * p%, p ∈ {max, max/2, …} ≥ min,
//!                              first p with projected ≤ target, else 0
//! FollowProvider             → R, scaled so projected ≤ cap
//! ```

pub mod split;
pub mod strategy;

pub use split::{SplitResult, split};
pub use strategy::{PurchaseSizing, SizingDecision, SizingInput, SizingOutcome};
