//! # Meta-Exchange Router Crate
//!
//! This crate computes best-execution plans: it splits a buy or sell request
//! across the resting orders of several exchanges so that the weighted average
//! fill price is as good as possible, without overdrawing any exchange.
//!
//! ## Architectural Principles
//!
//! - **Pure Core:** No I/O. Snapshots come in from the caller and go back out
//!   mutated; loading and persisting them is the `storage` crate's job.
//! - **Pipeline:** `ranker` orders the candidates, `feasibility` checks
//!   aggregate funds, `engine` fills greedily and `plan` aggregates the fills.
//!
//! ## Public API
//!
//! - `compute_best_execution`: One-shot entry point with default settings.
//! - `BestExecutionRouter`: The configurable router.
//! - `ExecutionOutcome`: Either an executed plan or an exceeded limit.
//! - `RouterError`: The specific error types that can be returned from this crate.

// Declare the modules that constitute this crate.
pub mod best_execution;
pub mod engine;
pub mod error;
pub mod feasibility;
pub mod plan;
pub mod ranker;

// Re-export the key components to provide a clean, public-facing API.
pub use best_execution::{BestExecutionRouter, ExecutionOutcome};
pub use error::RouterError;
pub use feasibility::Feasibility;
pub use ranker::Candidate;

use core_types::{ExchangeSnapshot, OrderSide};
use rust_decimal::Decimal;

/// Computes and applies the best execution of `amount` on `side` using the
/// default router settings.
pub fn compute_best_execution(
    side: OrderSide,
    amount: Decimal,
    exchanges: &mut [ExchangeSnapshot],
) -> Result<ExecutionOutcome, RouterError> {
    BestExecutionRouter::default().execute(side, amount, exchanges)
}
