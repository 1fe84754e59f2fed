//! Decision primitives.
//!
//! Per-policy votes and the pure reduction that combines them into a single
//! admission decision.

mod aggregate;
mod vote;

pub use aggregate::{aggregate, AggregateDecision};
pub use vote::{Action, Decision};
