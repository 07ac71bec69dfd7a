//! Building blocks of a parse session.
//!
//! This module provides:
//! - `RuleChain`: ordered, short-circuiting rule evaluation
//! - `FieldCollector`: duplicate handling and arrival-ordered merging
//! - `CompletionTracker`: the single "is everything done" decision
//! - `ErrorCleanup` / `InFlightFiles`: the one-shot unwind path
//!
//! `Form::parse` wires these together; they are public so that custom
//! orchestrators and tests can drive them directly.

mod chain;
mod cleanup;
mod collector;
mod tracker;

pub use chain::RuleChain;
pub use cleanup::{ErrorCleanup, InFlightFiles};
pub use collector::{Claim, FieldCollector};
pub use tracker::{CompletionTracker, finalize};
