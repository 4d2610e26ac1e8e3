#![forbid(unsafe_code)]
//! trellis-planner: rewrites a shape tree into a cheaper equivalent one and
//! summarises what executing it is expected to cost.
//!
//! - `rules`: bottom-up rewrite passes, applied until a fixpoint.
//! - `cost`: folds per-shape [`Costs`](trellis_core::costs::Costs) into a
//!   single `PlanEstimate`.
//!
//! Rewrites never change the multiset of (result, tags) pairs a shape
//! enumerates. Order may change, but only where no enclosing shape (or
//! caller, see [`Optimizer::preserving_order`]) can observe it.

pub mod cost;
pub mod rules;

pub use cost::{estimate_plan, PlanEstimate};
pub use rules::{optimize, Optimizer};
