#![forbid(unsafe_code)]
//! trellis-exec: drives a shape to completion on behalf of a caller.
//!
//! A [`Chain`] optimizes the shape (unless told not to), opens one cursor,
//! walks results and alternative paths under an optional limit, and closes
//! the cursor exactly once however the walk ends. Iteration is pull-based
//! and single-threaded; the only suspension point is the bounded channel
//! handoff in [`Chain::send`].

pub mod chain;
pub mod context;
pub mod fingerprint;
pub mod metrics;

pub use chain::{Chain, Explain};
pub use context::{CancellationToken, ExecContext};
pub use fingerprint::plan_fingerprint;
pub use metrics::ChainMetrics;
