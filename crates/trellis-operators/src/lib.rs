#![forbid(unsafe_code)]
//! trellis-operators: the iterator algebra (shapes, cursors, probers).
//!
//! Design intent:
//! - Keep this crate pure and synchronous: no threads, no async.
//! - Every combinator is one variant of the closed [`Shape`] enum; the planner
//!   pattern-matches on them.
//! - Each shape reports [`Costs`](trellis_core::costs::Costs) through
//!   `stats()` so the planner and Count can avoid needless enumeration.

pub mod plan;
pub mod shape;
pub mod store;
pub mod traits;

pub mod and;
pub mod count;
pub mod fixed;
pub mod limit;
pub mod materialize;
pub mod not;
pub mod or;
pub mod recursive;
pub mod resolver;
pub mod skip;
pub mod sort;
pub mod tag;
pub mod unique;
pub mod value_filter;

pub use plan::ShapePlan;
pub use recursive::RECURSIVE_BASE_TAG;
pub use shape::Shape;
pub use store::{morphism, Morphism, QuadStore};
pub use traits::{Base, BoxCursor, BoxProber, CloseErrors, Cursor, LeafShape, Prober};
