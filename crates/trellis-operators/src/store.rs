//! Store contract consumed by leaf shapes and Recursive, and the morphism
//! calling convention.

use std::sync::Arc;

use trellis_core::prelude::{Delta, Direction, IgnoreOpts, Namer, Ref, Result, StoreStats};

use crate::shape::Shape;

/// Maps a shape to a derived shape, e.g. one hop along a predicate. Must not
/// have side effects beyond store reads.
pub type Morphism = Arc<dyn Fn(Shape) -> Shape + Send + Sync>;

pub fn morphism(f: impl Fn(Shape) -> Shape + Send + Sync + 'static) -> Morphism {
    Arc::new(f)
}

/// A quad store as seen by the query core.
///
/// Read operations must stay callable for the lifetime of an execution.
/// Write serialization is the store's own business.
pub trait QuadStore: Namer {
    /// Leaf shape over every quad whose `dir` component is `node`.
    fn quad_iterator(&self, dir: Direction, node: &Ref) -> Result<Shape>;

    /// The `dir` component of a quad ref. Unknown quads yield `Ok(None)`.
    fn quad_direction(&self, quad: &Ref, dir: Direction) -> Result<Option<Ref>>;

    /// Node and quad counts; `exact` asks for exact counts even if costly.
    fn stats(&self, exact: bool) -> Result<StoreStats>;

    /// Apply a batch of writes atomically.
    fn apply_deltas(&self, deltas: &[Delta], opts: IgnoreOpts) -> Result<()>;
}
