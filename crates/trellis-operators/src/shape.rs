//! The closed set of shapes and their dispatch.
//!
//! A `Shape` is a reusable description of a computation: every call to
//! [`Shape::cursor`] or [`Shape::prober`] starts an independent execution.
//! Rewriting happens in `trellis-planner`, which pattern-matches on the
//! variants below.

use std::fmt;
use std::sync::Arc;

use trellis_core::prelude::{Costs, Namer, Ref, Result, Value};

use crate::and::And;
use crate::count::Count;
use crate::fixed::{Empty, Fixed};
use crate::limit::Limit;
use crate::materialize::Materialize;
use crate::not::Not;
use crate::or::Or;
use crate::plan::ShapePlan;
use crate::recursive::Recursive;
use crate::resolver::Resolver;
use crate::skip::Skip;
use crate::sort::Sort;
use crate::store::Morphism;
use crate::tag::Tag;
use crate::traits::{BoxCursor, BoxProber, LeafShape};
use crate::unique::Unique;
use crate::value_filter::ValueFilter;

#[derive(Clone)]
pub enum Shape {
    /// Produces nothing.
    Null,
    Fixed(Fixed),
    /// Store refs of a list of values.
    Resolver(Resolver),
    Tag(Tag),
    And(And),
    Or(Or),
    Not(Not),
    Unique(Unique),
    Sort(Sort),
    Limit(Limit),
    Skip(Skip),
    Count(Count),
    ValueFilter(ValueFilter),
    Materialize(Materialize),
    Recursive(Recursive),
    /// Backend-supplied primitive.
    Leaf(Arc<dyn LeafShape>),
}

impl Shape {
    pub fn cursor(&self) -> BoxCursor {
        match self {
            Shape::Null => Box::new(Empty),
            Shape::Fixed(s) => Box::new(s.cursor()),
            Shape::Resolver(s) => Box::new(s.cursor()),
            Shape::Tag(s) => Box::new(s.cursor()),
            Shape::And(s) => Box::new(s.cursor()),
            Shape::Or(s) => Box::new(s.cursor()),
            Shape::Not(s) => Box::new(s.cursor()),
            Shape::Unique(s) => Box::new(s.cursor()),
            Shape::Sort(s) => Box::new(s.cursor()),
            Shape::Limit(s) => Box::new(s.cursor()),
            Shape::Skip(s) => Box::new(s.cursor()),
            Shape::Count(s) => Box::new(s.cursor()),
            Shape::ValueFilter(s) => Box::new(s.cursor()),
            Shape::Materialize(s) => Box::new(s.cursor()),
            Shape::Recursive(s) => Box::new(s.cursor()),
            Shape::Leaf(l) => l.cursor(),
        }
    }

    pub fn prober(&self) -> BoxProber {
        match self {
            Shape::Null => Box::new(Empty),
            Shape::Fixed(s) => Box::new(s.prober()),
            Shape::Resolver(s) => Box::new(s.prober()),
            Shape::Tag(s) => Box::new(s.prober()),
            Shape::And(s) => Box::new(s.prober()),
            Shape::Or(s) => Box::new(s.prober()),
            Shape::Not(s) => Box::new(s.prober()),
            Shape::Unique(s) => Box::new(s.prober()),
            Shape::Sort(s) => s.prober(),
            Shape::Limit(s) => Box::new(s.prober()),
            Shape::Skip(s) => Box::new(s.prober()),
            Shape::Count(s) => Box::new(s.prober()),
            Shape::ValueFilter(s) => Box::new(s.prober()),
            Shape::Materialize(s) => Box::new(s.prober()),
            Shape::Recursive(s) => Box::new(s.prober()),
            Shape::Leaf(l) => l.prober(),
        }
    }

    pub fn stats(&self) -> Result<Costs> {
        match self {
            Shape::Null => Ok(Costs::empty()),
            Shape::Fixed(s) => Ok(s.stats()),
            Shape::Resolver(s) => Ok(s.stats()),
            Shape::Tag(s) => s.stats(),
            Shape::And(s) => s.stats(),
            Shape::Or(s) => s.stats(),
            Shape::Not(s) => s.stats(),
            Shape::Unique(s) => s.stats(),
            Shape::Sort(s) => s.stats(),
            Shape::Limit(s) => s.stats(),
            Shape::Skip(s) => s.stats(),
            Shape::Count(s) => s.stats(),
            Shape::ValueFilter(s) => s.stats(),
            Shape::Materialize(s) => s.stats(),
            Shape::Recursive(s) => s.stats(),
            Shape::Leaf(l) => l.stats(),
        }
    }

    /// Direct sub-shapes, in evaluation order.
    pub fn children(&self) -> Vec<&Shape> {
        match self {
            Shape::Null | Shape::Fixed(_) | Shape::Resolver(_) | Shape::Leaf(_) => Vec::new(),
            Shape::And(s) => s.subs.iter().collect(),
            Shape::Or(s) => s.subs.iter().collect(),
            Shape::Not(s) => vec![&*s.primary, &*s.universe],
            Shape::Tag(Tag { sub, .. })
            | Shape::Unique(Unique { sub })
            | Shape::Sort(Sort { sub, .. })
            | Shape::Limit(Limit { sub, .. })
            | Shape::Skip(Skip { sub, .. })
            | Shape::Count(Count { sub, .. })
            | Shape::ValueFilter(ValueFilter { sub, .. })
            | Shape::Materialize(Materialize { sub, .. })
            | Shape::Recursive(Recursive { sub, .. }) => vec![&**sub],
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Shape::Null => "null",
            Shape::Fixed(_) => "fixed",
            Shape::Resolver(_) => "resolver",
            Shape::Tag(_) => "tag",
            Shape::And(_) => "and",
            Shape::Or(Or {
                short_circuit: true,
                ..
            }) => "short_circuit_or",
            Shape::Or(_) => "or",
            Shape::Not(_) => "not",
            Shape::Unique(_) => "unique",
            Shape::Sort(_) => "sort",
            Shape::Limit(_) => "limit",
            Shape::Skip(_) => "skip",
            Shape::Count(_) => "count",
            Shape::ValueFilter(_) => "value_filter",
            Shape::Materialize(_) => "materialize",
            Shape::Recursive(_) => "recursive",
            Shape::Leaf(l) => l.name(),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Shape::Null)
    }

    /// Serializable description of the whole tree, costs included.
    pub fn describe(&self) -> ShapePlan {
        let mut plan = ShapePlan::new(self.name());
        plan = match self {
            Shape::Fixed(f) => plan.with_param("values", f.len()),
            Shape::Resolver(r) => plan.with_param("values", r.len()),
            Shape::Tag(t) => {
                let mut p = plan.with_param("tags", t.tags.join(","));
                if !t.fixed.is_empty() {
                    let names: Vec<&str> = t.fixed.keys().map(String::as_str).collect();
                    p = p.with_param("fixed", names.join(","));
                }
                p
            }
            Shape::Limit(l) => plan.with_param("limit", l.limit),
            Shape::Skip(s) => plan.with_param("skip", s.skip),
            Shape::ValueFilter(v) => plan.with_param("predicate", &v.label),
            Shape::Materialize(m) => plan.with_param("limit", m.limit),
            Shape::Recursive(r) => {
                let mut p = plan.with_param("max_depth", r.max_depth);
                if !r.depth_tags.is_empty() {
                    p = p.with_param("depth_tags", r.depth_tags.join(","));
                }
                p
            }
            Shape::Leaf(l) => {
                plan.params.extend(l.describe());
                plan
            }
            _ => plan,
        };
        plan.costs = self.stats().ok();
        plan.children = self.children().into_iter().map(Shape::describe).collect();
        plan
    }

    // Builders.

    pub fn fixed(values: impl IntoIterator<Item = Ref>) -> Shape {
        Shape::Fixed(Fixed::new(values))
    }

    pub fn resolver(namer: Arc<dyn Namer>, values: impl IntoIterator<Item = Value>) -> Shape {
        Shape::Resolver(Resolver::new(namer, values))
    }

    pub fn tagged(self, name: impl Into<String>) -> Shape {
        Shape::Tag(Tag::new(self, vec![name.into()]))
    }

    pub fn and(subs: Vec<Shape>) -> Shape {
        Shape::And(And::new(subs))
    }

    pub fn or(subs: Vec<Shape>) -> Shape {
        Shape::Or(Or::new(subs))
    }

    pub fn short_circuit_or(subs: Vec<Shape>) -> Shape {
        Shape::Or(Or::short_circuit(subs))
    }

    /// Everything in `universe` that is not in `primary`.
    pub fn not(primary: Shape, universe: Shape) -> Shape {
        Shape::Not(Not::new(primary, universe))
    }

    pub fn unique(self) -> Shape {
        Shape::Unique(Unique::new(self))
    }

    pub fn sorted(self, namer: Arc<dyn Namer>) -> Shape {
        Shape::Sort(Sort::new(self, namer))
    }

    pub fn limit(self, limit: i64) -> Shape {
        Shape::Limit(Limit::new(self, limit))
    }

    pub fn skip(self, skip: i64) -> Shape {
        Shape::Skip(Skip::new(self, skip))
    }

    pub fn count(self) -> Shape {
        Shape::Count(Count::new(self))
    }

    pub fn materialize(self) -> Shape {
        Shape::Materialize(Materialize::new(self))
    }

    pub fn recursive(self, morphism: Morphism, max_depth: usize) -> Shape {
        Shape::Recursive(Recursive::new(self, morphism, max_depth))
    }
}

impl fmt::Debug for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Shape::Fixed(fx) => write!(f, "Fixed{:?}", fx.values),
            Shape::Leaf(l) => write!(f, "Leaf({})", l.name()),
            Shape::Limit(l) => write!(f, "Limit({}, {:?})", l.limit, l.sub),
            Shape::Skip(s) => write!(f, "Skip({}, {:?})", s.skip, s.sub),
            Shape::Tag(t) => write!(f, "Tag({:?}, {:?})", t.tags, t.sub),
            other => {
                let mut t = f.debug_tuple(other.name());
                for child in other.children() {
                    t.field(child);
                }
                t.finish()
            }
        }
    }
}
