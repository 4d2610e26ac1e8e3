//! Bottom-up rewrite rules.
//!
//! Each pass optimizes children first, then applies the local rules of the
//! node itself, and reports whether anything changed. Callers re-apply passes
//! until nothing changes ([`Optimizer::optimize_fully`]).
//!
//! Every rule preserves the multiset of (result, tags) pairs a shape
//! enumerates. Some shapes also depend on the order their sub-shape produces
//! results in (Limit, Skip, Unique and Recursive keep the first matches they
//! see), so the pass carries an [`Order`] down the tree and never reorders
//! And sub-shapes where order is kept. Sub-shapes whose prober can disagree
//! with their cursor never change role either.

use tracing::debug;
use trellis_core::config::ExecConfig;
use trellis_core::prelude::Result;
use trellis_operators::and::And;
use trellis_operators::count::Count;
use trellis_operators::limit::Limit;
use trellis_operators::materialize::Materialize;
use trellis_operators::not::Not;
use trellis_operators::or::Or;
use trellis_operators::recursive::Recursive;
use trellis_operators::skip::Skip;
use trellis_operators::sort::Sort;
use trellis_operators::tag::Tag;
use trellis_operators::unique::Unique;
use trellis_operators::value_filter::ValueFilter;
use trellis_operators::Shape;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Optimizer {
    /// Cap for Materialize shapes inserted by the optimizer.
    pub materialize_limit: usize,
    pub max_passes: usize,
    /// Keep the root's enumeration order, e.g. when only a prefix of the
    /// results will be read.
    pub preserve_order: bool,
}

/// Whether the enumeration order of a subtree is observable from above.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Order {
    Free,
    Kept,
}

impl Order {
    fn keep_if(self, cond: bool) -> Order {
        if cond {
            Order::Kept
        } else {
            self
        }
    }
}

impl Default for Optimizer {
    fn default() -> Self {
        Self::new(&ExecConfig::default())
    }
}

/// One pass with default settings.
pub fn optimize(shape: Shape) -> Result<(Shape, bool)> {
    Optimizer::default().optimize(shape)
}

fn rewrote(rule: &'static str, shape: Shape) -> (Shape, bool) {
    debug!(rule, result = shape.name(), "optimizer rewrite");
    (shape, true)
}

impl Optimizer {
    pub fn new(cfg: &ExecConfig) -> Self {
        Self {
            materialize_limit: cfg.materialize_limit,
            max_passes: cfg.max_optimize_passes.max(1),
            preserve_order: false,
        }
    }

    pub fn preserving_order(mut self) -> Self {
        self.preserve_order = true;
        self
    }

    /// Re-apply passes until a fixpoint or `max_passes`.
    pub fn optimize_fully(&self, mut shape: Shape) -> Result<Shape> {
        for pass in 0..self.max_passes {
            let (next, changed) = self.optimize(shape)?;
            shape = next;
            if !changed {
                debug!(passes = pass + 1, "optimizer reached a fixpoint");
                return Ok(shape);
            }
        }
        debug!(passes = self.max_passes, "optimizer stopped at the pass limit");
        Ok(shape)
    }

    /// A single bottom-up pass.
    pub fn optimize(&self, shape: Shape) -> Result<(Shape, bool)> {
        let order = Order::Free.keep_if(self.preserve_order);
        self.rewrite(shape, order)
    }

    fn rewrite(&self, shape: Shape, order: Order) -> Result<(Shape, bool)> {
        match shape {
            Shape::Null => Ok((Shape::Null, false)),
            Shape::Fixed(f) if f.is_empty() => Ok(rewrote("empty_fixed", Shape::Null)),
            Shape::Fixed(f) => Ok((Shape::Fixed(f), false)),
            Shape::Resolver(r) if r.is_empty() => Ok(rewrote("empty_resolver", Shape::Null)),
            Shape::Resolver(r) => Ok((Shape::Resolver(r), false)),
            Shape::Leaf(leaf) => match leaf.optimize()? {
                Some(replacement) => Ok(rewrote("leaf", replacement)),
                None => Ok((Shape::Leaf(leaf), false)),
            },
            Shape::Tag(t) => {
                let (sub, changed) = self.rewrite(*t.sub, order)?;
                if sub.is_null() {
                    return Ok(rewrote("null_sub", Shape::Null));
                }
                let t = Tag {
                    sub: Box::new(sub),
                    ..t
                };
                Ok((Shape::Tag(t), changed))
            }
            Shape::And(and) => self.optimize_and(and, order),
            Shape::Or(or) => self.optimize_or(or, order),
            Shape::Not(not) => self.optimize_not(not, order),
            Shape::Unique(u) => {
                let (sub, changed) = self.rewrite(*u.sub, Order::Kept)?;
                self.wrap(sub, changed, |s| Shape::Unique(Unique::new(s)))
            }
            Shape::Sort(s) => {
                let (sub, changed) = self.rewrite(*s.sub, order)?;
                let namer = s.namer;
                self.wrap(sub, changed, |sub| Shape::Sort(Sort::new(sub, namer)))
            }
            Shape::ValueFilter(v) => {
                let (sub, changed) = self.rewrite(*v.sub, order)?;
                self.wrap(sub, changed, |sub| {
                    Shape::ValueFilter(ValueFilter {
                        sub: Box::new(sub),
                        ..v
                    })
                })
            }
            Shape::Limit(l) => {
                let (sub, changed) = self.rewrite(*l.sub, order.keep_if(l.limit > 0))?;
                if l.limit <= 0 {
                    return Ok(rewrote("unbounded_limit", sub));
                }
                let limit = l.limit;
                self.wrap(sub, changed, |sub| Shape::Limit(Limit::new(sub, limit)))
            }
            Shape::Skip(s) => {
                let (sub, changed) = self.rewrite(*s.sub, order.keep_if(s.skip > 0))?;
                if s.skip <= 0 {
                    return Ok(rewrote("zero_skip", sub));
                }
                let skip = s.skip;
                self.wrap(sub, changed, |sub| Shape::Skip(Skip::new(sub, skip)))
            }
            Shape::Count(c) => {
                let (sub, changed) = self.rewrite(*c.sub, Order::Free)?;
                let c = Count {
                    sub: Box::new(sub),
                    ..c
                };
                Ok((Shape::Count(c), changed))
            }
            Shape::Materialize(m) => {
                let (sub, changed) = self.rewrite(*m.sub, order)?;
                // Caching twice is caching once with the larger cap: either
                // level that fits the whole sub-shape folds it.
                if let Shape::Materialize(inner) = sub {
                    let merged = Materialize {
                        limit: inner.limit.max(m.limit),
                        ..inner
                    };
                    return Ok(rewrote("nested_materialize", Shape::Materialize(merged)));
                }
                self.wrap(sub, changed, |sub| {
                    Shape::Materialize(Materialize {
                        sub: Box::new(sub),
                        ..m
                    })
                })
            }
            Shape::Recursive(r) => {
                // Which root a value is credited to depends on seed order.
                let (sub, changed) = self.rewrite(*r.sub, Order::Kept)?;
                self.wrap(sub, changed, |sub| {
                    Shape::Recursive(Recursive {
                        sub: Box::new(sub),
                        ..r
                    })
                })
            }
        }
    }

    /// Rebuild a single-child wrapper, collapsing it when the child is empty.
    fn wrap(
        &self,
        sub: Shape,
        changed: bool,
        build: impl FnOnce(Shape) -> Shape,
    ) -> Result<(Shape, bool)> {
        if sub.is_null() {
            return Ok(rewrote("null_sub", Shape::Null));
        }
        Ok((build(sub), changed))
    }

    fn optimize_and(&self, and: And, order: Order) -> Result<(Shape, bool)> {
        // Stateful checkers answer differently depending on the order their
        // candidates arrive in.
        let order = order.keep_if(and.subs.iter().any(role_sensitive));
        let mut changed = false;
        let mut subs = Vec::with_capacity(and.subs.len());
        for sub in and.subs {
            let (sub, c) = self.rewrite(sub, order)?;
            changed |= c;
            match sub {
                Shape::Null => return Ok(rewrote("and_with_null", Shape::Null)),
                Shape::And(inner) => {
                    debug!(rule = "flatten_and", "optimizer rewrite");
                    changed = true;
                    subs.extend(inner.subs);
                }
                other => subs.push(other),
            }
        }
        match subs.len() {
            0 => return Ok(rewrote("empty_and", Shape::Null)),
            1 => {
                if let Some(only) = subs.pop() {
                    return Ok(rewrote("single_and", only));
                }
            }
            _ => {}
        }
        if order == Order::Free && !subs.iter().any(role_sensitive) && sort_by_size(&mut subs) {
            debug!(rule = "and_driver_order", subs = subs.len(), "optimizer rewrite");
            changed = true;
        }
        Ok((Shape::And(And::new(subs)), changed))
    }

    fn optimize_or(&self, or: Or, order: Order) -> Result<(Shape, bool)> {
        let mut changed = false;
        let mut subs = Vec::with_capacity(or.subs.len());
        for sub in or.subs {
            let (sub, c) = self.rewrite(sub, order)?;
            changed |= c;
            if sub.is_null() {
                changed = true;
            } else {
                subs.push(sub);
            }
        }
        match subs.len() {
            0 => return Ok(rewrote("empty_or", Shape::Null)),
            1 => {
                if let Some(only) = subs.pop() {
                    return Ok(rewrote("single_or", only));
                }
            }
            _ => {}
        }
        let or = Or {
            subs,
            short_circuit: or.short_circuit,
        };
        Ok((Shape::Or(or), changed))
    }

    fn optimize_not(&self, not: Not, order: Order) -> Result<(Shape, bool)> {
        // A stateful primary sees candidates in universe order.
        let sensitive = role_sensitive(&not.primary);
        let (universe, cu) = self.rewrite(*not.universe, order.keep_if(sensitive))?;
        if universe.is_null() {
            return Ok(rewrote("not_empty_universe", Shape::Null));
        }
        let (primary, cp) = self.rewrite(*not.primary, Order::Free)?;
        if primary.is_null() {
            return Ok(rewrote("not_empty_primary", universe));
        }
        // A cache is filled from the cursor, which is only equivalent to
        // probing when the two modes agree.
        let (primary, wrapped) = match primary {
            Shape::Materialize(m) => (Shape::Materialize(m), false),
            other if role_sensitive(&other) => (other, false),
            other => {
                debug!(rule = "materialize_not_primary", "optimizer rewrite");
                let m = Materialize::with_limit(other, self.materialize_limit);
                (Shape::Materialize(m), true)
            }
        };
        Ok((Shape::Not(Not::new(primary, universe)), cu || cp || wrapped))
    }
}

/// Whether a shape's prober can disagree with its cursor, so that moving it
/// between the driver and checker roles of an And changes what it yields.
/// Limit and Skip probers count `contains` calls. A Unique prober keeps the
/// path it sees first. A Not prober ignores the universe. A short-circuit Or
/// prober stops at the first sub-shape containing the value rather than the
/// first non-empty one. Materialize falls back to its sub-shape's prober.
fn role_sensitive(shape: &Shape) -> bool {
    match shape {
        Shape::Limit(l) => l.limit > 0 || role_sensitive(&l.sub),
        Shape::Skip(s) => s.skip > 0 || role_sensitive(&s.sub),
        Shape::Unique(_) | Shape::Not(_) => true,
        Shape::Or(or) if or.short_circuit => true,
        // Both modes drain a cursor.
        Shape::Count(_) | Shape::Recursive(_) => false,
        other => other.children().into_iter().any(role_sensitive),
    }
}

/// Stable sort of And subs by estimated size, smallest first so the cheapest
/// sub-shape drives enumeration. Returns whether the order changed.
fn sort_by_size(subs: &mut Vec<Shape>) -> bool {
    let Ok(sizes) = subs
        .iter()
        .map(|s| s.stats().map(|c| c.size.value))
        .collect::<Result<Vec<i64>>>()
    else {
        return false;
    };
    let mut order: Vec<usize> = (0..subs.len()).collect();
    order.sort_by_key(|&i| sizes[i]);
    if order.iter().enumerate().all(|(pos, &i)| pos == i) {
        return false;
    }
    let mut slots: Vec<Option<Shape>> = std::mem::take(subs).into_iter().map(Some).collect();
    subs.extend(order.into_iter().filter_map(|i| slots[i].take()));
    true
}
