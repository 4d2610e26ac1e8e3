//! Recursive: breadth-first fixpoint closure of a single-hop morphism.
//!
//! Depth 0 is the start shape; its tag bindings are recorded per result. At
//! every later depth the previous frontier is tagged with
//! [`RECURSIVE_BASE_TAG`], the morphism is applied, and each result not seen
//! before joins the next frontier. Expansion stops on an empty frontier or at
//! `max_depth`.
//!
//! Discovered values live in an arena. Each record keeps the base value that
//! produced it and the arena index of its depth-1 ancestor, whose base is the
//! depth-0 root whose tag bindings become the result's paths.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, error};
use trellis_core::config::DEFAULT_MAX_RECURSIVE_DEPTH;
use trellis_core::prelude::{Costs, Error, Ref, RefKey, Result, Size, TagMap, Value};

use crate::fixed::Fixed;
use crate::shape::Shape;
use crate::store::Morphism;
use crate::tag::Tag;
use crate::traits::{Base, BoxCursor, CloseErrors, Cursor, Prober};

/// Reserved tag marking the morphism's input. Never reaches callers.
pub const RECURSIVE_BASE_TAG: &str = "__base_recursive";

/// Fan-out probe value used when estimating costs.
const STATS_PROBE: i64 = 20;

#[derive(Clone)]
pub struct Recursive {
    pub sub: Box<Shape>,
    pub morphism: Morphism,
    pub max_depth: usize,
    /// Tags bound to the discovery depth of each result.
    pub depth_tags: Vec<String>,
}

impl fmt::Debug for Recursive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Recursive")
            .field("max_depth", &self.max_depth)
            .field("depth_tags", &self.depth_tags)
            .field("sub", &self.sub)
            .finish()
    }
}

impl Recursive {
    /// A `max_depth` of zero selects the default bound.
    pub fn new(sub: Shape, morphism: Morphism, max_depth: usize) -> Self {
        Self {
            sub: Box::new(sub),
            morphism,
            max_depth: if max_depth == 0 {
                DEFAULT_MAX_RECURSIVE_DEPTH
            } else {
                max_depth
            },
            depth_tags: Vec::new(),
        }
    }

    pub fn add_depth_tag(&mut self, name: impl Into<String>) {
        self.depth_tags.push(name.into());
    }

    /// Deliberately pessimistic: the closure may revisit the store once per
    /// depth for every frontier value.
    pub fn stats(&self) -> Result<Costs> {
        let probe = Shape::Fixed(Fixed::new([Ref::PreFetched(Value::Int(STATS_PROBE))]));
        let fanout = (self.morphism)(probe).stats()?;
        let sub = self.sub.stats()?;
        let base = sub.size.value.saturating_mul(fanout.size.value);
        // Float to int casts saturate.
        let size = (base as f64).powi(5) as i64;
        let next_cost = sub.next_cost.saturating_add(fanout.next_cost);
        Ok(Costs::new(
            next_cost,
            next_cost
                .saturating_mul(size / 10)
                .saturating_add(sub.contains_cost),
            Size::estimate(size),
        ))
    }

    pub fn cursor(&self) -> RecursiveCursor {
        RecursiveCursor {
            sub: self.sub.cursor(),
            morphism: Arc::clone(&self.morphism),
            max_depth: self.max_depth,
            depth_tags: self.depth_tags.clone(),
            phase: Phase::Seeding,
            depth: 0,
            frontier: Vec::new(),
            expansion: None,
            arena: Vec::new(),
            seen: HashMap::new(),
            root_paths: HashMap::new(),
            current: None,
            path: 0,
            err: None,
        }
    }

    pub fn prober(&self) -> RecursiveProber {
        RecursiveProber {
            inner: self.cursor(),
        }
    }
}

/// Arena record of one discovered value.
#[derive(Debug, Clone, Serialize)]
pub struct Discovered {
    pub value: Ref,
    pub depth: usize,
    /// Bindings produced by the morphism, base tag removed.
    pub tags: TagMap,
    /// Frontier value this one was expanded from.
    pub base: Ref,
    /// Arena index of the depth-1 ancestor (itself at depth 1).
    pub anchor: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Seeding,
    Expanding,
    Exhausted,
}

pub struct RecursiveCursor {
    sub: BoxCursor,
    morphism: Morphism,
    max_depth: usize,
    depth_tags: Vec<String>,

    phase: Phase,
    depth: usize,
    /// Values discovered at the current depth; the next depth's input.
    frontier: Vec<Ref>,
    expansion: Option<BoxCursor>,

    arena: Vec<Discovered>,
    seen: HashMap<RefKey, usize>,
    /// Depth-0 bindings, one entry per path.
    root_paths: HashMap<RefKey, Vec<TagMap>>,

    current: Option<usize>,
    path: usize,
    err: Option<Error>,
}

impl RecursiveCursor {
    /// Every value discovered so far, in discovery order.
    pub fn arena_snapshot(&self) -> &[Discovered] {
        &self.arena
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    fn fail(&mut self, e: Error) -> bool {
        if e.is_invariant() {
            error!(error = %e, "recursive ancestry is inconsistent");
        }
        self.err.get_or_insert(e);
        self.current = None;
        false
    }

    fn seed(&mut self) -> Result<()> {
        while self.sub.next() {
            let Some(r) = self.sub.result().cloned() else {
                continue;
            };
            let paths = self.root_paths.entry(r.key()).or_default();
            loop {
                let mut tags = TagMap::new();
                self.sub.tag_results(&mut tags);
                paths.push(tags);
                if !self.sub.next_path() {
                    break;
                }
            }
            self.frontier.push(r);
        }
        match self.sub.err() {
            Some(e) => Err(e.clone()),
            None => Ok(()),
        }
    }

    /// Start the next depth. Returns false once expansion is over.
    fn deepen(&mut self) -> Result<bool> {
        if let Some(mut done) = self.expansion.take() {
            let mut errs = CloseErrors::new(done.err());
            errs.record(done.close());
            errs.finish()?;
        }
        if self.depth >= self.max_depth || self.frontier.is_empty() {
            return Ok(false);
        }
        self.depth += 1;
        let frontier = std::mem::take(&mut self.frontier);
        debug!(depth = self.depth, frontier = frontier.len(), "recursive expansion");
        let base = Tag::new(
            Shape::Fixed(Fixed::new(frontier)),
            vec![RECURSIVE_BASE_TAG.to_string()],
        );
        self.expansion = Some((self.morphism)(Shape::Tag(base)).cursor());
        Ok(true)
    }

    /// Record a newly seen value and return its arena index.
    fn discover(&mut self, value: Ref, mut tags: TagMap) -> Result<usize> {
        let base = tags.remove(RECURSIVE_BASE_TAG).ok_or_else(|| {
            Error::invariant(format!(
                "value {value} at depth {} lost its {RECURSIVE_BASE_TAG} binding",
                self.depth
            ))
        })?;
        let idx = self.arena.len();
        let anchor = if self.depth == 1 {
            idx
        } else {
            let parent = self.seen.get(&base.key()).copied().ok_or_else(|| {
                Error::invariant(format!(
                    "base {base} of {value} at depth {} was never discovered",
                    self.depth
                ))
            })?;
            self.arena[parent].anchor
        };
        self.seen.insert(value.key(), idx);
        self.frontier.push(value.clone());
        self.arena.push(Discovered {
            value,
            depth: self.depth,
            tags,
            base,
            anchor,
        });
        Ok(idx)
    }

    fn root_paths_of(&self, idx: usize) -> Option<&Vec<TagMap>> {
        let anchor = self.arena.get(idx)?.anchor;
        let root = &self.arena.get(anchor)?.base;
        self.root_paths.get(&root.key())
    }

    fn pull(&mut self) -> Result<bool> {
        if self.phase == Phase::Seeding {
            self.seed()?;
            self.phase = Phase::Expanding;
        }
        while self.phase == Phase::Expanding {
            let mut pulled = None;
            if let Some(c) = self.expansion.as_mut() {
                if c.next() {
                    let Some(value) = c.result().cloned() else {
                        continue;
                    };
                    let mut tags = TagMap::new();
                    c.tag_results(&mut tags);
                    pulled = Some((value, tags));
                }
            }
            let Some((value, tags)) = pulled else {
                if !self.deepen()? {
                    self.phase = Phase::Exhausted;
                }
                continue;
            };
            if self.seen.contains_key(&value.key()) {
                continue;
            }
            self.current = Some(self.discover(value, tags)?);
            return Ok(true);
        }
        Ok(false)
    }
}

impl Base for RecursiveCursor {
    fn next_path(&mut self) -> bool {
        let Some(idx) = self.current else {
            return false;
        };
        let paths = self.root_paths_of(idx).map_or(0, Vec::len);
        if self.path + 1 < paths {
            self.path += 1;
            return true;
        }
        false
    }

    fn result(&self) -> Option<&Ref> {
        self.current
            .and_then(|i| self.arena.get(i))
            .map(|d| &d.value)
    }

    fn tag_results(&self, dst: &mut TagMap) {
        let Some(found) = self.current.and_then(|i| self.arena.get(i)) else {
            return;
        };
        for name in &self.depth_tags {
            dst.insert(
                name.clone(),
                Ref::PreFetched(Value::Int(found.depth as i64)),
            );
        }
        if let Some(root) = self
            .current
            .and_then(|i| self.root_paths_of(i))
            .and_then(|paths| paths.get(self.path))
        {
            dst.extend(root.iter().map(|(k, v)| (k.clone(), v.clone())));
        }
        dst.extend(found.tags.iter().map(|(k, v)| (k.clone(), v.clone())));
    }

    fn err(&self) -> Option<&Error> {
        self.err.as_ref()
    }

    fn close(&mut self) -> Result<()> {
        let mut errs = CloseErrors::new(self.err.as_ref());
        errs.record(self.sub.close());
        errs.close_all(self.expansion.iter_mut());
        self.expansion = None;
        self.seen.clear();
        self.frontier.clear();
        self.phase = Phase::Exhausted;
        errs.finish()
    }

    fn name(&self) -> &'static str {
        "recursive"
    }
}

impl Cursor for RecursiveCursor {
    fn next(&mut self) -> bool {
        if self.err.is_some() {
            return false;
        }
        self.path = 0;
        match self.pull() {
            Ok(true) => true,
            Ok(false) => {
                self.current = None;
                false
            }
            Err(e) => self.fail(e),
        }
    }
}

/// Membership over the closure. Values already discovered answer from the
/// arena; anything else pulls the expansion forward until it shows up or the
/// closure is exhausted.
pub struct RecursiveProber {
    inner: RecursiveCursor,
}

impl RecursiveProber {
    pub fn arena_snapshot(&self) -> &[Discovered] {
        self.inner.arena_snapshot()
    }
}

impl Base for RecursiveProber {
    fn next_path(&mut self) -> bool {
        self.inner.next_path()
    }

    fn result(&self) -> Option<&Ref> {
        self.inner.result()
    }

    fn tag_results(&self, dst: &mut TagMap) {
        self.inner.tag_results(dst);
    }

    fn err(&self) -> Option<&Error> {
        self.inner.err()
    }

    fn close(&mut self) -> Result<()> {
        self.inner.close()
    }

    fn name(&self) -> &'static str {
        "recursive"
    }
}

impl Prober for RecursiveProber {
    fn contains(&mut self, candidate: &Ref) -> bool {
        if self.inner.err.is_some() {
            return false;
        }
        self.inner.path = 0;
        let key = candidate.key();
        if let Some(&idx) = self.inner.seen.get(&key) {
            self.inner.current = Some(idx);
            return true;
        }
        while self.inner.next() {
            if self.inner.result().map(Ref::key).as_ref() == Some(&key) {
                return true;
            }
        }
        self.inner.current = None;
        false
    }
}
