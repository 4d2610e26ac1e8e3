//! Materialize: drain a sub-shape once and serve it from memory.
//!
//! On the first pull the sub-shape is enumerated completely (every result and
//! every path), grouped by canonical key. If more than `limit` entries show up
//! the cache is dropped and execution falls back to a fresh sub-cursor (cursor
//! mode) or the sub-shape's own prober (prober mode). Either way the caller
//! sees the same (result, tags) pairs; in cached mode repeated results are
//! folded into one result with several paths.

use std::collections::HashMap;

use tracing::debug;
use trellis_core::config::DEFAULT_MATERIALIZE_LIMIT;
use trellis_core::prelude::{Costs, Error, Ref, RefKey, Result, Size, TagMap};

use crate::shape::Shape;
use crate::traits::{Base, BoxCursor, BoxProber, CloseErrors, Cursor, Prober};

const OVERHEAD: i64 = 2;

#[derive(Debug, Clone)]
pub struct Materialize {
    pub sub: Box<Shape>,
    /// Maximum number of cached (result, path) entries.
    pub limit: usize,
    /// Size hint overriding the sub-shape's estimate when positive.
    pub expect_size: i64,
}

impl Materialize {
    pub fn new(sub: Shape) -> Self {
        Self::with_limit(sub, DEFAULT_MATERIALIZE_LIMIT)
    }

    pub fn with_limit(sub: Shape, limit: usize) -> Self {
        Self {
            sub: Box::new(sub),
            limit,
            expect_size: 0,
        }
    }

    pub fn stats(&self) -> Result<Costs> {
        let st = self.sub.stats()?;
        let size = if self.expect_size > 0 {
            Size::estimate(self.expect_size)
        } else {
            st.size
        };
        let cost = st.next_cost.saturating_mul(OVERHEAD);
        Ok(Costs::new(cost, cost, size))
    }

    pub fn cursor(&self) -> MaterializeExec<BoxCursor> {
        MaterializeExec::new(self, |s| s.cursor())
    }

    pub fn prober(&self) -> MaterializeExec<BoxProber> {
        MaterializeExec::new(self, |s| s.prober())
    }
}

struct Entry {
    id: Ref,
    tags: TagMap,
}

#[derive(Default)]
struct Cache {
    groups: Vec<Vec<Entry>>,
    index: HashMap<RefKey, usize>,
    pos: Option<usize>,
    path: usize,
}

impl Cache {
    fn current(&self) -> Option<&Entry> {
        self.groups.get(self.pos?)?.get(self.path)
    }

    fn push(&mut self, id: Ref, tags: TagMap) {
        let next = self.groups.len();
        let slot = *self.index.entry(id.key()).or_insert(next);
        if slot == next {
            self.groups.push(Vec::new());
        }
        self.groups[slot].push(Entry { id, tags });
    }
}

enum State<F> {
    NotStarted,
    Cached(Cache),
    /// Cap exceeded; everything is delegated to a fresh sub-execution.
    PassThrough(F),
    Failed(Error),
}

/// Enumerate `cursor` into a cache, giving up once more than `limit` entries
/// were seen.
fn drain(cursor: &mut BoxCursor, limit: usize) -> Result<Option<Cache>> {
    let mut cache = Cache::default();
    let mut seen = 0usize;
    while cursor.next() {
        let Some(id) = cursor.result().cloned() else {
            continue;
        };
        loop {
            seen += 1;
            if seen > limit {
                return Ok(None);
            }
            let mut tags = TagMap::new();
            cursor.tag_results(&mut tags);
            cache.push(id.clone(), tags);
            if !cursor.next_path() {
                break;
            }
        }
    }
    match cursor.err() {
        Some(e) => Err(e.clone()),
        None => Ok(Some(cache)),
    }
}

pub struct MaterializeExec<F> {
    sub: Shape,
    limit: usize,
    open: fn(&Shape) -> F,
    state: State<F>,
}

impl<F: Base> MaterializeExec<F> {
    fn new(shape: &Materialize, open: fn(&Shape) -> F) -> Self {
        Self {
            sub: (*shape.sub).clone(),
            limit: shape.limit,
            open,
            state: State::NotStarted,
        }
    }

    fn run(&mut self) {
        if !matches!(self.state, State::NotStarted) {
            return;
        }
        let mut cursor = self.sub.cursor();
        let drained = drain(&mut cursor, self.limit);
        let closed = cursor.close();
        self.state = match (drained, closed) {
            (Err(e), _) | (Ok(_), Err(e)) => State::Failed(e),
            (Ok(Some(cache)), Ok(())) => State::Cached(cache),
            (Ok(None), Ok(())) => {
                debug!(
                    limit = self.limit,
                    sub = self.sub.name(),
                    "materialize cap exceeded; falling back to the sub-shape"
                );
                State::PassThrough((self.open)(&self.sub))
            }
        };
    }
}

impl<F: Base> Base for MaterializeExec<F> {
    fn next_path(&mut self) -> bool {
        self.run();
        match &mut self.state {
            State::Cached(cache) => {
                let len = cache.pos.and_then(|p| cache.groups.get(p)).map_or(0, Vec::len);
                if cache.path + 1 < len {
                    cache.path += 1;
                    return true;
                }
                false
            }
            State::PassThrough(f) => f.next_path(),
            State::NotStarted | State::Failed(_) => false,
        }
    }

    fn result(&self) -> Option<&Ref> {
        match &self.state {
            State::Cached(cache) => cache.current().map(|e| &e.id),
            State::PassThrough(f) => f.result(),
            State::NotStarted | State::Failed(_) => None,
        }
    }

    fn tag_results(&self, dst: &mut TagMap) {
        match &self.state {
            State::Cached(cache) => {
                if let Some(e) = cache.current() {
                    dst.extend(e.tags.iter().map(|(k, v)| (k.clone(), v.clone())));
                }
            }
            State::PassThrough(f) => f.tag_results(dst),
            State::NotStarted | State::Failed(_) => {}
        }
    }

    fn err(&self) -> Option<&Error> {
        match &self.state {
            State::Failed(e) => Some(e),
            State::PassThrough(f) => f.err(),
            State::NotStarted | State::Cached(_) => None,
        }
    }

    fn close(&mut self) -> Result<()> {
        let state = std::mem::replace(&mut self.state, State::Cached(Cache::default()));
        let mut errs = CloseErrors::default();
        match state {
            State::PassThrough(mut f) => errs.record(f.close()),
            State::Failed(e) => errs.record(Err(e)),
            State::NotStarted | State::Cached(_) => {}
        }
        errs.finish()
    }

    fn name(&self) -> &'static str {
        "materialize"
    }
}

impl Cursor for MaterializeExec<BoxCursor> {
    fn next(&mut self) -> bool {
        self.run();
        match &mut self.state {
            State::Cached(cache) => {
                let next = cache.pos.map_or(0, |p| p + 1);
                cache.path = 0;
                cache.pos = Some(next.min(cache.groups.len()));
                next < cache.groups.len()
            }
            State::PassThrough(c) => c.next(),
            State::NotStarted | State::Failed(_) => false,
        }
    }
}

impl Prober for MaterializeExec<BoxProber> {
    fn contains(&mut self, candidate: &Ref) -> bool {
        self.run();
        match &mut self.state {
            State::Cached(cache) => {
                cache.path = 0;
                cache.pos = cache.index.get(&candidate.key()).copied();
                cache.pos.is_some()
            }
            State::PassThrough(p) => p.contains(candidate),
            State::NotStarted | State::Failed(_) => false,
        }
    }
}
