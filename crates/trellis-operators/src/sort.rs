//! Sort: orders results by the string form of their resolved values.
//!
//! The cursor drains the sub-shape (every result with all of its paths) on
//! the first pull. Ordering is stable: equal keys keep the sub-shape's order.
//! Refs the namer does not know sort under the empty key, ahead of the rest.
//!
//! The prober does not sort; it forwards to the sub-shape's prober.

use std::fmt;
use std::sync::Arc;

use tracing::trace;
use trellis_core::prelude::{resolve, Costs, Error, Namer, Ref, Result, TagMap};

use crate::shape::Shape;
use crate::traits::{Base, BoxCursor, BoxProber, CloseErrors, Cursor, Prober};

#[derive(Clone)]
pub struct Sort {
    pub sub: Box<Shape>,
    pub namer: Arc<dyn Namer>,
}

impl fmt::Debug for Sort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Sort").field("sub", &self.sub).finish()
    }
}

impl Sort {
    pub fn new(sub: Shape, namer: Arc<dyn Namer>) -> Self {
        Self {
            sub: Box::new(sub),
            namer,
        }
    }

    pub fn stats(&self) -> Result<Costs> {
        let st = self.sub.stats()?;
        Ok(Costs::new(
            st.next_cost.saturating_mul(2),
            st.contains_cost,
            st.size,
        ))
    }

    pub fn cursor(&self) -> SortCursor {
        SortCursor {
            sub: self.sub.cursor(),
            namer: Arc::clone(&self.namer),
            ordered: None,
            pos: None,
            path: 0,
            err: None,
        }
    }

    pub fn prober(&self) -> BoxProber {
        self.sub.prober()
    }
}

/// One result of the sub-shape and every binding it was produced with.
struct SortEntry {
    key: String,
    id: Ref,
    paths: Vec<TagMap>,
}

pub struct SortCursor {
    sub: BoxCursor,
    namer: Arc<dyn Namer>,
    ordered: Option<Vec<SortEntry>>,
    pos: Option<usize>,
    path: usize,
    err: Option<Error>,
}

impl SortCursor {
    fn current(&self) -> Option<&SortEntry> {
        let pos = self.pos?;
        self.ordered.as_ref()?.get(pos)
    }

    fn collect(&mut self) -> Result<Vec<SortEntry>> {
        let mut entries = Vec::new();
        while self.sub.next() {
            let Some(id) = self.sub.result().cloned() else {
                continue;
            };
            let key = resolve(self.namer.as_ref(), &id)?
                .map(|v| v.to_string())
                .unwrap_or_default();
            let mut paths = Vec::new();
            loop {
                let mut tags = TagMap::new();
                self.sub.tag_results(&mut tags);
                paths.push(tags);
                if !self.sub.next_path() {
                    break;
                }
            }
            entries.push(SortEntry { key, id, paths });
        }
        if let Some(e) = self.sub.err() {
            return Err(e.clone());
        }
        // `sort_by` is stable.
        entries.sort_by(|a, b| a.key.cmp(&b.key));
        trace!(results = entries.len(), "sort materialized sub-shape");
        Ok(entries)
    }
}

impl Base for SortCursor {
    fn next_path(&mut self) -> bool {
        let Some(entry) = self.current() else {
            return false;
        };
        if self.path + 1 < entry.paths.len() {
            self.path += 1;
            return true;
        }
        false
    }

    fn result(&self) -> Option<&Ref> {
        self.current().map(|e| &e.id)
    }

    fn tag_results(&self, dst: &mut TagMap) {
        if let Some(tags) = self.current().and_then(|e| e.paths.get(self.path)) {
            dst.extend(tags.iter().map(|(k, v)| (k.clone(), v.clone())));
        }
    }

    fn err(&self) -> Option<&Error> {
        self.err.as_ref()
    }

    fn close(&mut self) -> Result<()> {
        self.ordered = None;
        self.pos = None;
        let mut errs = CloseErrors::new(self.err.as_ref());
        errs.record(self.sub.close());
        errs.finish()
    }

    fn name(&self) -> &'static str {
        "sort"
    }
}

impl Cursor for SortCursor {
    fn next(&mut self) -> bool {
        if self.err.is_some() {
            return false;
        }
        if self.ordered.is_none() {
            match self.collect() {
                Ok(entries) => self.ordered = Some(entries),
                Err(e) => {
                    self.err = Some(e);
                    return false;
                }
            }
        }
        let len = self.ordered.as_ref().map_or(0, Vec::len);
        let next = self.pos.map_or(0, |p| p + 1);
        self.path = 0;
        if next >= len {
            self.pos = Some(len);
            return false;
        }
        self.pos = Some(next);
        true
    }
}
