//! Unique: drops repeated results by canonical key.
//!
//! The first occurrence and its first path win; alternative paths are never
//! exposed.

use std::collections::HashSet;

use trellis_core::prelude::{Costs, Error, Ref, RefKey, Result, Size, TagMap};

use crate::shape::Shape;
use crate::traits::{absorb, Base, BoxCursor, BoxProber, CloseErrors, Cursor, Prober};

const UNIQUENESS_FACTOR: i64 = 2;

#[derive(Debug, Clone)]
pub struct Unique {
    pub sub: Box<Shape>,
}

impl Unique {
    pub fn new(sub: Shape) -> Self {
        Self { sub: Box::new(sub) }
    }

    pub fn stats(&self) -> Result<Costs> {
        let st = self.sub.stats()?;
        Ok(Costs::new(
            st.next_cost.saturating_mul(UNIQUENESS_FACTOR),
            st.contains_cost,
            Size::estimate(st.size.value / UNIQUENESS_FACTOR),
        ))
    }

    pub fn cursor(&self) -> UniqueCursor {
        UniqueCursor {
            sub: self.sub.cursor(),
            seen: HashSet::new(),
            err: None,
        }
    }

    pub fn prober(&self) -> UniqueProber {
        UniqueProber {
            sub: self.sub.prober(),
        }
    }
}

pub struct UniqueCursor {
    sub: BoxCursor,
    seen: HashSet<RefKey>,
    err: Option<Error>,
}

impl Base for UniqueCursor {
    fn next_path(&mut self) -> bool {
        false
    }

    fn result(&self) -> Option<&Ref> {
        self.sub.result()
    }

    fn tag_results(&self, dst: &mut TagMap) {
        self.sub.tag_results(dst);
    }

    fn err(&self) -> Option<&Error> {
        self.err.as_ref()
    }

    fn close(&mut self) -> Result<()> {
        self.seen.clear();
        let mut errs = CloseErrors::new(self.err.as_ref());
        errs.record(self.sub.close());
        errs.finish()
    }

    fn name(&self) -> &'static str {
        "unique"
    }
}

impl Cursor for UniqueCursor {
    fn next(&mut self) -> bool {
        if self.err.is_some() {
            return false;
        }
        while self.sub.next() {
            if let Some(r) = self.sub.result() {
                if self.seen.insert(r.key()) {
                    return true;
                }
            }
        }
        absorb(&mut self.err, &self.sub);
        false
    }
}

/// Membership is unaffected by deduplication; only paths are suppressed.
pub struct UniqueProber {
    sub: BoxProber,
}

impl Base for UniqueProber {
    fn next_path(&mut self) -> bool {
        false
    }

    fn result(&self) -> Option<&Ref> {
        self.sub.result()
    }

    fn tag_results(&self, dst: &mut TagMap) {
        self.sub.tag_results(dst);
    }

    fn err(&self) -> Option<&Error> {
        self.sub.err()
    }

    fn close(&mut self) -> Result<()> {
        self.sub.close()
    }

    fn name(&self) -> &'static str {
        "unique"
    }
}

impl Prober for UniqueProber {
    fn contains(&mut self, candidate: &Ref) -> bool {
        self.sub.contains(candidate)
    }
}
