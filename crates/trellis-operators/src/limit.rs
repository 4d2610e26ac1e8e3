//! Limit: bounds the number of (result, path) pairs a sub-shape exposes.
//!
//! In cursor mode `next` and `next_path` both count against the limit; in
//! prober mode successful `contains` and `next_path` calls do. A limit of zero
//! or less means unlimited.

use trellis_core::prelude::{Costs, Error, Ref, Result, TagMap};

use crate::shape::Shape;
use crate::traits::{Base, BoxCursor, BoxProber, Cursor, Prober};

#[derive(Debug, Clone)]
pub struct Limit {
    pub sub: Box<Shape>,
    pub limit: i64,
}

impl Limit {
    pub fn new(sub: Shape, limit: i64) -> Self {
        Self {
            sub: Box::new(sub),
            limit,
        }
    }

    pub fn stats(&self) -> Result<Costs> {
        let mut st = self.sub.stats()?;
        if self.limit > 0 && st.size.value > self.limit {
            st.size.value = self.limit;
        }
        Ok(st)
    }

    pub fn cursor(&self) -> LimitExec<BoxCursor> {
        LimitExec::new(self.sub.cursor(), self.limit)
    }

    pub fn prober(&self) -> LimitExec<BoxProber> {
        LimitExec::new(self.sub.prober(), self.limit)
    }
}

pub struct LimitExec<S> {
    sub: S,
    limit: i64,
    count: i64,
}

impl<S> LimitExec<S> {
    fn new(sub: S, limit: i64) -> Self {
        Self {
            sub,
            limit,
            count: 0,
        }
    }

    fn exhausted(&self) -> bool {
        self.limit > 0 && self.count >= self.limit
    }

    fn counted(&mut self, ok: bool) -> bool {
        if ok {
            self.count += 1;
        }
        ok
    }
}

impl<S: Base> Base for LimitExec<S> {
    fn next_path(&mut self) -> bool {
        if self.exhausted() {
            return false;
        }
        let ok = self.sub.next_path();
        self.counted(ok)
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
        "limit"
    }
}

impl<S: Cursor> Cursor for LimitExec<S> {
    fn next(&mut self) -> bool {
        if self.exhausted() {
            return false;
        }
        let ok = self.sub.next();
        self.counted(ok)
    }
}

impl<S: Prober> Prober for LimitExec<S> {
    fn contains(&mut self, candidate: &Ref) -> bool {
        if self.exhausted() {
            return false;
        }
        let ok = self.sub.contains(candidate);
        self.counted(ok)
    }
}
