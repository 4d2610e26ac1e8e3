//! Skip: drops the first N matches of a sub-shape.
//!
//! A match is one (result, path) pair in both modes, so the size reported by
//! `stats` is exact whenever the sub-shape's is.

use trellis_core::prelude::{Costs, Error, Ref, Result, Size, TagMap};

use crate::shape::Shape;
use crate::traits::{Base, BoxCursor, BoxProber, Cursor, Prober};

#[derive(Debug, Clone)]
pub struct Skip {
    pub sub: Box<Shape>,
    pub skip: i64,
}

impl Skip {
    pub fn new(sub: Shape, skip: i64) -> Self {
        Self {
            sub: Box::new(sub),
            skip,
        }
    }

    pub fn stats(&self) -> Result<Costs> {
        let st = self.sub.stats()?;
        let skip = self.skip.max(0);
        Ok(Costs::new(
            st.next_cost,
            st.contains_cost,
            Size {
                value: (st.size.value - skip).max(0),
                exact: st.size.exact,
            },
        ))
    }

    pub fn cursor(&self) -> SkipCursor {
        SkipCursor {
            sub: self.sub.cursor(),
            skip: self.skip.max(0),
            skipped: 0,
        }
    }

    pub fn prober(&self) -> SkipProber {
        SkipProber {
            sub: self.sub.prober(),
            skip: self.skip.max(0),
            skipped: 0,
        }
    }
}

/// Skips the first N pairs. When the quota runs out part way through a
/// result, that result's remaining paths come first.
pub struct SkipCursor {
    sub: BoxCursor,
    skip: i64,
    skipped: i64,
}

impl Base for SkipCursor {
    fn next_path(&mut self) -> bool {
        self.skipped >= self.skip && self.sub.next_path()
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
        "skip"
    }
}

impl Cursor for SkipCursor {
    fn next(&mut self) -> bool {
        if self.skipped < self.skip {
            let mut on_result = false;
            while self.skipped < self.skip {
                if !(on_result && self.sub.next_path()) {
                    if !self.sub.next() {
                        return false;
                    }
                    on_result = true;
                }
                self.skipped += 1;
            }
            if self.sub.next_path() {
                return true;
            }
        }
        self.sub.next()
    }
}

/// Probing cannot pull sequentially, so the first N matches are consumed from
/// whatever the wrapped prober confirms: the fresh match first, then its
/// alternative paths. A candidate succeeds only once N matches are gone.
pub struct SkipProber {
    sub: BoxProber,
    skip: i64,
    skipped: i64,
}

impl Base for SkipProber {
    fn next_path(&mut self) -> bool {
        self.skipped >= self.skip && self.sub.next_path()
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
        "skip"
    }
}

impl Prober for SkipProber {
    fn contains(&mut self, candidate: &Ref) -> bool {
        if self.skipped >= self.skip {
            return self.sub.contains(candidate);
        }
        if !self.sub.contains(candidate) {
            return false;
        }
        // Consumed the fresh match; keep consuming its paths.
        self.skipped += 1;
        while self.skipped < self.skip {
            if !self.sub.next_path() {
                return false;
            }
            self.skipped += 1;
        }
        // Quota met mid-value: the candidate survives only with a path left.
        self.sub.next_path()
    }
}
