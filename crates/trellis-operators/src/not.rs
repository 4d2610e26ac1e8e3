//! Not: everything in a universe shape that is absent from a primary shape.

use trellis_core::prelude::{Costs, Error, Ref, Result, Size, TagMap};

use crate::shape::Shape;
use crate::traits::{absorb, Base, BoxCursor, BoxProber, CloseErrors, Cursor, Prober};

#[derive(Debug, Clone)]
pub struct Not {
    /// Values to exclude. Probed once per universe result, so the optimizer
    /// wraps it in a Materialize.
    pub primary: Box<Shape>,
    pub universe: Box<Shape>,
}

impl Not {
    pub fn new(primary: Shape, universe: Shape) -> Self {
        Self {
            primary: Box::new(primary),
            universe: Box::new(universe),
        }
    }

    pub fn stats(&self) -> Result<Costs> {
        let primary = self.primary.stats()?;
        let universe = self.universe.stats()?;
        Ok(Costs::new(
            universe.next_cost.saturating_add(primary.contains_cost),
            primary.contains_cost,
            Size::estimate((universe.size.value - primary.size.value).max(0)),
        ))
    }

    pub fn cursor(&self) -> NotCursor {
        NotCursor {
            universe: self.universe.cursor(),
            primary: self.primary.prober(),
            err: None,
        }
    }

    /// The prober only consults the primary: membership in the universe is
    /// assumed for every candidate.
    pub fn prober(&self) -> NotProber {
        NotProber {
            primary: self.primary.prober(),
            result: None,
            err: None,
        }
    }
}

pub struct NotCursor {
    universe: BoxCursor,
    primary: BoxProber,
    err: Option<Error>,
}

impl Base for NotCursor {
    /// Alternative bindings of a kept universe result are still absent from
    /// the primary.
    fn next_path(&mut self) -> bool {
        if self.err.is_some() {
            return false;
        }
        let more = self.universe.next_path();
        absorb(&mut self.err, &self.universe);
        more && self.err.is_none()
    }

    fn result(&self) -> Option<&Ref> {
        self.universe.result()
    }

    fn tag_results(&self, dst: &mut TagMap) {
        self.universe.tag_results(dst);
    }

    fn err(&self) -> Option<&Error> {
        self.err.as_ref()
    }

    fn close(&mut self) -> Result<()> {
        let mut errs = CloseErrors::new(self.err.as_ref());
        errs.record(self.universe.close());
        errs.record(self.primary.close());
        errs.finish()
    }

    fn name(&self) -> &'static str {
        "not"
    }
}

impl Cursor for NotCursor {
    fn next(&mut self) -> bool {
        if self.err.is_some() {
            return false;
        }
        while self.universe.next() {
            let Some(candidate) = self.universe.result().cloned() else {
                continue;
            };
            let present = self.primary.contains(&candidate);
            if absorb(&mut self.err, &self.primary) {
                return false;
            }
            if !present {
                return true;
            }
        }
        absorb(&mut self.err, &self.universe);
        false
    }
}

pub struct NotProber {
    primary: BoxProber,
    result: Option<Ref>,
    err: Option<Error>,
}

impl Base for NotProber {
    fn next_path(&mut self) -> bool {
        false
    }

    fn result(&self) -> Option<&Ref> {
        self.result.as_ref()
    }

    fn tag_results(&self, _dst: &mut TagMap) {}

    fn err(&self) -> Option<&Error> {
        self.err.as_ref()
    }

    fn close(&mut self) -> Result<()> {
        let mut errs = CloseErrors::new(self.err.as_ref());
        errs.record(self.primary.close());
        errs.finish()
    }

    fn name(&self) -> &'static str {
        "not"
    }
}

impl Prober for NotProber {
    fn contains(&mut self, candidate: &Ref) -> bool {
        self.result = None;
        if self.err.is_some() {
            return false;
        }
        let present = self.primary.contains(candidate);
        if absorb(&mut self.err, &self.primary) || present {
            return false;
        }
        self.result = Some(candidate.clone());
        true
    }
}
