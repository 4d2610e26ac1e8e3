//! Execution traits shared by every shape.
//!
//! A shape runs in one of two modes:
//! - [`Cursor`]: a single-pass forward enumerator (`next`).
//! - [`Prober`]: a membership tester addressed by candidate ref (`contains`).
//!
//! Both modes share [`Base`]: `next_path` walks the alternative tag bindings of
//! the most recently produced (or confirmed) result and never advances the
//! result itself. Once `err()` is set, `next`/`contains` keep returning false.

use std::fmt;

use trellis_core::prelude::{Costs, Error, Ref, Result, TagMap};

use crate::shape::Shape;

/// Behaviour common to cursors and probers.
pub trait Base: Send {
    /// Advance to the next alternative binding for the current result.
    fn next_path(&mut self) -> bool;

    /// Current result, if any.
    fn result(&self) -> Option<&Ref>;

    /// Write the current bindings into a caller-owned map.
    fn tag_results(&self, dst: &mut TagMap);

    /// Sticky error; once set the execution is terminal.
    fn err(&self) -> Option<&Error>;

    /// Release this execution and everything it owns. Returns the first error
    /// seen, after attempting to close every child.
    fn close(&mut self) -> Result<()>;

    fn name(&self) -> &'static str;
}

pub trait Cursor: Base {
    fn next(&mut self) -> bool;
}

pub trait Prober: Base {
    fn contains(&mut self, candidate: &Ref) -> bool;
}

pub type BoxCursor = Box<dyn Cursor>;
pub type BoxProber = Box<dyn Prober>;

impl<T: Base + ?Sized> Base for Box<T> {
    fn next_path(&mut self) -> bool {
        (**self).next_path()
    }

    fn result(&self) -> Option<&Ref> {
        (**self).result()
    }

    fn tag_results(&self, dst: &mut TagMap) {
        (**self).tag_results(dst)
    }

    fn err(&self) -> Option<&Error> {
        (**self).err()
    }

    fn close(&mut self) -> Result<()> {
        (**self).close()
    }

    fn name(&self) -> &'static str {
        (**self).name()
    }
}

impl<T: Cursor + ?Sized> Cursor for Box<T> {
    fn next(&mut self) -> bool {
        (**self).next()
    }
}

impl<T: Prober + ?Sized> Prober for Box<T> {
    fn contains(&mut self, candidate: &Ref) -> bool {
        (**self).contains(candidate)
    }
}

/// Shapes supplied from outside this crate, usually by a store backend.
pub trait LeafShape: Send + Sync {
    fn name(&self) -> &'static str;

    fn cursor(&self) -> BoxCursor;

    fn prober(&self) -> BoxProber;

    fn stats(&self) -> Result<Costs>;

    /// Backend-specific rewrite. `None` keeps the leaf as is.
    fn optimize(&self) -> Result<Option<Shape>> {
        Ok(None)
    }

    /// Parameters shown in plan descriptions.
    fn describe(&self) -> Vec<(String, String)> {
        Vec::new()
    }
}

impl fmt::Debug for dyn LeafShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Leaf({})", self.name())
    }
}

/// Accumulates the first error across a sequence of closes.
#[derive(Debug, Default)]
pub struct CloseErrors {
    first: Option<Error>,
}

impl CloseErrors {
    /// Start from an execution's sticky error, if it has one.
    pub fn new(sticky: Option<&Error>) -> Self {
        Self {
            first: sticky.cloned(),
        }
    }

    pub fn record(&mut self, res: Result<()>) {
        if let Err(e) = res {
            self.first.get_or_insert(e);
        }
    }

    pub fn close_all<'a, T: Base + 'a>(&mut self, items: impl IntoIterator<Item = &'a mut T>) {
        for it in items {
            self.record(it.close());
        }
    }

    pub fn finish(self) -> Result<()> {
        match self.first {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

/// Keep the first error reported for an execution.
pub(crate) fn stick(slot: &mut Option<Error>, e: Error) {
    slot.get_or_insert(e);
}

/// Copy a child's error into `slot` (if it has one). Returns true on error.
pub(crate) fn absorb<B: Base + ?Sized>(slot: &mut Option<Error>, child: &B) -> bool {
    match child.err() {
        Some(e) => {
            stick(slot, e.clone());
            true
        }
        None => false,
    }
}
