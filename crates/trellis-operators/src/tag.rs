//! Tag: binds names to the current result of a sub-shape.

use trellis_core::prelude::{Costs, Error, Ref, Result, TagMap};

use crate::shape::Shape;
use crate::traits::{Base, BoxCursor, BoxProber, Cursor, Prober};

#[derive(Debug, Clone)]
pub struct Tag {
    pub sub: Box<Shape>,
    /// Names bound to whatever the sub-shape currently produces.
    pub tags: Vec<String>,
    /// Constant bindings emitted with every result.
    pub fixed: TagMap,
}

impl Tag {
    pub fn new(sub: Shape, tags: Vec<String>) -> Self {
        Self {
            sub: Box::new(sub),
            tags,
            fixed: TagMap::new(),
        }
    }

    pub fn with_fixed(mut self, name: impl Into<String>, value: Ref) -> Self {
        self.fixed.insert(name.into(), value);
        self
    }

    pub fn stats(&self) -> Result<Costs> {
        self.sub.stats()
    }

    pub fn cursor(&self) -> TagExec<BoxCursor> {
        TagExec::new(self.sub.cursor(), self)
    }

    pub fn prober(&self) -> TagExec<BoxProber> {
        TagExec::new(self.sub.prober(), self)
    }
}

/// One execution of [`Tag`], generic over the sub-execution's mode.
pub struct TagExec<S> {
    sub: S,
    tags: Vec<String>,
    fixed: TagMap,
}

impl<S> TagExec<S> {
    fn new(sub: S, shape: &Tag) -> Self {
        Self {
            sub,
            tags: shape.tags.clone(),
            fixed: shape.fixed.clone(),
        }
    }
}

impl<S: Base> Base for TagExec<S> {
    fn next_path(&mut self) -> bool {
        self.sub.next_path()
    }

    fn result(&self) -> Option<&Ref> {
        self.sub.result()
    }

    fn tag_results(&self, dst: &mut TagMap) {
        self.sub.tag_results(dst);
        if let Some(r) = self.sub.result() {
            for name in &self.tags {
                dst.insert(name.clone(), r.clone());
            }
        }
        for (name, r) in &self.fixed {
            dst.insert(name.clone(), r.clone());
        }
    }

    fn err(&self) -> Option<&Error> {
        self.sub.err()
    }

    fn close(&mut self) -> Result<()> {
        self.sub.close()
    }

    fn name(&self) -> &'static str {
        "tag"
    }
}

impl<S: Cursor> Cursor for TagExec<S> {
    fn next(&mut self) -> bool {
        self.sub.next()
    }
}

impl<S: Prober> Prober for TagExec<S> {
    fn contains(&mut self, candidate: &Ref) -> bool {
        self.sub.contains(candidate)
    }
}
