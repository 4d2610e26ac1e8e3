//! Resolver: the refs a store assigns to a list of values.
//!
//! Values are looked up through [`Namer::value_of`] the first time an
//! execution needs them. Duplicates are kept in order; values the store does
//! not know are skipped.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use trellis_core::prelude::{Costs, Error, Namer, Ref, RefKey, Result, Size, TagMap, Value};

use crate::traits::{Base, Cursor, Prober};

#[derive(Clone)]
pub struct Resolver {
    pub namer: Arc<dyn Namer>,
    pub values: Arc<Vec<Value>>,
}

impl fmt::Debug for Resolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resolver")
            .field("values", &self.values)
            .finish()
    }
}

impl Resolver {
    pub fn new(namer: Arc<dyn Namer>, values: impl IntoIterator<Item = Value>) -> Self {
        Self {
            namer,
            values: Arc::new(values.into_iter().collect()),
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// An estimate: unknown values only show up once resolved.
    pub fn stats(&self) -> Costs {
        Costs::new(1, 1, Size::estimate(self.values.len() as i64))
    }

    pub fn cursor(&self) -> ResolverCursor {
        ResolverCursor {
            namer: Arc::clone(&self.namer),
            values: Arc::clone(&self.values),
            refs: None,
            next: 0,
            current: None,
            err: None,
        }
    }

    pub fn prober(&self) -> ResolverProber {
        ResolverProber {
            namer: Arc::clone(&self.namer),
            values: Arc::clone(&self.values),
            index: None,
            current: None,
            err: None,
        }
    }
}

/// Known values paired with their refs, in input order.
fn resolve_all(namer: &dyn Namer, values: &[Value]) -> Result<Vec<(Value, Ref)>> {
    let mut out = Vec::with_capacity(values.len());
    for v in values {
        if let Some(r) = namer.value_of(v)? {
            out.push((v.clone(), r));
        }
    }
    Ok(out)
}

pub struct ResolverCursor {
    namer: Arc<dyn Namer>,
    values: Arc<Vec<Value>>,
    refs: Option<Vec<Ref>>,
    next: usize,
    current: Option<usize>,
    err: Option<Error>,
}

impl Base for ResolverCursor {
    fn next_path(&mut self) -> bool {
        false
    }

    fn result(&self) -> Option<&Ref> {
        let refs = self.refs.as_ref()?;
        self.current.and_then(|i| refs.get(i))
    }

    fn tag_results(&self, _dst: &mut TagMap) {}

    fn err(&self) -> Option<&Error> {
        self.err.as_ref()
    }

    fn close(&mut self) -> Result<()> {
        self.refs = None;
        self.current = None;
        match &self.err {
            Some(e) => Err(e.clone()),
            None => Ok(()),
        }
    }

    fn name(&self) -> &'static str {
        "resolver"
    }
}

impl Cursor for ResolverCursor {
    fn next(&mut self) -> bool {
        self.current = None;
        if self.err.is_some() {
            return false;
        }
        if self.refs.is_none() {
            match resolve_all(self.namer.as_ref(), &self.values) {
                Ok(found) => self.refs = Some(found.into_iter().map(|(_, r)| r).collect()),
                Err(e) => {
                    self.err = Some(e);
                    return false;
                }
            }
        }
        let len = self.refs.as_ref().map_or(0, Vec::len);
        if self.next >= len {
            return false;
        }
        self.current = Some(self.next);
        self.next += 1;
        true
    }
}

/// Matches a candidate by the ref the store gave it, as the cursor would
/// produce it. A value listed several times is one match with one path per
/// occurrence.
pub struct ResolverProber {
    namer: Arc<dyn Namer>,
    values: Arc<Vec<Value>>,
    /// Ref key to (ref, occurrences).
    index: Option<HashMap<RefKey, (Ref, usize)>>,
    /// Matched ref, occurrences, current path.
    current: Option<(Ref, usize, usize)>,
    err: Option<Error>,
}

impl ResolverProber {
    fn build(&mut self) -> Result<()> {
        if self.index.is_some() {
            return Ok(());
        }
        let mut index: HashMap<RefKey, (Ref, usize)> = HashMap::new();
        for (_, r) in resolve_all(self.namer.as_ref(), &self.values)? {
            index.entry(r.key()).or_insert_with(|| (r, 0)).1 += 1;
        }
        self.index = Some(index);
        Ok(())
    }
}

impl Base for ResolverProber {
    fn next_path(&mut self) -> bool {
        match &mut self.current {
            Some((_, n, path)) if *path + 1 < *n => {
                *path += 1;
                true
            }
            _ => false,
        }
    }

    fn result(&self) -> Option<&Ref> {
        self.current.as_ref().map(|(r, _, _)| r)
    }

    fn tag_results(&self, _dst: &mut TagMap) {}

    fn err(&self) -> Option<&Error> {
        self.err.as_ref()
    }

    fn close(&mut self) -> Result<()> {
        self.index = None;
        self.current = None;
        match &self.err {
            Some(e) => Err(e.clone()),
            None => Ok(()),
        }
    }

    fn name(&self) -> &'static str {
        "resolver"
    }
}

impl Prober for ResolverProber {
    fn contains(&mut self, candidate: &Ref) -> bool {
        self.current = None;
        if self.err.is_some() {
            return false;
        }
        if let Err(e) = self.build() {
            self.err = Some(e);
            return false;
        }
        self.current = self
            .index
            .as_ref()
            .and_then(|idx| idx.get(&candidate.key()))
            .map(|(r, n)| (r.clone(), *n, 0));
        self.current.is_some()
    }
}
