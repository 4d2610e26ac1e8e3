//! Constant shapes: a fixed list of refs, and the empty shape.

use std::collections::HashMap;
use std::sync::Arc;

use trellis_core::prelude::{Costs, Error, Ref, RefKey, Result, Size, TagMap};

use crate::traits::{Base, Cursor, Prober};

/// A constant, ordered list of refs. Duplicates are kept.
#[derive(Debug, Clone, Default)]
pub struct Fixed {
    pub values: Arc<Vec<Ref>>,
}

impl Fixed {
    pub fn new(values: impl IntoIterator<Item = Ref>) -> Self {
        Self {
            values: Arc::new(values.into_iter().collect()),
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn stats(&self) -> Costs {
        Costs::new(1, 1, Size::exact(self.values.len() as i64))
    }

    pub fn cursor(&self) -> FixedCursor {
        FixedCursor {
            values: Arc::clone(&self.values),
            next: 0,
            current: None,
        }
    }

    pub fn prober(&self) -> FixedProber {
        FixedProber {
            values: Arc::clone(&self.values),
            index: None,
            matches: Vec::new(),
            path: 0,
        }
    }
}

pub struct FixedCursor {
    values: Arc<Vec<Ref>>,
    next: usize,
    current: Option<usize>,
}

impl Base for FixedCursor {
    fn next_path(&mut self) -> bool {
        false
    }

    fn result(&self) -> Option<&Ref> {
        self.current.and_then(|i| self.values.get(i))
    }

    fn tag_results(&self, _dst: &mut TagMap) {}

    fn err(&self) -> Option<&Error> {
        None
    }

    fn close(&mut self) -> Result<()> {
        self.current = None;
        self.next = self.values.len();
        Ok(())
    }

    fn name(&self) -> &'static str {
        "fixed"
    }
}

impl Cursor for FixedCursor {
    fn next(&mut self) -> bool {
        if self.next >= self.values.len() {
            self.current = None;
            return false;
        }
        self.current = Some(self.next);
        self.next += 1;
        true
    }
}

/// Hash-lookup prober over a fixed list.
///
/// A value listed several times is one match with one path per occurrence, so
/// probing agrees with enumeration on the number of (result, path) pairs.
pub struct FixedProber {
    values: Arc<Vec<Ref>>,
    index: Option<HashMap<RefKey, Vec<usize>>>,
    matches: Vec<usize>,
    path: usize,
}

impl Base for FixedProber {
    fn next_path(&mut self) -> bool {
        if self.path + 1 < self.matches.len() {
            self.path += 1;
            return true;
        }
        false
    }

    fn result(&self) -> Option<&Ref> {
        self.matches
            .get(self.path)
            .and_then(|&i| self.values.get(i))
    }

    fn tag_results(&self, _dst: &mut TagMap) {}

    fn err(&self) -> Option<&Error> {
        None
    }

    fn close(&mut self) -> Result<()> {
        self.index = None;
        self.matches.clear();
        Ok(())
    }

    fn name(&self) -> &'static str {
        "fixed"
    }
}

impl Prober for FixedProber {
    fn contains(&mut self, candidate: &Ref) -> bool {
        let values = &self.values;
        let index = self.index.get_or_insert_with(|| {
            let mut idx: HashMap<RefKey, Vec<usize>> = HashMap::with_capacity(values.len());
            for (i, r) in values.iter().enumerate() {
                idx.entry(r.key()).or_default().push(i);
            }
            idx
        });
        self.path = 0;
        match index.get(&candidate.key()) {
            Some(positions) => {
                self.matches.clone_from(positions);
                true
            }
            None => {
                self.matches.clear();
                false
            }
        }
    }
}

/// Execution of the empty shape, in either mode.
#[derive(Debug, Default)]
pub struct Empty;

impl Base for Empty {
    fn next_path(&mut self) -> bool {
        false
    }

    fn result(&self) -> Option<&Ref> {
        None
    }

    fn tag_results(&self, _dst: &mut TagMap) {}

    fn err(&self) -> Option<&Error> {
        None
    }

    fn close(&mut self) -> Result<()> {
        Ok(())
    }

    fn name(&self) -> &'static str {
        "null"
    }
}

impl Cursor for Empty {
    fn next(&mut self) -> bool {
        false
    }
}

impl Prober for Empty {
    fn contains(&mut self, _candidate: &Ref) -> bool {
        false
    }
}
