//! Or: union (concatenation) of sub-shapes, plus the "first non-empty wins"
//! variant.

use trellis_core::prelude::{Costs, Error, Ref, Result, Size, TagMap};

use crate::shape::Shape;
use crate::traits::{absorb, Base, BoxCursor, BoxProber, CloseErrors, Cursor, Prober};

#[derive(Debug, Clone, Default)]
pub struct Or {
    pub subs: Vec<Shape>,
    /// Only the first sub-shape that yields anything contributes results.
    pub short_circuit: bool,
}

impl Or {
    pub fn new(subs: Vec<Shape>) -> Self {
        Self {
            subs,
            short_circuit: false,
        }
    }

    pub fn short_circuit(subs: Vec<Shape>) -> Self {
        Self {
            subs,
            short_circuit: true,
        }
    }

    pub fn stats(&self) -> Result<Costs> {
        if self.subs.is_empty() {
            return Ok(Costs::empty());
        }
        let mut next_cost = 0i64;
        let mut contains_cost = 0i64;
        let mut total = 0i64;
        let mut largest = 0i64;
        let mut exact = true;
        for sub in &self.subs {
            let st = sub.stats()?;
            next_cost = next_cost.saturating_add(st.next_cost);
            contains_cost = contains_cost.saturating_add(st.contains_cost);
            total = total.saturating_add(st.size.value);
            largest = largest.max(st.size.value);
            exact &= st.size.exact;
        }
        let n = self.subs.len() as i64;
        let size = if self.short_circuit {
            Size {
                value: largest,
                exact: exact && n == 1,
            }
        } else {
            Size {
                value: total,
                exact,
            }
        };
        Ok(Costs::new(next_cost / n, contains_cost, size))
    }

    pub fn cursor(&self) -> OrCursor {
        OrCursor {
            cursors: self.subs.iter().map(|s| s.cursor()).collect(),
            current: 0,
            locked: false,
            short_circuit: self.short_circuit,
            err: None,
        }
    }

    pub fn prober(&self) -> OrProber {
        OrProber {
            probers: self.subs.iter().map(|s| s.prober()).collect(),
            current: None,
            result: None,
            short_circuit: self.short_circuit,
            err: None,
        }
    }
}

pub struct OrCursor {
    cursors: Vec<BoxCursor>,
    current: usize,
    /// Short-circuit mode: set once a sub-shape produced its first result.
    locked: bool,
    short_circuit: bool,
    err: Option<Error>,
}

impl OrCursor {
    fn active(&self) -> Option<&BoxCursor> {
        self.cursors.get(self.current)
    }
}

impl Base for OrCursor {
    fn next_path(&mut self) -> bool {
        if self.err.is_some() {
            return false;
        }
        match self.cursors.get_mut(self.current) {
            Some(c) => {
                let more = c.next_path();
                absorb(&mut self.err, c);
                more && self.err.is_none()
            }
            None => false,
        }
    }

    fn result(&self) -> Option<&Ref> {
        self.active().and_then(|c| c.result())
    }

    fn tag_results(&self, dst: &mut TagMap) {
        if let Some(c) = self.active() {
            c.tag_results(dst);
        }
    }

    fn err(&self) -> Option<&Error> {
        self.err.as_ref()
    }

    fn close(&mut self) -> Result<()> {
        let mut errs = CloseErrors::new(self.err.as_ref());
        errs.close_all(self.cursors.iter_mut());
        errs.finish()
    }

    fn name(&self) -> &'static str {
        if self.short_circuit {
            "short_circuit_or"
        } else {
            "or"
        }
    }
}

impl Cursor for OrCursor {
    fn next(&mut self) -> bool {
        if self.err.is_some() {
            return false;
        }
        while let Some(c) = self.cursors.get_mut(self.current) {
            if c.next() {
                self.locked = true;
                return true;
            }
            if absorb(&mut self.err, c) {
                return false;
            }
            if self.short_circuit && self.locked {
                // The winning sub-shape is exhausted; the rest are ignored.
                self.current = self.cursors.len();
                return false;
            }
            self.current += 1;
        }
        false
    }
}

pub struct OrProber {
    probers: Vec<BoxProber>,
    current: Option<usize>,
    result: Option<Ref>,
    short_circuit: bool,
    err: Option<Error>,
}

impl Base for OrProber {
    /// Paths of the matching sub-shape first. A plain union then moves on to
    /// later sub-shapes that also contain the value, mirroring the duplicate
    /// results its cursor would produce.
    fn next_path(&mut self) -> bool {
        if self.err.is_some() {
            return false;
        }
        let (Some(i), Some(value)) = (self.current, self.result.clone()) else {
            return false;
        };
        if self.probers[i].next_path() {
            return true;
        }
        if absorb(&mut self.err, &self.probers[i]) || self.short_circuit {
            return false;
        }
        for j in i + 1..self.probers.len() {
            if self.probers[j].contains(&value) {
                self.current = Some(j);
                return true;
            }
            if absorb(&mut self.err, &self.probers[j]) {
                return false;
            }
        }
        false
    }

    fn result(&self) -> Option<&Ref> {
        self.result.as_ref()
    }

    fn tag_results(&self, dst: &mut TagMap) {
        if let Some(p) = self.current.and_then(|i| self.probers.get(i)) {
            p.tag_results(dst);
        }
    }

    fn err(&self) -> Option<&Error> {
        self.err.as_ref()
    }

    fn close(&mut self) -> Result<()> {
        let mut errs = CloseErrors::new(self.err.as_ref());
        errs.close_all(self.probers.iter_mut());
        errs.finish()
    }

    fn name(&self) -> &'static str {
        if self.short_circuit {
            "short_circuit_or"
        } else {
            "or"
        }
    }
}

impl Prober for OrProber {
    fn contains(&mut self, candidate: &Ref) -> bool {
        self.current = None;
        self.result = None;
        if self.err.is_some() {
            return false;
        }
        for (i, p) in self.probers.iter_mut().enumerate() {
            if p.contains(candidate) {
                self.current = Some(i);
                self.result = Some(candidate.clone());
                return true;
            }
            if absorb(&mut self.err, p) {
                return false;
            }
        }
        false
    }
}
