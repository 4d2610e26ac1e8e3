//! Count: a single integer result, the number of (result, path) pairs the
//! sub-shape enumerates.

use std::fmt;
use std::sync::Arc;

use trellis_core::prelude::{resolve, Costs, Error, Namer, Ref, Result, Size, TagMap, Value};

use crate::shape::Shape;
use crate::traits::{Base, CloseErrors, Cursor, Prober};

#[derive(Clone)]
pub struct Count {
    pub sub: Box<Shape>,
    /// Lets the prober recognise counts passed as store refs.
    pub namer: Option<Arc<dyn Namer>>,
}

impl fmt::Debug for Count {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Count").field("sub", &self.sub).finish()
    }
}

impl Count {
    pub fn new(sub: Shape) -> Self {
        Self {
            sub: Box::new(sub),
            namer: None,
        }
    }

    pub fn with_namer(mut self, namer: Arc<dyn Namer>) -> Self {
        self.namer = Some(namer);
        self
    }

    pub fn stats(&self) -> Result<Costs> {
        let st = self.sub.stats()?;
        let cost = if st.size.exact {
            1
        } else {
            st.next_cost.saturating_mul(st.size.value.max(1))
        };
        Ok(Costs::new(cost, cost, Size::exact(1)))
    }

    pub fn cursor(&self) -> CountCursor {
        CountCursor {
            sub: (*self.sub).clone(),
            result: None,
            done: false,
            err: None,
        }
    }

    pub fn prober(&self) -> CountProber {
        CountProber {
            sub: (*self.sub).clone(),
            namer: self.namer.clone(),
            count: None,
            result: None,
            err: None,
        }
    }
}

/// Exact size from the cost model when available, otherwise a full drain.
pub fn count_pairs(shape: &Shape) -> Result<i64> {
    let st = shape.stats()?;
    if st.size.exact {
        return Ok(st.size.value);
    }
    let mut cursor = shape.cursor();
    let mut n = 0i64;
    while cursor.next() {
        n += 1;
        while cursor.next_path() {
            n += 1;
        }
    }
    let mut errs = CloseErrors::new(cursor.err());
    errs.record(cursor.close());
    errs.finish()?;
    Ok(n)
}

pub struct CountCursor {
    sub: Shape,
    result: Option<Ref>,
    done: bool,
    err: Option<Error>,
}

impl Base for CountCursor {
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
        self.done = true;
        CloseErrors::new(self.err.as_ref()).finish()
    }

    fn name(&self) -> &'static str {
        "count"
    }
}

impl Cursor for CountCursor {
    fn next(&mut self) -> bool {
        if self.done || self.err.is_some() {
            self.result = None;
            return false;
        }
        self.done = true;
        match count_pairs(&self.sub) {
            Ok(n) => {
                self.result = Some(Ref::PreFetched(Value::Int(n)));
                true
            }
            Err(e) => {
                self.err = Some(e);
                false
            }
        }
    }
}

/// Succeeds only for the integer equal to the count.
pub struct CountProber {
    sub: Shape,
    namer: Option<Arc<dyn Namer>>,
    count: Option<i64>,
    result: Option<Ref>,
    err: Option<Error>,
}

impl CountProber {
    fn candidate_value(&self, candidate: &Ref) -> Result<Option<Value>> {
        match (candidate, &self.namer) {
            (Ref::PreFetched(v), _) => Ok(Some(v.clone())),
            (other, Some(namer)) => resolve(namer.as_ref(), other),
            (_, None) => Ok(None),
        }
    }
}

impl Base for CountProber {
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
        CloseErrors::new(self.err.as_ref()).finish()
    }

    fn name(&self) -> &'static str {
        "count"
    }
}

impl Prober for CountProber {
    fn contains(&mut self, candidate: &Ref) -> bool {
        self.result = None;
        if self.err.is_some() {
            return false;
        }
        let count = match self.count {
            Some(n) => n,
            None => match count_pairs(&self.sub) {
                Ok(n) => *self.count.insert(n),
                Err(e) => {
                    self.err = Some(e);
                    return false;
                }
            },
        };
        match self.candidate_value(candidate) {
            Ok(Some(v)) if v.as_int() == Some(count) => {
                self.result = Some(candidate.clone());
                true
            }
            Ok(_) => false,
            Err(e) => {
                self.err = Some(e);
                false
            }
        }
    }
}
