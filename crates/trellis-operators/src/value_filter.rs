//! ValueFilter: keeps results whose resolved value satisfies a predicate.
//!
//! Supports the generic predicate form plus two built-in families:
//! comparisons (`col OP literal` style, OP in {==, !=, <, <=, >, >=}) and
//! SQL-like wildcard patterns (`%` any run, `_` one character).

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use trellis_core::prelude::{resolve, Costs, Error, Namer, Ref, Result, Size, TagMap, Value};

use crate::shape::Shape;
use crate::traits::{absorb, Base, BoxCursor, BoxProber, CloseErrors, Cursor, Prober};

pub type ValuePredicate = Arc<dyn Fn(&Value) -> Result<bool> + Send + Sync>;

#[derive(Clone)]
pub struct ValueFilter {
    pub sub: Box<Shape>,
    pub namer: Arc<dyn Namer>,
    pub predicate: ValuePredicate,
    /// Human-readable predicate, for plan descriptions.
    pub label: String,
}

impl fmt::Debug for ValueFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValueFilter")
            .field("label", &self.label)
            .field("sub", &self.sub)
            .finish()
    }
}

impl ValueFilter {
    pub fn new(
        sub: Shape,
        namer: Arc<dyn Namer>,
        label: impl Into<String>,
        predicate: impl Fn(&Value) -> Result<bool> + Send + Sync + 'static,
    ) -> Self {
        Self {
            sub: Box::new(sub),
            namer,
            predicate: Arc::new(predicate),
            label: label.into(),
        }
    }

    /// Keep values for which `value OP literal` holds.
    pub fn comparison(sub: Shape, namer: Arc<dyn Namer>, op: CompareOp, literal: Value) -> Self {
        let label = format!("{op} {literal}");
        Self::new(sub, namer, label, move |v| compare(v, op, &literal))
    }

    /// Keep textual values matching a wildcard pattern.
    pub fn like(sub: Shape, namer: Arc<dyn Namer>, pattern: impl Into<String>) -> Self {
        let pattern: Vec<char> = pattern.into().chars().collect();
        let label = format!("like {}", pattern.iter().collect::<String>());
        Self::new(sub, namer, label, move |v| {
            if !v.is_textual() {
                return Ok(false);
            }
            let text: Vec<char> = v.lexical().chars().collect();
            Ok(wildcard_match(&pattern, &text))
        })
    }

    pub fn stats(&self) -> Result<Costs> {
        let st = self.sub.stats()?;
        Ok(Costs::new(
            st.next_cost,
            st.contains_cost,
            Size::estimate(st.size.value / 2 + 1),
        ))
    }

    pub fn cursor(&self) -> ValueFilterCursor {
        ValueFilterCursor {
            sub: self.sub.cursor(),
            namer: Arc::clone(&self.namer),
            predicate: Arc::clone(&self.predicate),
            err: None,
        }
    }

    pub fn prober(&self) -> ValueFilterProber {
        ValueFilterProber {
            sub: self.sub.prober(),
            namer: Arc::clone(&self.namer),
            predicate: Arc::clone(&self.predicate),
            result: None,
            err: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Lt,
    Lte,
    Gt,
    Gte,
    Eq,
    Ne,
}

impl FromStr for CompareOp {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Ok(match s.trim() {
            "<" => CompareOp::Lt,
            "<=" => CompareOp::Lte,
            ">" => CompareOp::Gt,
            ">=" => CompareOp::Gte,
            "==" => CompareOp::Eq,
            "!=" => CompareOp::Ne,
            other => return Err(Error::Predicate(format!("unknown op: {}", other))),
        })
    }
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            CompareOp::Lt => "<",
            CompareOp::Lte => "<=",
            CompareOp::Gt => ">",
            CompareOp::Gte => ">=",
            CompareOp::Eq => "==",
            CompareOp::Ne => "!=",
        })
    }
}

fn ordered<T: PartialOrd>(a: &T, op: CompareOp, b: &T) -> bool {
    match op {
        CompareOp::Lt => a < b,
        CompareOp::Lte => a <= b,
        CompareOp::Gt => a > b,
        CompareOp::Gte => a >= b,
        CompareOp::Eq => a == b,
        CompareOp::Ne => a != b,
    }
}

/// Compare two values of the same kind. Values of different kinds never match.
pub fn compare(val: &Value, op: CompareOp, literal: &Value) -> Result<bool> {
    match (val, literal) {
        (Value::Int(a), Value::Int(b)) => Ok(ordered(a, op, b)),
        (Value::Bool(a), Value::Bool(b)) => match op {
            CompareOp::Eq => Ok(a == b),
            CompareOp::Ne => Ok(a != b),
            _ => Err(Error::Predicate(format!("unsupported op '{}' for bool", op))),
        },
        (a, b) if std::mem::discriminant(a) == std::mem::discriminant(b) && a.is_textual() => {
            Ok(ordered(&a.lexical(), op, &b.lexical()))
        }
        _ => Ok(false),
    }
}

/// `%` matches any run of characters (including none), `_` exactly one.
fn wildcard_match(pattern: &[char], text: &[char]) -> bool {
    // Greedy matcher with single-star backtracking.
    let (mut p, mut t) = (0, 0);
    let mut star: Option<(usize, usize)> = None;
    while t < text.len() {
        match pattern.get(p) {
            Some('%') => {
                star = Some((p, t));
                p += 1;
            }
            Some('_') => {
                p += 1;
                t += 1;
            }
            Some(c) if *c == text[t] => {
                p += 1;
                t += 1;
            }
            _ => match star {
                Some((sp, st)) => {
                    p = sp + 1;
                    t = st + 1;
                    star = Some((sp, st + 1));
                }
                None => return false,
            },
        }
    }
    pattern[p..].iter().all(|c| *c == '%')
}

/// Resolve then test. Unknown refs never pass.
fn accepts(namer: &dyn Namer, predicate: &ValuePredicate, r: &Ref) -> Result<bool> {
    match resolve(namer, r)? {
        Some(v) => predicate(&v),
        None => Ok(false),
    }
}

pub struct ValueFilterCursor {
    sub: BoxCursor,
    namer: Arc<dyn Namer>,
    predicate: ValuePredicate,
    err: Option<Error>,
}

impl Base for ValueFilterCursor {
    fn next_path(&mut self) -> bool {
        self.err.is_none() && self.sub.next_path()
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
        let mut errs = CloseErrors::new(self.err.as_ref());
        errs.record(self.sub.close());
        errs.finish()
    }

    fn name(&self) -> &'static str {
        "value_filter"
    }
}

impl Cursor for ValueFilterCursor {
    fn next(&mut self) -> bool {
        if self.err.is_some() {
            return false;
        }
        while self.sub.next() {
            let Some(r) = self.sub.result() else {
                continue;
            };
            match accepts(self.namer.as_ref(), &self.predicate, r) {
                Ok(true) => return true,
                Ok(false) => {}
                Err(e) => {
                    self.err = Some(e);
                    return false;
                }
            }
        }
        absorb(&mut self.err, &self.sub);
        false
    }
}

pub struct ValueFilterProber {
    sub: BoxProber,
    namer: Arc<dyn Namer>,
    predicate: ValuePredicate,
    result: Option<Ref>,
    err: Option<Error>,
}

impl Base for ValueFilterProber {
    fn next_path(&mut self) -> bool {
        self.err.is_none() && self.result.is_some() && self.sub.next_path()
    }

    fn result(&self) -> Option<&Ref> {
        self.result.as_ref()
    }

    fn tag_results(&self, dst: &mut TagMap) {
        if self.result.is_some() {
            self.sub.tag_results(dst);
        }
    }

    fn err(&self) -> Option<&Error> {
        self.err.as_ref()
    }

    fn close(&mut self) -> Result<()> {
        let mut errs = CloseErrors::new(self.err.as_ref());
        errs.record(self.sub.close());
        errs.finish()
    }

    fn name(&self) -> &'static str {
        "value_filter"
    }
}

impl Prober for ValueFilterProber {
    fn contains(&mut self, candidate: &Ref) -> bool {
        self.result = None;
        if self.err.is_some() {
            return false;
        }
        match accepts(self.namer.as_ref(), &self.predicate, candidate) {
            Ok(true) => {}
            Ok(false) => return false,
            Err(e) => {
                self.err = Some(e);
                return false;
            }
        }
        if self.sub.contains(candidate) {
            self.result = Some(candidate.clone());
            return true;
        }
        absorb(&mut self.err, &self.sub);
        false
    }
}
