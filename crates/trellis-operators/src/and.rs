//! And: intersection of sub-shapes.
//!
//! The cursor is driven by the first sub-shape; every other sub-shape is
//! probed with each candidate. Alternative paths form a cross product over
//! the driver and all checkers, advanced like an odometer (rightmost first),
//! so the set of (result, tags) pairs does not depend on sub-shape order.

use trellis_core::prelude::{Costs, Error, Ref, Result, Size, TagMap};

use crate::shape::Shape;
use crate::traits::{absorb, Base, BoxCursor, BoxProber, CloseErrors, Cursor, Prober};

#[derive(Debug, Clone, Default)]
pub struct And {
    /// `subs[0]` drives enumeration in cursor mode.
    pub subs: Vec<Shape>,
}

impl And {
    pub fn new(subs: Vec<Shape>) -> Self {
        Self { subs }
    }

    pub fn stats(&self) -> Result<Costs> {
        let Some(first) = self.subs.first() else {
            return Ok(Costs::empty());
        };
        let driver = first.stats()?;
        let mut next_cost = driver.next_cost;
        let mut contains_cost = driver.contains_cost;
        let mut size = driver.size.value;
        for sub in &self.subs[1..] {
            let st = sub.stats()?;
            next_cost = next_cost.saturating_add(st.contains_cost);
            contains_cost = contains_cost.saturating_add(st.contains_cost);
            size = size.min(st.size.value);
        }
        let exact = self.subs.len() == 1 && driver.size.exact;
        Ok(Costs::new(
            next_cost,
            contains_cost,
            Size {
                value: size,
                exact,
            },
        ))
    }

    pub fn cursor(&self) -> AndCursor {
        let mut subs = self.subs.iter();
        let driver = subs.next().map(|s| s.cursor());
        AndCursor {
            driver,
            checkers: subs.map(|s| s.prober()).collect(),
            result: None,
            err: None,
        }
    }

    pub fn prober(&self) -> AndProber {
        AndProber {
            probers: self.subs.iter().map(|s| s.prober()).collect(),
            result: None,
            err: None,
        }
    }
}

/// Re-confirm `value` on every checker from `from` onwards, resetting their
/// path state. Returns false if any of them no longer contains it.
fn reset_from(checkers: &mut [BoxProber], from: usize, value: &Ref) -> bool {
    checkers[from..].iter_mut().all(|p| p.contains(value))
}

/// Advance the rightmost checker that still has a path, then reset the ones
/// after it.
fn advance_checkers(checkers: &mut [BoxProber], value: &Ref) -> bool {
    for i in (0..checkers.len()).rev() {
        if checkers[i].next_path() {
            return reset_from(checkers, i + 1, value);
        }
    }
    false
}

fn first_error(err: &mut Option<Error>, probers: &[BoxProber]) -> bool {
    probers.iter().any(|p| absorb(err, p))
}

pub struct AndCursor {
    driver: Option<BoxCursor>,
    checkers: Vec<BoxProber>,
    result: Option<Ref>,
    err: Option<Error>,
}

impl Base for AndCursor {
    fn next_path(&mut self) -> bool {
        if self.err.is_some() {
            return false;
        }
        let Some(value) = self.result.clone() else {
            return false;
        };
        if advance_checkers(&mut self.checkers, &value) {
            return true;
        }
        let Some(driver) = self.driver.as_mut() else {
            return false;
        };
        if driver.next_path() {
            return reset_from(&mut self.checkers, 0, &value);
        }
        absorb(&mut self.err, driver);
        first_error(&mut self.err, &self.checkers);
        false
    }

    fn result(&self) -> Option<&Ref> {
        self.result.as_ref()
    }

    fn tag_results(&self, dst: &mut TagMap) {
        if let Some(d) = &self.driver {
            d.tag_results(dst);
        }
        for p in &self.checkers {
            p.tag_results(dst);
        }
    }

    fn err(&self) -> Option<&Error> {
        self.err.as_ref()
    }

    fn close(&mut self) -> Result<()> {
        let mut errs = CloseErrors::new(self.err.as_ref());
        errs.close_all(self.driver.iter_mut());
        errs.close_all(self.checkers.iter_mut());
        self.result = None;
        errs.finish()
    }

    fn name(&self) -> &'static str {
        "and"
    }
}

impl Cursor for AndCursor {
    fn next(&mut self) -> bool {
        if self.err.is_some() {
            return false;
        }
        let Some(driver) = self.driver.as_mut() else {
            return false;
        };
        while driver.next() {
            let Some(candidate) = driver.result().cloned() else {
                continue;
            };
            if reset_from(&mut self.checkers, 0, &candidate) {
                self.result = Some(candidate);
                return true;
            }
            if first_error(&mut self.err, &self.checkers) {
                break;
            }
        }
        absorb(&mut self.err, driver);
        self.result = None;
        false
    }
}

pub struct AndProber {
    probers: Vec<BoxProber>,
    result: Option<Ref>,
    err: Option<Error>,
}

impl Base for AndProber {
    fn next_path(&mut self) -> bool {
        if self.err.is_some() {
            return false;
        }
        let Some(value) = self.result.clone() else {
            return false;
        };
        if advance_checkers(&mut self.probers, &value) {
            return true;
        }
        first_error(&mut self.err, &self.probers);
        false
    }

    fn result(&self) -> Option<&Ref> {
        self.result.as_ref()
    }

    fn tag_results(&self, dst: &mut TagMap) {
        for p in &self.probers {
            p.tag_results(dst);
        }
    }

    fn err(&self) -> Option<&Error> {
        self.err.as_ref()
    }

    fn close(&mut self) -> Result<()> {
        let mut errs = CloseErrors::new(self.err.as_ref());
        errs.close_all(self.probers.iter_mut());
        self.result = None;
        errs.finish()
    }

    fn name(&self) -> &'static str {
        "and"
    }
}

impl Prober for AndProber {
    fn contains(&mut self, candidate: &Ref) -> bool {
        if self.err.is_some() || self.probers.is_empty() {
            return false;
        }
        if reset_from(&mut self.probers, 0, candidate) {
            self.result = Some(candidate.clone());
            return true;
        }
        self.result = None;
        first_error(&mut self.err, &self.probers);
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixed::Fixed;

    fn nodes(ids: &[u64]) -> Shape {
        Shape::Fixed(Fixed::new(ids.iter().map(|&i| Ref::node(i))))
    }

    #[test]
    fn intersection_keeps_driver_order() {
        let and = And::new(vec![nodes(&[5, 1, 3, 2]), nodes(&[2, 3, 4, 5])]);
        let mut c = and.cursor();
        let mut got = Vec::new();
        while c.next() {
            got.push(c.result().cloned().unwrap());
        }
        assert_eq!(got, vec![Ref::node(5), Ref::node(3), Ref::node(2)]);
        assert!(c.close().is_ok());
    }

    #[test]
    fn duplicate_checker_matches_become_paths() {
        let and = And::new(vec![nodes(&[1]), nodes(&[1, 1])]);
        let mut c = and.cursor();
        assert!(c.next());
        assert!(c.next_path());
        assert!(!c.next_path());
        assert!(!c.next());
    }

    #[test]
    fn prober_requires_every_sub() {
        let and = And::new(vec![nodes(&[1, 2]), nodes(&[2, 3])]);
        let mut p = and.prober();
        assert!(p.contains(&Ref::node(2)));
        assert_eq!(p.result(), Some(&Ref::node(2)));
        assert!(!p.contains(&Ref::node(1)));
        assert!(!p.contains(&Ref::node(3)));
    }

    #[test]
    fn size_is_the_smallest_sub() {
        let and = And::new(vec![nodes(&[1, 2, 3]), nodes(&[2])]);
        let st = and.stats().unwrap();
        assert_eq!(st.size, Size::estimate(1));
    }
}
