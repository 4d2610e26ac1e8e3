//! Read half of the store contract: translating between Refs and Values.
//!
//! Every backend follows one rule here: a Ref (or Value) the store does not
//! know is `Ok(None)`. `Err` is reserved for genuine backend failures, so
//! consumers never have to guess which of the two a given backend picked.

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::refs::{Ref, Size};
use crate::value::Value;

pub trait Namer: Send + Sync {
    /// Look up the Ref of a value. Unknown values yield `Ok(None)`.
    fn value_of(&self, value: &Value) -> Result<Option<Ref>>;

    /// Resolve a Ref to its public value. Unknown refs yield `Ok(None)`.
    fn name_of(&self, r: &Ref) -> Result<Option<Value>>;
}

/// Resolve a ref, short-circuiting refs that already carry their value.
pub fn resolve(namer: &dyn Namer, r: &Ref) -> Result<Option<Value>> {
    match r {
        Ref::PreFetched(v) => Ok(Some(v.clone())),
        other => namer.name_of(other),
    }
}

/// Node and quad counts reported by `QuadStore::stats`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreStats {
    pub nodes: Size,
    pub quads: Size,
}
