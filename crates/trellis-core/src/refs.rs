//! Backend-opaque references and tag bindings.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::id::{NodeId, QuadId};
use crate::value::Value;

/// Token identifying one node or one quad inside a backend.
///
/// Refs carry no ordering guarantee. Equality and hashing go through
/// [`Ref::key`], the canonical key used for deduplication.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Ref {
    Node(NodeId),
    Quad(QuadId),
    /// A ref that already carries its value; resolves without a store lookup.
    PreFetched(Value),
}

/// Canonical hashable key of a [`Ref`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RefKey {
    Node(u64),
    Quad(u64),
    Value(Value),
}

impl Ref {
    pub fn node(id: u64) -> Self {
        Ref::Node(NodeId::new(id))
    }

    pub fn quad(id: u64) -> Self {
        Ref::Quad(QuadId::new(id))
    }

    pub fn pre_fetched(v: impl Into<Value>) -> Self {
        Ref::PreFetched(v.into())
    }

    pub fn key(&self) -> RefKey {
        match self {
            Ref::Node(id) => RefKey::Node(id.get()),
            Ref::Quad(id) => RefKey::Quad(id.get()),
            Ref::PreFetched(v) => RefKey::Value(v.clone()),
        }
    }

    pub fn as_pre_fetched(&self) -> Option<&Value> {
        match self {
            Ref::PreFetched(v) => Some(v),
            _ => None,
        }
    }
}

impl fmt::Display for Ref {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Ref::Node(id) => write!(f, "{id}"),
            Ref::Quad(id) => write!(f, "{id}"),
            Ref::PreFetched(v) => write!(f, "{v}"),
        }
    }
}

/// Named bindings captured while a result was produced.
///
/// Always owned by whoever asked for the bindings; executions only write into
/// the map they are handed and never keep a reference to it.
pub type TagMap = BTreeMap<String, Ref>;

/// Estimated (or exact) result count of a shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Size {
    pub value: i64,
    pub exact: bool,
}

impl Size {
    pub const fn exact(value: i64) -> Self {
        Self { value, exact: true }
    }

    pub const fn estimate(value: i64) -> Self {
        Self {
            value,
            exact: false,
        }
    }
}
