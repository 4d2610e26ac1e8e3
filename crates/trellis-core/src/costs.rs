//! Self-describing cost estimates.
//!
//! Costs are expressed in backend-defined units, not wall-clock time. The
//! optimizer compares them between siblings; Count and the chain driver read
//! `size` to skip enumeration when it is exact.

use serde::{Deserialize, Serialize};

use crate::refs::Size;

/// Per-shape cost estimate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Costs {
    /// Cost of one `next()` on the cursor form.
    pub next_cost: i64,
    /// Cost of one `contains()` on the prober form.
    pub contains_cost: i64,
    pub size: Size,
}

impl Costs {
    pub const fn new(next_cost: i64, contains_cost: i64, size: Size) -> Self {
        Self {
            next_cost,
            contains_cost,
            size,
        }
    }

    /// Costs of a shape that produces nothing.
    pub const fn empty() -> Self {
        Self {
            next_cost: 0,
            contains_cost: 0,
            size: Size::exact(0),
        }
    }

    /// Total cost of enumerating every result.
    pub fn scan_cost(&self) -> i64 {
        self.next_cost.saturating_mul(self.size.value.max(0))
    }
}
