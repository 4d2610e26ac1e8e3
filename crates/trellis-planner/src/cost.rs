//! Whole-plan cost summary.
//!
//! Every shape reports its own [`Costs`]; this walks a tree once and folds
//! them into a single `PlanEstimate`, which is what `explain` output and the
//! optimizer's debug logs show.

use serde::{Deserialize, Serialize};
use trellis_core::prelude::{Costs, Result};
use trellis_operators::Shape;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlanEstimate {
    /// Costs of the root shape.
    pub root: Costs,
    /// Sum of every node's full-scan cost.
    pub total_scan_cost: i64,
    pub nodes: usize,
    pub max_depth: usize,
    /// Nodes whose size is a guess rather than an exact count.
    pub inexact_nodes: usize,
    /// Cached sub-plans, whether written by the caller or inserted by the
    /// optimizer.
    pub materialize_nodes: usize,
}

impl PlanEstimate {
    /// Expected cost of draining the plan from the root.
    pub fn root_scan_cost(&self) -> i64 {
        self.root.scan_cost()
    }
}

pub fn estimate_plan(shape: &Shape) -> Result<PlanEstimate> {
    fn walk(shape: &Shape, depth: usize, acc: &mut PlanEstimate) -> Result<()> {
        let costs = shape.stats()?;
        acc.nodes += 1;
        acc.max_depth = acc.max_depth.max(depth);
        acc.total_scan_cost = acc.total_scan_cost.saturating_add(costs.scan_cost());
        if !costs.size.exact {
            acc.inexact_nodes += 1;
        }
        if matches!(shape, Shape::Materialize(_)) {
            acc.materialize_nodes += 1;
        }
        for child in shape.children() {
            walk(child, depth + 1, acc)?;
        }
        Ok(())
    }

    let mut acc = PlanEstimate {
        root: shape.stats()?,
        ..PlanEstimate::default()
    };
    walk(shape, 1, &mut acc)?;
    Ok(acc)
}
