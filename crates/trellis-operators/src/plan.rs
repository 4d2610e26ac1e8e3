//! Serializable description of a shape tree.
//!
//! Used for explain output and for plan fingerprints in the exec crate.

use serde::{Deserialize, Serialize};
use trellis_core::prelude::Costs;

/// One node of a described plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShapePlan {
    /// Stable kind name (`"and"`, `"materialize"`, ...).
    pub kind: String,

    /// Kind-specific parameters, in a stable order.
    pub params: Vec<(String, String)>,

    /// `None` when the shape failed to report its costs.
    pub costs: Option<Costs>,

    pub children: Vec<ShapePlan>,
}

impl ShapePlan {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            params: Vec::new(),
            costs: None,
            children: Vec::new(),
        }
    }

    pub fn with_param(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.params.push((key.into(), value.to_string()));
        self
    }

    /// Total number of nodes in this plan.
    pub fn node_count(&self) -> usize {
        1 + self.children.iter().map(|c| c.node_count()).sum::<usize>()
    }

    /// Indented one-node-per-line rendering.
    pub fn render(&self) -> String {
        let mut out = String::new();
        self.render_into(&mut out, 0);
        out
    }

    fn render_into(&self, out: &mut String, depth: usize) {
        for _ in 0..depth {
            out.push_str("  ");
        }
        out.push_str(&self.kind);
        if !self.params.is_empty() {
            let params: Vec<String> = self
                .params
                .iter()
                .map(|(k, v)| format!("{k}={v}"))
                .collect();
            out.push('(');
            out.push_str(&params.join(", "));
            out.push(')');
        }
        if let Some(c) = &self.costs {
            out.push_str(&format!(
                " [next={} contains={} size={}{}]",
                c.next_cost,
                c.contains_cost,
                if c.size.exact { "" } else { "~" },
                c.size.value
            ));
        }
        out.push('\n');
        for child in &self.children {
            child.render_into(out, depth + 1);
        }
    }
}
