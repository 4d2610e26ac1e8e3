//! Execution configuration that downstream crates can serialize/deserialize.

use serde::{Deserialize, Serialize};

/// Entries (results plus alternative paths) Materialize caches before it
/// gives up and falls back to re-iteration.
pub const DEFAULT_MATERIALIZE_LIMIT: usize = 1000;

/// Depth bound for Recursive when the caller does not pick one.
pub const DEFAULT_MAX_RECURSIVE_DEPTH: usize = 50;

/// Upper bound on optimizer passes before the chain stops re-applying rules.
pub const DEFAULT_MAX_OPTIMIZE_PASSES: usize = 16;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecConfig {
    /// Cap on cached entries for Materialize shapes the optimizer inserts.
    pub materialize_limit: usize,

    /// Default depth bound for Recursive shapes built from this config.
    pub max_recursive_depth: usize,

    /// Run the optimizer before iterating.
    pub optimize: bool,

    /// Enumerate alternative tag bindings (`next_path`) in chain operations.
    pub paths: bool,

    /// Optional bound on the number of (result, path) pairs a chain returns.
    pub result_limit: Option<usize>,

    pub max_optimize_passes: usize,
}

impl Default for ExecConfig {
    fn default() -> Self {
        Self {
            materialize_limit: DEFAULT_MATERIALIZE_LIMIT,
            max_recursive_depth: DEFAULT_MAX_RECURSIVE_DEPTH,
            optimize: true,
            paths: true,
            result_limit: None,
            max_optimize_passes: DEFAULT_MAX_OPTIMIZE_PASSES,
        }
    }
}

impl ExecConfig {
    /// Create a config from environment variables, falling back to defaults.
    ///
    /// Environment variables:
    /// - `TRELLIS_MATERIALIZE_LIMIT`: Materialize cache cap
    /// - `TRELLIS_MAX_RECURSIVE_DEPTH`: default Recursive depth bound
    /// - `TRELLIS_OPTIMIZE`: `true`/`false`
    /// - `TRELLIS_PATHS`: `true`/`false`
    /// - `TRELLIS_RESULT_LIMIT`: bound on returned results
    /// - `TRELLIS_MAX_OPTIMIZE_PASSES`: optimizer pass bound
    ///
    /// Values that fail to parse are ignored.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`ExecConfig::from_env`] over an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut cfg = Self::default();

        if let Some(v) = parse(&lookup, "TRELLIS_MATERIALIZE_LIMIT") {
            cfg.materialize_limit = v;
        }

        if let Some(v) = parse(&lookup, "TRELLIS_MAX_RECURSIVE_DEPTH") {
            cfg.max_recursive_depth = v;
        }

        if let Some(v) = parse(&lookup, "TRELLIS_OPTIMIZE") {
            cfg.optimize = v;
        }

        if let Some(v) = parse(&lookup, "TRELLIS_PATHS") {
            cfg.paths = v;
        }

        if let Some(v) = parse(&lookup, "TRELLIS_RESULT_LIMIT") {
            cfg.result_limit = Some(v);
        }

        if let Some(v) = parse(&lookup, "TRELLIS_MAX_OPTIMIZE_PASSES") {
            cfg.max_optimize_passes = v;
        }

        cfg
    }

    pub fn validate(&self) -> crate::Result<()> {
        if self.max_optimize_passes == 0 {
            return Err(crate::Error::Config(
                "max_optimize_passes must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

fn parse<T: std::str::FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    lookup(key).and_then(|s| s.trim().parse::<T>().ok())
}
