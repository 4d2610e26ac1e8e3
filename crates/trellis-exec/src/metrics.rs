//! Per-chain counters.
//!
//! Kept deliberately small: the counters are emitted as a single `debug!`
//! event when the chain finishes. Export to a metrics backend belongs to the
//! embedding application, which can subscribe to the `trellis_exec` target.

use std::time::Instant;

use tracing::debug;

#[derive(Debug, Clone)]
pub struct ChainMetrics {
    op: &'static str,
    plan: Option<String>,
    results: u64,
    paths: u64,
    started: Instant,
}

impl ChainMetrics {
    pub fn new(op: &'static str) -> Self {
        Self {
            op,
            plan: None,
            results: 0,
            paths: 0,
            started: Instant::now(),
        }
    }

    /// Attach the short plan fingerprint so log lines can be correlated.
    pub fn set_plan(&mut self, short: String) {
        self.plan = Some(short);
    }

    #[inline]
    pub fn record_result(&mut self) {
        self.results += 1;
    }

    #[inline]
    pub fn record_path(&mut self) {
        self.paths += 1;
    }

    pub fn results(&self) -> u64 {
        self.results
    }

    pub fn paths(&self) -> u64 {
        self.paths
    }

    pub fn emit(&self, ok: bool) {
        debug!(
            op = self.op,
            plan = self.plan.as_deref().unwrap_or("-"),
            results = self.results,
            paths = self.paths,
            elapsed_us = self.started.elapsed().as_micros() as u64,
            ok,
            "chain finished"
        );
    }
}
