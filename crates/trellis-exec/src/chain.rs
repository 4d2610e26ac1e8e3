//! The execution chain.
//!
//! ```text
//! Chain::new(shape)          optimize? -> cursor -> limit? -> paths? -> op
//!     .limit(10)
//!     .on(store)             required by the *_value(s) operations
//!     .all()
//! ```
//!
//! Every operation consumes the chain, opens at most one cursor and closes it
//! exactly once on every exit path. When the body of an operation fails the
//! body's error is returned even if closing also failed.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::mpsc;
use tracing::{debug, trace, Level};
use trellis_core::config::ExecConfig;
use trellis_core::hash::Fingerprint;
use trellis_core::prelude::{resolve, Error, Namer, Ref, Result, TagMap, Value};
use trellis_operators::{BoxCursor, Cursor, Shape, ShapePlan, RECURSIVE_BASE_TAG};
use trellis_planner::{estimate_plan, Optimizer, PlanEstimate};

use crate::context::ExecContext;
use crate::fingerprint::plan_fingerprint;
use crate::metrics::ChainMetrics;

pub struct Chain {
    shape: Shape,
    cfg: ExecConfig,
    namer: Option<Arc<dyn Namer>>,
    ctx: ExecContext,
}

/// What a chain would run, without running it.
#[derive(Debug, Clone, Serialize)]
pub struct Explain {
    pub plan: ShapePlan,
    pub estimate: PlanEstimate,
    pub fingerprint: Fingerprint,
    pub optimized: bool,
}

impl Chain {
    pub fn new(shape: Shape) -> Self {
        Self {
            shape,
            cfg: ExecConfig::default(),
            namer: None,
            ctx: ExecContext::default(),
        }
    }

    pub fn with_config(mut self, cfg: ExecConfig) -> Self {
        self.cfg = cfg;
        self
    }

    /// Stop after `n` (result, path) pairs.
    pub fn limit(mut self, n: usize) -> Self {
        self.cfg.result_limit = Some(n);
        self
    }

    /// Whether alternative tag bindings of a result are visited.
    pub fn paths(mut self, enabled: bool) -> Self {
        self.cfg.paths = enabled;
        self
    }

    /// Naming function used by the value-resolving operations.
    pub fn on(mut self, namer: Arc<dyn Namer>) -> Self {
        self.namer = Some(namer);
        self
    }

    pub fn unoptimized(mut self) -> Self {
        self.cfg.optimize = false;
        self
    }

    pub fn with_context(mut self, ctx: ExecContext) -> Self {
        self.ctx = ctx;
        self
    }

    pub fn config(&self) -> &ExecConfig {
        &self.cfg
    }

    /// The shape that will actually be iterated.
    pub fn prepare(&self) -> Result<Shape> {
        self.cfg.validate()?;
        if !self.cfg.optimize {
            return Ok(self.shape.clone());
        }
        let mut opt = Optimizer::new(&self.cfg);
        if self.cfg.result_limit.is_some() {
            // Only a prefix is read, so which results come first matters.
            opt = opt.preserving_order();
        }
        opt.optimize_fully(self.shape.clone())
    }

    pub fn explain(&self) -> Result<Explain> {
        let shape = self.prepare()?;
        Ok(Explain {
            plan: shape.describe(),
            estimate: estimate_plan(&shape)?,
            fingerprint: plan_fingerprint(&shape)?,
            optimized: self.cfg.optimize,
        })
    }

    fn namer(&self) -> Result<Arc<dyn Namer>> {
        self.namer.clone().ok_or(Error::NoNamer)
    }

    fn start(&self, op: &'static str) -> Result<Run> {
        self.ctx.check()?;
        let shape = self.prepare()?;
        Ok(self.open(&shape, op))
    }

    fn open(&self, shape: &Shape, op: &'static str) -> Run {
        let mut metrics = ChainMetrics::new(op);
        if tracing::enabled!(Level::DEBUG) {
            match plan_fingerprint(shape) {
                Ok(fp) => {
                    debug!(op, plan = %fp.short(), root = shape.name(), "chain started");
                    metrics.set_plan(fp.short());
                }
                Err(e) => debug!(op, error = %e, "plan fingerprint unavailable"),
            }
        }
        Run {
            cursor: shape.cursor(),
            progress: Progress::default(),
            paths: self.cfg.paths,
            limit: self.cfg.result_limit,
            ctx: self.ctx.clone(),
            metrics,
        }
    }

    fn drive<T>(&self, op: &'static str, body: impl FnOnce(&mut Run) -> Result<T>) -> Result<T> {
        let mut run = self.start(op)?;
        let out = body(&mut run);
        run.finish(out)
    }

    /// Call `f` for every (result, path) pair.
    pub fn each(self, mut f: impl FnMut(&Ref)) -> Result<()> {
        self.drive("each", |run| {
            while run.advance()? {
                if let Some(r) = run.result() {
                    f(r);
                }
            }
            Ok(())
        })
    }

    pub fn all(self) -> Result<Vec<Ref>> {
        let mut out = Vec::new();
        self.each(|r| out.push(r.clone()))?;
        Ok(out)
    }

    /// The first result, alternative paths aside.
    pub fn first(self) -> Result<Option<Ref>> {
        self.drive("first", |run| {
            if run.advance()? {
                return Ok(run.result().cloned());
            }
            Ok(None)
        })
    }

    /// Exact size estimates are trusted; anything else is counted by
    /// enumeration. Exact sizes count (result, path) pairs, so they are only
    /// used while paths are enabled.
    pub fn count(self) -> Result<i64> {
        self.ctx.check()?;
        let shape = self.prepare()?;
        let st = shape.stats()?;
        if self.cfg.paths && st.size.exact {
            let n = st.size.value;
            let n = match self.cfg.result_limit {
                Some(limit) => n.min(i64::try_from(limit).unwrap_or(i64::MAX)),
                None => n,
            };
            debug!(count = n, "count answered from exact stats");
            return Ok(n);
        }
        let mut run = self.open(&shape, "count");
        let mut n = 0i64;
        let out = loop {
            match run.advance() {
                Ok(true) => n += 1,
                Ok(false) => break Ok(n),
                Err(e) => break Err(e),
            }
        };
        run.finish(out)
    }

    /// Push every result into `out`, waiting for capacity as needed. Fails
    /// with `Cancelled` if the context is cancelled while waiting and with
    /// `ChannelClosed` if the receiver went away.
    pub async fn send(self, out: &mpsc::Sender<Ref>) -> Result<()> {
        let mut run = self.start("send")?;
        let token = self.ctx.token().clone();
        let body = async {
            while run.advance()? {
                let Some(r) = run.result().cloned() else {
                    continue;
                };
                tokio::select! {
                    biased;
                    _ = token.cancelled() => return Err(Error::Cancelled),
                    sent = out.send(r) => sent.map_err(|_| Error::ChannelClosed)?,
                }
            }
            Ok::<(), Error>(())
        }
        .await;
        run.finish(body)
    }

    /// Call `f` with the tag bindings of every (result, path) pair.
    pub fn tag_each(self, mut f: impl FnMut(&TagMap)) -> Result<()> {
        self.drive("tag_each", |run| {
            while run.advance()? {
                f(&run.tags());
            }
            Ok(())
        })
    }

    // Value-resolving variants. Refs the store cannot name are skipped.

    pub fn each_value(self, mut f: impl FnMut(&Value)) -> Result<()> {
        self.each_value_pair(|_, v| f(v))
    }

    pub fn each_value_pair(self, mut f: impl FnMut(&Ref, &Value)) -> Result<()> {
        let namer = self.namer()?;
        self.drive("each_value", |run| {
            while run.advance()? {
                let Some(r) = run.result() else {
                    continue;
                };
                if let Some(v) = resolve(namer.as_ref(), r)? {
                    f(r, &v);
                }
            }
            Ok(())
        })
    }

    pub fn all_values(self) -> Result<Vec<Value>> {
        let mut out = Vec::new();
        self.each_value(|v| out.push(v.clone()))?;
        Ok(out)
    }

    /// First result the store can name.
    pub fn first_value(self) -> Result<Option<Value>> {
        let namer = self.namer()?;
        self.paths(false).drive("first_value", |run| {
            while run.advance()? {
                let Some(r) = run.result() else {
                    continue;
                };
                if let Some(v) = resolve(namer.as_ref(), r)? {
                    return Ok(Some(v));
                }
            }
            Ok(None)
        })
    }

    pub async fn send_values(self, out: &mpsc::Sender<Value>) -> Result<()> {
        let namer = self.namer()?;
        let mut run = self.start("send_values")?;
        let token = self.ctx.token().clone();
        let body = async {
            while run.advance()? {
                let Some(r) = run.result() else {
                    continue;
                };
                let Some(v) = resolve(namer.as_ref(), r)? else {
                    continue;
                };
                tokio::select! {
                    biased;
                    _ = token.cancelled() => return Err(Error::Cancelled),
                    sent = out.send(v) => sent.map_err(|_| Error::ChannelClosed)?,
                }
            }
            Ok::<(), Error>(())
        }
        .await;
        run.finish(body)
    }

    /// Tag bindings resolved to values; bindings the store cannot name are
    /// left out of the map.
    pub fn tag_values(self, mut f: impl FnMut(&BTreeMap<String, Value>)) -> Result<()> {
        let namer = self.namer()?;
        self.drive("tag_values", |run| {
            while run.advance()? {
                let mut named = BTreeMap::new();
                for (k, r) in run.tags() {
                    if let Some(v) = resolve(namer.as_ref(), &r)? {
                        named.insert(k, v);
                    }
                }
                f(&named);
            }
            Ok(())
        })
    }
}

#[derive(Debug, Default, Clone, Copy)]
struct Progress {
    /// (result, path) pairs handed to the operation so far.
    emitted: usize,
    /// The cursor sits on a result, so `next_path` is legal.
    started: bool,
}

/// One open cursor plus the bookkeeping of the walk over it.
struct Run {
    cursor: BoxCursor,
    progress: Progress,
    paths: bool,
    limit: Option<usize>,
    ctx: ExecContext,
    metrics: ChainMetrics,
}

impl Run {
    /// Move to the next (result, path) pair.
    fn advance(&mut self) -> Result<bool> {
        self.ctx.check()?;
        if self.limit.is_some_and(|l| self.progress.emitted >= l) {
            return Ok(false);
        }
        let moved = if self.progress.started && self.paths && self.cursor.next_path() {
            self.metrics.record_path();
            true
        } else if self.cursor.next() {
            self.progress.started = true;
            self.metrics.record_result();
            true
        } else {
            self.progress.started = false;
            false
        };
        if !moved {
            return match self.cursor.err() {
                Some(e) => Err(e.clone()),
                None => Ok(false),
            };
        }
        self.progress.emitted += 1;
        if let Some(r) = self.cursor.result() {
            trace!(result = %r, n = self.progress.emitted, "chain result");
        }
        Ok(true)
    }

    fn result(&self) -> Option<&Ref> {
        self.cursor.result()
    }

    /// Bindings of the current pair, internal bookkeeping tags removed.
    fn tags(&self) -> TagMap {
        let mut tags = TagMap::new();
        self.cursor.tag_results(&mut tags);
        tags.remove(RECURSIVE_BASE_TAG);
        tags
    }

    fn finish<T>(mut self, body: Result<T>) -> Result<T> {
        let closed = self.cursor.close();
        self.metrics.emit(body.is_ok() && closed.is_ok());
        match (body, closed) {
            (Err(e), _) | (Ok(_), Err(e)) => Err(e),
            (Ok(v), Ok(())) => Ok(v),
        }
    }
}
