//! Cooperative cancellation.
//!
//! A chain checks its context before every unit of work. Cancelling a token
//! never interrupts a pull in progress; the next check observes it and the
//! chain unwinds with [`Error::Cancelled`].

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::Notify;
use trellis_core::prelude::{Error, Result};

#[derive(Debug, Default)]
struct Inner {
    cancelled: AtomicBool,
    notify: Notify,
}

/// Shared cancellation flag. Clones observe the same state.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    inner: Arc<Inner>,
}

impl CancellationToken {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Cancels every execution holding this token. Idempotent.
    #[inline]
    pub fn cancel(&self) {
        self.inner.cancelled.store(true, Ordering::SeqCst);
        self.inner.notify.notify_waiters();
    }

    #[inline]
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::SeqCst)
    }

    /// Resolves once the token is cancelled.
    pub async fn cancelled(&self) {
        loop {
            // Registered before the flag check so a concurrent cancel is not lost.
            let notified = self.inner.notify.notified();
            if self.is_cancelled() {
                return;
            }
            notified.await;
        }
    }
}

/// Per-execution context handed to a chain.
#[derive(Debug, Clone, Default)]
pub struct ExecContext {
    token: CancellationToken,
}

impl ExecContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(token: CancellationToken) -> Self {
        Self { token }
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// `Err(Cancelled)` once the token fired.
    #[inline]
    pub fn check(&self) -> Result<()> {
        if self.token.is_cancelled() {
            Err(Error::Cancelled)
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_state() {
        let token = CancellationToken::new();
        let ctx = ExecContext::with_token(token.clone());
        assert!(ctx.check().is_ok());

        token.cancel();
        assert!(ctx.token().is_cancelled());
        assert_eq!(ctx.check(), Err(Error::Cancelled));
    }

    #[tokio::test]
    async fn cancelled_future_wakes() {
        let token = CancellationToken::new();
        let waiter = token.clone();
        let cancel = async {
            tokio::task::yield_now().await;
            token.cancel();
        };
        tokio::join!(waiter.cancelled(), cancel);
        assert!(waiter.is_cancelled());
    }
}
