use thiserror::Error;

/// Canonical result for the query core.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by cursors, probers, the optimizer and the chain driver.
///
/// `Clone` because an execution keeps its first error sticky: `err()` keeps
/// reporting it and `close()` returns it again.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// Storage or resolution failure reported by a backend. Propagated verbatim.
    #[error("backend error: {0}")]
    Backend(String),

    /// A broken internal invariant. Indicates a bug, never bad input.
    #[error("Internal invariant failed: {0}")]
    Invariant(String),

    /// A value-resolving operation was invoked without a naming function.
    #[error("no naming function configured for a value-resolving operation")]
    NoNamer,

    #[error("execution cancelled")]
    Cancelled,

    /// The receiving side of a result channel went away.
    #[error("result channel closed by receiver")]
    ChannelClosed,

    #[error("Invalid configuration: {0}")]
    Config(String),

    /// A user-supplied value predicate failed.
    #[error("value predicate failed: {0}")]
    Predicate(String),

    #[error("plan encoding error: {0}")]
    Encode(String),
}

impl Error {
    pub fn backend(msg: impl Into<String>) -> Self {
        Error::Backend(msg.into())
    }

    pub fn invariant(msg: impl Into<String>) -> Self {
        Error::Invariant(msg.into())
    }

    /// True for errors that indicate a bug in this core rather than bad data.
    pub fn is_invariant(&self) -> bool {
        matches!(self, Error::Invariant(_))
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Encode(e.to_string())
    }
}
