//! Error taxonomy for the relay.
//!
//! Classification drives behavior: `Throttled` is the only retryable kind,
//! `DuplicateDelivery` is skipped silently, `Validation` maps to a client
//! error at the HTTP boundary, and everything else degrades to a visible
//! failure notice rather than silence.

use std::time::Duration;

/// Result type alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Malformed or incomplete ingest payload. Client error, never retried.
    #[error("invalid sensor payload: {0}")]
    Validation(String),

    /// The delivery token was already admitted. Not user-visible.
    #[error("duplicate delivery token: {0}")]
    DuplicateDelivery(String),

    /// Explicit throttling signal from the completion service.
    ///
    /// `retry_after` carries the server-supplied backoff hint when one was
    /// present, already normalized to a `Duration`.
    #[error("completion service throttled")]
    Throttled { retry_after: Option<Duration> },

    /// The completion service failed for a non-throttling reason, or
    /// throttling retries were exhausted.
    #[error("completion service unavailable: {0}")]
    Unavailable(String),

    /// Persistent store failure.
    #[error("persistence failure: {0}")]
    Persistence(String),

    /// Chat platform transport failure.
    #[error("chat transport failure: {0}")]
    Chat(String),

    /// Invalid or missing configuration at startup.
    #[error("configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Whether this error is a throttling signal eligible for retry.
    pub fn is_throttled(&self) -> bool {
        matches!(self, Error::Throttled { .. })
    }
}
