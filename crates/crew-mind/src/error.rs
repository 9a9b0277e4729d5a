//! Reasoning failure taxonomy.
//!
//! Nothing here is retried internally; retries happen implicitly on the next
//! tick's trigger cycle.

use thiserror::Error;

/// Ways a reasoning request can fail.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MindError {
    /// Non-2xx HTTP status or malformed body from the endpoint.  Logged at
    /// error level; callers fall back.
    #[error("endpoint error: {0}")]
    Endpoint(String),

    /// The request's wall-clock deadline expired while queued or executing.
    /// Logged at debug level — expected under load.
    #[error("request deadline expired")]
    Timeout,

    /// The queue was cleared (shutdown).  Silently discarded by callers.
    #[error("request cancelled")]
    Cancelled,

    /// The response did not match the expected `GOAL:/TARGET:/…` pattern.
    #[error("response parse error: {0}")]
    Parse(String),
}

impl MindError {
    /// Failures where speech must stay silent but a canned thought is still
    /// produced.
    pub fn suppresses_speech(&self) -> bool {
        matches!(self, MindError::Timeout | MindError::Cancelled)
    }
}
