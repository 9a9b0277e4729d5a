//! Framework error type.
//!
//! Sub-crates define their own error enums and either convert into
//! `CrewError` via `From` impls or keep them separate and wrap `CrewError`
//! as one variant.  Both patterns are acceptable; prefer whichever keeps
//! error sites clean.

use thiserror::Error;

use crate::AgentId;

/// The top-level error type for `crew-core` and a common base for sub-crates.
#[derive(Debug, Error)]
pub enum CrewError {
    #[error("agent {0} not found")]
    AgentNotFound(AgentId),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("invariant violated: {0}")]
    Invariant(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Shorthand result type for all `crew-*` crates.
pub type CrewResult<T> = Result<T, CrewError>;
