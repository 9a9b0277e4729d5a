//! Broadcast server errors.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum NetError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A write to one subscriber failed; that subscriber is dropped and the
    /// broadcast continues for everyone else.
    #[error("subscriber send failed: {0}")]
    Send(String),
}
