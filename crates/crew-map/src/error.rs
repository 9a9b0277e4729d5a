//! Map loading and validation errors.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum MapError {
    #[error("map has no walkable zones")]
    Empty,

    #[error("{what} ring {index} has fewer than 3 vertices")]
    BadRing { what: &'static str, index: usize },

    #[error("map JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
}
