//! Pathfinding errors.
//!
//! All variants are non-fatal to the simulation: a failed query leaves the
//! agent where it is and the caller retries on its own cadence.

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum NavError {
    /// A dynamic endpoint could see no static node and had no direct line to
    /// the other endpoint (typically a point inside an obstacle).
    #[error("{endpoint} point connects to no nav node")]
    Unconnected { endpoint: &'static str },

    /// The search exhausted the open set without reaching the goal
    /// (disconnected walkable regions).
    #[error("no path between the requested points")]
    NoPath,
}
