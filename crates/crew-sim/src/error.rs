//! Simulation construction errors.

use thiserror::Error;

use crew_core::CrewError;

#[derive(Debug, Error)]
pub enum SimError {
    #[error(transparent)]
    Config(#[from] CrewError),

    #[error("navigation graph is empty — the map has no walkable interior")]
    EmptyNavGraph,
}
