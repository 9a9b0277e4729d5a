//! Agent state errors.

use thiserror::Error;

use crew_core::AgentId;

use crate::ActivityState;

#[derive(Debug, Error)]
pub enum AgentError {
    #[error("agent {agent}: illegal transition {from} → {to}")]
    IllegalTransition {
        agent: AgentId,
        from: ActivityState,
        to: ActivityState,
    },

    #[error("agent {0}: path must contain at least 2 points")]
    EmptyPath(AgentId),

    #[error("agent {agent}: no task at index {index}")]
    NoSuchTask { agent: AgentId, index: usize },

    #[error("agent {agent}: task {index} already complete")]
    TaskAlreadyComplete { agent: AgentId, index: usize },

    #[error("agent {0} is not doing a task")]
    NotDoingTask(AgentId),
}
