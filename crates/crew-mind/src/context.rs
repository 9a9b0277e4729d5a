//! The read-only context a reasoning request travels with.
//!
//! Built by the simulation on the tick the request fires, then moved into
//! the spawned task — nothing here borrows live simulation state.

use crew_core::{AgentId, Vec2};
use crew_agent::Role;

use crate::Trigger;

/// Another agent as seen by the thinker.
#[derive(Clone, Debug)]
pub struct VisibleAgent {
    pub id: AgentId,
    pub name: String,
    pub distance: f32,
    pub position: Vec2,
    /// Room the other agent stands in, when labeled.
    pub zone: Option<String>,
}

/// Task summary for prompt rendering.
#[derive(Clone, Debug)]
pub struct TaskBrief {
    pub task_type: String,
    pub room: String,
    pub is_completed: bool,
}

/// An inbound conversation turn awaiting this agent's reply.
///
/// A typed field, not an ad-hoc attachment: requests either carry a pending
/// reply or they don't.
#[derive(Clone, Debug)]
pub struct PendingReply {
    pub speaker_id: AgentId,
    pub speaker_name: String,
    pub message: String,
    pub zone: Option<String>,
    pub timestamp: u64,
}

/// Everything the decision service needs to assemble prompts for one agent.
#[derive(Clone, Debug)]
pub struct ThinkContext {
    pub agent_id: AgentId,
    pub name: String,
    pub role: Role,
    pub position: Vec2,
    pub zone: Option<String>,
    pub visible: Vec<VisibleAgent>,
    /// Names currently within speech range (wall-occlusion already applied).
    pub can_speak_to: Vec<String>,
    pub tasks: Vec<TaskBrief>,
    pub current_task_index: Option<usize>,
    /// Oldest-first recent observations, prompt-ready.
    pub recent_events: Vec<String>,
    /// The trigger that caused this request, if any.
    pub trigger: Option<Trigger>,
    /// Set when a conversation partner is waiting on this agent.
    pub pending_reply: Option<PendingReply>,
    /// Every agent name in the run — used by speech validation to spot
    /// mentions of absent agents.
    pub known_names: Vec<String>,
}
