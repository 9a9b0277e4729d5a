//! World snapshots and per-facet deltas.
//!
//! A snapshot is the full observable world; a delta carries, per agent, only
//! the facets (`summary` / `movement` / `aiState`) that changed relative to
//! some previous snapshot.  Diffing is a pure function so the broadcaster
//! can maintain an independent baseline per subscriber, and
//! [`apply_delta`] is the inverse used by reconstruction tests (and any
//! Rust-side client).

use serde::{Deserialize, Serialize};

use crew_agent::{ActivityState, Agent, AssignedTask, CurrentGoal, Role};
use crew_core::{AgentId, Tick, Vec2};
use crew_mind::QueueStats;

// ── Facets ────────────────────────────────────────────────────────────────────

/// Slow-changing identity and progress facet.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentSummary {
    pub name: String,
    pub color: u32,
    pub role: Role,
    pub activity_state: ActivityState,
    pub current_zone: Option<String>,
    pub current_goal: Option<CurrentGoal>,
    pub assigned_tasks: Vec<AssignedTask>,
    pub current_task_index: Option<usize>,
    pub tasks_completed: usize,
}

/// Kinematic facet — changes nearly every tick while walking.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentMovement {
    pub position: Vec2,
    pub velocity: Vec2,
    pub facing: f32,
    pub path: Vec<Vec2>,
}

/// Reasoning facet.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentAiState {
    pub is_thinking: bool,
    pub current_thought: Option<String>,
    pub recent_speech: Option<String>,
    pub visible_agent_ids: Vec<AgentId>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentSnapshot {
    pub id: AgentId,
    pub summary: AgentSummary,
    pub movement: AgentMovement,
    pub ai_state: AgentAiState,
}

impl AgentSnapshot {
    /// Capture one agent, resolving its zone index to a name.
    pub fn capture(agent: &Agent, zone_name: Option<&str>, visible_ids: Vec<AgentId>) -> Self {
        Self {
            id: agent.id,
            summary: AgentSummary {
                name: agent.name.clone(),
                color: agent.color,
                role: agent.role,
                activity_state: agent.activity_state,
                current_zone: zone_name.map(str::to_string),
                current_goal: agent.current_goal.clone(),
                assigned_tasks: agent.assigned_tasks.clone(),
                current_task_index: agent.current_task_index,
                tasks_completed: agent.tasks_completed(),
            },
            movement: AgentMovement {
                position: agent.position,
                velocity: agent.velocity,
                facing: agent.facing,
                path: agent.path.clone(),
            },
            ai_state: AgentAiState {
                is_thinking: agent.is_thinking,
                current_thought: agent.current_thought.clone(),
                recent_speech: agent.recent_speech.clone(),
                visible_agent_ids: visible_ids,
            },
        }
    }
}

// ── World-level entries ───────────────────────────────────────────────────────

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GamePhase {
    Lobby,
    Playing,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThoughtEntry {
    pub agent_id: AgentId,
    pub agent_name: String,
    pub text: String,
    pub at_ms: u64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpeechEntry {
    pub agent_id: AgentId,
    pub agent_name: String,
    pub text: String,
    pub at_ms: u64,
}

/// The full observable world at one tick.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorldSnapshot {
    pub tick: Tick,
    /// Unix milliseconds.
    pub timestamp: u64,
    pub agents: Vec<AgentSnapshot>,
    /// Completed crew tasks / total crew tasks; 0 when no tasks exist.
    pub task_progress: f32,
    pub game_phase: GamePhase,
    pub recent_thoughts: Vec<ThoughtEntry>,
    pub recent_speech: Vec<SpeechEntry>,
    pub llm_queue_stats: QueueStats,
}

// ── Deltas ────────────────────────────────────────────────────────────────────

/// Per-agent facet diff; absent facets were unchanged.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentDelta {
    pub id: AgentId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<AgentSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub movement: Option<AgentMovement>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ai_state: Option<AgentAiState>,
}

impl AgentDelta {
    pub fn is_empty(&self) -> bool {
        self.summary.is_none() && self.movement.is_none() && self.ai_state.is_none()
    }
}

/// Diff between two snapshots.  World-level fields ride along unconditionally
/// (they are small); agent sub-blocks appear only when changed.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotDelta {
    pub tick: Tick,
    pub timestamp: u64,
    pub removed_agents: Vec<AgentId>,
    pub agents: Vec<AgentDelta>,
    pub task_progress: f32,
    pub game_phase: GamePhase,
    pub recent_thoughts: Vec<ThoughtEntry>,
    pub recent_speech: Vec<SpeechEntry>,
    pub llm_queue_stats: QueueStats,
}

/// Compute the delta that turns `prev` into `cur`.
pub fn diff_snapshots(prev: &WorldSnapshot, cur: &WorldSnapshot) -> SnapshotDelta {
    let mut agents = Vec::new();
    for agent in &cur.agents {
        let old = prev.agents.iter().find(|a| a.id == agent.id);
        let delta = match old {
            // Unknown to the baseline: ship every facet.
            None => AgentDelta {
                id: agent.id,
                summary: Some(agent.summary.clone()),
                movement: Some(agent.movement.clone()),
                ai_state: Some(agent.ai_state.clone()),
            },
            Some(old) => AgentDelta {
                id: agent.id,
                summary: (old.summary != agent.summary).then(|| agent.summary.clone()),
                movement: (old.movement != agent.movement).then(|| agent.movement.clone()),
                ai_state: (old.ai_state != agent.ai_state).then(|| agent.ai_state.clone()),
            },
        };
        if !delta.is_empty() {
            agents.push(delta);
        }
    }

    let removed_agents = prev
        .agents
        .iter()
        .filter(|a| !cur.agents.iter().any(|b| b.id == a.id))
        .map(|a| a.id)
        .collect();

    SnapshotDelta {
        tick: cur.tick,
        timestamp: cur.timestamp,
        removed_agents,
        agents,
        task_progress: cur.task_progress,
        game_phase: cur.game_phase,
        recent_thoughts: cur.recent_thoughts.clone(),
        recent_speech: cur.recent_speech.clone(),
        llm_queue_stats: cur.llm_queue_stats.clone(),
    }
}

/// Apply `delta` on top of `base` in place.  Unknown agent ids in the delta
/// are skipped, matching the subscriber contract.
pub fn apply_delta(base: &mut WorldSnapshot, delta: &SnapshotDelta) {
    base.tick = delta.tick;
    base.timestamp = delta.timestamp;
    base.task_progress = delta.task_progress;
    base.game_phase = delta.game_phase;
    base.recent_thoughts = delta.recent_thoughts.clone();
    base.recent_speech = delta.recent_speech.clone();
    base.llm_queue_stats = delta.llm_queue_stats.clone();

    base.agents.retain(|a| !delta.removed_agents.contains(&a.id));

    for ad in &delta.agents {
        let Some(agent) = base.agents.iter_mut().find(|a| a.id == ad.id) else {
            continue;
        };
        if let Some(summary) = &ad.summary {
            agent.summary = summary.clone();
        }
        if let Some(movement) = &ad.movement {
            agent.movement = movement.clone();
        }
        if let Some(ai_state) = &ad.ai_state {
            agent.ai_state = ai_state.clone();
        }
    }
}
