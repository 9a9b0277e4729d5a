//! The `Agent` record and its state transitions.

use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crew_core::{AgentId, ConvId, Vec2};

use crate::{ActivityState, AgentError, AssignedTask, RecentEvents};

// ── Role and goals ────────────────────────────────────────────────────────────

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Crewmate,
    Impostor,
}

/// Behavior goals an agent can pursue.  `Kill` and `Hunt` parse for
/// impostors but currently resolve to follow-style pathing; kill events are
/// reserved.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GoalKind {
    GoToTask,
    Wander,
    FollowAgent,
    AvoidAgent,
    Idle,
    Speak,
    Kill,
    Hunt,
}

/// The goal an agent is currently pursuing, as chosen by the decision
/// service (or its fallback).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentGoal {
    pub kind: GoalKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_agent: Option<AgentId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_task: Option<usize>,
    pub reasoning: String,
}

// ── Agent ─────────────────────────────────────────────────────────────────────

/// One simulated agent.  Exclusively owned by the simulation driver; all
/// mutation goes through it.
pub struct Agent {
    // Identity — assigned once at spawn.
    pub id: AgentId,
    /// Color word, e.g. "Orange".  Doubles as the display name.
    pub name: String,
    /// 24-bit RGB.
    pub color: u32,
    pub role: Role,

    // Kinematics.
    pub position: Vec2,
    pub velocity: Vec2,
    /// Heading in radians; updated by the movement controller while moving.
    pub facing: f32,
    /// Odometer, world units.
    pub distance_traveled: f32,

    // Path state.  Invariant: `activity_state == Walking` ⇒ `path.len() >= 2`.
    pub path: Vec<Vec2>,
    pub path_index: usize,

    pub activity_state: ActivityState,
    /// Labeled-zone index of the current room; `None` in hallways.
    pub current_zone: Option<usize>,

    // Tasks.
    pub assigned_tasks: Vec<AssignedTask>,
    /// Invariant: `activity_state == DoingTask` ⇒ `Some` with `started_at` set.
    pub current_task_index: Option<usize>,

    // Perception tunables.
    pub vision_radius: f32,
    pub action_radius: f32,

    // Reasoning state.
    /// `true` while a reasoning request for this agent is outstanding.
    pub is_thinking: bool,
    pub last_thought_ms: u64,
    pub last_speech_ms: u64,
    pub next_random_thought_ms: u64,
    pub current_thought: Option<String>,
    /// Last utterance, surfaced in snapshots.
    pub recent_speech: Option<String>,
    pub current_goal: Option<CurrentGoal>,

    // Perception memory.
    pub previously_visible: FxHashSet<AgentId>,
    pub recent_events: RecentEvents,

    /// Dialogue this agent is currently part of, if any.
    pub conversation: Option<ConvId>,
}

impl Agent {
    #[inline]
    pub fn is_alive(&self) -> bool {
        self.activity_state.is_alive()
    }

    /// Count of completed tasks.
    pub fn tasks_completed(&self) -> usize {
        self.assigned_tasks.iter().filter(|t| t.is_completed).count()
    }

    /// Index of the first incomplete task, if any.
    pub fn first_incomplete_task(&self) -> Option<usize> {
        self.assigned_tasks.iter().position(|t| !t.is_completed)
    }

    // ── State transitions ─────────────────────────────────────────────────

    /// Transition to `next`, carrying a reason for observability.
    ///
    /// Illegal transitions (per the table on [`ActivityState`]) are
    /// rejected; the caller decides whether that is an invariant breach.
    pub fn set_state(&mut self, next: ActivityState, reason: &str) -> Result<(), AgentError> {
        if !self.activity_state.can_transition_to(next) {
            return Err(AgentError::IllegalTransition {
                agent: self.id,
                from: self.activity_state,
                to: next,
            });
        }
        if self.activity_state != next {
            debug!(agent = %self.name, from = %self.activity_state, to = %next, reason, "state transition");
        }
        self.activity_state = next;
        Ok(())
    }

    /// Assign a smoothed path and start walking.
    ///
    /// Paths with fewer than two points are rejected (the walking invariant
    /// requires a real segment to follow).
    pub fn assign_path(&mut self, path: Vec<Vec2>, reason: &str) -> Result<(), AgentError> {
        if path.len() < 2 {
            return Err(AgentError::EmptyPath(self.id));
        }
        self.set_state(ActivityState::Walking, reason)?;
        self.path = path;
        self.path_index = 0;
        Ok(())
    }

    /// Stop in place: clears the path and returns to `Idle`.
    pub fn stop(&mut self, reason: &str) -> Result<(), AgentError> {
        self.set_state(ActivityState::Idle, reason)?;
        self.path.clear();
        self.path_index = 0;
        self.velocity = Vec2::ZERO;
        Ok(())
    }

    /// Begin working on task `index` at wall-clock `now_ms`.
    ///
    /// The caller is responsible for the proximity check (`action_radius`).
    pub fn start_task(&mut self, index: usize, now_ms: u64) -> Result<(), AgentError> {
        match self.assigned_tasks.get(index) {
            None => return Err(AgentError::NoSuchTask { agent: self.id, index }),
            Some(task) if task.is_completed => {
                return Err(AgentError::TaskAlreadyComplete { agent: self.id, index });
            }
            Some(_) => {}
        }
        self.set_state(ActivityState::DoingTask, "task started")?;
        self.assigned_tasks[index].started_at = Some(now_ms);
        self.current_task_index = Some(index);
        self.velocity = Vec2::ZERO;
        Ok(())
    }

    /// Mark the current task complete and return to `Idle`.
    ///
    /// Returns the completed task's index.
    pub fn complete_current_task(&mut self) -> Result<usize, AgentError> {
        let Some(index) = self.current_task_index else {
            return Err(AgentError::NotDoingTask(self.id));
        };
        self.assigned_tasks[index].is_completed = true;
        self.current_task_index = None;
        self.set_state(ActivityState::Idle, "task completed")?;
        Ok(index)
    }

    /// Kill transition — terminal.  Reserved for future game rules.
    pub fn mark_dead(&mut self, reason: &str) -> Result<(), AgentError> {
        self.set_state(ActivityState::Dead, reason)?;
        self.path.clear();
        self.velocity = Vec2::ZERO;
        self.current_task_index = None;
        self.conversation = None;
        Ok(())
    }
}
