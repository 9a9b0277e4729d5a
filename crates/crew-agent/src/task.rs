//! Assigned tasks.

use crew_core::Vec2;
use serde::{Deserialize, Serialize};

/// One task on an agent's list.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignedTask {
    /// Short machine name, e.g. `"fix_wiring"`.
    pub task_type: String,
    /// Name of the labeled zone the task lives in.
    pub room: String,
    /// Exact interaction point, inside `room`.
    pub position: Vec2,
    /// How long the task takes once started, in milliseconds.
    pub duration_ms: u64,
    /// Wall-clock ms when the agent began working, `None` until then.
    pub started_at: Option<u64>,
    pub is_completed: bool,
}

impl AssignedTask {
    pub fn new(task_type: impl Into<String>, room: impl Into<String>, position: Vec2, duration_ms: u64) -> Self {
        Self {
            task_type: task_type.into(),
            room: room.into(),
            position,
            duration_ms,
            started_at: None,
            is_completed: false,
        }
    }

    /// `true` once `now` is at least `duration_ms` past `started_at`.
    pub fn is_elapsed(&self, now_ms: u64) -> bool {
        match self.started_at {
            Some(t0) => now_ms.saturating_sub(t0) >= self.duration_ms,
            None => false,
        }
    }
}
