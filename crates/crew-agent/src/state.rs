//! Activity states and the legal-transition table.

use serde::{Deserialize, Serialize};

/// What an agent is doing right now.
///
/// | From → To            | Trigger                                     |
/// |----------------------|---------------------------------------------|
/// | Idle → Walking       | path assigned                               |
/// | Walking → Idle       | arrived, stuck (replan), or external stop   |
/// | Idle → DoingTask     | at the task position, task chosen           |
/// | DoingTask → Idle     | elapsed ≥ task duration (task completed)    |
/// | any living → Dead    | kill event (reserved)                       |
///
/// `Dead` is terminal.  Transitions carry a reason string for observability;
/// see [`Agent::set_state`][crate::Agent::set_state].
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActivityState {
    Idle,
    Walking,
    DoingTask,
    Dead,
}

impl ActivityState {
    /// `true` if the transition `self → to` appears in the table above.
    /// Self-transitions are allowed (used to refresh a walk with a new path).
    pub fn can_transition_to(self, to: ActivityState) -> bool {
        use ActivityState::*;
        match (self, to) {
            (Dead, _) => false,
            (_, Dead) => true,
            (Idle, Walking) | (Idle, DoingTask) => true,
            (Walking, Idle) | (Walking, Walking) => true,
            (DoingTask, Idle) => true,
            (Idle, Idle) => true,
            _ => false,
        }
    }

    #[inline]
    pub fn is_alive(self) -> bool {
        self != ActivityState::Dead
    }
}

impl std::fmt::Display for ActivityState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ActivityState::Idle => "IDLE",
            ActivityState::Walking => "WALKING",
            ActivityState::DoingTask => "DOING_TASK",
            ActivityState::Dead => "DEAD",
        };
        f.write_str(s)
    }
}
