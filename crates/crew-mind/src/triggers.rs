//! Trigger detection and cooldown gating.
//!
//! Triggers make an agent *eligible* to think; whether a request is actually
//! enqueued depends on per-agent cooldown clocks scaled by the reasoning
//! queue's thinking coefficient (`effective = base / coefficient`), plus the
//! `is_thinking` latch the simulation maintains.

use serde::Serialize;

use crew_core::{AgentId, AgentRng};
use crew_agent::Agent;

// ── Trigger kinds ─────────────────────────────────────────────────────────────

/// Named events that can wake an agent's reasoning, ordered by priority.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerKind {
    AgentSpotted,
    AgentLostSight,
    PassedAgentClosely,
    EnteredRoom,
    TaskCompleted,
    TaskStarted,
    ArrivedAtDestination,
    HeardSpeech,
    TaskInActionRadius,
    IdleRandom,
}

impl TriggerKind {
    /// Lower is more urgent.
    pub fn priority(self) -> u8 {
        use TriggerKind::*;
        match self {
            AgentSpotted => 0,
            AgentLostSight => 1,
            PassedAgentClosely => 2,
            EnteredRoom => 3,
            TaskCompleted => 4,
            TaskStarted => 5,
            ArrivedAtDestination => 6,
            HeardSpeech => 7,
            TaskInActionRadius => 8,
            IdleRandom => 9,
        }
    }

    /// Social triggers give speech the higher (0.5) roll.
    pub fn is_social(self) -> bool {
        matches!(
            self,
            TriggerKind::AgentSpotted | TriggerKind::PassedAgentClosely | TriggerKind::HeardSpeech
        )
    }

    pub fn as_str(self) -> &'static str {
        use TriggerKind::*;
        match self {
            AgentSpotted => "agent_spotted",
            AgentLostSight => "agent_lost_sight",
            PassedAgentClosely => "passed_agent_closely",
            EnteredRoom => "entered_room",
            TaskCompleted => "task_completed",
            TaskStarted => "task_started",
            ArrivedAtDestination => "arrived_at_destination",
            HeardSpeech => "heard_speech",
            TaskInActionRadius => "task_in_action_radius",
            IdleRandom => "idle_random",
        }
    }
}

/// One fired trigger: the kind plus prompt-ready detail.
#[derive(Clone, Debug, PartialEq)]
pub struct Trigger {
    pub kind: TriggerKind,
    /// Human-readable detail, e.g. `"spotted Blue"`.
    pub detail: String,
    /// The other agent involved, when there is one.
    pub other: Option<AgentId>,
}

impl Trigger {
    pub fn new(kind: TriggerKind, detail: impl Into<String>) -> Self {
        Self { kind, detail: detail.into(), other: None }
    }

    pub fn with_other(kind: TriggerKind, detail: impl Into<String>, other: AgentId) -> Self {
        Self { kind, detail: detail.into(), other: Some(other) }
    }
}

// ── Config ────────────────────────────────────────────────────────────────────

/// Base trigger timings, copied from the resolved `SimConfig` at startup.
#[derive(Clone, Debug)]
pub struct TriggerConfig {
    pub base_thought_cooldown_ms: u64,
    pub base_speech_cooldown_ms: u64,
    pub base_random_thought_interval_ms: [u64; 2],
    pub close_pass_distance: f32,
}

impl Default for TriggerConfig {
    fn default() -> Self {
        Self {
            base_thought_cooldown_ms: 6_000,
            base_speech_cooldown_ms: 12_000,
            base_random_thought_interval_ms: [8_000, 30_000],
            close_pass_distance: 50.0,
        }
    }
}

/// Probability that a social trigger also produces speech.
const SPEECH_PROB_SOCIAL: f64 = 0.5;
/// …and for every other trigger kind.
const SPEECH_PROB_OTHER: f64 = 0.2;
/// Jitter applied to each random-thought interval draw.
const RANDOM_THOUGHT_JITTER: f64 = 0.2;

// ── Engine ────────────────────────────────────────────────────────────────────

/// What the engine decided an agent should request this tick.
#[derive(Clone, Debug, PartialEq)]
pub struct ThinkRequest {
    pub trigger: Trigger,
    /// `true` when a speech request is permitted alongside the thought.
    pub want_speech: bool,
}

/// Stateless trigger evaluator; all per-agent clocks live on the agent.
pub struct TriggerEngine {
    config: TriggerConfig,
}

impl TriggerEngine {
    pub fn new(config: TriggerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &TriggerConfig {
        &self.config
    }

    /// Effective cooldown after backpressure scaling.
    #[inline]
    pub fn effective_thought_cooldown_ms(&self, coefficient: f32) -> u64 {
        scale_cooldown(self.config.base_thought_cooldown_ms, coefficient)
    }

    #[inline]
    pub fn effective_speech_cooldown_ms(&self, coefficient: f32) -> u64 {
        scale_cooldown(self.config.base_speech_cooldown_ms, coefficient)
    }

    /// Perception-derived triggers for one agent: spotted / lost-sight /
    /// close-pass / entered-room / idle-random.
    ///
    /// `visible` is this tick's visible set with distances;
    /// `previous_zone` is the zone before this tick's recompute.  Event
    /// triggers raised by the state machine are appended by the caller.
    pub fn collect(
        &self,
        agent: &Agent,
        visible: &[(AgentId, String, f32)],
        previous_zone: Option<usize>,
        zone_name: Option<&str>,
        now_ms: u64,
    ) -> Vec<Trigger> {
        let mut triggers = Vec::new();

        for (id, name, dist) in visible {
            if !agent.previously_visible.contains(id) {
                triggers.push(Trigger::with_other(
                    TriggerKind::AgentSpotted,
                    format!("spotted {name}"),
                    *id,
                ));
            }
            if *dist <= self.config.close_pass_distance {
                triggers.push(Trigger::with_other(
                    TriggerKind::PassedAgentClosely,
                    format!("passed close to {name}"),
                    *id,
                ));
            }
        }

        for &prev in &agent.previously_visible {
            if !visible.iter().any(|(id, _, _)| *id == prev) {
                triggers.push(Trigger::with_other(
                    TriggerKind::AgentLostSight,
                    "lost sight of someone".to_string(),
                    prev,
                ));
            }
        }

        if agent.current_zone.is_some() && previous_zone.is_some() && agent.current_zone != previous_zone {
            triggers.push(Trigger::new(
                TriggerKind::EnteredRoom,
                format!("entered {}", zone_name.unwrap_or("a room")),
            ));
        }

        if now_ms >= agent.next_random_thought_ms {
            triggers.push(Trigger::new(TriggerKind::IdleRandom, "idle musing"));
        }

        triggers
    }

    /// Gate the collected triggers through the cooldown clocks.
    ///
    /// Returns `None` when no trigger fired or the thought cooldown has not
    /// elapsed.  Speech is additionally rolled (0.5 social / 0.2 otherwise)
    /// and gated by its own cooldown; it also requires someone in earshot.
    pub fn decide(
        &self,
        agent: &Agent,
        mut triggers: Vec<Trigger>,
        anyone_in_earshot: bool,
        now_ms: u64,
        coefficient: f32,
        rng: &mut AgentRng,
    ) -> Option<ThinkRequest> {
        if triggers.is_empty() || agent.is_thinking {
            return None;
        }
        triggers.sort_by_key(|t| t.kind.priority());
        let trigger = triggers.into_iter().next()?;

        let thought_cd = self.effective_thought_cooldown_ms(coefficient);
        if now_ms.saturating_sub(agent.last_thought_ms) < thought_cd {
            return None;
        }

        let mut want_speech = false;
        if anyone_in_earshot {
            let speech_cd = self.effective_speech_cooldown_ms(coefficient);
            if now_ms.saturating_sub(agent.last_speech_ms) >= speech_cd {
                let p = if trigger.kind.is_social() { SPEECH_PROB_SOCIAL } else { SPEECH_PROB_OTHER };
                want_speech = rng.gen_bool(p);
            }
        }

        Some(ThinkRequest { trigger, want_speech })
    }

    /// Next unprompted-thought time: a fresh interval draw with ±20 % jitter.
    pub fn next_random_thought_ms(&self, now_ms: u64, rng: &mut AgentRng) -> u64 {
        let [lo, hi] = self.config.base_random_thought_interval_ms;
        let base = rng.gen_range(lo..=hi.max(lo + 1)) as f64;
        now_ms + rng.jitter(base, RANDOM_THOUGHT_JITTER) as u64
    }
}

/// `effective = base / coefficient`, saturating at sane bounds.
#[inline]
fn scale_cooldown(base_ms: u64, coefficient: f32) -> u64 {
    let c = coefficient.clamp(0.25, 2.0) as f64;
    (base_ms as f64 / c) as u64
}
