//! Top-level simulation configuration.
//!
//! Every recognized option of the server lives here.  The binary loads a
//! TOML file into this struct (all fields defaulted, so an empty file is
//! valid) and applies CLI overrides on top; library crates only ever see the
//! resolved value.

use crate::{CrewError, CrewResult};

/// All recognized server options, with their defaults.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct SimConfig {
    /// Population size.
    pub num_agents: usize,

    /// Driver rate in ticks per second.
    pub tick_hz: u32,

    /// Master RNG seed.  The same seed reproduces identity/role/task
    /// assignment and all trigger jitter.
    pub seed: u64,

    // ── Reasoning endpoint ────────────────────────────────────────────────
    /// Base URL of the external chat-completion service.  The client POSTs
    /// to `{reasoning_endpoint}/v1/chat/completions`.
    pub reasoning_endpoint: String,

    /// Per-request wall-clock deadline, covering both queue wait and the
    /// HTTP round-trip.
    pub reasoning_timeout_ms: u64,

    /// Sampling temperature forwarded to the endpoint.
    pub temperature: f32,

    // ── Trigger base timings (scaled by the thinking coefficient) ─────────
    pub base_thought_cooldown_ms: u64,
    pub base_speech_cooldown_ms: u64,
    /// `[min, max]` interval between unprompted idle thoughts.
    pub base_random_thought_interval_ms: [u64; 2],

    // ── Perception / interaction ──────────────────────────────────────────
    /// How far speech carries, in world units.
    pub speech_range: f32,
    /// Distance below which passing a visible agent raises a trigger.
    pub close_pass_distance: f32,
    /// Vision distance; sight is additionally wall-occluded.
    pub vision_radius: f32,
    /// Distance within which an agent can start a task.
    pub action_radius: f32,

    // ── Subscriber endpoint ───────────────────────────────────────────────
    pub broadcast_port: u16,
    /// URL path of the WebSocket upgrade endpoint.
    pub broadcast_path: String,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            num_agents: 6,
            tick_hz: 10,
            seed: 0,
            reasoning_endpoint: "http://127.0.0.1:1234".to_string(),
            reasoning_timeout_ms: 10_000,
            temperature: 0.8,
            base_thought_cooldown_ms: 6_000,
            base_speech_cooldown_ms: 12_000,
            base_random_thought_interval_ms: [8_000, 30_000],
            speech_range: 150.0,
            close_pass_distance: 50.0,
            vision_radius: 250.0,
            action_radius: 50.0,
            broadcast_port: 8765,
            broadcast_path: "/stream".to_string(),
        }
    }
}

impl SimConfig {
    /// Reject configurations the engine cannot run with.
    pub fn validate(&self) -> CrewResult<()> {
        if self.num_agents == 0 {
            return Err(CrewError::Config("num_agents must be >= 1".into()));
        }
        if self.tick_hz == 0 || self.tick_hz > 120 {
            return Err(CrewError::Config(format!(
                "tick_hz {} out of range 1..=120",
                self.tick_hz
            )));
        }
        let [lo, hi] = self.base_random_thought_interval_ms;
        if lo == 0 || lo > hi {
            return Err(CrewError::Config(format!(
                "base_random_thought_interval_ms [{lo}, {hi}] must satisfy 0 < min <= max"
            )));
        }
        if !self.broadcast_path.starts_with('/') {
            return Err(CrewError::Config(format!(
                "broadcast_path {:?} must start with '/'",
                self.broadcast_path
            )));
        }
        Ok(())
    }
}
