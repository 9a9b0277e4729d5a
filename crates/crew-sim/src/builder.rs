//! Fluent builder for constructing a [`Simulation`].

use std::sync::Arc;
use std::time::Duration;

use crew_agent::{spawn_fleet, SpawnParams};
use crew_core::{time::unix_ms_now, AgentId, AgentRng, SimConfig, SimRng};
use crew_map::WorldMap;
use crew_mind::{
    ChatBackend, ChatClient, DecisionService, LlmTrace, ReasoningQueue, TriggerConfig,
    TriggerEngine,
};
use crew_nav::NavGraphBuilder;

use crate::{SimError, Simulation};

/// Builds a ready-to-run [`Simulation`] from a config and a map.
///
/// Everything the simulation depends on is constructed here and passed in
/// explicitly — there are no process-wide singletons.
///
/// # Example
///
/// ```rust,ignore
/// let sim = SimBuilder::new(config, map)
///     .trace_channel(trace_tx)
///     .build()?;
/// ```
pub struct SimBuilder {
    config: SimConfig,
    map: WorldMap,
    nav_spacing: Option<f32>,
    backend: Option<Arc<dyn ChatBackend>>,
    trace_tx: Option<tokio::sync::mpsc::UnboundedSender<LlmTrace>>,
}

impl SimBuilder {
    pub fn new(config: SimConfig, map: WorldMap) -> Self {
        Self { config, map, nav_spacing: None, backend: None, trace_tx: None }
    }

    /// Override the nav-node corridor sampling spacing (world units).
    pub fn nav_spacing(mut self, spacing: f32) -> Self {
        self.nav_spacing = Some(spacing);
        self
    }

    /// Substitute the completion backend (defaults to the HTTP client
    /// against `config.reasoning_endpoint`).  Tests script this.
    pub fn chat_backend(mut self, backend: Arc<dyn ChatBackend>) -> Self {
        self.backend = Some(backend);
        self
    }

    /// Send an `LlmTrace` per reasoning exchange to this channel (the
    /// broadcaster turns them into `llm-trace` frames).
    pub fn trace_channel(
        mut self,
        tx: tokio::sync::mpsc::UnboundedSender<LlmTrace>,
    ) -> Self {
        self.trace_tx = Some(tx);
        self
    }

    /// Validate the config, build the nav graph, spawn the fleet, and wire
    /// the reasoning stack.
    ///
    /// Must be called inside a tokio runtime (the reasoning queue spawns its
    /// worker here).
    pub fn build(self) -> Result<Simulation, SimError> {
        self.config.validate()?;

        let mut graph_builder = NavGraphBuilder::new();
        if let Some(spacing) = self.nav_spacing {
            graph_builder = graph_builder.spacing(spacing);
        }
        let nav = graph_builder.from_map(&self.map);
        if nav.node_count() == 0 {
            return Err(SimError::EmptyNavGraph);
        }

        let mut sim_rng = SimRng::new(self.config.seed);
        let spawn_params = SpawnParams {
            num_agents: self.config.num_agents,
            vision_radius: self.config.vision_radius,
            action_radius: self.config.action_radius,
            thought_cooldown_ms: self.config.base_thought_cooldown_ms,
            speech_cooldown_ms: self.config.base_speech_cooldown_ms,
            random_thought_interval_ms: self.config.base_random_thought_interval_ms,
        };
        let agents = spawn_fleet(&spawn_params, &self.map, &mut sim_rng, unix_ms_now());
        let rngs: Vec<AgentRng> = (0..agents.len() as u32)
            .map(|i| AgentRng::new(self.config.seed, AgentId(i)))
            .collect();

        let queue = ReasoningQueue::start(Duration::from_millis(self.config.reasoning_timeout_ms));
        let backend = self.backend.unwrap_or_else(|| {
            Arc::new(ChatClient::new(
                &self.config.reasoning_endpoint,
                self.config.temperature,
            ))
        });
        let decisions = DecisionService::new(queue.clone(), backend, self.trace_tx);

        let triggers = TriggerEngine::new(TriggerConfig {
            base_thought_cooldown_ms: self.config.base_thought_cooldown_ms,
            base_speech_cooldown_ms: self.config.base_speech_cooldown_ms,
            base_random_thought_interval_ms: self.config.base_random_thought_interval_ms,
            close_pass_distance: self.config.close_pass_distance,
        });

        Ok(Simulation::assemble(
            self.config,
            Arc::new(self.map),
            Arc::new(nav),
            agents,
            rngs,
            sim_rng,
            triggers,
            queue,
            decisions,
        ))
    }
}
