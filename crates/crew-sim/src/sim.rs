//! The `Simulation` struct and its tick loop.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::{mpsc, watch};
use tracing::{debug, error, info, warn};

use crew_agent::{ActivityState, Agent, AgentStore, CurrentGoal, GoalKind, Role};
use crew_core::{time::unix_ms_now, AgentId, AgentRng, ConvId, SimConfig, SimRng, TickClock, Vec2};
use crew_map::WorldMap;
use crew_mind::{
    ConversationCoordinator, Decision, DecisionService, PendingReply, ReasoningQueue, TaskBrief,
    ThinkContext, Trigger, TriggerEngine, TriggerKind, TriggerOutcome, VisibleAgent,
};
use crew_motion::MovementController;
use crew_nav::NavGraph;

use crate::perception::{compute_perception, PerceptionView};
use crate::snapshot::{
    AgentSnapshot, GamePhase, SpeechEntry, ThoughtEntry, WorldSnapshot,
};
use crate::SnapshotSink;

/// Retry cadence after a failed pathfinding query, ms.
const PATH_RETRY_MS: u64 = 250;
/// Follow/avoid/hunt goals expire after this long and force a fresh decision.
const PURSUIT_GOAL_TTL_MS: u64 = 15_000;
/// Idle/speak goals expire quickly so the agent soon re-decides.
const IDLE_GOAL_TTL_MS: u64 = 5_000;
/// Standing distance for follow-style goals.
const FOLLOW_GAP: f32 = 80.0;
/// An avoid goal is satisfied once the threat is this far away.
const AVOID_SATISFIED: f32 = 300.0;
/// Length of the global thought/speech feeds in snapshots.
const FEED_CAP: usize = 20;

// ── Per-agent driver state ────────────────────────────────────────────────────

/// Driver-side agent state that does not belong on the `Agent` record.
struct AgentAux {
    controller: MovementController,
    /// Earliest time the next pathfinding attempt may run.
    next_path_retry_ms: u64,
    /// Where the current/last walk was headed (kept across stuck replans).
    walk_dest: Option<Vec2>,
    goal_set_ms: u64,
    /// Edge detector for the `task_in_action_radius` trigger.
    task_in_radius_prev: bool,
    /// Event triggers raised by the state machine since the last trigger pass.
    event_triggers: Vec<Trigger>,
}

/// A resolved reasoning request, posted back to the driver's channel.
enum ReasonOutcome {
    Triggered { agent: AgentId, outcome: TriggerOutcome },
    Decision { agent: AgentId, decision: Decision },
    Reply { agent: AgentId, conv: ConvId, text: Option<String> },
}

// ── Simulation ────────────────────────────────────────────────────────────────

/// Owns all simulation state and drives the fixed-rate tick.
///
/// Created via [`SimBuilder`][crate::SimBuilder].  All agent mutation
/// happens inside [`step`][Self::step]; reasoning tasks communicate back
/// exclusively through the outcome channel drained at the start of each
/// tick.
pub struct Simulation {
    pub(crate) config: SimConfig,
    pub(crate) map: Arc<WorldMap>,
    pub(crate) nav: Arc<NavGraph>,
    pub(crate) clock: TickClock,
    pub(crate) agents: AgentStore,
    pub(crate) rngs: Vec<AgentRng>,
    pub(crate) sim_rng: SimRng,
    pub(crate) triggers: TriggerEngine,
    pub(crate) queue: ReasoningQueue,
    pub(crate) decisions: DecisionService,
    pub(crate) convos: ConversationCoordinator,

    aux: Vec<AgentAux>,
    views: Vec<PerceptionView>,
    outcome_tx: mpsc::UnboundedSender<ReasonOutcome>,
    outcome_rx: mpsc::UnboundedReceiver<ReasonOutcome>,
    recent_thoughts: VecDeque<ThoughtEntry>,
    recent_speech: VecDeque<SpeechEntry>,
    phase: GamePhase,
}

impl Simulation {
    pub(crate) fn assemble(
        config: SimConfig,
        map: Arc<WorldMap>,
        nav: Arc<NavGraph>,
        agents: AgentStore,
        rngs: Vec<AgentRng>,
        sim_rng: SimRng,
        triggers: TriggerEngine,
        queue: ReasoningQueue,
        decisions: DecisionService,
    ) -> Self {
        let (outcome_tx, outcome_rx) = mpsc::unbounded_channel();
        let clock = TickClock::new(config.tick_hz);
        let aux = agents
            .iter()
            .map(|a| AgentAux {
                controller: MovementController::new(Default::default(), a.position),
                next_path_retry_ms: 0,
                walk_dest: None,
                goal_set_ms: 0,
                task_in_radius_prev: false,
                event_triggers: Vec::new(),
            })
            .collect();
        let views = vec![PerceptionView::default(); agents.len()];
        Self {
            config,
            map,
            nav,
            clock,
            agents,
            rngs,
            sim_rng,
            triggers,
            queue,
            decisions,
            convos: ConversationCoordinator::new(),
            aux,
            views,
            outcome_tx,
            outcome_rx,
            recent_thoughts: VecDeque::new(),
            recent_speech: VecDeque::new(),
            phase: GamePhase::Playing,
        }
    }

    // ── Accessors ─────────────────────────────────────────────────────────

    pub fn agents(&self) -> &AgentStore {
        &self.agents
    }

    pub fn conversations(&self) -> &ConversationCoordinator {
        &self.convos
    }

    pub fn reasoning_queue(&self) -> &ReasoningQueue {
        &self.queue
    }

    pub fn current_tick(&self) -> crew_core::Tick {
        self.clock.current_tick
    }

    // ── Driver loop ───────────────────────────────────────────────────────

    /// Run at the configured rate until `stop_rx` flips true (or its sender
    /// drops).  Clears the reasoning queue on exit.
    pub async fn run(&mut self, sink: Arc<dyn SnapshotSink>, mut stop_rx: watch::Receiver<bool>) {
        let mut interval = tokio::time::interval(self.clock.tick_interval());
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        let mut last = Instant::now();

        info!(tick_hz = self.config.tick_hz, agents = self.agents.len(), "simulation started");
        loop {
            tokio::select! {
                _ = interval.tick() => {
                    let dt = TickClock::clamp_dt(last.elapsed());
                    last = Instant::now();
                    let snapshot = self.step(unix_ms_now(), dt);
                    sink.publish(snapshot);
                }
                changed = stop_rx.changed() => {
                    if changed.is_err() || *stop_rx.borrow() {
                        break;
                    }
                }
            }
        }
        info!(tick = %self.clock.current_tick, "simulation stopped");
        self.queue.clear();
    }

    /// Advance one tick.  `now_ms` stamps clocks and snapshots; `dt` is the
    /// (already clamped) integration step in seconds.
    ///
    /// Must run inside a tokio runtime: reasoning requests spawn tasks.
    pub fn step(&mut self, now_ms: u64, dt: f32) -> Arc<WorldSnapshot> {
        self.drain_outcomes(now_ms);
        let prev_zones = self.update_movement_and_states(now_ms, dt);
        self.views = compute_perception(&self.map, &self.agents, self.config.speech_range);
        self.execute_goals(now_ms);
        self.dispatch_reasoning(&prev_zones, now_ms);
        self.convos.tick_cleanup(now_ms);
        self.sync_conversation_markers();
        Arc::new(self.build_snapshot(now_ms))
    }

    // ── Phase 0: resolved reasoning ───────────────────────────────────────

    fn drain_outcomes(&mut self, now_ms: u64) {
        while let Ok(outcome) = self.outcome_rx.try_recv() {
            match outcome {
                ReasonOutcome::Triggered { agent, outcome } => {
                    if let Some(a) = self.agents.get_mut(agent) {
                        a.is_thinking = false;
                    }
                    if let Some(thought) = outcome.thought {
                        self.emit_thought(agent, thought, now_ms);
                    }
                    if let Some(speech) = outcome.speech {
                        self.deliver_speech(agent, speech, now_ms);
                    }
                }
                ReasonOutcome::Decision { agent, decision } => {
                    if let Some(a) = self.agents.get_mut(agent) {
                        a.is_thinking = false;
                    }
                    self.apply_decision(agent, decision, now_ms);
                }
                ReasonOutcome::Reply { agent, conv, text } => {
                    if let Some(a) = self.agents.get_mut(agent) {
                        a.is_thinking = false;
                    }
                    if let Some(text) = text {
                        let name = self
                            .agents
                            .get(agent)
                            .map(|a| a.name.clone())
                            .unwrap_or_default();
                        if let Err(e) = self.convos.add_reply(conv, agent, &name, &text, now_ms) {
                            // The conversation may have closed while the
                            // reply was in flight; the line is still spoken.
                            debug!(%conv, error = %e, "reply landed on a closed conversation");
                        }
                        self.deliver_speech(agent, text, now_ms);
                    }
                }
            }
        }
    }

    fn emit_thought(&mut self, id: AgentId, text: String, now_ms: u64) {
        let Some(agent) = self.agents.get_mut(id) else { return };
        if !agent.is_alive() {
            return;
        }
        agent.current_thought = Some(text.clone());
        agent.last_thought_ms = now_ms;
        let name = agent.name.clone();
        push_capped(
            &mut self.recent_thoughts,
            ThoughtEntry { agent_id: id, agent_name: name, text, at_ms: now_ms },
        );
    }

    /// Speech becomes observable: feeds, hearer triggers, and conversation
    /// bookkeeping.
    fn deliver_speech(&mut self, speaker: AgentId, text: String, now_ms: u64) {
        let (speaker_name, speaker_alive) = match self.agents.get(speaker) {
            Some(a) => (a.name.clone(), a.is_alive()),
            None => return,
        };
        if !speaker_alive {
            return;
        }

        if let Some(a) = self.agents.get_mut(speaker) {
            a.recent_speech = Some(text.clone());
            a.last_speech_ms = now_ms;
        }
        push_capped(
            &mut self.recent_speech,
            SpeechEntry {
                agent_id: speaker,
                agent_name: speaker_name.clone(),
                text: text.clone(),
                at_ms: now_ms,
            },
        );

        // Hearers get a trigger and a memory of the line.
        let hearers: Vec<AgentId> = self.views[speaker.index()]
            .can_speak_to
            .iter()
            .map(|(id, _)| *id)
            .collect();
        for hearer in &hearers {
            if let Some(h) = self.agents.get_mut(*hearer) {
                if !h.is_alive() {
                    continue;
                }
                h.recent_events
                    .push(now_ms, format!("heard {speaker_name} say \"{text}\""));
            }
            self.aux[hearer.index()].event_triggers.push(Trigger::with_other(
                TriggerKind::HeardSpeech,
                format!("heard {speaker_name} speak"),
                speaker,
            ));
        }

        // A line spoken outside any dialogue opens one with the nearest
        // hearer; replies inside a dialogue were already appended.
        if self.convos.get_active_for(speaker).is_none() {
            if let Some(&target) = hearers.first() {
                if self.convos.get_active_for(target).is_none() {
                    let conv = self.convos.start_conversation(
                        speaker,
                        &speaker_name,
                        target,
                        &text,
                        now_ms,
                        &mut self.sim_rng,
                    );
                    debug!(%conv, speaker = %speaker_name, "conversation opened");
                }
            }
        }
    }

    fn apply_decision(&mut self, id: AgentId, decision: Decision, now_ms: u64) {
        let target_agent = decision
            .target_agent
            .as_deref()
            .and_then(|name| self.agents.by_name(name))
            .map(|a| a.id);

        let Some(agent) = self.agents.get_mut(id) else { return };
        if !agent.is_alive() {
            return;
        }

        agent.current_goal = Some(CurrentGoal {
            kind: decision.goal,
            target_agent,
            target_task: decision.target_task_index,
            reasoning: decision.reasoning,
        });
        let aux = &mut self.aux[id.index()];
        aux.goal_set_ms = now_ms;
        aux.walk_dest = None;
        aux.next_path_retry_ms = 0;

        if let Some(thought) = decision.thought {
            self.emit_thought(id, thought, now_ms);
        }
    }

    // ── Phase 1: movement and the state machine ───────────────────────────

    /// Returns each agent's zone as of *before* this tick's recompute.
    fn update_movement_and_states(&mut self, now_ms: u64, dt: f32) -> Vec<Option<usize>> {
        let mut prev_zones = Vec::with_capacity(self.agents.len());

        for i in 0..self.agents.len() {
            let id = AgentId(i as u32);
            let aux = &mut self.aux[i];
            let Some(agent) = self.agents.get_mut(id) else { continue };
            prev_zones.push(agent.current_zone);
            if !agent.is_alive() {
                continue;
            }

            match agent.activity_state {
                ActivityState::Walking => {
                    if agent.path.len() < 2 {
                        // Unreachable by construction; recover per the error
                        // policy: stop the agent and continue the loop.
                        error!(agent = %agent.name, "walking without a path");
                        let _ = agent.stop("invariant breach: empty path");
                        continue;
                    }
                    let step = aux.controller.update(agent, &self.map, dt);
                    if step.arrived {
                        let _ = agent.stop("arrived at destination");
                        aux.event_triggers.push(Trigger::new(
                            TriggerKind::ArrivedAtDestination,
                            "arrived at destination",
                        ));
                        // A completed wander is a completed goal.
                        if matches!(
                            agent.current_goal.as_ref().map(|g| g.kind),
                            Some(GoalKind::Wander)
                        ) {
                            agent.current_goal = None;
                        }
                        aux.walk_dest = None;
                    } else if step.stuck {
                        let _ = agent.stop("stuck, replanning");
                        // Keep walk_dest: the goal phase re-paths promptly.
                        aux.next_path_retry_ms = now_ms;
                    }
                }
                ActivityState::DoingTask => {
                    let done = agent
                        .current_task_index
                        .and_then(|idx| agent.assigned_tasks.get(idx))
                        .is_some_and(|t| t.is_elapsed(now_ms));
                    if done {
                        match agent.complete_current_task() {
                            Ok(idx) => {
                                let task_type = agent.assigned_tasks[idx].task_type.clone();
                                agent
                                    .recent_events
                                    .push(now_ms, format!("finished {task_type}"));
                                agent.current_goal = None;
                                aux.event_triggers.push(Trigger::new(
                                    TriggerKind::TaskCompleted,
                                    format!("completed {task_type}"),
                                ));
                            }
                            Err(e) => {
                                error!(agent = %agent.name, error = %e, "task completion failed");
                                let _ = agent.stop("invariant breach: task state");
                            }
                        }
                    }
                }
                ActivityState::Idle | ActivityState::Dead => {}
            }

            // Zone recompute happens here so perception and triggers see the
            // post-movement room.
            agent.current_zone = self.map.zone_at(agent.position);
        }

        prev_zones
    }

    // ── Phase 2: goal execution ───────────────────────────────────────────

    fn execute_goals(&mut self, now_ms: u64) {
        for i in 0..self.agents.len() {
            let id = AgentId(i as u32);

            // Pursuit targets are read before the mutable borrow below.
            let target_pos = {
                let agent = match self.agents.get(id) {
                    Some(a) => a,
                    None => continue,
                };
                agent
                    .current_goal
                    .as_ref()
                    .and_then(|g| g.target_agent)
                    .and_then(|t| self.agents.get(t))
                    .filter(|t| t.is_alive())
                    .map(|t| t.position)
            };

            let map = &self.map;
            let nav = &self.nav;
            let aux = &mut self.aux[i];
            let Some(agent) = self.agents.get_mut(id) else { continue };
            if !agent.is_alive() || agent.activity_state != ActivityState::Idle {
                continue;
            }
            let Some(goal) = agent.current_goal.clone() else { continue };

            match goal.kind {
                GoalKind::GoToTask => {
                    let idx = goal
                        .target_task
                        .filter(|&t| {
                            agent
                                .assigned_tasks
                                .get(t)
                                .is_some_and(|task| !task.is_completed)
                        })
                        .or_else(|| agent.first_incomplete_task());
                    let Some(idx) = idx else {
                        agent.current_goal = None;
                        continue;
                    };
                    let task_pos = agent.assigned_tasks[idx].position;
                    if agent.position.distance(task_pos) <= agent.action_radius {
                        match agent.start_task(idx, now_ms) {
                            Ok(()) => {
                                let task_type = agent.assigned_tasks[idx].task_type.clone();
                                aux.event_triggers.push(Trigger::new(
                                    TriggerKind::TaskStarted,
                                    format!("started {task_type}"),
                                ));
                            }
                            Err(e) => {
                                warn!(agent = %agent.name, error = %e, "could not start task");
                                agent.current_goal = None;
                            }
                        }
                    } else if now_ms >= aux.next_path_retry_ms {
                        plan_walk(map, nav, agent, aux, task_pos, now_ms, "heading to task");
                    }
                }

                GoalKind::Wander => {
                    if now_ms < aux.next_path_retry_ms {
                        continue;
                    }
                    let dest = aux.walk_dest.unwrap_or_else(|| {
                        wander_target(nav, agent.position, &mut self.sim_rng)
                    });
                    plan_walk(map, nav, agent, aux, dest, now_ms, "wandering");
                }

                GoalKind::FollowAgent | GoalKind::Hunt | GoalKind::Kill => {
                    if now_ms.saturating_sub(aux.goal_set_ms) > PURSUIT_GOAL_TTL_MS {
                        agent.current_goal = None;
                        continue;
                    }
                    let Some(tpos) = target_pos else {
                        agent.current_goal = None;
                        continue;
                    };
                    if agent.position.distance(tpos) > FOLLOW_GAP
                        && now_ms >= aux.next_path_retry_ms
                    {
                        plan_walk(map, nav, agent, aux, tpos, now_ms, "following");
                    }
                }

                GoalKind::AvoidAgent => {
                    if now_ms.saturating_sub(aux.goal_set_ms) > PURSUIT_GOAL_TTL_MS {
                        agent.current_goal = None;
                        continue;
                    }
                    let Some(tpos) = target_pos else {
                        agent.current_goal = None;
                        continue;
                    };
                    if agent.position.distance(tpos) >= AVOID_SATISFIED {
                        agent.current_goal = None;
                    } else if now_ms >= aux.next_path_retry_ms {
                        let dest = flee_target(nav, tpos, &mut self.sim_rng);
                        plan_walk(map, nav, agent, aux, dest, now_ms, "keeping distance");
                    }
                }

                GoalKind::Idle | GoalKind::Speak => {
                    if now_ms.saturating_sub(aux.goal_set_ms) > IDLE_GOAL_TTL_MS {
                        agent.current_goal = None;
                    }
                }
            }
        }
    }

    // ── Phase 3: reasoning dispatch ───────────────────────────────────────

    fn dispatch_reasoning(&mut self, prev_zones: &[Option<usize>], now_ms: u64) {
        let coefficient = self.queue.thinking_coefficient();
        let known_names: Vec<String> = self.agents.iter().map(|a| a.name.clone()).collect();

        for i in 0..self.agents.len() {
            let id = AgentId(i as u32);
            let alive_and_free = self
                .agents
                .get(id)
                .is_some_and(|a| a.is_alive() && !a.is_thinking);
            if !alive_and_free {
                continue;
            }

            // Conversation replies take priority over normal triggers.
            if let Some((conv, last_turn)) = self.convos.pending_reply_for(id) {
                let partner = last_turn.speaker;
                let in_earshot = self.views[i]
                    .can_speak_to
                    .iter()
                    .any(|(other, _)| *other == partner);
                if in_earshot {
                    let pending = PendingReply {
                        speaker_id: partner,
                        speaker_name: last_turn.speaker_name.clone(),
                        message: last_turn.text.clone(),
                        zone: self
                            .agents
                            .get(partner)
                            .and_then(|p| p.current_zone)
                            .map(|z| self.map.zone_name(z).to_string()),
                        timestamp: last_turn.at_ms,
                    };
                    let history = self
                        .convos
                        .get(conv)
                        .map(|c| c.history_lines())
                        .unwrap_or_default();
                    let topic = self
                        .convos
                        .get(conv)
                        .map(|c| c.topic)
                        .unwrap_or(crew_mind::Topic::SmallTalk);
                    let ctx = self.build_context(id, None, Some(pending), &known_names);
                    self.spawn_reply(id, conv, ctx, history, topic, now_ms);
                    continue;
                }
            }

            // Idle agents with no goal ask for a behavior plan.
            let needs_decision = self.agents.get(id).is_some_and(|a| {
                a.activity_state == ActivityState::Idle && a.current_goal.is_none()
            });
            if needs_decision {
                let ctx = self.build_context(id, None, None, &known_names);
                self.spawn_decision(id, ctx);
                continue;
            }

            // Normal trigger path.
            let mut triggers = {
                let agent = self.agents.get(id).expect("agent exists");
                let zone_name = agent.current_zone.map(|z| self.map.zone_name(z).to_string());
                self.triggers.collect(
                    agent,
                    &self.views[i].visible,
                    prev_zones.get(i).copied().flatten(),
                    zone_name.as_deref(),
                    now_ms,
                )
            };
            triggers.append(&mut self.aux[i].event_triggers);

            // Edge-detect "an incomplete task is right here".
            {
                let agent = self.agents.get(id).expect("agent exists");
                let near = agent.assigned_tasks.iter().any(|t| {
                    !t.is_completed && agent.position.distance(t.position) <= agent.action_radius
                });
                let aux = &mut self.aux[i];
                if near && !aux.task_in_radius_prev {
                    triggers.push(Trigger::new(
                        TriggerKind::TaskInActionRadius,
                        "a task is within reach",
                    ));
                }
                aux.task_in_radius_prev = near;
            }

            // A consumed random-thought clock re-arms regardless of whether
            // the cooldown lets the thought through.
            if triggers.iter().any(|t| t.kind == TriggerKind::IdleRandom) {
                let next = self
                    .triggers
                    .next_random_thought_ms(now_ms, &mut self.rngs[i]);
                if let Some(a) = self.agents.get_mut(id) {
                    a.next_random_thought_ms = next;
                }
            }

            // Spotted events become memories whether or not a thought fires.
            for t in &triggers {
                if t.kind == TriggerKind::AgentSpotted {
                    if let Some(a) = self.agents.get_mut(id) {
                        let at = now_ms;
                        let detail = t.detail.clone();
                        a.recent_events.push(at, detail);
                    }
                }
            }

            let request = {
                let agent = self.agents.get(id).expect("agent exists");
                let earshot = !self.views[i].can_speak_to.is_empty();
                self.triggers.decide(
                    agent,
                    triggers,
                    earshot,
                    now_ms,
                    coefficient,
                    &mut self.rngs[i],
                )
            };

            // Visible-set memory rolls forward after the diff-based triggers.
            if let Some(a) = self.agents.get_mut(id) {
                a.previously_visible = self.views[i]
                    .visible
                    .iter()
                    .map(|(vid, _, _)| *vid)
                    .collect();
            }

            if let Some(req) = request {
                let ctx =
                    self.build_context(id, Some(req.trigger.clone()), None, &known_names);
                self.spawn_triggered(id, ctx, req.want_speech, now_ms);
            }
        }
    }

    fn sync_conversation_markers(&mut self) {
        for i in 0..self.agents.len() {
            let id = AgentId(i as u32);
            let conv = self.convos.get_active_for(id).map(|c| c.id);
            if let Some(a) = self.agents.get_mut(id) {
                a.conversation = conv;
            }
        }
    }

    // ── Request spawning ──────────────────────────────────────────────────

    fn spawn_triggered(&mut self, id: AgentId, ctx: ThinkContext, want_speech: bool, now_ms: u64) {
        if let Some(a) = self.agents.get_mut(id) {
            a.is_thinking = true;
        }
        let service = self.decisions.clone();
        let tx = self.outcome_tx.clone();
        let pick = id.0 as u64 ^ now_ms;
        tokio::spawn(async move {
            let outcome = service.process_triggers(ctx, want_speech, pick).await;
            let _ = tx.send(ReasonOutcome::Triggered { agent: id, outcome });
        });
    }

    fn spawn_decision(&mut self, id: AgentId, ctx: ThinkContext) {
        if let Some(a) = self.agents.get_mut(id) {
            a.is_thinking = true;
        }
        let service = self.decisions.clone();
        let tx = self.outcome_tx.clone();
        tokio::spawn(async move {
            let decision = service.get_decision(ctx).await;
            let _ = tx.send(ReasonOutcome::Decision { agent: id, decision });
        });
    }

    fn spawn_reply(
        &mut self,
        id: AgentId,
        conv: ConvId,
        ctx: ThinkContext,
        history: Vec<String>,
        topic: crew_mind::Topic,
        now_ms: u64,
    ) {
        if let Some(a) = self.agents.get_mut(id) {
            a.is_thinking = true;
        }
        let service = self.decisions.clone();
        let tx = self.outcome_tx.clone();
        let pick = id.0 as u64 ^ now_ms;
        tokio::spawn(async move {
            let text = service.conversation_reply(ctx, history, topic, pick).await;
            let _ = tx.send(ReasonOutcome::Reply { agent: id, conv, text });
        });
    }

    // ── Context assembly ──────────────────────────────────────────────────

    fn build_context(
        &self,
        id: AgentId,
        trigger: Option<Trigger>,
        pending_reply: Option<PendingReply>,
        known_names: &[String],
    ) -> ThinkContext {
        let agent = self.agents.get(id).expect("agent exists");
        let view = &self.views[id.index()];

        let visible = view
            .visible
            .iter()
            .filter_map(|(vid, name, dist)| {
                self.agents.get(*vid).map(|other| VisibleAgent {
                    id: *vid,
                    name: name.clone(),
                    distance: *dist,
                    position: other.position,
                    zone: other.current_zone.map(|z| self.map.zone_name(z).to_string()),
                })
            })
            .collect();

        ThinkContext {
            agent_id: id,
            name: agent.name.clone(),
            role: agent.role,
            position: agent.position,
            zone: agent.current_zone.map(|z| self.map.zone_name(z).to_string()),
            visible,
            can_speak_to: view.can_speak_names(),
            tasks: agent
                .assigned_tasks
                .iter()
                .map(|t| TaskBrief {
                    task_type: t.task_type.clone(),
                    room: t.room.clone(),
                    is_completed: t.is_completed,
                })
                .collect(),
            current_task_index: agent.current_task_index,
            recent_events: agent.recent_events.iter().map(|e| e.text.clone()).collect(),
            trigger,
            pending_reply,
            known_names: known_names.to_vec(),
        }
    }

    // ── Snapshot assembly ─────────────────────────────────────────────────

    fn build_snapshot(&mut self, now_ms: u64) -> WorldSnapshot {
        let tick = self.clock.advance();

        let agents = self
            .agents
            .iter()
            .map(|a| {
                let zone_name = a.current_zone.map(|z| self.map.zone_name(z));
                let visible_ids = self.views[a.id.index()]
                    .visible
                    .iter()
                    .map(|(id, _, _)| *id)
                    .collect();
                AgentSnapshot::capture(a, zone_name, visible_ids)
            })
            .collect();

        let (total, done) = self
            .agents
            .iter()
            .filter(|a| a.role == Role::Crewmate)
            .fold((0usize, 0usize), |(total, done), a| {
                (
                    total + a.assigned_tasks.len(),
                    done + a.tasks_completed(),
                )
            });
        let task_progress = if total == 0 { 0.0 } else { done as f32 / total as f32 };

        WorldSnapshot {
            tick,
            timestamp: now_ms,
            agents,
            task_progress,
            game_phase: self.phase,
            recent_thoughts: self.recent_thoughts.iter().cloned().collect(),
            recent_speech: self.recent_speech.iter().cloned().collect(),
            llm_queue_stats: self.queue.stats(),
        }
    }
}

// ── Free helpers ──────────────────────────────────────────────────────────────

fn push_capped<T>(feed: &mut VecDeque<T>, entry: T) {
    if feed.len() == FEED_CAP {
        feed.pop_front();
    }
    feed.push_back(entry);
}

/// Plan and assign a walk; on pathfinding failure, back off for the retry
/// cadence and leave the goal in place.
fn plan_walk(
    map: &WorldMap,
    nav: &NavGraph,
    agent: &mut Agent,
    aux: &mut AgentAux,
    dest: Vec2,
    now_ms: u64,
    reason: &str,
) {
    match crew_nav::find_path(map, nav, agent.position, dest) {
        Ok(waypoints) => {
            let smooth = crew_nav::smooth_path(&waypoints);
            match agent.assign_path(smooth, reason) {
                Ok(()) => {
                    aux.controller.reset(agent.position);
                    aux.walk_dest = Some(dest);
                }
                Err(e) => {
                    warn!(agent = %agent.name, error = %e, "path assignment rejected");
                    aux.next_path_retry_ms = now_ms + PATH_RETRY_MS;
                }
            }
        }
        Err(e) => {
            debug!(agent = %agent.name, error = %e, "pathfinding failed, will retry");
            aux.next_path_retry_ms = now_ms + PATH_RETRY_MS;
        }
    }
}

/// A random nav node reasonably far from `from`.
fn wander_target(nav: &NavGraph, from: Vec2, rng: &mut SimRng) -> Vec2 {
    let n = nav.node_count();
    for _ in 0..8 {
        let node = crew_core::NodeId(rng.gen_range(0..n as u32));
        let pos = nav.position(node);
        if pos.distance(from) > 100.0 {
            return pos;
        }
    }
    nav.position(crew_core::NodeId(rng.gen_range(0..n as u32)))
}

/// The farthest of a handful of sampled nav nodes from `threat`.
fn flee_target(nav: &NavGraph, threat: Vec2, rng: &mut SimRng) -> Vec2 {
    let n = nav.node_count();
    let mut best = nav.position(crew_core::NodeId(rng.gen_range(0..n as u32)));
    let mut best_dist = best.distance(threat);
    for _ in 0..7 {
        let candidate = nav.position(crew_core::NodeId(rng.gen_range(0..n as u32)));
        let d = candidate.distance(threat);
        if d > best_dist {
            best = candidate;
            best_dist = d;
        }
    }
    best
}
