//! Decision service: prompt assembly, response parsing, fallbacks, and
//! speech validation.
//!
//! All entry points consume an owned [`ThinkContext`] and are infallible at
//! the interface: every failure mode decays to a fallback (or to silence,
//! for speech) rather than an error the simulation must handle.

use std::sync::{Arc, LazyLock};
use std::time::Instant;

use regex::Regex;
use serde::Serialize;
use tracing::{debug, warn};

use crew_agent::GoalKind;
use crew_core::AgentId;

use crate::prompts::{
    self, MAX_TOKENS_DECISION, MAX_TOKENS_REPLY, MAX_TOKENS_SPEECH, MAX_TOKENS_THOUGHT,
};
use crate::client::ChatBackend;
use crate::queue::TaskFn;
use crate::{ChatOutcome, MindError, ReasoningQueue, ThinkContext, Topic};

// ── Results ───────────────────────────────────────────────────────────────────

/// A parsed (or fallen-back) behavior decision.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Decision {
    pub goal: GoalKind,
    /// Agent name for FOLLOW/AVOID/KILL/HUNT goals; resolved to an id by the
    /// simulation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_agent: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_task_index: Option<usize>,
    pub reasoning: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thought: Option<String>,
}

/// Output of the per-tick trigger hook.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TriggerOutcome {
    pub thought: Option<String>,
    pub speech: Option<String>,
}

// ── Trace events ──────────────────────────────────────────────────────────────

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TracePrompts {
    pub system: String,
    pub user: String,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TraceAgentPos {
    pub name: String,
    pub x: f32,
    pub y: f32,
}

/// One reasoning exchange, emitted for observability (`llm-trace` frames).
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LlmTrace {
    pub agent_id: AgentId,
    pub agent_name: String,
    pub request_type: &'static str,
    pub prompts: TracePrompts,
    pub raw_response: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parsed_decision: Option<serde_json::Value>,
    pub context: String,
    pub agent_positions: Vec<TraceAgentPos>,
    pub tokens: u32,
    pub duration_ms: u64,
    pub success: bool,
}

// ── Service ───────────────────────────────────────────────────────────────────

/// Stateless front-end over the reasoning queue.  Clone freely.
#[derive(Clone)]
pub struct DecisionService {
    queue: ReasoningQueue,
    backend: Arc<dyn ChatBackend>,
    trace_tx: Option<tokio::sync::mpsc::UnboundedSender<LlmTrace>>,
}

impl DecisionService {
    pub fn new(
        queue: ReasoningQueue,
        backend: Arc<dyn ChatBackend>,
        trace_tx: Option<tokio::sync::mpsc::UnboundedSender<LlmTrace>>,
    ) -> Self {
        Self { queue, backend, trace_tx }
    }

    // ── Public operations ─────────────────────────────────────────────────

    /// The per-tick hook: produce a thought and (optionally) a spoken line
    /// for the trigger carried in `ctx`.
    ///
    /// `pick` seeds fallback-table selection (any per-agent varying number).
    pub async fn process_triggers(
        &self,
        ctx: ThinkContext,
        want_speech: bool,
        pick: u64,
    ) -> TriggerOutcome {
        let trigger_kind = ctx.trigger.as_ref().map(|t| t.kind);

        let (system, user) = prompts::thought_prompt(&ctx);
        let thought = match self.request(&ctx, "thought", system, user, MAX_TOKENS_THOUGHT).await {
            Ok(out) => non_empty(out.text),
            Err(MindError::Cancelled) => None,
            Err(_) => trigger_kind.map(|k| prompts::fallback_thought(k, pick).to_string()),
        };

        let speech = if want_speech {
            let (system, user) = prompts::speech_prompt(&ctx);
            match self.request(&ctx, "speech", system, user, MAX_TOKENS_SPEECH).await {
                Ok(out) => validate_speech(&ctx, &out.text),
                // Speech always stays silent on failure.
                Err(_) => None,
            }
        } else {
            None
        };

        TriggerOutcome { thought, speech }
    }

    /// Goal selection.  Never fails: endpoint or parse trouble decays to the
    /// default decision (first incomplete task, else wander).
    pub async fn get_decision(&self, ctx: ThinkContext) -> Decision {
        let (system, user) = prompts::decision_prompt(&ctx);
        let started = Instant::now();
        let result = self.run(system.clone(), user.clone(), MAX_TOKENS_DECISION).await;
        let duration_ms = started.elapsed().as_millis() as u64;

        let parsed = result
            .as_ref()
            .ok()
            .map(|out| parse_decision(&out.text))
            .transpose();

        let decision = match parsed {
            Ok(Some(d)) => Some(d),
            Ok(None) => None,
            Err(e) => {
                debug!(agent = %ctx.name, error = %e, "decision response unparseable");
                None
            }
        };

        self.emit_trace(
            &ctx,
            "decision",
            TracePrompts { system, user },
            &result,
            decision
                .as_ref()
                .and_then(|d| serde_json::to_value(d).ok()),
            duration_ms,
        );

        decision.unwrap_or_else(|| {
            debug!(agent = %ctx.name, "decision fell back");
            fallback_decision(&ctx)
        })
    }

    /// A conversation reply.  Timeouts and cancellations stay silent;
    /// endpoint failures use the topic-keyed canned table.
    pub async fn conversation_reply(
        &self,
        ctx: ThinkContext,
        history: Vec<String>,
        topic: Topic,
        pick: u64,
    ) -> Option<String> {
        let (system, user) = prompts::reply_prompt(&ctx, &history);
        match self
            .request(&ctx, "conversation_reply", system, user, MAX_TOKENS_REPLY)
            .await
        {
            Ok(out) => validate_speech(&ctx, &out.text),
            Err(e) if e.suppresses_speech() => None,
            Err(_) => Some(prompts::fallback_reply(topic, pick).to_string()),
        }
    }

    // ── Internals ─────────────────────────────────────────────────────────

    /// Enqueue one exchange on the reasoning queue and await it.
    async fn run(
        &self,
        system: String,
        user: String,
        max_tokens: u32,
    ) -> Result<ChatOutcome, MindError> {
        let backend = Arc::clone(&self.backend);
        let task: TaskFn = Box::new(move || backend.dispatch(system, user, max_tokens));
        self.queue.enqueue(task, None).await
    }

    /// Enqueue one exchange and trace it.
    async fn request(
        &self,
        ctx: &ThinkContext,
        request_type: &'static str,
        system: String,
        user: String,
        max_tokens: u32,
    ) -> Result<ChatOutcome, MindError> {
        let started = Instant::now();
        let result = self.run(system.clone(), user.clone(), max_tokens).await;
        let duration_ms = started.elapsed().as_millis() as u64;
        self.emit_trace(ctx, request_type, TracePrompts { system, user }, &result, None, duration_ms);
        result
    }

    fn emit_trace(
        &self,
        ctx: &ThinkContext,
        request_type: &'static str,
        prompts: TracePrompts,
        result: &Result<ChatOutcome, MindError>,
        parsed_decision: Option<serde_json::Value>,
        duration_ms: u64,
    ) {
        let Some(tx) = &self.trace_tx else { return };
        let trace = LlmTrace {
            agent_id: ctx.agent_id,
            agent_name: ctx.name.clone(),
            request_type,
            prompts,
            raw_response: result.as_ref().ok().map(|o| o.text.clone()),
            parsed_decision,
            context: ctx
                .trigger
                .as_ref()
                .map(|t| t.detail.clone())
                .unwrap_or_default(),
            agent_positions: trace_positions(ctx),
            tokens: result
                .as_ref()
                .map(|o| o.prompt_tokens + o.completion_tokens)
                .unwrap_or(0),
            duration_ms,
            success: result.is_ok(),
        };
        let _ = tx.send(trace);
    }
}

fn trace_positions(ctx: &ThinkContext) -> Vec<TraceAgentPos> {
    let mut out = Vec::with_capacity(ctx.visible.len() + 1);
    out.push(TraceAgentPos { name: ctx.name.clone(), x: ctx.position.x, y: ctx.position.y });
    for v in &ctx.visible {
        out.push(TraceAgentPos { name: v.name.clone(), x: v.position.x, y: v.position.y });
    }
    out
}

fn non_empty(text: String) -> Option<String> {
    let trimmed = text.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

// ── Response parsing ──────────────────────────────────────────────────────────

static GOAL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?mi)^\s*GOAL:\s*([A-Z_]+)").expect("static regex"));
static TARGET_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?mi)^\s*TARGET:\s*(.+)$").expect("static regex"));
static REASONING_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?mi)^\s*REASONING:\s*(.+)$").expect("static regex"));
static THOUGHT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?mi)^\s*THOUGHT:\s*(.+)$").expect("static regex"));

/// Parse the `GOAL:/TARGET:/REASONING:/THOUGHT:` response format.
pub fn parse_decision(text: &str) -> Result<Decision, MindError> {
    let goal_str = GOAL_RE
        .captures(text)
        .and_then(|c| c.get(1))
        .ok_or_else(|| MindError::Parse("missing GOAL line".into()))?
        .as_str()
        .to_uppercase();

    let goal = match goal_str.as_str() {
        "GO_TO_TASK" => GoalKind::GoToTask,
        "WANDER" => GoalKind::Wander,
        "FOLLOW_AGENT" => GoalKind::FollowAgent,
        "AVOID_AGENT" => GoalKind::AvoidAgent,
        "IDLE" => GoalKind::Idle,
        "SPEAK" => GoalKind::Speak,
        "KILL" => GoalKind::Kill,
        "HUNT" => GoalKind::Hunt,
        other => return Err(MindError::Parse(format!("unknown goal {other:?}"))),
    };

    let target_raw = TARGET_RE
        .captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|t| !t.eq_ignore_ascii_case("none") && !t.is_empty());

    let (target_agent, target_task_index) = match &target_raw {
        None => (None, None),
        Some(t) => match t.parse::<usize>() {
            Ok(idx) => (None, Some(idx)),
            Err(_) => (Some(t.clone()), None),
        },
    };

    let reasoning = REASONING_RE
        .captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim().to_string())
        .unwrap_or_default();

    let thought = THOUGHT_RE
        .captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|t| !t.is_empty());

    Ok(Decision { goal, target_agent, target_task_index, reasoning, thought })
}

/// The default decision: first incomplete task, else wander.
pub fn fallback_decision(ctx: &ThinkContext) -> Decision {
    match ctx.tasks.iter().position(|t| !t.is_completed) {
        Some(idx) => Decision {
            goal: GoalKind::GoToTask,
            target_agent: None,
            target_task_index: Some(idx),
            reasoning: "falling back to the next incomplete task".into(),
            thought: None,
        },
        None => Decision {
            goal: GoalKind::Wander,
            target_agent: None,
            target_task_index: None,
            reasoning: "nothing pressing; wandering".into(),
            thought: None,
        },
    }
}

// ── Speech validation ─────────────────────────────────────────────────────────

/// Post-generation speech checks:
///
/// - Empty or whitespace-only responses are dropped.
/// - Third-person self-reference is rewritten to first person ("Orange was"
///   → "I was").
/// - Mentions of agents who are neither the speaker nor in earshot are
///   logged as warnings but not blocked — the speaker may be relaying an
///   older observation.
pub fn validate_speech(ctx: &ThinkContext, raw: &str) -> Option<String> {
    let trimmed = raw.trim().trim_matches('"');
    if trimmed.is_empty() {
        return None;
    }

    let mut text = trimmed.to_string();
    let escaped = regex::escape(&ctx.name);
    // Copula-aware rewrites first, then the bare-name catch-all.
    for (pattern, replacement) in [
        (format!(r"(?i)\b{escaped} is\b"), "I am"),
        (format!(r"(?i)\b{escaped} was\b"), "I was"),
        (format!(r"(?i)\b{escaped}'s\b"), "my"),
        (format!(r"(?i)\b{escaped}\b"), "I"),
    ] {
        if let Ok(re) = Regex::new(&pattern) {
            text = re.replace_all(&text, replacement).into_owned();
        }
    }

    for name in &ctx.known_names {
        if name.eq_ignore_ascii_case(&ctx.name) {
            continue;
        }
        let mentioned = Regex::new(&format!(r"(?i)\b{}\b", regex::escape(name)))
            .map(|re| re.is_match(&text))
            .unwrap_or(false);
        if mentioned && !ctx.can_speak_to.iter().any(|n| n.eq_ignore_ascii_case(name)) {
            warn!(
                speaker = %ctx.name,
                mentioned = %name,
                "speech mentions an agent who is not in earshot"
            );
        }
    }

    Some(text)
}
