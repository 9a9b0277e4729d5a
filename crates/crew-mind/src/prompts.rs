//! Prompt templates and canned fallback tables.
//!
//! The fallback tables are static constants; nothing here is rebuilt per
//! call.

use std::fmt::Write as _;

use crew_agent::Role;

use crate::{ThinkContext, TriggerKind};

// ── Token budgets ─────────────────────────────────────────────────────────────

pub const MAX_TOKENS_DECISION: u32 = 200;
pub const MAX_TOKENS_THOUGHT: u32 = 100;
pub const MAX_TOKENS_SPEECH: u32 = 70;
pub const MAX_TOKENS_REPLY: u32 = 80;

// ── System personas ───────────────────────────────────────────────────────────

const CREWMATE_SYSTEM: &str = "You are a crewmate on a spaceship. You complete \
maintenance tasks and keep an eye out for suspicious behavior. Stay in \
character, be brief, and always speak in the first person.";

const IMPOSTOR_SYSTEM: &str = "You are secretly the impostor on a spaceship. \
You pretend to do tasks while blending in with the crew. Never admit your \
role. Stay in character, be brief, and always speak in the first person.";

pub fn system_for(role: Role) -> &'static str {
    match role {
        Role::Crewmate => CREWMATE_SYSTEM,
        Role::Impostor => IMPOSTOR_SYSTEM,
    }
}

// ── Context rendering ─────────────────────────────────────────────────────────

/// Shared situation block: location, visible agents with distances, task
/// list with completion marks, recent events.
fn situation(ctx: &ThinkContext) -> String {
    let mut s = String::new();
    let zone = ctx.zone.as_deref().unwrap_or("a hallway");
    let _ = writeln!(s, "You are {} in {}.", ctx.name, zone);

    if ctx.visible.is_empty() {
        let _ = writeln!(s, "No one is in sight.");
    } else {
        let _ = writeln!(s, "You can see:");
        for v in &ctx.visible {
            let where_ = v.zone.as_deref().unwrap_or("the hallway");
            let _ = writeln!(s, "- {} ({:.0} units away, in {})", v.name, v.distance, where_);
        }
    }

    if !ctx.tasks.is_empty() {
        let _ = writeln!(s, "Your tasks:");
        for (i, t) in ctx.tasks.iter().enumerate() {
            let mark = if t.is_completed { "x" } else { " " };
            let _ = writeln!(s, "{}. [{}] {} in {}", i, mark, t.task_type, t.room);
        }
    }

    if !ctx.recent_events.is_empty() {
        let _ = writeln!(s, "Recently: {}", ctx.recent_events.join("; "));
    }
    s
}

fn role_addendum(role: Role) -> &'static str {
    match role {
        Role::Crewmate => "Finish your tasks and report anything odd.",
        Role::Impostor => "Look busy. Isolate crewmates when you can, and keep your cover.",
    }
}

// ── Request prompts ───────────────────────────────────────────────────────────

/// `(system, user)` for an inner-monologue request.
pub fn thought_prompt(ctx: &ThinkContext) -> (String, String) {
    let trigger_line = match &ctx.trigger {
        Some(t) => format!("Something just happened: {}.", t.detail),
        None => String::new(),
    };
    let user = format!(
        "{}{}\nWrite a single short inner thought (one sentence, first person). No quotes.",
        situation(ctx),
        trigger_line
    );
    (system_for(ctx.role).to_string(), user)
}

/// `(system, user)` for a spoken-line request.
pub fn speech_prompt(ctx: &ThinkContext) -> (String, String) {
    let hearers = ctx.can_speak_to.join(", ");
    let trigger_line = match &ctx.trigger {
        Some(t) => format!("Context: {}.", t.detail),
        None => String::new(),
    };
    let user = format!(
        "{}{}\nSay one short line out loud to {}. Plain text, no quotes, no stage directions.",
        situation(ctx),
        trigger_line,
        if hearers.is_empty() { "no one in particular" } else { &hearers }
    );
    (system_for(ctx.role).to_string(), user)
}

/// `(system, user)` for a goal-selection request.  The response must follow
/// the `GOAL:/TARGET:/REASONING:/THOUGHT:` line format.
pub fn decision_prompt(ctx: &ThinkContext) -> (String, String) {
    let goals = match ctx.role {
        Role::Crewmate => "GO_TO_TASK, WANDER, FOLLOW_AGENT, AVOID_AGENT, IDLE, SPEAK",
        Role::Impostor => "GO_TO_TASK, WANDER, FOLLOW_AGENT, AVOID_AGENT, IDLE, SPEAK, KILL, HUNT",
    };
    let user = format!(
        "{}{}\nChoose your next goal from: {goals}.\nAnswer in exactly this format:\n\
         GOAL: <one of the goals>\nTARGET: <task number, agent name, or NONE>\n\
         REASONING: <one sentence>\nTHOUGHT: <one short inner thought>",
        situation(ctx),
        role_addendum(ctx.role),
    );
    (system_for(ctx.role).to_string(), user)
}

/// `(system, user)` for a conversation reply.  `history` is oldest-first
/// `"Name: text"` lines.
pub fn reply_prompt(ctx: &ThinkContext, history: &[String]) -> (String, String) {
    let partner = ctx
        .pending_reply
        .as_ref()
        .map(|p| p.speaker_name.clone())
        .unwrap_or_else(|| "them".to_string());
    let user = format!(
        "{}\nYou are talking with {partner}. The conversation so far:\n{}\n\
         Reply with one short line, first person, plain text.",
        situation(ctx),
        history.join("\n"),
    );
    (system_for(ctx.role).to_string(), user)
}

// ── Fallback tables ───────────────────────────────────────────────────────────

/// Canned thoughts used when the endpoint times out or errors, keyed by the
/// trigger that started the request.
pub fn fallback_thought(kind: TriggerKind, pick: u64) -> &'static str {
    use TriggerKind::*;
    let table: &[&str] = match kind {
        AgentSpotted => &[
            "Someone just came into view.",
            "Oh — company.",
            "I should keep an eye on them.",
        ],
        AgentLostSight => &[
            "Where did they go?",
            "Lost track of them.",
        ],
        PassedAgentClosely => &[
            "That was close quarters.",
            "Excuse me, coming through.",
        ],
        EnteredRoom => &[
            "New room, same ship.",
            "Let me look around here.",
        ],
        TaskCompleted => &[
            "Done. What's next?",
            "One more off the list.",
        ],
        TaskStarted => &[
            "Alright, focus.",
            "Let's get this done.",
        ],
        ArrivedAtDestination => &[
            "Here at last.",
            "Made it.",
        ],
        HeardSpeech => &[
            "Interesting. I heard that.",
            "Someone's chatty.",
        ],
        TaskInActionRadius => &[
            "That task is right here.",
            "Might as well do this one.",
        ],
        IdleRandom => &[
            "Quiet ship today.",
            "I wonder how the others are doing.",
            "Back to work soon.",
        ],
    };
    table[(pick % table.len() as u64) as usize]
}

/// Canned conversation replies keyed by topic, used when a reply request
/// fails non-silently.
pub fn fallback_reply(topic: crate::Topic, pick: u64) -> &'static str {
    use crate::Topic::*;
    let table: &[&str] = match topic {
        Suspicion => &["Hm. I'm not sure I buy that.", "Keep your eyes open."],
        Alibi => &["I was doing my tasks, you can check.", "Ask around, I was seen."],
        TaskInfo => &["Mine are almost done.", "Still a few tasks left on my list."],
        SmallTalk => &["Yeah, quiet shift.", "Tell me about it."],
        Accusation => &["That's a serious claim.", "Where's your proof?"],
        Defense => &["I believe you. For now.", "Alright, alright."],
    };
    table[(pick % table.len() as u64) as usize]
}
