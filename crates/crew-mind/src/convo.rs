//! Two-party conversation coordinator.
//!
//! Invariants: a conversation has exactly two participants, turns strictly
//! alternate speakers, and an agent is in at most one active conversation.
//! Conversations close at their turn cap or after 30 s of silence, then
//! linger 30 s for display before eviction.

use rustc_hash::FxHashMap;
use thiserror::Error;
use tracing::debug;

use crew_core::{AgentId, ConvId, SimRng};

/// Active conversations time out after this much silence.
pub const INACTIVITY_MS: u64 = 30_000;
/// Closed conversations are evicted after this long.
pub const RETENTION_MS: u64 = 30_000;

// ── Types ─────────────────────────────────────────────────────────────────────

/// Inferred subject of a conversation, from the opening message's keywords.
#[derive(Copy, Clone, Debug, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Topic {
    Suspicion,
    Alibi,
    TaskInfo,
    SmallTalk,
    Accusation,
    Defense,
}

/// Why a conversation closed.
#[derive(Copy, Clone, Debug, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CloseReason {
    MaxTurnsReached,
    Inactivity,
}

#[derive(Clone, Debug)]
pub struct Turn {
    pub speaker: AgentId,
    pub speaker_name: String,
    pub text: String,
    pub at_ms: u64,
}

#[derive(Clone, Debug)]
pub struct Conversation {
    pub id: ConvId,
    pub participants: [AgentId; 2],
    pub turns: Vec<Turn>,
    /// Randomized cap in `[3, 10]`.
    pub max_turns: usize,
    pub topic: Topic,
    pub is_active: bool,
    pub close_reason: Option<CloseReason>,
    pub start_ms: u64,
    pub last_activity_ms: u64,
    closed_at_ms: Option<u64>,
}

impl Conversation {
    pub fn involves(&self, agent: AgentId) -> bool {
        self.participants.contains(&agent)
    }

    /// The participant who is not `agent`.
    pub fn other(&self, agent: AgentId) -> AgentId {
        if self.participants[0] == agent {
            self.participants[1]
        } else {
            self.participants[0]
        }
    }

    /// `"Name: text"` lines, oldest first — prompt-ready.
    pub fn history_lines(&self) -> Vec<String> {
        self.turns
            .iter()
            .map(|t| format!("{}: {}", t.speaker_name, t.text))
            .collect()
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConvoError {
    #[error("conversation {0} not found")]
    NotFound(ConvId),

    #[error("conversation {0} is closed")]
    Closed(ConvId),

    #[error("agent {agent} is not part of conversation {conv}")]
    NotParticipant { conv: ConvId, agent: AgentId },

    #[error("agent {agent} spoke out of turn in conversation {conv}")]
    OutOfTurn { conv: ConvId, agent: AgentId },
}

// ── Coordinator ───────────────────────────────────────────────────────────────

/// Owns every conversation of the run (active and lingering).
#[derive(Default)]
pub struct ConversationCoordinator {
    convos: FxHashMap<ConvId, Conversation>,
    /// Active-conversation index: agent → conversation.
    by_agent: FxHashMap<AgentId, ConvId>,
    next_id: u32,
}

impl ConversationCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Begin a dialogue, or resolve to the existing one if either party is
    /// already mid-conversation.
    ///
    /// The initial message becomes turn 1 and seeds the topic inference.
    #[allow(clippy::too_many_arguments)]
    pub fn start_conversation(
        &mut self,
        initiator: AgentId,
        initiator_name: &str,
        target: AgentId,
        initial_message: &str,
        now_ms: u64,
        rng: &mut SimRng,
    ) -> ConvId {
        if let Some(&existing) = self.by_agent.get(&initiator) {
            return existing;
        }
        if let Some(&existing) = self.by_agent.get(&target) {
            return existing;
        }

        let id = ConvId(self.next_id);
        self.next_id += 1;

        let topic = infer_topic(initial_message);
        let max_turns = 3 + rng.gen_range(0..=7usize);
        let convo = Conversation {
            id,
            participants: [initiator, target],
            turns: vec![Turn {
                speaker: initiator,
                speaker_name: initiator_name.to_string(),
                text: initial_message.to_string(),
                at_ms: now_ms,
            }],
            max_turns,
            topic,
            is_active: true,
            close_reason: None,
            start_ms: now_ms,
            last_activity_ms: now_ms,
            closed_at_ms: None,
        };
        debug!(conv = %id, ?topic, max_turns, "conversation started");
        self.convos.insert(id, convo);
        self.by_agent.insert(initiator, id);
        self.by_agent.insert(target, id);
        id
    }

    /// Append a reply turn.  Closes the conversation once `max_turns` is
    /// reached.
    pub fn add_reply(
        &mut self,
        conv: ConvId,
        speaker: AgentId,
        speaker_name: &str,
        text: &str,
        now_ms: u64,
    ) -> Result<(), ConvoError> {
        let convo = self.convos.get_mut(&conv).ok_or(ConvoError::NotFound(conv))?;
        if !convo.is_active {
            return Err(ConvoError::Closed(conv));
        }
        if !convo.involves(speaker) {
            return Err(ConvoError::NotParticipant { conv, agent: speaker });
        }
        if convo.turns.last().is_some_and(|t| t.speaker == speaker) {
            return Err(ConvoError::OutOfTurn { conv, agent: speaker });
        }

        convo.turns.push(Turn {
            speaker,
            speaker_name: speaker_name.to_string(),
            text: text.to_string(),
            at_ms: now_ms,
        });
        convo.last_activity_ms = now_ms;

        if convo.turns.len() >= convo.max_turns {
            Self::close(convo, CloseReason::MaxTurnsReached, now_ms, &mut self.by_agent);
        }
        Ok(())
    }

    pub fn get(&self, conv: ConvId) -> Option<&Conversation> {
        self.convos.get(&conv)
    }

    /// The active conversation `agent` is part of, if any.
    pub fn get_active_for(&self, agent: AgentId) -> Option<&Conversation> {
        let id = self.by_agent.get(&agent)?;
        self.convos.get(id).filter(|c| c.is_active)
    }

    /// The turn `agent` owes a reply to: its active conversation's last turn
    /// when that turn was spoken by the other party.
    pub fn pending_reply_for(&self, agent: AgentId) -> Option<(ConvId, &Turn)> {
        let convo = self.get_active_for(agent)?;
        let last = convo.turns.last()?;
        (last.speaker != agent).then_some((convo.id, last))
    }

    /// Close idle conversations and evict closed ones past their retention.
    pub fn tick_cleanup(&mut self, now_ms: u64) {
        let by_agent = &mut self.by_agent;
        for convo in self.convos.values_mut() {
            if convo.is_active && now_ms.saturating_sub(convo.last_activity_ms) > INACTIVITY_MS {
                Self::close(convo, CloseReason::Inactivity, now_ms, by_agent);
            }
        }
        self.convos.retain(|_, c| match c.closed_at_ms {
            Some(t) => now_ms.saturating_sub(t) <= RETENTION_MS,
            None => true,
        });
    }

    /// All conversations still in memory, including lingering closed ones.
    pub fn iter(&self) -> impl Iterator<Item = &Conversation> {
        self.convos.values()
    }

    pub fn active_count(&self) -> usize {
        self.convos.values().filter(|c| c.is_active).count()
    }

    fn close(
        convo: &mut Conversation,
        reason: CloseReason,
        now_ms: u64,
        by_agent: &mut FxHashMap<AgentId, ConvId>,
    ) {
        convo.is_active = false;
        convo.close_reason = Some(reason);
        convo.closed_at_ms = Some(now_ms);
        for p in convo.participants {
            if by_agent.get(&p) == Some(&convo.id) {
                by_agent.remove(&p);
            }
        }
        debug!(conv = %convo.id, ?reason, turns = convo.turns.len(), "conversation closed");
    }
}

// ── Topic inference ───────────────────────────────────────────────────────────

/// Keyword tables for topic inference, checked in order.
const TOPIC_KEYWORDS: &[(Topic, &[&str])] = &[
    (Topic::Accusation, &["it was you", "you did", "i saw you", "guilty", "accuse"]),
    (Topic::Suspicion, &["sus", "suspicious", "vent", "weird", "strange", "trust"]),
    (Topic::Alibi, &["i was", "i've been", "saw me", "with me", "alibi"]),
    (Topic::Defense, &["wasn't me", "not me", "i swear", "innocent"]),
    (Topic::TaskInfo, &["task", "wiring", "fix", "download", "fuel", "done"]),
];

/// Infer a topic from the opening message; defaults to small talk.
pub fn infer_topic(message: &str) -> Topic {
    let lower = message.to_lowercase();
    for (topic, keywords) in TOPIC_KEYWORDS {
        if keywords.iter().any(|k| lower.contains(k)) {
            return *topic;
        }
    }
    Topic::SmallTalk
}
