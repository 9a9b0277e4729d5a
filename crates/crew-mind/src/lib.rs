//! `crew-mind` — everything between a perception change and an utterance.
//!
//! | Module       | Contents                                                  |
//! |--------------|-----------------------------------------------------------|
//! | [`triggers`] | trigger detection, priorities, cooldown clocks            |
//! | [`queue`]    | FIFO reasoning queue: one request in flight, deadlines,   |
//! |              | cancellation, sliding stats, thinking coefficient         |
//! | [`client`]   | chat-completions HTTP client                              |
//! | [`context`]  | `ThinkContext` — the read-only prompt context             |
//! | [`prompts`]  | role templates, response format, canned fallback tables   |
//! | [`decision`] | prompt assembly, response parsing, speech validation      |
//! | [`convo`]    | two-party conversation coordinator                        |
//!
//! # Concurrency
//!
//! The queue is callable from many producers; dispatch is single-consumer
//! (one worker task).  The decision service is `Clone` and is driven from
//! short-lived tasks the simulation spawns per request; everything it needs
//! travels in an owned [`ThinkContext`], so it never borrows simulation
//! state across an await point.

pub mod client;
pub mod context;
pub mod convo;
pub mod decision;
pub mod prompts;
pub mod queue;
pub mod triggers;

mod error;

#[cfg(test)]
mod tests;

pub use client::{ChatBackend, ChatClient, ChatOutcome};
pub use context::{PendingReply, TaskBrief, ThinkContext, VisibleAgent};
pub use convo::{CloseReason, Conversation, ConversationCoordinator, ConvoError, Topic, Turn};
pub use decision::{Decision, DecisionService, LlmTrace, TriggerOutcome};
pub use error::MindError;
pub use queue::{QueueStats, ReasonHandle, ReasoningQueue, TaskFn};
pub use triggers::{ThinkRequest, Trigger, TriggerConfig, TriggerEngine, TriggerKind};
