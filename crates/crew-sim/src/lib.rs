//! `crew-sim` — the simulation driver.
//!
//! The [`Simulation`] owns every agent, conversation, and controller; all
//! mutation happens on its tick, in one logical thread of control.
//! Reasoning requests are the only work that leaves the tick: they run as
//! detached tasks against the serialized queue and post their outcomes back
//! through a channel the next tick drains.
//!
//! | Module         | Contents                                        |
//! |----------------|-------------------------------------------------|
//! | [`sim`]        | `Simulation` — the tick loop itself             |
//! | [`builder`]    | validating construction from a `SimConfig`      |
//! | [`perception`] | per-agent visible / audible sets                |
//! | [`snapshot`]   | world snapshots, per-facet deltas, delta apply  |
//! | [`sink`]       | `SnapshotSink` — the broadcaster seam           |

pub mod builder;
pub mod perception;
pub mod sim;
pub mod sink;
pub mod snapshot;

mod error;


pub use builder::SimBuilder;
pub use error::SimError;
pub use perception::PerceptionView;
pub use sim::Simulation;
pub use sink::{NoopSink, SnapshotSink};
pub use snapshot::{
    diff_snapshots, apply_delta, AgentAiState, AgentDelta, AgentMovement, AgentSnapshot,
    AgentSummary, GamePhase, SnapshotDelta, SpeechEntry, ThoughtEntry, WorldSnapshot,
};
