//! `crew-core` — foundational types for the `crewsim` agent server.
//!
//! This crate is a dependency of every other `crew-*` crate.  It intentionally
//! has no `crew-*` dependencies and minimal external ones (only `rand` and
//! `thiserror`, plus optional `serde`).
//!
//! # What lives here
//!
//! | Module      | Contents                                        |
//! |-------------|-------------------------------------------------|
//! | [`ids`]     | `AgentId`, `NodeId`, `ConvId`                   |
//! | [`vec2`]    | `Vec2` planar vector math                       |
//! | [`time`]    | `Tick`, `TickClock`, `dt` clamping              |
//! | [`rng`]     | `AgentRng` (per-agent), `SimRng` (global)       |
//! | [`config`]  | `SimConfig` — every recognized server option    |
//! | [`error`]   | `CrewError`, `CrewResult`                       |
//!
//! # Feature flags
//!
//! | Flag    | Effect                                              |
//! |---------|-----------------------------------------------------|
//! | `serde` | Adds `Serialize`/`Deserialize` to all public types. |

pub mod config;
pub mod error;
pub mod ids;
pub mod rng;
pub mod time;
pub mod vec2;

#[cfg(test)]
mod tests;

// ── Re-exports ────────────────────────────────────────────────────────────────

pub use config::SimConfig;
pub use error::{CrewError, CrewResult};
pub use ids::{AgentId, ConvId, NodeId};
pub use rng::{AgentRng, SimRng};
pub use time::{Tick, TickClock};
pub use vec2::Vec2;
