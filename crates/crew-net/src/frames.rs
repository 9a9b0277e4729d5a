//! Wire frames.
//!
//! Every frame is one JSON text message of the form
//! `{"type": "<tag>", "payload": {...}}`.

use serde::Serialize;

use crew_core::Tick;
use crew_mind::LlmTrace;
use crew_sim::{SnapshotDelta, WorldSnapshot};

/// Server identity sent as the first frame of every connection.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HandshakeInfo {
    pub server: &'static str,
    pub version: &'static str,
    pub tick_hz: u32,
    pub num_agents: usize,
}

impl HandshakeInfo {
    pub fn new(tick_hz: u32, num_agents: usize) -> Self {
        Self {
            server: "crewsim",
            version: env!("CARGO_PKG_VERSION"),
            tick_hz,
            num_agents,
        }
    }
}

/// Outbound frame set.  Inbound traffic is free-form and never parsed into
/// this type.
#[derive(Clone, Debug, Serialize)]
#[serde(tag = "type", content = "payload", rename_all = "kebab-case")]
pub enum Frame {
    Handshake(HandshakeInfo),
    Snapshot(WorldSnapshot),
    StateUpdate(SnapshotDelta),
    Heartbeat { tick: Tick, timestamp: u64 },
    LlmTrace(LlmTrace),
    Error { message: String },
}

impl Frame {
    /// Serialize to the wire text.  Frame types are all plain data; failure
    /// here would be a serde derive bug, so it degrades to an error frame.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|e| {
            format!(r#"{{"type":"error","payload":{{"message":"serialize: {e}"}}}}"#)
        })
    }
}
