//! `crew-motion` — per-agent steering along a smoothed path.
//!
//! One [`MovementController`] per agent tracks stuck-detection state between
//! ticks; everything else is recomputed per update from the agent's
//! kinematics and the map.

pub mod controller;
pub mod params;

#[cfg(test)]
mod tests;

pub use controller::{MotionStep, MovementController};
pub use params::MotionParams;
