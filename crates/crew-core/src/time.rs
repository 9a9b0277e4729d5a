//! Simulation time model.
//!
//! # Design
//!
//! Time is a monotonically increasing `Tick` counter driven at a fixed rate
//! (`tick_hz`, default 10).  Snapshots are stamped with both the tick index
//! and a wall-clock unix-millisecond timestamp; all cooldown arithmetic in
//! the trigger engine is done in milliseconds.
//!
//! The integration step `dt` is measured from the wall clock between ticks
//! and clamped to [`MAX_DT_MS`] so a paused or suspended process does not
//! catapult agents through walls on resume.

use std::fmt;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Longest integration step the movement code will accept, in milliseconds.
/// Anything larger (debugger pause, laptop sleep) is truncated.
pub const MAX_DT_MS: u64 = 250;

// ── Tick ─────────────────────────────────────────────────────────────────────

/// An absolute simulation tick counter.
///
/// Tick 0 is "before the first tick"; the first emitted snapshot carries
/// tick 1.  Stored as `u64`: at 10 Hz a u64 lasts ~58 billion years.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Tick(pub u64);

impl Tick {
    pub const ZERO: Tick = Tick(0);

    /// Return the tick `n` steps after `self`.
    #[inline]
    pub fn offset(self, n: u64) -> Tick {
        Tick(self.0 + n)
    }

    /// Ticks elapsed from `earlier` to `self`.
    #[inline]
    pub fn since(self, earlier: Tick) -> u64 {
        self.0 - earlier.0
    }
}

impl std::ops::Add<u64> for Tick {
    type Output = Tick;
    #[inline]
    fn add(self, rhs: u64) -> Tick {
        Tick(self.0 + rhs)
    }
}

impl fmt::Display for Tick {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "T{}", self.0)
    }
}

// ── TickClock ─────────────────────────────────────────────────────────────────

/// Drives the fixed-rate loop: tracks the current tick and knows the target
/// interval between ticks.
///
/// `TickClock` is cheap to copy and intentionally holds no heap data.
#[derive(Clone, Debug)]
pub struct TickClock {
    /// Target driver rate in ticks per second.
    pub tick_hz: u32,
    /// The current tick — advanced by [`TickClock::advance`] each iteration.
    pub current_tick: Tick,
}

impl TickClock {
    pub fn new(tick_hz: u32) -> Self {
        Self { tick_hz: tick_hz.max(1), current_tick: Tick::ZERO }
    }

    /// Target wall-clock interval between ticks.
    #[inline]
    pub fn tick_interval(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.tick_hz as f64)
    }

    /// Advance to the next tick and return it.
    #[inline]
    pub fn advance(&mut self) -> Tick {
        self.current_tick = Tick(self.current_tick.0 + 1);
        self.current_tick
    }

    /// Clamp a measured inter-tick delta to the integration ceiling and
    /// convert to seconds for the movement code.
    #[inline]
    pub fn clamp_dt(elapsed: Duration) -> f32 {
        let ms = (elapsed.as_millis() as u64).min(MAX_DT_MS);
        ms as f32 / 1000.0
    }
}

/// Current wall-clock time as unix milliseconds.
///
/// All trigger clocks and snapshot timestamps use this scale.
#[inline]
pub fn unix_ms_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
