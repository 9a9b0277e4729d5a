//! The seam between the simulation and the broadcaster.

use std::sync::Arc;

use crate::WorldSnapshot;

/// Receives the finished snapshot at the end of every tick.
///
/// Implementations must not block: the broadcaster hands the snapshot to
/// per-subscriber queues and returns immediately.
pub trait SnapshotSink: Send + Sync {
    fn publish(&self, snapshot: Arc<WorldSnapshot>);
}

/// A [`SnapshotSink`] that does nothing.  Use when driving the simulation
/// headless (tests, probes).
pub struct NoopSink;

impl SnapshotSink for NoopSink {
    fn publish(&self, _snapshot: Arc<WorldSnapshot>) {}
}
