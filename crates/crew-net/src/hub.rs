//! The broadcast hub: subscriber registry and per-subscriber mailboxes.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::Notify;
use tracing::debug;

use crew_mind::LlmTrace;
use crew_sim::{SnapshotSink, WorldSnapshot};

/// Bounded per-subscriber queue length.  At 10 Hz this is ~3 s of backlog
/// before the oldest delta is sacrificed for a full-snapshot resync.
const MAILBOX_CAP: usize = 32;

// ── Mailbox ───────────────────────────────────────────────────────────────────

/// One queued item for a subscriber task.
pub enum MailItem {
    World(Arc<WorldSnapshot>),
    Trace(Arc<LlmTrace>),
}

struct MailboxState {
    queue: Vec<MailItem>,
    /// Set when overflow dropped a snapshot; the subscriber's next world
    /// frame must be a full snapshot.
    needs_full: bool,
    closed: bool,
}

struct Mailbox {
    state: Mutex<MailboxState>,
    notify: Notify,
}

impl Mailbox {
    fn new() -> Self {
        Self {
            state: Mutex::new(MailboxState {
                queue: Vec::new(),
                needs_full: false,
                closed: false,
            }),
            notify: Notify::new(),
        }
    }

    fn push(&self, item: MailItem) {
        {
            let mut state = self.state.lock().expect("mailbox mutex poisoned");
            if state.closed {
                return;
            }
            if state.queue.len() >= MAILBOX_CAP {
                // Drop the oldest item; world drops force a resync.
                let dropped = state.queue.remove(0);
                if matches!(dropped, MailItem::World(_)) {
                    state.needs_full = true;
                }
            }
            state.queue.push(item);
        }
        self.notify.notify_one();
    }

    fn close(&self) {
        self.state.lock().expect("mailbox mutex poisoned").closed = true;
        self.notify.notify_one();
    }
}

// ── Subscriber handle ─────────────────────────────────────────────────────────

/// A subscriber task's end of its mailbox.  Dropping the handle does not
/// unsubscribe; the owning task calls [`BroadcastHub::unsubscribe`].
pub struct Subscriber {
    pub id: u64,
    mailbox: Arc<Mailbox>,
}

impl Subscriber {
    /// Wait until at least one item (or a close) is available.
    pub async fn wait(&self) {
        self.mailbox.notify.notified().await;
    }

    /// Drain everything queued.  `(items, needs_full, closed)`; the
    /// needs-full flag is cleared by the take.
    pub fn drain(&self) -> (Vec<MailItem>, bool, bool) {
        let mut state = self.mailbox.state.lock().expect("mailbox mutex poisoned");
        let items = std::mem::take(&mut state.queue);
        let needs_full = std::mem::take(&mut state.needs_full);
        (items, needs_full, state.closed)
    }
}

// ── Hub ───────────────────────────────────────────────────────────────────────

struct HubInner {
    subscribers: HashMap<u64, Arc<Mailbox>>,
    next_id: u64,
    /// Most recent snapshot, served to fresh subscribers before their first
    /// delta.
    latest: Option<Arc<WorldSnapshot>>,
}

/// Fan-out point between the simulation and all subscriber tasks.
///
/// One mutex guards the registry; each mailbox has its own lock, so a slow
/// subscriber never delays `publish` beyond an O(1) enqueue.
pub struct BroadcastHub {
    inner: Mutex<HubInner>,
    shutting_down: AtomicBool,
}

impl BroadcastHub {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(HubInner {
                subscribers: HashMap::new(),
                next_id: 0,
                latest: None,
            }),
            shutting_down: AtomicBool::new(false),
        }
    }

    /// Register a subscriber.  `(handle, latest snapshot if any)`.
    pub fn subscribe(&self) -> (Subscriber, Option<Arc<WorldSnapshot>>) {
        let mut inner = self.inner.lock().expect("hub mutex poisoned");
        let id = inner.next_id;
        inner.next_id += 1;
        let mailbox = Arc::new(Mailbox::new());
        inner.subscribers.insert(id, Arc::clone(&mailbox));
        debug!(subscriber = id, total = inner.subscribers.len(), "subscriber joined");
        (Subscriber { id, mailbox }, inner.latest.clone())
    }

    pub fn unsubscribe(&self, id: u64) {
        let mut inner = self.inner.lock().expect("hub mutex poisoned");
        if inner.subscribers.remove(&id).is_some() {
            debug!(subscriber = id, total = inner.subscribers.len(), "subscriber left");
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.lock().expect("hub mutex poisoned").subscribers.len()
    }

    /// Queue an observability trace for every subscriber.
    pub fn publish_trace(&self, trace: LlmTrace) {
        let trace = Arc::new(trace);
        let inner = self.inner.lock().expect("hub mutex poisoned");
        for mailbox in inner.subscribers.values() {
            mailbox.push(MailItem::Trace(Arc::clone(&trace)));
        }
    }

    /// Flag shutdown and close every mailbox; subscriber tasks send a final
    /// error frame and disconnect.
    pub fn shutdown(&self) {
        self.shutting_down.store(true, Ordering::SeqCst);
        let inner = self.inner.lock().expect("hub mutex poisoned");
        for mailbox in inner.subscribers.values() {
            mailbox.close();
        }
    }

    pub fn is_shutting_down(&self) -> bool {
        self.shutting_down.load(Ordering::SeqCst)
    }
}

impl Default for BroadcastHub {
    fn default() -> Self {
        Self::new()
    }
}

impl SnapshotSink for BroadcastHub {
    fn publish(&self, snapshot: Arc<WorldSnapshot>) {
        let mut inner = self.inner.lock().expect("hub mutex poisoned");
        for mailbox in inner.subscribers.values() {
            mailbox.push(MailItem::World(Arc::clone(&snapshot)));
        }
        inner.latest = Some(snapshot);
    }
}
