//! The serialized reasoning queue.
//!
//! # Contract
//!
//! - Exactly one task executes at a time; ordering is FIFO by enqueue time.
//! - Every task carries a wall-clock deadline covering both queue wait and
//!   execution.  Expiry resolves the handle with [`MindError::Timeout`] and
//!   aborts any in-flight HTTP by dropping its future.
//! - [`ReasoningQueue::clear`] resolves everything pending and in flight
//!   with [`MindError::Cancelled`].
//! - Completion statistics accumulate in a sliding 60-second window and
//!   feed the *thinking coefficient* that scales agent cooldowns.
//!
//! # Locking
//!
//! One internal mutex protects the deque, the in-flight flag, and the stats
//! window; it is only ever held for O(1) bookkeeping, never across an await.

use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};
use std::time::{Duration, Instant};

use futures::future::BoxFuture;
use tokio::sync::{oneshot, watch, Notify};
use tracing::{debug, error};

use crate::{ChatOutcome, MindError};

/// Sliding window over which rates and averages are computed.
const STATS_WINDOW: Duration = Duration::from_secs(60);

/// Bounds of the thinking coefficient.
const COEFF_MIN: f32 = 0.25;
const COEFF_MAX: f32 = 2.0;

/// The work a request performs once dispatched.  Produced lazily so queued
/// requests hold no connections.
pub type TaskFn = Box<dyn FnOnce() -> BoxFuture<'static, Result<ChatOutcome, MindError>> + Send>;

// ── Handle ────────────────────────────────────────────────────────────────────

/// Resolves with the endpoint text or one of the failure kinds.  Dropping
/// the handle abandons the result without cancelling the request.
pub struct ReasonHandle {
    rx: oneshot::Receiver<Result<ChatOutcome, MindError>>,
}

impl Future for ReasonHandle {
    type Output = Result<ChatOutcome, MindError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match Pin::new(&mut self.rx).poll(cx) {
            Poll::Ready(Ok(res)) => Poll::Ready(res),
            // Sender dropped without a verdict — the queue died; treat as a
            // cancellation.
            Poll::Ready(Err(_)) => Poll::Ready(Err(MindError::Cancelled)),
            Poll::Pending => Poll::Pending,
        }
    }
}

// ── Stats ─────────────────────────────────────────────────────────────────────

/// A point-in-time view of queue health, embedded in world snapshots.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueStats {
    pub queue_depth: usize,
    pub in_flight: usize,
    pub avg_latency_ms: f64,
    pub tokens_per_second: f64,
    pub success_rate: f64,
    pub failure_rate: f64,
}

struct Completion {
    at: Instant,
    success: bool,
    latency_ms: u64,
    tokens: u64,
}

// ── Internal state ────────────────────────────────────────────────────────────

struct PendingRequest {
    enqueued_at: Instant,
    deadline: Instant,
    task: TaskFn,
    tx: oneshot::Sender<Result<ChatOutcome, MindError>>,
}

struct QueueState {
    pending: VecDeque<PendingRequest>,
    in_flight: bool,
    completions: VecDeque<Completion>,
    total_prompt_tokens: u64,
    total_completion_tokens: u64,
}

impl QueueState {
    fn add_tokens(&mut self, prompt: u32, completion: u32) {
        self.total_prompt_tokens += prompt as u64;
        self.total_completion_tokens += completion as u64;
    }

    fn prune(&mut self, now: Instant) {
        while let Some(front) = self.completions.front() {
            if now.duration_since(front.at) > STATS_WINDOW {
                self.completions.pop_front();
            } else {
                break;
            }
        }
    }

    fn record(&mut self, success: bool, latency_ms: u64, tokens: u64) {
        let now = Instant::now();
        self.completions.push_back(Completion { at: now, success, latency_ms, tokens });
        self.prune(now);
    }

    fn stats(&mut self) -> QueueStats {
        let now = Instant::now();
        self.prune(now);
        let n = self.completions.len();
        let (mut ok, mut latency_sum, mut tokens) = (0usize, 0u64, 0u64);
        for c in &self.completions {
            if c.success {
                ok += 1;
            }
            latency_sum += c.latency_ms;
            tokens += c.tokens;
        }
        let success_rate = if n == 0 { 1.0 } else { ok as f64 / n as f64 };
        QueueStats {
            queue_depth: self.pending.len(),
            in_flight: usize::from(self.in_flight),
            avg_latency_ms: if n == 0 { 0.0 } else { latency_sum as f64 / n as f64 },
            tokens_per_second: tokens as f64 / STATS_WINDOW.as_secs_f64(),
            success_rate,
            failure_rate: 1.0 - success_rate,
        }
    }
}

struct QueueInner {
    state: Mutex<QueueState>,
    /// Wakes the worker when a request lands in an empty queue.
    notify: Notify,
    /// Bumped by `clear()`; the worker aborts its in-flight task when the
    /// observed generation changes.
    generation: watch::Sender<u64>,
    default_deadline: Duration,
}

// ── ReasoningQueue ────────────────────────────────────────────────────────────

/// Handle to the queue.  Clone freely — all clones share one worker.
#[derive(Clone)]
pub struct ReasoningQueue {
    inner: Arc<QueueInner>,
}

impl ReasoningQueue {
    /// Create the queue and spawn its worker task on the current runtime.
    pub fn start(default_deadline: Duration) -> Self {
        let (generation, gen_rx) = watch::channel(0u64);
        let inner = Arc::new(QueueInner {
            state: Mutex::new(QueueState {
                pending: VecDeque::new(),
                in_flight: false,
                completions: VecDeque::new(),
                total_prompt_tokens: 0,
                total_completion_tokens: 0,
            }),
            notify: Notify::new(),
            generation,
            default_deadline,
        });
        tokio::spawn(worker(Arc::clone(&inner), gen_rx));
        Self { inner }
    }

    /// Append a request.  `deadline` defaults to the queue-wide setting.
    pub fn enqueue(&self, task: TaskFn, deadline: Option<Duration>) -> ReasonHandle {
        let (tx, rx) = oneshot::channel();
        let now = Instant::now();
        let req = PendingRequest {
            enqueued_at: now,
            deadline: now + deadline.unwrap_or(self.inner.default_deadline),
            task,
            tx,
        };
        self.inner
            .state
            .lock()
            .expect("queue mutex poisoned")
            .pending
            .push_back(req);
        self.inner.notify.notify_one();
        ReasonHandle { rx }
    }

    /// Accumulate token counters.  The worker records usage for every
    /// request it completes — usage reporting belongs to the queue that owns
    /// the request, not to the HTTP client.  This entry point exists for
    /// callers accounting for work done out of band.
    pub fn record_token_usage(&self, prompt: u32, completion: u32) {
        self.inner
            .state
            .lock()
            .expect("queue mutex poisoned")
            .add_tokens(prompt, completion);
    }

    /// `(prompt, completion)` totals since start.
    pub fn token_totals(&self) -> (u64, u64) {
        let state = self.inner.state.lock().expect("queue mutex poisoned");
        (state.total_prompt_tokens, state.total_completion_tokens)
    }

    /// Health over the sliding window.
    pub fn stats(&self) -> QueueStats {
        self.inner.state.lock().expect("queue mutex poisoned").stats()
    }

    /// Spare-capacity scalar in `[0.25, 2.0]`.
    ///
    /// Strictly decreasing in queue depth; approaches the upper bound when
    /// the queue is empty, responses are fast, and failures are absent;
    /// approaches the lower bound under deep queues or dominant failures.
    /// Agent cooldowns divide by this value.
    pub fn thinking_coefficient(&self) -> f32 {
        let stats = self.stats();
        let depth = (stats.queue_depth + stats.in_flight) as f32;
        let depth_term = 2.0 / (1.0 + 0.5 * depth);
        let success_term = 0.25 + 0.75 * stats.success_rate as f32;
        let latency_term = if stats.avg_latency_ms <= 1_000.0 {
            1.0
        } else {
            (1_000.0 / stats.avg_latency_ms) as f32
        };
        (depth_term * success_term * latency_term).clamp(COEFF_MIN, COEFF_MAX)
    }

    /// Cancel everything: waiting requests resolve `Cancelled` immediately
    /// and the in-flight request (if any) is aborted.
    pub fn clear(&self) {
        let drained: Vec<PendingRequest> = {
            let mut state = self.inner.state.lock().expect("queue mutex poisoned");
            state.pending.drain(..).collect()
        };
        for req in drained {
            let _ = req.tx.send(Err(MindError::Cancelled));
        }
        self.inner.generation.send_modify(|g| *g += 1);
        // Wake the worker in case it was idle so it observes the new
        // generation promptly.
        self.inner.notify.notify_one();
    }
}

// ── Worker ────────────────────────────────────────────────────────────────────

async fn worker(inner: Arc<QueueInner>, mut gen_rx: watch::Receiver<u64>) {
    loop {
        // Pop the next request, parking until one arrives.
        let req = loop {
            let popped = {
                let mut state = inner.state.lock().expect("queue mutex poisoned");
                let r = state.pending.pop_front();
                state.in_flight = r.is_some();
                r
            };
            match popped {
                Some(r) => break r,
                None => inner.notify.notified().await,
            }
        };

        let started_gen = *gen_rx.borrow_and_update();
        let now = Instant::now();

        // Deadline may already have expired while the request waited.
        let outcome = if now >= req.deadline {
            debug!("reasoning request expired while queued");
            Err(MindError::Timeout)
        } else {
            let fut = (req.task)();
            tokio::select! {
                res = tokio::time::timeout_at(req.deadline.into(), fut) => {
                    match res {
                        Ok(inner_res) => inner_res,
                        Err(_elapsed) => {
                            debug!("reasoning request timed out in flight");
                            Err(MindError::Timeout)
                        }
                    }
                }
                changed = gen_rx.changed() => {
                    if changed.is_err() {
                        // Queue handle dropped entirely; shut the worker down.
                        let _ = req.tx.send(Err(MindError::Cancelled));
                        return;
                    }
                    Err(MindError::Cancelled)
                }
            }
        };

        // A clear() that raced the completion still counts as cancelled.
        let outcome = if *gen_rx.borrow() != started_gen && outcome.is_ok() {
            Err(MindError::Cancelled)
        } else {
            outcome
        };

        let latency_ms = req.enqueued_at.elapsed().as_millis() as u64;
        match &outcome {
            Ok(out) => {
                let tokens = (out.prompt_tokens + out.completion_tokens) as u64;
                let mut state = inner.state.lock().expect("queue mutex poisoned");
                state.add_tokens(out.prompt_tokens, out.completion_tokens);
                state.record(true, latency_ms, tokens);
                state.in_flight = false;
            }
            Err(MindError::Cancelled) => {
                // Cancellations do not count against the success rate.
                let mut state = inner.state.lock().expect("queue mutex poisoned");
                state.in_flight = false;
            }
            Err(e) => {
                if matches!(e, MindError::Endpoint(_)) {
                    error!(error = %e, "reasoning request failed");
                }
                let mut state = inner.state.lock().expect("queue mutex poisoned");
                state.record(false, latency_ms, 0);
                state.in_flight = false;
            }
        }

        let _ = req.tx.send(outcome);
    }
}
