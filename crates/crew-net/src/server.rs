//! The WebSocket endpoint and per-subscriber send loop.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::Response;
use axum::routing::get;
use axum::Router;
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crew_sim::{diff_snapshots, WorldSnapshot};

use crate::hub::MailItem;
use crate::{BroadcastHub, Frame, HandshakeInfo, NetError};

/// Heartbeats go out on this cadence — half the staleness contract, so a
/// healthy connection never looks stale to clients.
const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(5);

type WsSender = SplitSink<WebSocket, Message>;
type WsReceiver = SplitStream<WebSocket>;

#[derive(Clone)]
struct AppState {
    hub: Arc<BroadcastHub>,
    info: HandshakeInfo,
}

/// The bound server, ready to accept subscribers.
pub struct BroadcastServer {
    listener: TcpListener,
    router: Router,
    local_addr: SocketAddr,
}

impl BroadcastServer {
    /// Bind `addr` and install the upgrade route at `path`.
    pub async fn bind(
        hub: Arc<BroadcastHub>,
        info: HandshakeInfo,
        addr: SocketAddr,
        path: &str,
    ) -> Result<Self, NetError> {
        let state = AppState { hub, info };
        let router = Router::new().route(path, get(upgrade_handler)).with_state(state);
        let listener = TcpListener::bind(addr).await?;
        let local_addr = listener.local_addr()?;
        info!(%local_addr, path, "broadcast server listening");
        Ok(Self { listener, router, local_addr })
    }

    /// The actual bound address (useful when binding port 0).
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Serve until `stop_rx` flips true (or its sender drops).
    pub async fn run(self, mut stop_rx: watch::Receiver<bool>) -> Result<(), NetError> {
        let shutdown = async move {
            while !*stop_rx.borrow() {
                if stop_rx.changed().await.is_err() {
                    break;
                }
            }
        };
        axum::serve(self.listener, self.router)
            .with_graceful_shutdown(shutdown)
            .await?;
        Ok(())
    }
}

async fn upgrade_handler(State(state): State<AppState>, ws: WebSocketUpgrade) -> Response {
    ws.on_upgrade(move |socket| subscriber_loop(socket, state))
}

// ── Per-subscriber loop ───────────────────────────────────────────────────────

/// Drives one subscriber: handshake, initial snapshot, then deltas,
/// heartbeats, and traces until the socket or the hub goes away.
async fn subscriber_loop(socket: WebSocket, state: AppState) {
    let (sub, latest) = state.hub.subscribe();
    let id = sub.id;
    let (mut sender, receiver) = socket.split();

    let result = drive_subscriber(&mut sender, receiver, &state, &sub, latest).await;
    if let Err(e) = result {
        // SubscriberFatal: drop this subscriber, the simulation carries on.
        debug!(subscriber = id, error = %e, "subscriber dropped");
    }
    state.hub.unsubscribe(id);
    let _ = sender.send(Message::Close(None)).await;
}

async fn drive_subscriber(
    sender: &mut WsSender,
    mut receiver: WsReceiver,
    state: &AppState,
    sub: &crate::Subscriber,
    latest: Option<Arc<WorldSnapshot>>,
) -> Result<(), NetError> {
    let mut baseline: Option<Arc<WorldSnapshot>> = None;
    let mut last_tick = crew_core::Tick::ZERO;

    // 1. Handshake.
    send_frame(sender, &Frame::Handshake(state.info.clone())).await?;

    // 2. Full snapshot — the latest if the simulation has ticked, otherwise
    //    the first one to arrive below.
    if let Some(snapshot) = latest {
        last_tick = snapshot.tick;
        send_frame(sender, &Frame::Snapshot((*snapshot).clone())).await?;
        baseline = Some(snapshot);
    }

    // First heartbeat one interval out — the handshake just proved liveness.
    let mut heartbeat = tokio::time::interval_at(
        tokio::time::Instant::now() + HEARTBEAT_INTERVAL,
        HEARTBEAT_INTERVAL,
    );
    heartbeat.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    // 3. Deltas, heartbeats, traces.
    loop {
        tokio::select! {
            _ = sub.wait() => {
                let (items, mut needs_full, closed) = sub.drain();
                for item in items {
                    match item {
                        MailItem::World(snapshot) => {
                            last_tick = snapshot.tick;
                            let frame = match (&baseline, needs_full) {
                                (Some(base), false) => {
                                    Frame::StateUpdate(diff_snapshots(base, &snapshot))
                                }
                                // No baseline yet, or a dropped delta forced
                                // a resync: upgrade to a full snapshot.
                                _ => Frame::Snapshot((*snapshot).clone()),
                            };
                            needs_full = false;
                            send_frame(sender, &frame).await?;
                            baseline = Some(snapshot);
                        }
                        MailItem::Trace(trace) => {
                            send_frame(sender, &Frame::LlmTrace((*trace).clone())).await?;
                        }
                    }
                }
                if closed {
                    let _ = send_frame(
                        sender,
                        &Frame::Error { message: "server shutting down".into() },
                    )
                    .await;
                    return Ok(());
                }
            }

            _ = heartbeat.tick() => {
                send_frame(
                    sender,
                    &Frame::Heartbeat {
                        tick: last_tick,
                        timestamp: crew_core::time::unix_ms_now(),
                    },
                )
                .await?;
            }

            inbound = receiver.next() => {
                match inbound {
                    Some(Ok(Message::Close(_))) | None => return Ok(()),
                    Some(Ok(msg)) => {
                        // No inbound protocol exists; log and ignore.
                        debug!(subscriber = sub.id, ?msg, "ignoring inbound message");
                    }
                    Some(Err(e)) => {
                        warn!(subscriber = sub.id, error = %e, "subscriber read error");
                        return Ok(());
                    }
                }
            }
        }
    }
}

async fn send_frame(sender: &mut WsSender, frame: &Frame) -> Result<(), NetError> {
    sender
        .send(Message::Text(frame.to_json()))
        .await
        .map_err(|e| NetError::Send(e.to_string()))
}
