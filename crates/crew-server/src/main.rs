//! The crewsim server binary.
//!
//! Wiring only: everything stateful is constructed here and handed to the
//! simulation and the broadcast server as explicit dependencies.

mod demo_map;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tokio::sync::watch;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crew_core::SimConfig;
use crew_net::{BroadcastHub, BroadcastServer, HandshakeInfo};
use crew_sim::{SimBuilder, SnapshotSink};

#[derive(Parser, Debug)]
#[command(name = "crew-server", about = "LLM-agent crew simulation server")]
struct Cli {
    /// TOML config file; flags below override its values.
    #[arg(long)]
    config: Option<PathBuf>,

    /// JSON map file.  Defaults to the built-in demo ship.
    #[arg(long)]
    map: Option<PathBuf>,

    #[arg(long)]
    num_agents: Option<usize>,

    #[arg(long)]
    port: Option<u16>,

    /// Base URL of the chat-completions endpoint.
    #[arg(long)]
    endpoint: Option<String>,

    #[arg(long)]
    seed: Option<u64>,

    /// Emit llm-trace frames to subscribers.
    #[arg(long, default_value_t = true)]
    traces: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let cli = Cli::parse();

    // ── Configuration: file, then flag overrides ──────────────────────────
    let mut config: SimConfig = match &cli.config {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("reading config {}", path.display()))?;
            toml::from_str(&text).with_context(|| format!("parsing {}", path.display()))?
        }
        None => SimConfig::default(),
    };
    if let Some(n) = cli.num_agents {
        config.num_agents = n;
    }
    if let Some(port) = cli.port {
        config.broadcast_port = port;
    }
    if let Some(endpoint) = cli.endpoint {
        config.reasoning_endpoint = endpoint;
    }
    if let Some(seed) = cli.seed {
        config.seed = seed;
    }
    config.validate()?;

    // ── Map ───────────────────────────────────────────────────────────────
    let map = match &cli.map {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("reading map {}", path.display()))?;
            crew_map::load_map_json(&text).with_context(|| format!("parsing {}", path.display()))?
        }
        None => demo_map::build(),
    };

    // ── Wiring ────────────────────────────────────────────────────────────
    let hub = Arc::new(BroadcastHub::new());

    let mut builder = SimBuilder::new(config.clone(), map);
    if cli.traces {
        let (trace_tx, mut trace_rx) = tokio::sync::mpsc::unbounded_channel();
        builder = builder.trace_channel(trace_tx);
        let trace_hub = Arc::clone(&hub);
        tokio::spawn(async move {
            while let Some(trace) = trace_rx.recv().await {
                trace_hub.publish_trace(trace);
            }
        });
    }
    let mut sim = builder.build()?;

    let addr = SocketAddr::from(([0, 0, 0, 0], config.broadcast_port));
    let server = BroadcastServer::bind(
        Arc::clone(&hub),
        HandshakeInfo::new(config.tick_hz, config.num_agents),
        addr,
        &config.broadcast_path,
    )
    .await?;

    let (stop_tx, stop_rx) = watch::channel(false);
    let server_task = tokio::spawn(server.run(stop_rx.clone()));

    let sink: Arc<dyn SnapshotSink> = hub.clone();
    let sim_stop = stop_rx.clone();
    let sim_task = tokio::spawn(async move {
        sim.run(sink, sim_stop).await;
    });

    // ── Shutdown ──────────────────────────────────────────────────────────
    tokio::signal::ctrl_c().await?;
    info!("shutting down");
    let _ = stop_tx.send(true);
    hub.shutdown();
    let _ = sim_task.await;
    let _ = server_task.await;
    Ok(())
}
