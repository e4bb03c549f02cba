//! Limit Order Agent — Entry Point
//!
//! Wires the agent to a paper venue and a stdin tick feed. Runs until
//! input ends or SIGINT.
//!
//! Wiring sequence:
//! 1. Load config.toml (path from argv[1]) + validate
//! 2. Init tracing (JSON structured logging)
//! 3. Create PaperExecutor (implements ExecutionPort)
//! 4. Create LimitOrderAgent and register seed orders
//! 5. Spawn audit log + metrics tasks on the event stream
//! 6. Spawn AgentService (single-owner message loop)
//! 7. Spawn LineTickFeed on stdin
//! 8. Wait for EOF or SIGINT → graceful shutdown

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::io::BufReader;
use tokio::signal;
use tokio::sync::broadcast;
use tracing::{error, info, warn};

use limit_order_agent::adapters::audit::EventLog;
use limit_order_agent::adapters::execution::PaperExecutor;
use limit_order_agent::adapters::feeds::LineTickFeed;
use limit_order_agent::adapters::metrics::AgentMetrics;
use limit_order_agent::config;
use limit_order_agent::usecases::{AgentService, LimitOrderAgent};

#[tokio::main]
async fn main() -> Result<()> {
    // ── 1. Load configuration ───────────────────────────────
    let config_path = std::env::args().nth(1).unwrap_or_else(|| "config.toml".to_string());
    let config = config::loader::load_config(&config_path)
        .context("Failed to load configuration")?;

    // ── 2. Initialize structured JSON logging ───────────────
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.agent.log_level)),
        )
        .json()
        .init();

    info!(
        name = %config.agent.name,
        version = env!("CARGO_PKG_VERSION"),
        seed_orders = config.orders.len(),
        "Starting limit order agent"
    );

    // ── 3. Shutdown signal channel ──────────────────────────
    let (shutdown_tx, _shutdown_rx) = broadcast::channel::<()>(1);

    // ── 4. Paper venue ──────────────────────────────────────
    let executor = Arc::new(PaperExecutor::from_config(&config.paper));

    // ── 5. Agent + seed orders ──────────────────────────────
    let mut agent = LimitOrderAgent::with_event_capacity(
        Arc::clone(&executor),
        config.agent.event_channel_capacity,
    );
    if let Some(timeout) = config.agent.execution_timeout() {
        agent = agent.with_execution_timeout(timeout);
    }
    for order in &config.orders {
        agent
            .add_order_str(&order.action, &order.instrument_id, order.quantity, order.limit_price)
            .with_context(|| format!("Failed to register seed order for {}", order.instrument_id))?;
    }

    let mut tasks = Vec::new();

    // ── 6. Audit log ────────────────────────────────────────
    if config.audit.enabled {
        let log = EventLog::new(&config.audit.data_dir)
            .await
            .context("Failed to open audit log")?;
        let events_rx = agent.subscribe();
        let shutdown_rx = shutdown_tx.subscribe();
        tasks.push(tokio::spawn(async move {
            if let Err(e) = log.run(events_rx, shutdown_rx).await {
                error!(error = %e, "Audit log task failed");
            }
        }));
    }

    // ── 7. Metrics (subscribed before the agent moves) ──────
    let metrics = if config.metrics.enabled {
        let metrics = Arc::new(AgentMetrics::new().context("Failed to create metrics")?);
        Some((metrics, agent.subscribe()))
    } else {
        None
    };

    // ── 8. Agent service ────────────────────────────────────
    let (handle, agent_task) = AgentService::spawn(
        agent,
        config.agent.command_channel_capacity,
        shutdown_tx.subscribe(),
    );

    if let Some((metrics, events_rx)) = metrics {
        tasks.push(tokio::spawn(Arc::clone(&metrics).track(
            events_rx,
            handle.watch_pending(),
            shutdown_tx.subscribe(),
        )));

        let bind = config.metrics.bind_address.clone();
        let shutdown_rx = shutdown_tx.subscribe();
        tasks.push(tokio::spawn(async move {
            if let Err(e) = metrics.serve(bind, shutdown_rx).await {
                error!(error = %e, "Metrics server failed");
            }
        }));
    }

    // ── 9. Stdin tick feed ──────────────────────────────────
    let feed = LineTickFeed::new(BufReader::new(tokio::io::stdin()), handle);
    let mut feed_task = tokio::spawn(feed.run(shutdown_tx.subscribe()));

    info!("All tasks spawned — reading ticks from stdin");

    // ── 10. Wait for end of input or SIGINT ─────────────────
    tokio::select! {
        _ = signal::ctrl_c() => {
            info!("SIGINT received, initiating graceful shutdown");
        }
        result = &mut feed_task => {
            match result {
                Ok(Ok(delivered)) => info!(delivered, "Tick feed finished"),
                Ok(Err(e)) => warn!(error = %e, "Tick feed failed"),
                Err(e) => error!(error = %e, "Tick feed task panicked"),
            }
        }
    }

    // ── Graceful shutdown ───────────────────────────────────
    let _ = shutdown_tx.send(());

    match tokio::time::timeout(Duration::from_secs(10), agent_task).await {
        Ok(Ok(agent)) => {
            let pending = agent.pending_orders();
            info!(
                pending = pending.len(),
                fills = executor.fills().len(),
                "Agent stopped; pending orders are not persisted"
            );
            for order in pending {
                info!(
                    order_id = %order.id,
                    side = %order.side,
                    instrument = %order.instrument_id,
                    quantity = order.quantity,
                    limit_price = order.limit_price,
                    "Order left pending"
                );
            }
        }
        Ok(Err(e)) => error!(error = %e, "Agent task panicked"),
        Err(_) => warn!("Agent did not stop within 10s"),
    }

    for task in tasks {
        let _ = tokio::time::timeout(Duration::from_secs(5), task).await;
    }

    info!("Shutdown complete");
    Ok(())
}
