//! Prometheus Metrics Registry - Execution Observability
//!
//! Counts executions and failures from the agent's event stream and
//! exposes them on `/metrics` for scraping.

use std::sync::Arc;

use axum::routing::get;
use axum::Router;
use prometheus::{Encoder, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};
use tokio::sync::{broadcast, watch};
use tracing::{info, instrument, warn};

use crate::domain::events::ExecutionEvent;

/// Centralized Prometheus metrics for the agent.
///
/// All metrics follow the naming convention `limit_agent_*`.
pub struct AgentMetrics {
    /// Prometheus registry.
    registry: Registry,
    /// Orders executed, by side.
    pub orders_executed: IntCounterVec,
    /// Execution failures, by side.
    pub execution_failures: IntCounterVec,
    /// Orders currently pending.
    pub pending_orders: IntGauge,
}

impl AgentMetrics {
    /// Create and register all Prometheus metrics.
    ///
    /// # Errors
    /// Fails if a metric definition is invalid or registered twice.
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        let orders_executed = IntCounterVec::new(
            Opts::new("limit_agent_orders_executed_total", "Total orders executed"),
            &["side"],
        )?;

        let execution_failures = IntCounterVec::new(
            Opts::new(
                "limit_agent_execution_failures_total",
                "Total execution attempts that failed and left the order pending",
            ),
            &["side"],
        )?;

        let pending_orders = IntGauge::new(
            "limit_agent_pending_orders",
            "Orders waiting for a matching tick",
        )?;

        registry.register(Box::new(orders_executed.clone()))?;
        registry.register(Box::new(execution_failures.clone()))?;
        registry.register(Box::new(pending_orders.clone()))?;

        Ok(Self {
            registry,
            orders_executed,
            execution_failures,
            pending_orders,
        })
    }

    /// Update counters from one execution event.
    ///
    /// The pending gauge is not derived from events; see `set_pending`.
    pub fn observe(&self, event: &ExecutionEvent) {
        let side = event.side().to_string();
        if event.is_executed() {
            self.orders_executed.with_label_values(&[side.as_str()]).inc();
        } else {
            self.execution_failures.with_label_values(&[side.as_str()]).inc();
        }
    }

    /// Reset the pending gauge to an absolute count.
    pub fn set_pending(&self, pending: usize) {
        self.pending_orders.set(i64::try_from(pending).unwrap_or(i64::MAX));
    }

    /// Render all metrics in the Prometheus text format.
    ///
    /// # Errors
    /// Fails if encoding produces invalid UTF-8 or the encoder errors.
    pub fn render(&self) -> anyhow::Result<String> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }

    /// Feed counters from the event stream until shutdown.
    ///
    /// The pending gauge follows the book size published by the agent
    /// service. On shutdown, buffered events are counted before returning.
    /// Dropping the shutdown sender is not a shutdown.
    #[instrument(skip_all)]
    pub async fn track(
        self: Arc<Self>,
        mut events_rx: broadcast::Receiver<ExecutionEvent>,
        mut pending_rx: watch::Receiver<usize>,
        mut shutdown_rx: broadcast::Receiver<()>,
    ) {
        self.set_pending(*pending_rx.borrow_and_update());
        let mut shutdown_open = true;
        let mut pending_open = true;

        loop {
            tokio::select! {
                biased;
                signal = shutdown_rx.recv(), if shutdown_open => {
                    if let Err(broadcast::error::RecvError::Closed) = signal {
                        shutdown_open = false;
                        continue;
                    }
                    self.drain(&mut events_rx);
                    self.set_pending(*pending_rx.borrow());
                    return;
                }
                changed = pending_rx.changed(), if pending_open => {
                    if changed.is_ok() {
                        self.set_pending(*pending_rx.borrow_and_update());
                    } else {
                        // Service stopped; its last published value stands.
                        pending_open = false;
                    }
                }
                event = events_rx.recv() => match event {
                    Ok(event) => self.observe(&event),
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        warn!(dropped = n, "Metrics tracker lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        self.set_pending(*pending_rx.borrow());
                        return;
                    }
                },
            }
        }
    }

    /// Count every event still buffered in the stream.
    fn drain(&self, events_rx: &mut broadcast::Receiver<ExecutionEvent>) {
        loop {
            match events_rx.try_recv() {
                Ok(event) => self.observe(&event),
                Err(broadcast::error::TryRecvError::Lagged(n)) => {
                    warn!(dropped = n, "Metrics tracker lagged while draining");
                }
                Err(
                    broadcast::error::TryRecvError::Empty
                    | broadcast::error::TryRecvError::Closed,
                ) => return,
            }
        }
    }

    /// Serve Prometheus metrics on the configured bind address.
    ///
    /// # Errors
    /// Fails if the address cannot be bound or the server errors.
    #[instrument(skip(self, shutdown_rx))]
    pub async fn serve(
        self: Arc<Self>,
        bind_address: String,
        mut shutdown_rx: broadcast::Receiver<()>,
    ) -> anyhow::Result<()> {
        let metrics_self = Arc::clone(&self);

        let app = Router::new().route(
            "/metrics",
            get(move || {
                let metrics = Arc::clone(&metrics_self);
                async move { metrics.render().unwrap_or_default() }
            }),
        );

        let listener = tokio::net::TcpListener::bind(&bind_address).await?;
        info!(address = %bind_address, "Prometheus metrics server started");

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown_rx.recv().await;
            })
            .await?;

        Ok(())
    }
}
