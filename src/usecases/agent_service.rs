//! Agent Service - Single-owner Message Loop
//!
//! Serializes every `add_order` and price tick through one mpsc queue
//! so the agent's book is only ever touched by one task:
//! - No order is evaluated by two ticks at once
//! - Pruning is atomic with respect to scans
//! - Order registration never races an in-progress tick
//!
//! Callers hold a cloneable `AgentHandle`; each call carries a oneshot
//! reply channel.

use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

use crate::domain::errors::ValidationError;
use crate::domain::order::{LimitOrder, OrderId, TradeSide};
use crate::ports::execution::ExecutionPort;

use super::limit_order_agent::{LimitOrderAgent, TickReport};

/// Errors surfaced through an `AgentHandle`.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AgentServiceError {
  /// The message loop has exited.
  #[error("agent service has stopped")]
  Stopped,
  /// The agent rejected the input.
  #[error(transparent)]
  Validation(#[from] ValidationError),
}

/// Requests processed by the message loop.
enum Command {
  AddOrder {
    side: TradeSide,
    instrument_id: String,
    quantity: i64,
    limit_price: f64,
    reply: oneshot::Sender<Result<OrderId, ValidationError>>,
  },
  PriceTick {
    instrument_id: String,
    price: f64,
    reply: oneshot::Sender<Result<TickReport, ValidationError>>,
  },
  PendingOrders {
    reply: oneshot::Sender<Vec<LimitOrder>>,
  },
}

/// Cloneable front-end to a running agent service.
#[derive(Debug, Clone)]
pub struct AgentHandle {
  commands: mpsc::Sender<Command>,
  pending_rx: watch::Receiver<usize>,
}

impl std::fmt::Debug for Command {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      Self::AddOrder { instrument_id, .. } => write!(f, "AddOrder({instrument_id})"),
      Self::PriceTick { instrument_id, price, .. } => {
        write!(f, "PriceTick({instrument_id}, {price})")
      }
      Self::PendingOrders { .. } => write!(f, "PendingOrders"),
    }
  }
}

impl AgentHandle {
  /// Register a limit order with the owned agent.
  ///
  /// # Errors
  /// `Validation` if the agent rejects the order, `Stopped` if the loop
  /// has exited.
  pub async fn add_order(
    &self,
    side: TradeSide,
    instrument_id: impl Into<String>,
    quantity: i64,
    limit_price: f64,
  ) -> Result<OrderId, AgentServiceError> {
    let (reply, rx) = oneshot::channel();
    self
      .send(Command::AddOrder {
        side,
        instrument_id: instrument_id.into(),
        quantity,
        limit_price,
        reply,
      })
      .await?;
    Ok(rx.await.map_err(|_| AgentServiceError::Stopped)??)
  }

  /// Deliver a price tick and wait for it to be fully processed.
  ///
  /// # Errors
  /// `Validation` for a malformed tick, `Stopped` if the loop has exited.
  pub async fn price_tick(
    &self,
    instrument_id: impl Into<String>,
    price: f64,
  ) -> Result<TickReport, AgentServiceError> {
    let (reply, rx) = oneshot::channel();
    self
      .send(Command::PriceTick {
        instrument_id: instrument_id.into(),
        price,
        reply,
      })
      .await?;
    Ok(rx.await.map_err(|_| AgentServiceError::Stopped)??)
  }

  /// Snapshot of the agent's pending orders.
  ///
  /// # Errors
  /// `Stopped` if the loop has exited.
  pub async fn pending_orders(&self) -> Result<Vec<LimitOrder>, AgentServiceError> {
    let (reply, rx) = oneshot::channel();
    self.send(Command::PendingOrders { reply }).await?;
    rx.await.map_err(|_| AgentServiceError::Stopped)
  }

  /// Book size, republished by the service after every command.
  pub fn watch_pending(&self) -> watch::Receiver<usize> {
    self.pending_rx.clone()
  }

  async fn send(&self, command: Command) -> Result<(), AgentServiceError> {
    self
      .commands
      .send(command)
      .await
      .map_err(|_| AgentServiceError::Stopped)
  }
}

/// Owns a `LimitOrderAgent` inside a dedicated tokio task.
pub struct AgentService<E: ExecutionPort> {
  agent: LimitOrderAgent<E>,
  commands_rx: mpsc::Receiver<Command>,
  pending_tx: watch::Sender<usize>,
  shutdown_rx: broadcast::Receiver<()>,
}

impl<E: ExecutionPort> AgentService<E> {
  /// Move `agent` into a new task and return a handle to it.
  ///
  /// The loop exits on the shutdown signal or once every handle is
  /// dropped. Dropping the shutdown sender is not a shutdown. The join
  /// handle yields the agent back so callers can inspect what is still
  /// pending.
  pub fn spawn(
    agent: LimitOrderAgent<E>,
    capacity: usize,
    shutdown_rx: broadcast::Receiver<()>,
  ) -> (AgentHandle, JoinHandle<LimitOrderAgent<E>>) {
    let (commands, commands_rx) = mpsc::channel(capacity.max(1));
    let (pending_tx, pending_rx) = watch::channel(agent.pending_count());
    let service = Self {
      agent,
      commands_rx,
      pending_tx,
      shutdown_rx,
    };
    let task = tokio::spawn(service.run());
    (AgentHandle { commands, pending_rx }, task)
  }

  #[instrument(skip(self), name = "agent_service")]
  async fn run(mut self) -> LimitOrderAgent<E> {
    info!(pending = self.agent.pending_count(), "Agent service started");
    let mut shutdown_open = true;

    loop {
      tokio::select! {
        biased;
        signal = self.shutdown_rx.recv(), if shutdown_open => {
          if let Err(broadcast::error::RecvError::Closed) = signal {
            debug!("Shutdown sender dropped, running until handles close");
            shutdown_open = false;
            continue;
          }
          info!("Agent service received shutdown signal");
          break;
        }
        command = self.commands_rx.recv() => {
          match command {
            Some(command) => {
              self.handle(command).await;
              self.pending_tx.send_replace(self.agent.pending_count());
            }
            None => {
              info!("All agent handles dropped");
              break;
            }
          }
        }
      }
    }

    info!(pending = self.agent.pending_count(), "Agent service stopped");
    self.agent
  }

  async fn handle(&mut self, command: Command) {
    debug!(?command, "Handling command");
    match command {
      Command::AddOrder {
        side,
        instrument_id,
        quantity,
        limit_price,
        reply,
      } => {
        let result = self.agent.add_order(side, &instrument_id, quantity, limit_price);
        if let Err(e) = &result {
          warn!(error = %e, instrument = %instrument_id, "Order rejected");
        }
        let _ = reply.send(result);
      }
      Command::PriceTick {
        instrument_id,
        price,
        reply,
      } => {
        let result = self.agent.on_price_tick(&instrument_id, price).await;
        if let Err(e) = &result {
          warn!(error = %e, instrument = %instrument_id, "Tick rejected");
        }
        let _ = reply.send(result);
      }
      Command::PendingOrders { reply } => {
        let _ = reply.send(self.agent.pending_orders());
      }
    }
  }
}
