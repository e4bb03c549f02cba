//! Limit Order Agent - Tick-driven Matching and Execution
//!
//! Owns the pending order book and reacts to price ticks:
//! 1. Scan pending orders for the tick's instrument in insertion order
//! 2. Dispatch every matching order to the execution port
//! 3. Emit one execution event per matched order
//! 4. Prune successfully executed orders in a single compaction
//!
//! Execution failures are isolated per order: the order stays pending
//! and the scan continues.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tracing::{debug, info, instrument, warn};

use crate::domain::book::PendingOrderBook;
use crate::domain::errors::{ExecutionError, ValidationError};
use crate::domain::events::ExecutionEvent;
use crate::domain::order::{
  validate_instrument, validate_price, LimitOrder, OrderId, OrderRequest, TradeSide,
};
use crate::ports::execution::ExecutionPort;

/// Default capacity of the execution event channel.
pub const DEFAULT_EVENT_CAPACITY: usize = 4096;

/// Outcome of a single tick.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickReport {
  /// Orders for the tick's instrument that were checked.
  pub evaluated: usize,
  /// Events emitted, in dispatch order.
  pub events: Vec<ExecutionEvent>,
}

impl TickReport {
  /// Ids of orders that executed and left the book.
  pub fn executed(&self) -> Vec<OrderId> {
    self
      .events
      .iter()
      .filter(|e| e.is_executed())
      .map(ExecutionEvent::order_id)
      .collect()
  }

  /// Ids of orders whose execution failed and remain pending.
  pub fn failed(&self) -> Vec<OrderId> {
    self
      .events
      .iter()
      .filter(|e| !e.is_executed())
      .map(ExecutionEvent::order_id)
      .collect()
  }
}

/// Holds pending limit orders and executes them on matching ticks.
pub struct LimitOrderAgent<E: ExecutionPort> {
  /// Execution port.
  execution: Arc<E>,
  /// Orders awaiting a matching tick.
  book: PendingOrderBook,
  /// Structured notification stream.
  events_tx: broadcast::Sender<ExecutionEvent>,
  /// Optional bound on each port call.
  execution_timeout: Option<Duration>,
}

impl<E: ExecutionPort> LimitOrderAgent<E> {
  /// Create an agent with an empty book and no port-call bound.
  pub fn new(execution: Arc<E>) -> Self {
    Self::with_event_capacity(execution, DEFAULT_EVENT_CAPACITY)
  }

  /// Create an agent with a specific event channel capacity.
  pub fn with_event_capacity(execution: Arc<E>, capacity: usize) -> Self {
    let (events_tx, _) = broadcast::channel(capacity.max(1));
    Self {
      execution,
      book: PendingOrderBook::new(),
      events_tx,
      execution_timeout: None,
    }
  }

  /// Bound every port call; an elapsed bound counts as an execution failure.
  #[must_use]
  pub fn with_execution_timeout(mut self, timeout: Duration) -> Self {
    self.execution_timeout = Some(timeout);
    self
  }

  /// Subscribe to execution events.
  pub fn subscribe(&self) -> broadcast::Receiver<ExecutionEvent> {
    self.events_tx.subscribe()
  }

  /// Register a new limit order.
  ///
  /// Never touches the execution port, even if the order would match
  /// the last seen price; it is only evaluated on the next tick.
  ///
  /// # Errors
  /// Returns `ValidationError` for an empty instrument, non-positive
  /// quantity, or non-finite price. Nothing is added in that case.
  #[instrument(skip(self))]
  pub fn add_order(
    &mut self,
    side: TradeSide,
    instrument_id: &str,
    quantity: i64,
    limit_price: f64,
  ) -> Result<OrderId, ValidationError> {
    let request = OrderRequest::new(side, instrument_id, quantity, limit_price)?;
    let id = self.book.insert(request);

    info!(
      order_id = %id,
      side = %side,
      quantity,
      limit_price,
      pending = self.book.len(),
      "Limit order added"
    );

    Ok(id)
  }

  /// Register a limit order from a textual action ("buy" / "sell").
  ///
  /// # Errors
  /// Returns `ValidationError::UnknownAction` for any other action, plus
  /// everything `add_order` rejects.
  pub fn add_order_str(
    &mut self,
    action: &str,
    instrument_id: &str,
    quantity: i64,
    limit_price: f64,
  ) -> Result<OrderId, ValidationError> {
    let side: TradeSide = action.parse()?;
    self.add_order(side, instrument_id, quantity, limit_price)
  }

  /// React to a new price for one instrument.
  ///
  /// Matching orders are dispatched strictly in insertion order. Port
  /// failures never escape: the order is kept and a `Failed` event is
  /// emitted instead.
  ///
  /// # Errors
  /// Returns `ValidationError` for an empty instrument or non-finite
  /// price; the book is not scanned in that case.
  #[instrument(skip(self, instrument_id), fields(instrument = %instrument_id))]
  pub async fn on_price_tick(
    &mut self,
    instrument_id: &str,
    price: f64,
  ) -> Result<TickReport, ValidationError> {
    validate_instrument(instrument_id)?;
    validate_price(price)?;

    // Snapshot candidates first; the book is only mutated after the scan.
    let candidates: Vec<LimitOrder> = self.book.for_instrument(instrument_id).cloned().collect();

    let mut report = TickReport {
      evaluated: candidates.len(),
      events: Vec::new(),
    };

    if candidates.is_empty() {
      debug!(price, "No pending orders for instrument");
      return Ok(report);
    }

    let mut executed = Vec::new();

    for order in candidates.iter().filter(|o| o.matches(price)) {
      let event = match self.dispatch(order).await {
        Ok(()) => {
          executed.push(order.id);
          info!(
            order_id = %order.id,
            side = %order.side,
            quantity = order.quantity,
            price,
            "Executed order"
          );
          ExecutionEvent::Executed {
            order_id: order.id,
            instrument_id: order.instrument_id.clone(),
            quantity: order.quantity,
            side: order.side,
            executed_price: price,
          }
        }
        Err(e) => {
          warn!(
            order_id = %order.id,
            side = %order.side,
            price,
            error = %e,
            "Failed to execute order, keeping it pending"
          );
          ExecutionEvent::Failed {
            order_id: order.id,
            instrument_id: order.instrument_id.clone(),
            quantity: order.quantity,
            side: order.side,
            attempted_price: price,
            reason: e.to_string(),
          }
        }
      };

      // No subscribers is fine; the report still carries the event.
      let _ = self.events_tx.send(event.clone());
      report.events.push(event);
    }

    let removed = self.book.remove_all(&executed);

    debug!(
      evaluated = report.evaluated,
      matched = report.events.len(),
      removed,
      pending = self.book.len(),
      "Tick processed"
    );

    Ok(report)
  }

  /// Snapshot of pending orders in insertion order.
  pub fn pending_orders(&self) -> Vec<LimitOrder> {
    self.book.iter().cloned().collect()
  }

  /// Number of pending orders.
  pub fn pending_count(&self) -> usize {
    self.book.len()
  }

  /// Look up a pending order by id.
  pub fn get_order(&self, id: OrderId) -> Option<&LimitOrder> {
    self.book.get(id)
  }

  /// Call the port for one order, applying the timeout if configured.
  async fn dispatch(&self, order: &LimitOrder) -> Result<(), ExecutionError> {
    let call = async {
      match order.side {
        TradeSide::Buy => self.execution.buy(&order.instrument_id, order.quantity).await,
        TradeSide::Sell => self.execution.sell(&order.instrument_id, order.quantity).await,
      }
    };

    match self.execution_timeout {
      Some(limit) => tokio::time::timeout(limit, call).await.unwrap_or_else(|_| {
        Err(ExecutionError::Timeout {
          after_ms: u64::try_from(limit.as_millis()).unwrap_or(u64::MAX),
        })
      }),
      None => call.await,
    }
  }
}

#[cfg(test)]
mod tests {
  use std::sync::Mutex;

  use async_trait::async_trait;

  use super::*;

  /// Records calls and fails for instruments listed in `failing`.
  #[derive(Default)]
  struct RecordingPort {
    calls: Mutex<Vec<(TradeSide, String, u64)>>,
    failing: Vec<String>,
  }

  impl RecordingPort {
    fn failing(instruments: &[&str]) -> Self {
      Self {
        calls: Mutex::new(Vec::new()),
        failing: instruments.iter().map(ToString::to_string).collect(),
      }
    }

    fn record(
      &self,
      side: TradeSide,
      instrument_id: &str,
      quantity: u64,
    ) -> Result<(), ExecutionError> {
      self
        .calls
        .lock()
        .unwrap()
        .push((side, instrument_id.to_string(), quantity));
      if self.failing.iter().any(|f| f == instrument_id) {
        Err(ExecutionError::rejected("venue unavailable"))
      } else {
        Ok(())
      }
    }

    fn calls(&self) -> Vec<(TradeSide, String, u64)> {
      self.calls.lock().unwrap().clone()
    }
  }

  #[async_trait]
  impl ExecutionPort for RecordingPort {
    async fn buy(&self, instrument_id: &str, quantity: u64) -> Result<(), ExecutionError> {
      self.record(TradeSide::Buy, instrument_id, quantity)
    }

    async fn sell(&self, instrument_id: &str, quantity: u64) -> Result<(), ExecutionError> {
      self.record(TradeSide::Sell, instrument_id, quantity)
    }
  }

  /// Never completes a trade.
  struct HangingPort;

  #[async_trait]
  impl ExecutionPort for HangingPort {
    async fn buy(&self, _instrument_id: &str, _quantity: u64) -> Result<(), ExecutionError> {
      std::future::pending().await
    }

    async fn sell(&self, _instrument_id: &str, _quantity: u64) -> Result<(), ExecutionError> {
      std::future::pending().await
    }
  }

  #[tokio::test]
  async fn test_buy_executes_and_leaves_book() {
    let port = Arc::new(RecordingPort::default());
    let mut agent = LimitOrderAgent::new(Arc::clone(&port));
    let id = agent.add_order(TradeSide::Buy, "IBM", 1000, 100.0).unwrap();

    let report = agent.on_price_tick("IBM", 99.0).await.unwrap();

    assert_eq!(port.calls(), vec![(TradeSide::Buy, "IBM".to_string(), 1000)]);
    assert_eq!(report.executed(), vec![id]);
    assert_eq!(agent.pending_count(), 0);
  }

  #[tokio::test]
  async fn test_add_order_does_not_touch_port() {
    let port = Arc::new(RecordingPort::default());
    let mut agent = LimitOrderAgent::new(Arc::clone(&port));
    agent.add_order(TradeSide::Buy, "IBM", 1000, 100.0).unwrap();
    agent.add_order_str("sell", "IBM", 10, 1.0).unwrap();
    assert!(port.calls().is_empty());
    assert_eq!(agent.pending_count(), 2);
  }

  #[tokio::test]
  async fn test_validation_rejects_leave_book_untouched() {
    let port = Arc::new(RecordingPort::default());
    let mut agent = LimitOrderAgent::new(Arc::clone(&port));

    assert_eq!(
      agent.add_order(TradeSide::Buy, "IBM", 0, 100.0),
      Err(ValidationError::NonPositiveQuantity(0))
    );
    assert!(matches!(
      agent.add_order(TradeSide::Buy, "IBM", 10, f64::NAN),
      Err(ValidationError::NonFinitePrice(_))
    ));
    assert_eq!(
      agent.add_order_str("hold", "IBM", 10, 100.0),
      Err(ValidationError::UnknownAction("hold".to_string()))
    );
    assert_eq!(agent.pending_count(), 0);
  }

  #[tokio::test]
  async fn test_non_finite_tick_rejected_without_dispatch() {
    let port = Arc::new(RecordingPort::default());
    let mut agent = LimitOrderAgent::new(Arc::clone(&port));
    agent.add_order(TradeSide::Buy, "IBM", 1000, 100.0).unwrap();

    let result = agent.on_price_tick("IBM", f64::NEG_INFINITY).await;
    assert!(matches!(result, Err(ValidationError::NonFinitePrice(_))));
    assert_eq!(
      agent.on_price_tick("", 99.0).await,
      Err(ValidationError::EmptyInstrument)
    );
    assert!(port.calls().is_empty());
    assert_eq!(agent.pending_count(), 1);
  }

  #[tokio::test]
  async fn test_tick_for_unknown_instrument_is_noop() {
    let port = Arc::new(RecordingPort::default());
    let mut agent = LimitOrderAgent::new(Arc::clone(&port));
    agent.add_order(TradeSide::Buy, "AAPL", 10, 1_000.0).unwrap();

    let report = agent.on_price_tick("IBM", 1.0).await.unwrap();
    assert_eq!(report, TickReport::default());
    assert!(port.calls().is_empty());
    assert_eq!(agent.pending_count(), 1);
  }

  #[tokio::test]
  async fn test_failure_keeps_order_and_continues_scan() {
    let port = Arc::new(RecordingPort::failing(&["IBM"]));
    let mut agent = LimitOrderAgent::new(Arc::clone(&port));
    let first = agent.add_order(TradeSide::Buy, "IBM", 1000, 100.0).unwrap();
    let second = agent.add_order(TradeSide::Sell, "IBM", 50, 90.0).unwrap();

    let report = agent.on_price_tick("IBM", 99.0).await.unwrap();

    assert_eq!(port.calls().len(), 2);
    assert_eq!(report.failed(), vec![first, second]);
    assert!(report.executed().is_empty());
    let ids: Vec<_> = agent.pending_orders().iter().map(|o| o.id).collect();
    assert_eq!(ids, vec![first, second]);
  }

  #[tokio::test]
  async fn test_events_broadcast_to_subscribers() {
    let port = Arc::new(RecordingPort::default());
    let mut agent = LimitOrderAgent::new(Arc::clone(&port));
    let mut rx = agent.subscribe();
    let id = agent.add_order(TradeSide::Sell, "IBM", 500, 150.0).unwrap();

    agent.on_price_tick("IBM", 151.0).await.unwrap();

    let event = rx.recv().await.unwrap();
    assert_eq!(
      event,
      ExecutionEvent::Executed {
        order_id: id,
        instrument_id: "IBM".to_string(),
        quantity: 500,
        side: TradeSide::Sell,
        executed_price: 151.0,
      }
    );
  }

  #[tokio::test]
  async fn test_timeout_counts_as_failure() {
    let mut agent = LimitOrderAgent::new(Arc::new(HangingPort))
      .with_execution_timeout(Duration::from_millis(25));
    let id = agent.add_order(TradeSide::Buy, "IBM", 1000, 100.0).unwrap();

    let report = agent.on_price_tick("IBM", 99.0).await.unwrap();

    assert_eq!(report.failed(), vec![id]);
    match &report.events[0] {
      ExecutionEvent::Failed { reason, .. } => {
        assert_eq!(reason, "execution timed out after 25ms");
      }
      other => panic!("expected failure, got {other:?}"),
    }
    assert!(agent.get_order(id).is_some());
  }
}
