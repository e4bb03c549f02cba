//! Execution notifications.
//!
//! One event is emitted per matched order on a tick, success or failure.
//! Non-matching orders produce nothing.

use serde::{Deserialize, Serialize};

use super::order::{OrderId, TradeSide};

/// Structured outcome of dispatching a matched order to the execution port.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ExecutionEvent {
    /// The port completed the trade; the order has left the book.
    Executed {
        order_id: OrderId,
        instrument_id: String,
        quantity: u64,
        side: TradeSide,
        executed_price: f64,
    },
    /// The port failed; the order stays pending for future ticks.
    Failed {
        order_id: OrderId,
        instrument_id: String,
        quantity: u64,
        side: TradeSide,
        attempted_price: f64,
        reason: String,
    },
}

impl ExecutionEvent {
    pub const fn order_id(&self) -> OrderId {
        match self {
            Self::Executed { order_id, .. } | Self::Failed { order_id, .. } => *order_id,
        }
    }

    pub const fn side(&self) -> TradeSide {
        match self {
            Self::Executed { side, .. } | Self::Failed { side, .. } => *side,
        }
    }

    pub fn instrument_id(&self) -> &str {
        match self {
            Self::Executed { instrument_id, .. } | Self::Failed { instrument_id, .. } => {
                instrument_id
            }
        }
    }

    pub const fn is_executed(&self) -> bool {
        matches!(self, Self::Executed { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_serializes_with_tag() {
        let event = ExecutionEvent::Executed {
            order_id: OrderId(7),
            instrument_id: "IBM".to_string(),
            quantity: 1000,
            side: TradeSide::Buy,
            executed_price: 99.0,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], "executed");
        assert_eq!(json["order_id"], 7);
        assert_eq!(json["side"], "buy");
    }

    #[test]
    fn test_accessors() {
        let event = ExecutionEvent::Failed {
            order_id: OrderId(3),
            instrument_id: "AAPL".to_string(),
            quantity: 500,
            side: TradeSide::Sell,
            attempted_price: 151.0,
            reason: "venue down".to_string(),
        };
        assert_eq!(event.order_id(), OrderId(3));
        assert_eq!(event.side(), TradeSide::Sell);
        assert_eq!(event.instrument_id(), "AAPL");
        assert!(!event.is_executed());
    }
}
