//! Pending order book.
//!
//! Insertion-ordered collection of open limit orders. Insertion order is
//! the evaluation order on every tick, so the book never reorders.
//! Removal is batched: callers collect ids during a scan and compact once.

use std::collections::HashSet;

use super::order::{LimitOrder, OrderId, OrderRequest};

/// In-memory book of not-yet-executed orders.
#[derive(Debug, Default)]
pub struct PendingOrderBook {
    orders: Vec<LimitOrder>,
    next_id: u64,
}

impl PendingOrderBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a validated order and return its assigned id.
    pub fn insert(&mut self, request: OrderRequest) -> OrderId {
        self.next_id += 1;
        let id = OrderId(self.next_id);
        self.orders.push(LimitOrder {
            id,
            side: request.side,
            instrument_id: request.instrument_id,
            quantity: request.quantity,
            limit_price: request.limit_price,
        });
        id
    }

    /// All pending orders in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &LimitOrder> {
        self.orders.iter()
    }

    /// Pending orders for one instrument, in insertion order.
    pub fn for_instrument<'a>(
        &'a self,
        instrument_id: &'a str,
    ) -> impl Iterator<Item = &'a LimitOrder> + 'a {
        self.orders
            .iter()
            .filter(move |o| o.instrument_id == instrument_id)
    }

    pub fn get(&self, id: OrderId) -> Option<&LimitOrder> {
        self.orders.iter().find(|o| o.id == id)
    }

    /// Remove every order whose id is in `ids` in a single pass.
    ///
    /// Relative order of the survivors is preserved. Returns the number
    /// of orders removed; unknown ids are ignored.
    pub fn remove_all(&mut self, ids: &[OrderId]) -> usize {
        if ids.is_empty() {
            return 0;
        }
        let doomed: HashSet<OrderId> = ids.iter().copied().collect();
        let before = self.orders.len();
        self.orders.retain(|o| !doomed.contains(&o.id));
        before - self.orders.len()
    }

    pub fn len(&self) -> usize {
        self.orders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::order::TradeSide;

    fn req(side: TradeSide, instrument: &str, qty: i64, limit: f64) -> OrderRequest {
        OrderRequest::new(side, instrument, qty, limit).unwrap()
    }

    #[test]
    fn test_ids_are_distinct_for_identical_orders() {
        let mut book = PendingOrderBook::new();
        let a = book.insert(req(TradeSide::Buy, "IBM", 10, 100.0));
        let b = book.insert(req(TradeSide::Buy, "IBM", 10, 100.0));
        assert_ne!(a, b);
        assert_eq!(book.len(), 2);
    }

    #[test]
    fn test_for_instrument_keeps_insertion_order() {
        let mut book = PendingOrderBook::new();
        let a = book.insert(req(TradeSide::Buy, "IBM", 1, 100.0));
        book.insert(req(TradeSide::Sell, "AAPL", 2, 150.0));
        let c = book.insert(req(TradeSide::Sell, "IBM", 3, 90.0));

        let ids: Vec<_> = book.for_instrument("IBM").map(|o| o.id).collect();
        assert_eq!(ids, vec![a, c]);
    }

    #[test]
    fn test_remove_all_preserves_remaining_order() {
        let mut book = PendingOrderBook::new();
        let a = book.insert(req(TradeSide::Buy, "IBM", 1, 100.0));
        let b = book.insert(req(TradeSide::Buy, "IBM", 2, 100.0));
        let c = book.insert(req(TradeSide::Buy, "IBM", 3, 100.0));
        let d = book.insert(req(TradeSide::Buy, "IBM", 4, 100.0));

        assert_eq!(book.remove_all(&[b, d, OrderId(99)]), 2);
        let ids: Vec<_> = book.iter().map(|o| o.id).collect();
        assert_eq!(ids, vec![a, c]);
        assert!(book.get(b).is_none());
    }

    #[test]
    fn test_ids_not_reused_after_removal() {
        let mut book = PendingOrderBook::new();
        let a = book.insert(req(TradeSide::Buy, "IBM", 1, 100.0));
        book.remove_all(&[a]);
        assert!(book.is_empty());
        let b = book.insert(req(TradeSide::Buy, "IBM", 1, 100.0));
        assert!(b > a);
    }
}
