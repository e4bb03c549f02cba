//! Limit order types.
//!
//! A `LimitOrder` is immutable once created. Its only lifecycle change is
//! leaving the pending book after a successful execution.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::errors::ValidationError;

/// Trade direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradeSide {
    Buy,
    Sell,
}

impl fmt::Display for TradeSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Buy => write!(f, "BUY"),
            Self::Sell => write!(f, "SELL"),
        }
    }
}

impl FromStr for TradeSide {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "buy" => Ok(Self::Buy),
            "sell" => Ok(Self::Sell),
            _ => Err(ValidationError::UnknownAction(s.to_string())),
        }
    }
}

/// Synthetic order identifier, assigned by the book at insertion.
///
/// Ids increase monotonically, so two structurally identical orders are
/// still distinguishable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderId(pub u64);

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A pending limit order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LimitOrder {
    /// Book-assigned identifier.
    pub id: OrderId,
    /// Buy or sell.
    pub side: TradeSide,
    /// Opaque instrument identifier (e.g. "IBM").
    pub instrument_id: String,
    /// Units to trade, always > 0.
    pub quantity: u64,
    /// Buy: highest acceptable price. Sell: lowest acceptable price.
    pub limit_price: f64,
}

impl LimitOrder {
    /// Whether `price` satisfies this order's limit. Both bounds inclusive.
    pub fn matches(&self, price: f64) -> bool {
        match self.side {
            TradeSide::Buy => price <= self.limit_price,
            TradeSide::Sell => price >= self.limit_price,
        }
    }
}

/// Order parameters checked at the boundary, before an id is assigned.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderRequest {
    pub side: TradeSide,
    pub instrument_id: String,
    pub quantity: u64,
    pub limit_price: f64,
}

impl OrderRequest {
    /// Validate raw order parameters.
    ///
    /// Quantity is taken signed so that negative input from loosely typed
    /// sources (config, text feeds) is reported rather than wrapped.
    ///
    /// # Errors
    /// Returns the first violated constraint.
    pub fn new(
        side: TradeSide,
        instrument_id: impl Into<String>,
        quantity: i64,
        limit_price: f64,
    ) -> Result<Self, ValidationError> {
        let instrument_id = instrument_id.into();
        validate_instrument(&instrument_id)?;
        let quantity = u64::try_from(quantity)
            .ok()
            .filter(|q| *q > 0)
            .ok_or(ValidationError::NonPositiveQuantity(quantity))?;
        let limit_price = validate_price(limit_price)?;

        Ok(Self {
            side,
            instrument_id,
            quantity,
            limit_price,
        })
    }
}

/// Reject empty or whitespace-only instrument ids.
pub fn validate_instrument(instrument_id: &str) -> Result<(), ValidationError> {
    if instrument_id.trim().is_empty() {
        return Err(ValidationError::EmptyInstrument);
    }
    Ok(())
}

/// Reject NaN and infinite prices.
pub const fn validate_price(price: f64) -> Result<f64, ValidationError> {
    if price.is_finite() {
        Ok(price)
    } else {
        Err(ValidationError::NonFinitePrice(price))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn order(side: TradeSide, limit: f64) -> LimitOrder {
        LimitOrder {
            id: OrderId(1),
            side,
            instrument_id: "IBM".to_string(),
            quantity: 1000,
            limit_price: limit,
        }
    }

    #[test]
    fn test_buy_matches_at_or_below_limit() {
        let buy = order(TradeSide::Buy, 100.0);
        assert!(buy.matches(99.0));
        assert!(buy.matches(100.0));
        assert!(!buy.matches(100.01));
    }

    #[test]
    fn test_sell_matches_at_or_above_limit() {
        let sell = order(TradeSide::Sell, 150.0);
        assert!(sell.matches(151.0));
        assert!(sell.matches(150.0));
        assert!(!sell.matches(149.99));
    }

    #[test]
    fn test_side_parsing() {
        assert_eq!("buy".parse::<TradeSide>(), Ok(TradeSide::Buy));
        assert_eq!(" SELL ".parse::<TradeSide>(), Ok(TradeSide::Sell));
        assert_eq!(
            "short".parse::<TradeSide>(),
            Err(ValidationError::UnknownAction("short".to_string()))
        );
    }

    #[test]
    fn test_side_display() {
        assert_eq!(format!("{}", TradeSide::Buy), "BUY");
        assert_eq!(format!("{}", TradeSide::Sell), "SELL");
    }

    #[test]
    fn test_request_validation() {
        assert!(OrderRequest::new(TradeSide::Buy, "IBM", 1000, 100.0).is_ok());
        assert_eq!(
            OrderRequest::new(TradeSide::Buy, "IBM", 0, 100.0),
            Err(ValidationError::NonPositiveQuantity(0))
        );
        assert_eq!(
            OrderRequest::new(TradeSide::Sell, "IBM", -5, 100.0),
            Err(ValidationError::NonPositiveQuantity(-5))
        );
        assert_eq!(
            OrderRequest::new(TradeSide::Buy, "  ", 10, 100.0),
            Err(ValidationError::EmptyInstrument)
        );
        assert!(matches!(
            OrderRequest::new(TradeSide::Buy, "IBM", 10, f64::NAN),
            Err(ValidationError::NonFinitePrice(_))
        ));
        assert!(matches!(
            OrderRequest::new(TradeSide::Buy, "IBM", 10, f64::INFINITY),
            Err(ValidationError::NonFinitePrice(_))
        ));
    }
}
