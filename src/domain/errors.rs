//! Domain errors.
//!
//! `ValidationError` is surfaced to callers at the boundary and never
//! reaches the book. `ExecutionError` is the only failure the agent
//! recovers from locally.

use thiserror::Error;

/// Malformed order parameters or tick input.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    /// Instrument identifier was empty or whitespace.
    #[error("instrument id must not be empty")]
    EmptyInstrument,
    /// Quantity was zero or negative.
    #[error("quantity must be positive, got {0}")]
    NonPositiveQuantity(i64),
    /// Price was NaN or infinite.
    #[error("price must be finite, got {0}")]
    NonFinitePrice(f64),
    /// Action string was neither `buy` nor `sell`.
    #[error("unknown order action: {0:?}")]
    UnknownAction(String),
}

/// The execution port could not complete a buy or sell.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExecutionError {
    /// Venue refused or failed the trade.
    #[error("execution rejected: {reason}")]
    Rejected {
        /// Human-readable reason from the venue.
        reason: String,
    },
    /// Port call did not complete within the configured bound.
    #[error("execution timed out after {after_ms}ms")]
    Timeout {
        /// Elapsed bound in milliseconds.
        after_ms: u64,
    },
}

impl ExecutionError {
    /// Shorthand for a venue rejection.
    pub fn rejected(reason: impl Into<String>) -> Self {
        Self::Rejected {
            reason: reason.into(),
        }
    }
}
