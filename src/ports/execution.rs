//! Execution Port - Trade Placement Interface
//!
//! Defines the capability the agent needs from a trading venue:
//! buy or sell a quantity of an instrument, all-or-nothing.
//!
//! Key design decisions:
//! - No partial-fill or retry signal flows back to the agent
//! - `ExecutionError` is the only failure the agent recovers from
//! - Anything else (a panic) is a contract violation and unwinds

use async_trait::async_trait;

use crate::domain::errors::ExecutionError;

/// Trait for trade execution providers.
///
/// Implementors complete the trade before returning. The agent never
/// calls the port concurrently for the same book, but implementations
/// must still be shareable across tasks.
#[async_trait]
pub trait ExecutionPort: Send + Sync + 'static {
  /// Buy `quantity` units of `instrument_id`.
  ///
  /// # Errors
  /// Returns `ExecutionError` if the venue could not complete the trade.
  async fn buy(&self, instrument_id: &str, quantity: u64) -> Result<(), ExecutionError>;

  /// Sell `quantity` units of `instrument_id`.
  ///
  /// # Errors
  /// Returns `ExecutionError` if the venue could not complete the trade.
  async fn sell(&self, instrument_id: &str, quantity: u64) -> Result<(), ExecutionError>;
}
