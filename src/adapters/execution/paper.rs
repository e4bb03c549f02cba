//! Paper Executor - Simulated Trading Venue
//!
//! Fills every order instantly and keeps an in-memory record of fills.
//! Instruments on the reject list fail with `ExecutionError::Rejected`,
//! which exercises the agent's keep-pending path without a real venue.

use std::collections::HashSet;
use std::sync::Mutex;

use async_trait::async_trait;
use tracing::{info, instrument, warn};

use crate::config::PaperConfig;
use crate::domain::errors::ExecutionError;
use crate::domain::order::TradeSide;
use crate::ports::execution::ExecutionPort;

/// A completed simulated trade.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fill {
    /// Instrument traded.
    pub instrument_id: String,
    /// Units traded.
    pub quantity: u64,
    /// Buy or sell.
    pub side: TradeSide,
}

/// In-memory venue for dry runs and demos.
#[derive(Debug, Default)]
pub struct PaperExecutor {
    /// Instruments that always fail.
    reject: HashSet<String>,
    /// Fills in execution order.
    fills: Mutex<Vec<Fill>>,
}

impl PaperExecutor {
    /// Create a paper venue that accepts everything.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a paper venue from config.
    pub fn from_config(config: &PaperConfig) -> Self {
        Self {
            reject: config.reject_instruments.iter().cloned().collect(),
            fills: Mutex::new(Vec::new()),
        }
    }

    /// Copy of all fills so far.
    pub fn fills(&self) -> Vec<Fill> {
        self.fills
            .lock()
            .map(|f| f.clone())
            .unwrap_or_default()
    }

    fn fill(
        &self,
        side: TradeSide,
        instrument_id: &str,
        quantity: u64,
    ) -> Result<(), ExecutionError> {
        if self.reject.contains(instrument_id) {
            warn!(instrument = instrument_id, %side, quantity, "Paper venue rejecting instrument");
            return Err(ExecutionError::rejected(format!(
                "paper venue does not trade {instrument_id}"
            )));
        }

        let mut fills = self
            .fills
            .lock()
            .map_err(|_| ExecutionError::rejected("paper fill log poisoned"))?;
        fills.push(Fill {
            instrument_id: instrument_id.to_string(),
            quantity,
            side,
        });

        info!(instrument = instrument_id, %side, quantity, "Paper fill");
        Ok(())
    }
}

#[async_trait]
impl ExecutionPort for PaperExecutor {
    #[instrument(skip(self))]
    async fn buy(&self, instrument_id: &str, quantity: u64) -> Result<(), ExecutionError> {
        self.fill(TradeSide::Buy, instrument_id, quantity)
    }

    #[instrument(skip(self))]
    async fn sell(&self, instrument_id: &str, quantity: u64) -> Result<(), ExecutionError> {
        self.fill(TradeSide::Sell, instrument_id, quantity)
    }
}
