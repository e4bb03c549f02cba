//! Line Tick Feed - Text Price Source
//!
//! Reads `<instrument> <price>` lines from any async reader (stdin, a
//! file, a socket) and forwards each tick to the agent service.
//! Blank lines and `#` comments are ignored; malformed lines are
//! logged and skipped so one bad line never stops the feed.

use anyhow::Result;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::sync::broadcast;
use tracing::{debug, info, instrument, warn};

use crate::usecases::agent_service::{AgentHandle, AgentServiceError};

/// A parsed price tick.
#[derive(Debug, Clone, PartialEq)]
pub struct Tick {
    /// Instrument whose price changed.
    pub instrument_id: String,
    /// Observed price.
    pub price: f64,
}

/// Parse one feed line.
///
/// Returns `Ok(None)` for blank lines and comments.
///
/// # Errors
/// Returns a description of the problem for malformed lines.
pub fn parse_line(line: &str) -> Result<Option<Tick>, String> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }

    let mut parts = line.split_whitespace();
    let (Some(instrument), Some(price), None) = (parts.next(), parts.next(), parts.next()) else {
        return Err(format!("expected `<instrument> <price>`, got {line:?}"));
    };

    let price: f64 = price
        .parse()
        .map_err(|e| format!("invalid price {price:?}: {e}"))?;

    Ok(Some(Tick {
        instrument_id: instrument.to_string(),
        price,
    }))
}

/// Feeds ticks from a line-oriented reader into an agent.
pub struct LineTickFeed<R> {
    reader: R,
    agent: AgentHandle,
}

impl<R: AsyncBufRead + Unpin> LineTickFeed<R> {
    pub const fn new(reader: R, agent: AgentHandle) -> Self {
        Self { reader, agent }
    }

    /// Run until EOF, shutdown, or the agent stops.
    ///
    /// Dropping the shutdown sender is not a shutdown.
    ///
    /// Returns the number of ticks delivered.
    ///
    /// # Errors
    /// Returns an error if reading from the underlying source fails.
    #[instrument(skip(self, shutdown_rx))]
    pub async fn run(mut self, mut shutdown_rx: broadcast::Receiver<()>) -> Result<usize> {
        let mut delivered = 0usize;
        let mut line_no = 0usize;
        let mut line = String::new();
        let mut shutdown_open = true;

        loop {
            line.clear();
            let read = tokio::select! {
                biased;
                signal = shutdown_rx.recv(), if shutdown_open => {
                    if let Err(broadcast::error::RecvError::Closed) = signal {
                        shutdown_open = false;
                        continue;
                    }
                    info!("Tick feed shutting down");
                    break;
                }
                read = self.reader.read_line(&mut line) => read?,
            };

            if read == 0 {
                info!(delivered, "Tick feed reached end of input");
                break;
            }
            line_no += 1;

            let tick = match parse_line(&line) {
                Ok(Some(tick)) => tick,
                Ok(None) => continue,
                Err(reason) => {
                    warn!(line = line_no, %reason, "Skipping malformed tick");
                    continue;
                }
            };

            match self.agent.price_tick(tick.instrument_id.clone(), tick.price).await {
                Ok(report) => {
                    delivered += 1;
                    debug!(
                        instrument = %tick.instrument_id,
                        price = tick.price,
                        matched = report.events.len(),
                        "Tick delivered"
                    );
                }
                Err(AgentServiceError::Validation(e)) => {
                    warn!(line = line_no, error = %e, "Tick rejected by agent");
                }
                Err(AgentServiceError::Stopped) => {
                    warn!("Agent stopped, tick feed exiting");
                    break;
                }
            }
        }

        Ok(delivered)
    }
}
