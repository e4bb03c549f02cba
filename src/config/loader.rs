//! Configuration Loader - File Loading and Validation
//!
//! Handles loading `config.toml`, validating all parameters,
//! and providing clear error messages for misconfiguration.

use std::path::Path;

use anyhow::{Context, Result};
use tracing::info;

use super::AppConfig;
use crate::domain::order::{OrderRequest, TradeSide};

/// Load and validate configuration from a TOML file.
///
/// # Errors
/// Returns detailed error if:
/// - File doesn't exist or can't be read
/// - TOML parsing fails
/// - Validation rules are violated
pub fn load_config(path: &str) -> Result<AppConfig> {
  let path = Path::new(path);

  let content = std::fs::read_to_string(path)
    .with_context(|| format!("Failed to read config file: {}", path.display()))?;

  let config = parse_config(&content)?;

  info!(
    name = %config.agent.name,
    orders = config.orders.len(),
    timeout_ms = config.agent.execution_timeout_ms,
    "Configuration loaded successfully"
  );

  Ok(config)
}

/// Parse and validate configuration from TOML text.
///
/// # Errors
/// Returns an error on malformed TOML or invalid values.
pub fn parse_config(content: &str) -> Result<AppConfig> {
  let config: AppConfig =
    toml::from_str(content).with_context(|| "Failed to parse config.toml")?;

  validate_config(&config)?;

  Ok(config)
}

/// Validate all configuration parameters.
///
/// Checks for:
/// - Non-empty agent name
/// - Non-zero channel capacities
/// - Every seed order passing the same validation as `add_order`
fn validate_config(config: &AppConfig) -> Result<()> {
  anyhow::ensure!(
    !config.agent.name.trim().is_empty(),
    "Agent name must not be empty"
  );
  anyhow::ensure!(
    config.agent.command_channel_capacity > 0,
    "command_channel_capacity must be positive"
  );
  anyhow::ensure!(
    config.agent.event_channel_capacity > 0,
    "event_channel_capacity must be positive"
  );

  if config.audit.enabled {
    anyhow::ensure!(
      !config.audit.data_dir.is_empty(),
      "Audit data_dir must not be empty when audit is enabled"
    );
  }

  if config.metrics.enabled {
    config
      .metrics
      .bind_address
      .parse::<std::net::SocketAddr>()
      .with_context(|| {
        format!("Invalid metrics bind_address: {}", config.metrics.bind_address)
      })?;
  }

  for (i, order) in config.orders.iter().enumerate() {
    let side: TradeSide = order
      .action
      .parse()
      .with_context(|| format!("Order {i} ({}) has invalid action", order.instrument_id))?;
    OrderRequest::new(side, order.instrument_id.clone(), order.quantity, order.limit_price)
      .with_context(|| format!("Order {i} ({}) is invalid", order.instrument_id))?;
  }

  Ok(())
}
