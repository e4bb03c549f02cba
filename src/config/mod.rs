//! Configuration Module - TOML-based Agent Configuration
//!
//! Loads and validates configuration from `config.toml`.
//! Seed orders, the port-call timeout, and adapter settings are
//! externalized here - nothing is hardcoded in the usecases layer.

pub mod loader;

use std::time::Duration;

use serde::Deserialize;

/// Top-level agent configuration.
///
/// Loaded from `config.toml` at startup. All fields are validated
/// before the agent accepts ticks.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
  /// Agent identity and runtime tuning.
  pub agent: AgentConfig,
  /// Simulated execution venue.
  #[serde(default)]
  pub paper: PaperConfig,
  /// JSONL audit log of execution events.
  #[serde(default)]
  pub audit: AuditConfig,
  /// Metrics and monitoring.
  #[serde(default)]
  pub metrics: MetricsConfig,
  /// Limit orders registered at startup.
  #[serde(default)]
  pub orders: Vec<OrderConfig>,
}

/// Agent identity and runtime tuning.
#[derive(Debug, Clone, Deserialize)]
pub struct AgentConfig {
  /// Human-readable agent name.
  pub name: String,
  /// Log level (trace, debug, info, warn, error).
  #[serde(default = "default_log_level")]
  pub log_level: String,
  /// Upper bound on a single port call (ms). 0 disables the bound.
  #[serde(default = "default_execution_timeout")]
  pub execution_timeout_ms: u64,
  /// Capacity of the agent service command queue.
  #[serde(default = "default_command_capacity")]
  pub command_channel_capacity: usize,
  /// Capacity of the execution event broadcast channel.
  #[serde(default = "default_event_capacity")]
  pub event_channel_capacity: usize,
}

impl AgentConfig {
  /// Port-call bound, or `None` when disabled.
  pub const fn execution_timeout(&self) -> Option<Duration> {
    if self.execution_timeout_ms == 0 {
      None
    } else {
      Some(Duration::from_millis(self.execution_timeout_ms))
    }
  }
}

/// Simulated venue configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PaperConfig {
  /// Instruments the paper venue refuses to trade.
  #[serde(default)]
  pub reject_instruments: Vec<String>,
}

/// Audit log configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AuditConfig {
  /// Write execution events to JSONL files.
  #[serde(default = "default_true")]
  pub enabled: bool,
  /// Directory for JSONL event logs.
  #[serde(default = "default_data_dir")]
  pub data_dir: String,
}

impl Default for AuditConfig {
  fn default() -> Self {
    Self {
      enabled: true,
      data_dir: default_data_dir(),
    }
  }
}

/// Metrics and monitoring configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
  /// Enable Prometheus metrics export.
  #[serde(default = "default_true")]
  pub enabled: bool,
  /// Metrics server bind address.
  #[serde(default = "default_metrics_addr")]
  pub bind_address: String,
}

impl Default for MetricsConfig {
  fn default() -> Self {
    Self {
      enabled: true,
      bind_address: default_metrics_addr(),
    }
  }
}

/// A seed limit order.
///
/// Kept loosely typed so the agent's own validation reports bad values.
#[derive(Debug, Clone, Deserialize)]
pub struct OrderConfig {
  /// "buy" or "sell".
  pub action: String,
  /// Instrument identifier.
  pub instrument_id: String,
  /// Units to trade.
  pub quantity: i64,
  /// Limit price.
  pub limit_price: f64,
}

// Default value functions for serde

fn default_log_level() -> String {
  "info".to_string()
}

const fn default_true() -> bool {
  true
}

const fn default_execution_timeout() -> u64 {
  5_000
}

const fn default_command_capacity() -> usize {
  1024
}

const fn default_event_capacity() -> usize {
  4096
}

fn default_metrics_addr() -> String {
  "0.0.0.0:9090".to_string()
}

fn default_data_dir() -> String {
  "data".to_string()
}
