//! Metrics Adapters - Prometheus Export
//!
//! Counts execution outcomes from the agent's event stream.

pub mod prometheus;

pub use self::prometheus::AgentMetrics;
