//! Adapters Layer - Concrete Port Implementations
//!
//! Implements the port traits and the agent's surrounding plumbing:
//! - `execution`: Paper venue implementing `ExecutionPort`
//! - `feeds`: Text tick feed driving the agent service
//! - `audit`: JSONL log of execution events
//! - `metrics`: Prometheus counters and `/metrics` endpoint

pub mod audit;
pub mod execution;
pub mod feeds;
pub mod metrics;
