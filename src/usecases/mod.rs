//! Use Cases Layer - Application Business Logic
//!
//! Orchestrates the domain with port interfaces.
//!
//! Use cases:
//! - `LimitOrderAgent`: Match ticks against pending orders and execute
//! - `AgentService`: Single-task ownership of an agent behind a queue

pub mod agent_service;
pub mod limit_order_agent;

pub use agent_service::{AgentHandle, AgentService, AgentServiceError};
pub use limit_order_agent::{LimitOrderAgent, TickReport};
