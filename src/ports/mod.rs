//! Ports Layer - Hexagonal Architecture Boundaries
//!
//! Defines the interfaces (traits) that the usecases layer
//! requires from the outside world. Adapters implement these traits.
//!
//! Port categories:
//! - `ExecutionPort`: Buy/sell placement with a trading venue

pub mod execution;

pub use execution::ExecutionPort;
