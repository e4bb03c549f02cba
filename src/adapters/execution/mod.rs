//! Execution Adapters - Venues Implementing `ExecutionPort`
//!
//! - `paper`: Simulated venue that fills instantly and records fills

pub mod paper;

pub use paper::PaperExecutor;
