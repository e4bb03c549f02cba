//! Audit Adapters - Append-only Execution Records
//!
//! Persists every execution event as a JSONL line for offline review.
//! Pending orders are never persisted; this is an outcome log only.

pub mod event_log;

pub use event_log::{AuditRecord, EventLog};
