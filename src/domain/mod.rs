//! Domain layer - Core order model.
//!
//! Pure types and the pending book. No I/O and no async here
//! (hexagonal architecture inner ring).

pub mod book;
pub mod errors;
pub mod events;
pub mod order;

pub use book::PendingOrderBook;
pub use errors::{ExecutionError, ValidationError};
pub use events::ExecutionEvent;
pub use order::{LimitOrder, OrderId, OrderRequest, TradeSide};
