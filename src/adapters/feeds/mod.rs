//! Price Feed Adapters
//!
//! - `line_feed`: `<instrument> <price>` lines from any async reader

pub mod line_feed;

pub use line_feed::{LineTickFeed, Tick};
