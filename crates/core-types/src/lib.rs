pub mod enums;
pub mod error;
pub mod structs;

// Re-export the core types to provide a clean public API.
pub use enums::{OrderSide, TieBreak};
pub use error::CoreError;
pub use structs::{ExchangeSnapshot, ExecutionPlan, Fill, Order, OrderBook};
