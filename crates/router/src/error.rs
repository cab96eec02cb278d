use core_types::CoreError;
use rust_decimal::Decimal;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RouterError {
    #[error("Requested amount must be positive, got {0}")]
    NonPositiveAmount(Decimal),

    #[error("Invalid exchange snapshot: {0}")]
    InvalidSnapshot(#[from] CoreError),

    #[error("Exchange {0} appears more than once in the snapshot set")]
    DuplicateExchange(String),

    #[error("Exchange {exchange}: {quantity} is too large to compute with")]
    Overflow {
        exchange: String,
        quantity: &'static str,
    },

    /// A post-run check found a broken invariant. This is a bug, not a market condition.
    #[error("Allocation left an exchange in an invalid state: {0}")]
    InvariantViolation(CoreError),
}
