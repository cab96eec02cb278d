use serde::{Deserialize, Serialize};
use std::fmt;

/// The direction of a requested order.
///
/// A `Buy` is filled against resting asks, a `Sell` against resting bids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
pub enum OrderSide {
    Buy,
    Sell,
}

impl OrderSide {
    /// Name of the book this side consumes.
    pub fn book_name(&self) -> &'static str {
        match self {
            OrderSide::Buy => "asks",
            OrderSide::Sell => "bids",
        }
    }
}

impl fmt::Display for OrderSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderSide::Buy => write!(f, "Buy"),
            OrderSide::Sell => write!(f, "Sell"),
        }
    }
}

/// Ordering applied to candidates that share the same price.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
pub enum TieBreak {
    /// Ascending exchange id, then position in the book.
    #[default]
    ExchangeId,
    /// Larger resting amount first, then exchange id, then position in the book.
    LargestAmount,
}
