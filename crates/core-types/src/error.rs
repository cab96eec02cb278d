use rust_decimal::Decimal;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CoreError {
    #[error("Exchange {exchange} has a negative {field} balance: {value}")]
    NegativeBalance {
        exchange: String,
        field: &'static str,
        value: Decimal,
    },

    #[error("Order {order_id} on exchange {exchange} is invalid: {reason}")]
    InvalidOrder {
        exchange: String,
        order_id: String,
        reason: String,
    },
}
