use core_types::{ExecutionPlan, Fill, OrderSide};
use rust_decimal::Decimal;

/// `Σ(price × amount) / Σ(amount)` over `fills`, zero when nothing was filled.
pub fn weighted_average_price(fills: &[Fill]) -> Decimal {
    let filled: Decimal = fills.iter().map(|fill| fill.amount).sum();
    if filled.is_zero() {
        return Decimal::ZERO;
    }
    let notional: Decimal = fills.iter().map(Fill::notional).sum();
    notional / filled
}

/// Turns the ordered fills of a run into its execution plan.
pub fn assemble(side: OrderSide, requested_amount: Decimal, fills: Vec<Fill>) -> ExecutionPlan {
    let best_price = weighted_average_price(&fills);
    ExecutionPlan::new(side, requested_amount, best_price, fills)
}
