use crate::engine::allocate;
use crate::error::RouterError;
use crate::feasibility::{check_feasibility, Feasibility};
use crate::plan::assemble;
use crate::ranker::rank_candidates;
use configuration::RouterSettings;
use core_types::{ExchangeSnapshot, ExecutionPlan, OrderSide};
use rust_decimal::Decimal;
use std::collections::HashSet;

/// What a best-execution request produced.
#[derive(Debug, Clone, PartialEq)]
pub enum ExecutionOutcome {
    /// The request passed the funds check and was allocated. The plan may
    /// still be partial, see [`ExecutionPlan::is_complete`].
    Executed {
        plan: ExecutionPlan,
        total_available_funds: Decimal,
    },
    /// The request exceeds the funds of all exchanges. Nothing was mutated.
    ExceedsLimit {
        side: OrderSide,
        requested: Decimal,
        required: Decimal,
        total_available_funds: Decimal,
    },
}

impl ExecutionOutcome {
    pub fn exceeds_limit(&self) -> bool {
        matches!(self, ExecutionOutcome::ExceedsLimit { .. })
    }

    pub fn total_available_funds(&self) -> Decimal {
        match self {
            ExecutionOutcome::Executed {
                total_available_funds,
                ..
            }
            | ExecutionOutcome::ExceedsLimit {
                total_available_funds,
                ..
            } => *total_available_funds,
        }
    }

    pub fn plan(&self) -> Option<&ExecutionPlan> {
        match self {
            ExecutionOutcome::Executed { plan, .. } => Some(plan),
            ExecutionOutcome::ExceedsLimit { .. } => None,
        }
    }

    /// Flattens the outcome into `(plan, exceeds_limit, total_available_funds)`.
    /// An exceeded limit yields an empty plan.
    pub fn into_parts(self) -> (ExecutionPlan, bool, Decimal) {
        match self {
            ExecutionOutcome::Executed {
                plan,
                total_available_funds,
            } => (plan, false, total_available_funds),
            ExecutionOutcome::ExceedsLimit {
                side,
                requested,
                total_available_funds,
                ..
            } => (
                ExecutionPlan::empty(side, requested),
                true,
                total_available_funds,
            ),
        }
    }
}

/// Splits buy and sell requests across exchanges at the best weighted price.
///
/// The router holds no state between calls. Each call takes the snapshot set
/// by exclusive reference, so the funds check and the allocation that follows
/// see the same state.
#[derive(Debug, Clone, Default)]
pub struct BestExecutionRouter {
    settings: RouterSettings,
}

impl BestExecutionRouter {
    pub fn new(settings: RouterSettings) -> Self {
        Self { settings }
    }

    /// Runs the funds check alone, without allocating. Never mutates.
    pub fn assess(
        &self,
        side: OrderSide,
        amount: Decimal,
        exchanges: &[ExchangeSnapshot],
    ) -> Result<Feasibility, RouterError> {
        validate_request(side, amount, exchanges)?;
        let candidates = rank_candidates(exchanges, side, self.settings.tie_break);
        Ok(check_feasibility(exchanges, side, amount, &candidates))
    }

    /// Computes the best execution for `amount` on `side` and applies it to
    /// `exchanges`.
    ///
    /// When the request is infeasible the snapshots are left untouched and
    /// [`ExecutionOutcome::ExceedsLimit`] is returned. Otherwise balances and
    /// books reflect every fill in the returned plan.
    pub fn execute(
        &self,
        side: OrderSide,
        amount: Decimal,
        exchanges: &mut [ExchangeSnapshot],
    ) -> Result<ExecutionOutcome, RouterError> {
        validate_request(side, amount, exchanges)?;

        let candidates = rank_candidates(exchanges, side, self.settings.tie_break);
        tracing::debug!(%side, %amount, candidates = candidates.len(), "ranked candidates");

        let verdict = check_feasibility(exchanges, side, amount, &candidates);
        if let Feasibility::Infeasible {
            required,
            total_available_funds,
        } = verdict
        {
            tracing::info!(
                %side,
                %amount,
                %required,
                available = %total_available_funds,
                "request exceeds the funds of all exchanges"
            );
            return Ok(ExecutionOutcome::ExceedsLimit {
                side,
                requested: amount,
                required,
                total_available_funds,
            });
        }

        let fills = allocate(exchanges, side, amount, &candidates);
        let plan = assemble(side, amount, fills);

        for exchange in exchanges.iter() {
            exchange
                .check_balances()
                .map_err(RouterError::InvariantViolation)?;
        }

        if !plan.is_complete() {
            tracing::warn!(
                %side,
                requested = %amount,
                filled = %plan.filled_amount(),
                "candidates exhausted before the request was filled"
            );
        }

        tracing::info!(
            plan_id = %plan.plan_id,
            %side,
            requested = %amount,
            filled = %plan.filled_amount(),
            best_price = %plan.best_price,
            fills = plan.fills.len(),
            "execution plan computed"
        );

        Ok(ExecutionOutcome::Executed {
            plan,
            total_available_funds: verdict.total_available_funds(),
        })
    }
}

fn validate_request(
    side: OrderSide,
    amount: Decimal,
    exchanges: &[ExchangeSnapshot],
) -> Result<(), RouterError> {
    if amount <= Decimal::ZERO {
        return Err(RouterError::NonPositiveAmount(amount));
    }

    let mut seen = HashSet::with_capacity(exchanges.len());
    for exchange in exchanges {
        exchange.validate()?;
        if !seen.insert(exchange.id.as_str()) {
            return Err(RouterError::DuplicateExchange(exchange.id.clone()));
        }
    }
    check_bounds(side, exchanges)
}

/// Ensures every sum and product a run can form fits in a `Decimal`.
///
/// Each fill's notional is at most its order's `price × amount`, so bounding
/// the whole consumed book bounds the balances, sell proceeds and plan totals
/// the run produces.
fn check_bounds(side: OrderSide, exchanges: &[ExchangeSnapshot]) -> Result<(), RouterError> {
    let overflow = |exchange: &ExchangeSnapshot, quantity: &'static str| RouterError::Overflow {
        exchange: exchange.id.clone(),
        quantity,
    };

    let mut total_asset = Decimal::ZERO;
    let mut total_cash = Decimal::ZERO;
    let mut total_notional = Decimal::ZERO;
    for exchange in exchanges {
        let mut book_amount = Decimal::ZERO;
        let mut book_notional = Decimal::ZERO;
        for order in exchange.book(side).iter() {
            let notional = order
                .price
                .checked_mul(order.amount)
                .ok_or_else(|| overflow(exchange, "order notional"))?;
            book_notional = book_notional
                .checked_add(notional)
                .ok_or_else(|| overflow(exchange, "book notional"))?;
            book_amount = book_amount
                .checked_add(order.amount)
                .ok_or_else(|| overflow(exchange, "book amount"))?;
        }

        // A buy credits cash, a sell credits the asset.
        let (asset, cash) = match side {
            OrderSide::Buy => (
                exchange.asset_balance,
                exchange
                    .cash_balance
                    .checked_add(book_notional)
                    .ok_or_else(|| overflow(exchange, "cash balance after fills"))?,
            ),
            OrderSide::Sell => (
                exchange
                    .asset_balance
                    .checked_add(book_amount)
                    .ok_or_else(|| overflow(exchange, "asset balance after fills"))?,
                exchange.cash_balance,
            ),
        };

        total_asset = total_asset
            .checked_add(asset)
            .ok_or_else(|| overflow(exchange, "total asset balance"))?;
        total_cash = total_cash
            .checked_add(cash)
            .ok_or_else(|| overflow(exchange, "total cash balance"))?;
        total_notional = total_notional
            .checked_add(book_notional)
            .ok_or_else(|| overflow(exchange, "total notional"))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compute_best_execution;
    use core_types::{CoreError, Order, TieBreak};
    use rust_decimal_macros::dec;

    #[test]
    fn non_positive_amounts_are_rejected_before_any_work() {
        let mut exchanges = vec![ExchangeSnapshot::new("x", dec!(1), dec!(1))];
        let router = BestExecutionRouter::default();

        assert!(matches!(
            router.execute(OrderSide::Buy, dec!(0), &mut exchanges),
            Err(RouterError::NonPositiveAmount(_))
        ));
        assert!(matches!(
            router.execute(OrderSide::Sell, dec!(-1), &mut exchanges),
            Err(RouterError::NonPositiveAmount(_))
        ));
    }

    #[test]
    fn duplicate_exchange_ids_are_rejected() {
        let mut exchanges = vec![
            ExchangeSnapshot::new("x", dec!(1), dec!(1)),
            ExchangeSnapshot::new("x", dec!(1), dec!(1)),
        ];

        let result = BestExecutionRouter::default().execute(OrderSide::Buy, dec!(1), &mut exchanges);
        assert!(matches!(result, Err(RouterError::DuplicateExchange(id)) if id == "x"));
    }

    #[test]
    fn negative_balances_are_rejected() {
        let mut exchanges = vec![ExchangeSnapshot::new("x", dec!(1), dec!(-5))];

        let result = BestExecutionRouter::default().execute(OrderSide::Buy, dec!(1), &mut exchanges);
        assert!(matches!(
            result,
            Err(RouterError::InvalidSnapshot(CoreError::NegativeBalance { .. }))
        ));
    }

    #[test]
    fn notionals_beyond_decimal_range_are_rejected_untouched() {
        let huge_price = Decimal::from_i128_with_scale(10i128.pow(20), 0);
        let mut exchanges = vec![ExchangeSnapshot::new("x", dec!(10000000000), dec!(0))
            .with_ask(Order::new("a", dec!(10000000000), huge_price))];
        let before = exchanges.clone();

        let result = compute_best_execution(OrderSide::Buy, dec!(10000000000), &mut exchanges);

        assert!(matches!(
            result,
            Err(RouterError::Overflow { ref exchange, .. }) if exchange == "x"
        ));
        assert_eq!(exchanges, before);
    }

    #[test]
    fn sell_side_bounds_cover_balances_summed_across_exchanges() {
        let mut exchanges = vec![
            ExchangeSnapshot::new("x", dec!(0), Decimal::MAX)
                .with_bid(Order::new("b", dec!(1), dec!(1))),
            ExchangeSnapshot::new("y", dec!(0), Decimal::MAX),
        ];

        let result = compute_best_execution(OrderSide::Sell, dec!(1), &mut exchanges);
        assert!(matches!(
            result,
            Err(RouterError::Overflow { ref exchange, .. }) if exchange == "y"
        ));
    }

    #[test]
    fn exceeded_limit_flattens_to_empty_plan() {
        let mut exchanges = vec![ExchangeSnapshot::new("x", dec!(1), dec!(0))
            .with_ask(Order::new("a", dec!(5), dec!(100)))];

        let outcome = BestExecutionRouter::default()
            .execute(OrderSide::Buy, dec!(2), &mut exchanges)
            .unwrap();
        assert!(outcome.exceeds_limit());
        assert!(outcome.plan().is_none());

        let (plan, exceeds_limit, available) = outcome.into_parts();
        assert!(exceeds_limit);
        assert!(plan.is_empty());
        assert_eq!(plan.best_price, Decimal::ZERO);
        assert_eq!(available, dec!(1));
    }

    #[test]
    fn configured_tie_break_decides_equal_prices() {
        let build = || {
            vec![
                ExchangeSnapshot::new("alpha", dec!(10), dec!(0))
                    .with_ask(Order::new("small", dec!(1), dec!(100))),
                ExchangeSnapshot::new("beta", dec!(10), dec!(0))
                    .with_ask(Order::new("large", dec!(4), dec!(100))),
            ]
        };

        let mut exchanges = build();
        let outcome = BestExecutionRouter::default()
            .execute(OrderSide::Buy, dec!(1), &mut exchanges)
            .unwrap();
        assert_eq!(outcome.plan().unwrap().fills[0].exchange_id, "alpha");

        let mut exchanges = build();
        let router = BestExecutionRouter::new(RouterSettings {
            tie_break: TieBreak::LargestAmount,
        });
        let outcome = router.execute(OrderSide::Buy, dec!(1), &mut exchanges).unwrap();
        assert_eq!(outcome.plan().unwrap().fills[0].exchange_id, "beta");
    }

    #[test]
    fn assess_reports_without_mutating() {
        let exchanges = vec![ExchangeSnapshot::new("x", dec!(0), dec!(50))
            .with_bid(Order::new("b", dec!(100), dec!(10)))];
        let before = exchanges.clone();

        let verdict = BestExecutionRouter::default()
            .assess(OrderSide::Sell, dec!(10), &exchanges)
            .unwrap();

        assert!(!verdict.is_feasible());
        assert_eq!(verdict.required(), dec!(100));
        assert_eq!(exchanges, before);
    }
}
