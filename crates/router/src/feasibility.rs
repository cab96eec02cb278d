use crate::ranker::Candidate;
use core_types::{ExchangeSnapshot, OrderSide};
use rust_decimal::Decimal;

/// Verdict of the pre-allocation funds check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Feasibility {
    Feasible {
        required: Decimal,
        total_available_funds: Decimal,
    },
    Infeasible {
        required: Decimal,
        total_available_funds: Decimal,
    },
}

impl Feasibility {
    pub fn is_feasible(&self) -> bool {
        matches!(self, Feasibility::Feasible { .. })
    }

    /// Asset for a buy, cash for a sell, summed across every exchange.
    pub fn total_available_funds(&self) -> Decimal {
        match self {
            Feasibility::Feasible {
                total_available_funds,
                ..
            }
            | Feasibility::Infeasible {
                total_available_funds,
                ..
            } => *total_available_funds,
        }
    }

    /// The amount checked against the available funds: the requested quantity
    /// for a buy, the implied cash for a sell.
    pub fn required(&self) -> Decimal {
        match self {
            Feasibility::Feasible { required, .. } | Feasibility::Infeasible { required, .. } => {
                *required
            }
        }
    }
}

/// Decides whether `amount` can plausibly be satisfied. Read-only.
///
/// A buy is limited by the aggregate asset balance and is checked on quantity
/// alone. A sell is limited by the aggregate cash balance against the cash the
/// ranked bids would pay out for `amount`.
pub fn check_feasibility(
    exchanges: &[ExchangeSnapshot],
    side: OrderSide,
    amount: Decimal,
    candidates: &[Candidate],
) -> Feasibility {
    let (required, total_available_funds) = match side {
        OrderSide::Buy => (
            amount,
            exchanges.iter().map(|e| e.asset_balance).sum::<Decimal>(),
        ),
        OrderSide::Sell => (
            sell_proceeds(candidates, amount),
            exchanges.iter().map(|e| e.cash_balance).sum::<Decimal>(),
        ),
    };

    if required > total_available_funds {
        Feasibility::Infeasible {
            required,
            total_available_funds,
        }
    } else {
        Feasibility::Feasible {
            required,
            total_available_funds,
        }
    }
}

/// Cash paid out by walking `candidates` in order until `amount` is covered
/// or the candidates run out.
pub fn sell_proceeds(candidates: &[Candidate], amount: Decimal) -> Decimal {
    let mut accumulated = Decimal::ZERO;
    let mut proceeds = Decimal::ZERO;

    for candidate in candidates {
        if accumulated >= amount {
            break;
        }
        let take = (amount - accumulated).min(candidate.amount);
        proceeds += take * candidate.price;
        accumulated += take;
    }

    proceeds
}
