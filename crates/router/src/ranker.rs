use core_types::{ExchangeSnapshot, OrderSide, TieBreak};
use rust_decimal::Decimal;
use std::cmp::Ordering;

/// A reference to a resting order considered for a fill.
///
/// `exchange` indexes the snapshot slice passed to the ranker and `slot`
/// indexes that exchange's book for the requested side. The price and amount
/// are captured for ordering only; the engine always re-reads the live order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Candidate {
    pub exchange: usize,
    pub slot: usize,
    pub price: Decimal,
    pub amount: Decimal,
}

/// Merges the relevant book of every exchange into one sequence, most
/// favourable price first: cheapest asks for a buy, highest bids for a sell.
///
/// Exhausted orders are left out. Equal prices are ordered by `tie_break`,
/// falling back to exchange position and book slot so the result is fully
/// deterministic.
pub fn rank_candidates(
    exchanges: &[ExchangeSnapshot],
    side: OrderSide,
    tie_break: TieBreak,
) -> Vec<Candidate> {
    let capacity = exchanges.iter().map(|e| e.book(side).len()).sum();
    let mut candidates = Vec::with_capacity(capacity);

    for (exchange, snapshot) in exchanges.iter().enumerate() {
        for (slot, order) in snapshot.book(side).iter().enumerate() {
            if order.is_exhausted() {
                continue;
            }
            candidates.push(Candidate {
                exchange,
                slot,
                price: order.price,
                amount: order.amount,
            });
        }
    }

    candidates.sort_by(|a, b| {
        by_price(side, a, b)
            .then_with(|| by_tie_break(exchanges, tie_break, a, b))
            .then_with(|| a.exchange.cmp(&b.exchange))
            .then_with(|| a.slot.cmp(&b.slot))
    });

    candidates
}

fn by_price(side: OrderSide, a: &Candidate, b: &Candidate) -> Ordering {
    match side {
        OrderSide::Buy => a.price.cmp(&b.price),
        OrderSide::Sell => b.price.cmp(&a.price),
    }
}

fn by_tie_break(
    exchanges: &[ExchangeSnapshot],
    tie_break: TieBreak,
    a: &Candidate,
    b: &Candidate,
) -> Ordering {
    let by_id = || exchanges[a.exchange].id.cmp(&exchanges[b.exchange].id);
    match tie_break {
        TieBreak::ExchangeId => by_id(),
        TieBreak::LargestAmount => b.amount.cmp(&a.amount).then_with(by_id),
    }
}
