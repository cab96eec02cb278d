use crate::ranker::Candidate;
use core_types::{ExchangeSnapshot, Fill, OrderSide};
use rust_decimal::Decimal;

/// Walks the ranked `candidates` and fills up to `amount`, mutating the
/// snapshots as it goes. Returns the fills in match order.
///
/// For each candidate the amount taken is capped by what is still requested,
/// by the order's remaining size and by the exchange's remaining balance on
/// the constrained side (asset for a buy, cash for a sell). A sell fill the
/// exchange cannot pay for in full is skipped, never shrunk. Candidates whose
/// order is already exhausted are skipped.
///
/// Every book on the consumed side is swept of exhausted orders before returning.
pub fn allocate(
    exchanges: &mut [ExchangeSnapshot],
    side: OrderSide,
    amount: Decimal,
    candidates: &[Candidate],
) -> Vec<Fill> {
    let mut fills = Vec::new();
    let mut filled = Decimal::ZERO;

    for candidate in candidates {
        if filled >= amount {
            break;
        }

        let Some(exchange) = exchanges.get_mut(candidate.exchange) else {
            continue;
        };

        let ledger = exchange.usable_balance(side);
        if ledger <= Decimal::ZERO {
            tracing::debug!(exchange = %exchange.id, slot = candidate.slot, "exchange drained, skipping candidate");
            continue;
        }

        let (order_id, price, remaining) = match exchange.book(side).get(candidate.slot) {
            Some(order) if !order.is_exhausted() => (order.id.clone(), order.price, order.amount),
            _ => {
                tracing::trace!(exchange = %exchange.id, slot = candidate.slot, "stale candidate, skipping");
                continue;
            }
        };

        let take = (amount - filled).min(remaining).min(ledger);
        let notional = price * take;

        match side {
            OrderSide::Buy => {
                exchange.cash_balance += notional;
                exchange.asset_balance -= take;
            }
            OrderSide::Sell => {
                if exchange.cash_balance < notional {
                    tracing::debug!(
                        exchange = %exchange.id,
                        order = %order_id,
                        required = %notional,
                        available = %exchange.cash_balance,
                        "insufficient cash for fill, skipping candidate"
                    );
                    continue;
                }
                exchange.cash_balance -= notional;
                exchange.asset_balance += take;
            }
        }

        exchange.book_mut(side).consume(candidate.slot, take);

        tracing::debug!(exchange = %exchange.id, order = %order_id, %price, amount = %take, "filled");
        fills.push(Fill {
            exchange_id: exchange.id.clone(),
            order_id,
            price,
            amount: take,
        });
        filled += take;
    }

    for exchange in exchanges.iter_mut() {
        let removed = exchange.book_mut(side).sweep();
        if removed > 0 {
            tracing::debug!(exchange = %exchange.id, removed, book = side.book_name(), "removed consumed orders");
        }
    }

    fills
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ranker::rank_candidates;
    use core_types::{Order, TieBreak};
    use rust_decimal_macros::dec;

    fn run(exchanges: &mut [ExchangeSnapshot], side: OrderSide, amount: Decimal) -> Vec<Fill> {
        let candidates = rank_candidates(exchanges, side, TieBreak::ExchangeId);
        allocate(exchanges, side, amount, &candidates)
    }

    #[test]
    fn buy_moves_asset_out_and_cash_in() {
        let mut exchanges = vec![ExchangeSnapshot::new("x", dec!(10), dec!(0))
            .with_ask(Order::new("a", dec!(10), dec!(100)))];

        let fills = run(&mut exchanges, OrderSide::Buy, dec!(5));

        assert_eq!(fills.len(), 1);
        assert_eq!(exchanges[0].asset_balance, dec!(5));
        assert_eq!(exchanges[0].cash_balance, dec!(500));
        assert_eq!(exchanges[0].asks.orders()[0].amount, dec!(5));
    }

    #[test]
    fn sell_moves_cash_out_and_asset_in() {
        let mut exchanges = vec![ExchangeSnapshot::new("x", dec!(0), dec!(1000))
            .with_bid(Order::new("b", dec!(5), dec!(100)))];

        let fills = run(&mut exchanges, OrderSide::Sell, dec!(5));

        assert_eq!(fills[0].amount, dec!(5));
        assert_eq!(exchanges[0].cash_balance, dec!(500));
        assert_eq!(exchanges[0].asset_balance, dec!(5));
        assert!(exchanges[0].bids.is_empty());
    }

    #[test]
    fn take_is_capped_by_exchange_balance() {
        let mut exchanges = vec![ExchangeSnapshot::new("x", dec!(2), dec!(0))
            .with_ask(Order::new("a", dec!(10), dec!(100)))];

        let fills = run(&mut exchanges, OrderSide::Buy, dec!(5));

        assert_eq!(fills[0].amount, dec!(2));
        assert_eq!(exchanges[0].asset_balance, dec!(0));
        assert_eq!(exchanges[0].asks.orders()[0].amount, dec!(8));
    }

    #[test]
    fn unaffordable_sell_candidate_is_skipped_whole() {
        let mut exchanges = vec![
            ExchangeSnapshot::new("poor", dec!(0), dec!(100))
                .with_bid(Order::new("p", dec!(10), dec!(99))),
            ExchangeSnapshot::new("rich", dec!(0), dec!(1000))
                .with_bid(Order::new("r", dec!(10), dec!(98))),
        ];

        let fills = run(&mut exchanges, OrderSide::Sell, dec!(3));

        assert_eq!(fills.len(), 1);
        assert_eq!(fills[0].exchange_id, "rich");
        assert_eq!(exchanges[0].cash_balance, dec!(100));
        assert_eq!(exchanges[0].bids.orders()[0].amount, dec!(10));
    }

    #[test]
    fn stale_candidates_are_skipped() {
        let mut exchanges = vec![ExchangeSnapshot::new("x", dec!(10), dec!(0))
            .with_ask(Order::new("a", dec!(2), dec!(100)))];
        let mut candidates = rank_candidates(&exchanges, OrderSide::Buy, TieBreak::ExchangeId);
        // Same order referenced twice, plus a slot that does not exist.
        candidates.push(candidates[0]);
        candidates.push(Candidate {
            exchange: 0,
            slot: 7,
            price: dec!(100),
            amount: dec!(1),
        });

        let fills = allocate(&mut exchanges, OrderSide::Buy, dec!(5), &candidates);

        assert_eq!(fills.len(), 1);
        assert_eq!(fills[0].amount, dec!(2));
        assert!(exchanges[0].asks.is_empty());
    }

    #[test]
    fn exhausted_orders_are_swept_from_every_book() {
        let mut exchanges = vec![
            ExchangeSnapshot::new("x", dec!(10), dec!(0))
                .with_ask(Order::new("a", dec!(1), dec!(100))),
            ExchangeSnapshot::new("y", dec!(10), dec!(0))
                .with_ask(Order::new("dust", dec!(0), dec!(100))),
        ];

        let _ = run(&mut exchanges, OrderSide::Buy, dec!(1));

        assert!(exchanges[0].asks.is_empty());
        assert!(exchanges[1].asks.is_empty());
    }

    #[test]
    fn sell_ledger_is_the_cash_balance_itself() {
        let mut exchanges = vec![ExchangeSnapshot::new("x", dec!(0), dec!(10))
            .with_bid(Order::new("b1", dec!(5), dec!(0.8)))
            .with_bid(Order::new("b2", dec!(20), dec!(0.8)))];

        let fills = run(&mut exchanges, OrderSide::Sell, dec!(20));

        // Cash 10 pays 4 for the first order, leaving 6 to cap the second take.
        let amounts: Vec<Decimal> = fills.iter().map(|f| f.amount).collect();
        assert_eq!(amounts, vec![dec!(5), dec!(6)]);
        assert_eq!(exchanges[0].cash_balance, dec!(1.2));
        assert_eq!(exchanges[0].asset_balance, dec!(11));
        assert_eq!(exchanges[0].bids.orders()[0].amount, dec!(14));
    }
}
