use crate::enums::OrderSide;
use crate::error::CoreError;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

/// A resting order in an exchange's book.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: String,
    /// Remaining amount of the tradable asset. Only ever decreases.
    pub amount: Decimal,
    pub price: Decimal,
    /// Venue-specific fields (timestamps, order kind, ...) carried through untouched.
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub extra: Map<String, Value>,
}

impl Order {
    pub fn new(id: impl Into<String>, amount: Decimal, price: Decimal) -> Self {
        Self {
            id: id.into(),
            amount,
            price,
            extra: Map::new(),
        }
    }

    /// An exhausted order has nothing left to trade and is due for removal.
    pub fn is_exhausted(&self) -> bool {
        self.amount <= Decimal::ZERO
    }
}

/// One side (bids or asks) of a single exchange's order book.
///
/// Orders are addressed by their slot, i.e. their position in the book. Slots
/// stay stable while orders are consumed; exhausted orders are only dropped by
/// [`OrderBook::sweep`], which callers run once they hold no more slot references.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderBook {
    orders: Vec<Order>,
}

impl OrderBook {
    pub fn new(orders: Vec<Order>) -> Self {
        Self { orders }
    }

    pub fn orders(&self) -> &[Order] {
        &self.orders
    }

    pub fn get(&self, slot: usize) -> Option<&Order> {
        self.orders.get(slot)
    }

    pub fn len(&self) -> usize {
        self.orders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Order> {
        self.orders.iter()
    }

    pub fn push(&mut self, order: Order) {
        self.orders.push(order);
    }

    /// Decrements the order at `slot` by `amount` and returns what remains.
    ///
    /// Returns `None` when the slot does not exist or its order is already
    /// exhausted, so a stale reference never consumes anything.
    pub fn consume(&mut self, slot: usize, amount: Decimal) -> Option<Decimal> {
        let order = self.orders.get_mut(slot)?;
        if order.is_exhausted() {
            return None;
        }
        order.amount -= amount;
        Some(order.amount)
    }

    /// Removes every exhausted order. Returns how many were removed.
    pub fn sweep(&mut self) -> usize {
        let before = self.orders.len();
        self.orders.retain(|order| !order.is_exhausted());
        before - self.orders.len()
    }

    /// Orders sorted by ascending price, for display.
    pub fn sorted_by_price(&self) -> Vec<&Order> {
        let mut sorted: Vec<&Order> = self.orders.iter().collect();
        sorted.sort_by(|a, b| a.price.cmp(&b.price));
        sorted
    }
}

/// The in-memory state of one exchange for the duration of a single run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExchangeSnapshot {
    pub id: String,
    /// The tradable crypto held on the exchange.
    pub asset_balance: Decimal,
    /// The quote currency held on the exchange.
    pub cash_balance: Decimal,
    pub bids: OrderBook,
    pub asks: OrderBook,
}

impl ExchangeSnapshot {
    pub fn new(id: impl Into<String>, asset_balance: Decimal, cash_balance: Decimal) -> Self {
        Self {
            id: id.into(),
            asset_balance,
            cash_balance,
            bids: OrderBook::default(),
            asks: OrderBook::default(),
        }
    }

    pub fn with_bid(mut self, order: Order) -> Self {
        self.bids.push(order);
        self
    }

    pub fn with_ask(mut self, order: Order) -> Self {
        self.asks.push(order);
        self
    }

    /// The book a request on `side` is filled against.
    pub fn book(&self, side: OrderSide) -> &OrderBook {
        match side {
            OrderSide::Buy => &self.asks,
            OrderSide::Sell => &self.bids,
        }
    }

    pub fn book_mut(&mut self, side: OrderSide) -> &mut OrderBook {
        match side {
            OrderSide::Buy => &mut self.asks,
            OrderSide::Sell => &mut self.bids,
        }
    }

    /// The balance that limits fills on `side`: the asset balance for a buy,
    /// the cash balance for a sell.
    pub fn usable_balance(&self, side: OrderSide) -> Decimal {
        match side {
            OrderSide::Buy => self.asset_balance,
            OrderSide::Sell => self.cash_balance,
        }
    }

    /// Checks the non-negativity invariants of balances and orders.
    pub fn validate(&self) -> Result<(), CoreError> {
        self.check_balances()?;
        for order in self.bids.iter().chain(self.asks.iter()) {
            if order.amount < Decimal::ZERO {
                return Err(CoreError::InvalidOrder {
                    exchange: self.id.clone(),
                    order_id: order.id.clone(),
                    reason: format!("negative amount {}", order.amount),
                });
            }
            if order.price <= Decimal::ZERO {
                return Err(CoreError::InvalidOrder {
                    exchange: self.id.clone(),
                    order_id: order.id.clone(),
                    reason: format!("non-positive price {}", order.price),
                });
            }
        }
        Ok(())
    }

    /// Checks that neither balance is negative.
    pub fn check_balances(&self) -> Result<(), CoreError> {
        if self.asset_balance < Decimal::ZERO {
            return Err(CoreError::NegativeBalance {
                exchange: self.id.clone(),
                field: "asset",
                value: self.asset_balance,
            });
        }
        if self.cash_balance < Decimal::ZERO {
            return Err(CoreError::NegativeBalance {
                exchange: self.id.clone(),
                field: "cash",
                value: self.cash_balance,
            });
        }
        Ok(())
    }
}

/// A concrete, executed portion of a resting order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fill {
    pub exchange_id: String,
    pub order_id: String,
    /// Copied from the matched order.
    pub price: Decimal,
    pub amount: Decimal,
}

impl Fill {
    pub fn notional(&self) -> Decimal {
        self.price * self.amount
    }
}

/// The result of one best-execution run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionPlan {
    pub plan_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub side: OrderSide,
    pub requested_amount: Decimal,
    /// Size-weighted average price of all fills, zero when nothing was filled.
    pub best_price: Decimal,
    pub fills: Vec<Fill>,
}

impl ExecutionPlan {
    pub fn new(
        side: OrderSide,
        requested_amount: Decimal,
        best_price: Decimal,
        fills: Vec<Fill>,
    ) -> Self {
        Self {
            plan_id: Uuid::new_v4(),
            created_at: Utc::now(),
            side,
            requested_amount,
            best_price,
            fills,
        }
    }

    /// A plan with no fills and a zero best price.
    pub fn empty(side: OrderSide, requested_amount: Decimal) -> Self {
        Self::new(side, requested_amount, Decimal::ZERO, Vec::new())
    }

    pub fn is_empty(&self) -> bool {
        self.fills.is_empty()
    }

    pub fn filled_amount(&self) -> Decimal {
        self.fills.iter().map(|fill| fill.amount).sum()
    }

    pub fn total_notional(&self) -> Decimal {
        self.fills.iter().map(Fill::notional).sum()
    }

    /// Whether the fills cover the whole requested amount.
    pub fn is_complete(&self) -> bool {
        self.filled_amount() >= self.requested_amount
    }

    /// Distinct exchanges touched by the plan, in first-fill order.
    pub fn exchange_ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = Vec::new();
        for fill in &self.fills {
            if !ids.contains(&fill.exchange_id.as_str()) {
                ids.push(fill.exchange_id.as_str());
            }
        }
        ids
    }
}
