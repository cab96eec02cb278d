//! On-disk representation of an exchange snapshot.
//!
//! The file layout nests every order in an `{"Order": {...}}` wrapper and
//! uses PascalCase keys:
//!
//! ```json
//! {
//!   "Id": "exchange-01",
//!   "AvailableFunds": { "Crypto": 10.5, "Euro": 117520.12 },
//!   "OrderBook": {
//!     "Bids": [{ "Order": { "Id": "b-1", "Type": "Buy", "Amount": 0.01, "Price": 2960.64 } }],
//!     "Asks": []
//!   }
//! }
//! ```
//!
//! Order fields other than `Id`, `Amount` and `Price` are kept verbatim.

use core_types::{ExchangeSnapshot, Order, OrderBook};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ExchangeRecord {
    pub id: String,
    pub available_funds: AvailableFundsRecord,
    #[serde(default)]
    pub order_book: OrderBookRecord,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AvailableFundsRecord {
    #[serde(with = "rust_decimal::serde::arbitrary_precision")]
    pub crypto: Decimal,
    #[serde(with = "rust_decimal::serde::arbitrary_precision")]
    pub euro: Decimal,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct OrderBookRecord {
    #[serde(default)]
    pub bids: Vec<BookEntryRecord>,
    #[serde(default)]
    pub asks: Vec<BookEntryRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct BookEntryRecord {
    pub order: OrderRecord,
}

/// A single order. Parsed from a raw JSON object so that unknown fields
/// survive a load/persist cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Map<String, Value>", into = "Map<String, Value>")]
pub struct OrderRecord {
    pub id: Option<String>,
    pub amount: Decimal,
    pub price: Decimal,
    pub extra: Map<String, Value>,
}

impl TryFrom<Map<String, Value>> for OrderRecord {
    type Error = String;

    fn try_from(mut object: Map<String, Value>) -> Result<Self, Self::Error> {
        let id = match object.remove("Id") {
            Some(Value::String(id)) => Some(id),
            Some(Value::Number(id)) => Some(id.to_string()),
            Some(Value::Null) | None => None,
            Some(other) => return Err(format!("order Id must be a string, got {}", other)),
        };
        let amount = take_decimal(&mut object, "Amount")?;
        let price = take_decimal(&mut object, "Price")?;
        Ok(Self {
            id,
            amount,
            price,
            extra: object,
        })
    }
}

impl From<OrderRecord> for Map<String, Value> {
    fn from(record: OrderRecord) -> Self {
        let mut object = record.extra;
        object.insert(
            "Id".to_string(),
            record.id.map(Value::String).unwrap_or(Value::Null),
        );
        object.insert("Amount".to_string(), decimal_to_value(record.amount));
        object.insert("Price".to_string(), decimal_to_value(record.price));
        object
    }
}

fn take_decimal(object: &mut Map<String, Value>, key: &str) -> Result<Decimal, String> {
    let value = object
        .remove(key)
        .ok_or_else(|| format!("order is missing {}", key))?;
    let text = match &value {
        Value::Number(number) => number.to_string(),
        Value::String(text) => text.clone(),
        other => return Err(format!("order {} must be a number, got {}", key, other)),
    };
    Decimal::from_str(&text)
        .or_else(|_| Decimal::from_scientific(&text))
        .map_err(|e| format!("order {} {:?} is not a decimal: {}", key, text, e))
}

fn decimal_to_value(value: Decimal) -> Value {
    let text = value.to_string();
    match Number::from_str(&text) {
        Ok(number) => Value::Number(number),
        Err(_) => Value::String(text),
    }
}

impl ExchangeRecord {
    /// Converts the record into the in-memory snapshot. Orders stored without
    /// an id are given a positional one (`<exchange>-<book>-<slot>`).
    pub fn into_snapshot(self) -> ExchangeSnapshot {
        let bids = book_from_entries(&self.id, "bid", self.order_book.bids);
        let asks = book_from_entries(&self.id, "ask", self.order_book.asks);
        ExchangeSnapshot {
            id: self.id,
            asset_balance: self.available_funds.crypto,
            cash_balance: self.available_funds.euro,
            bids,
            asks,
        }
    }
}

fn book_from_entries(exchange: &str, book: &str, entries: Vec<BookEntryRecord>) -> OrderBook {
    let orders = entries
        .into_iter()
        .enumerate()
        .map(|(slot, entry)| {
            let record = entry.order;
            Order {
                id: record
                    .id
                    .unwrap_or_else(|| format!("{}-{}-{}", exchange, book, slot)),
                amount: record.amount,
                price: record.price,
                extra: record.extra,
            }
        })
        .collect();
    OrderBook::new(orders)
}

impl From<&ExchangeSnapshot> for ExchangeRecord {
    fn from(snapshot: &ExchangeSnapshot) -> Self {
        Self {
            id: snapshot.id.clone(),
            available_funds: AvailableFundsRecord {
                crypto: snapshot.asset_balance,
                euro: snapshot.cash_balance,
            },
            order_book: OrderBookRecord {
                bids: entries_from_book(&snapshot.bids),
                asks: entries_from_book(&snapshot.asks),
            },
        }
    }
}

fn entries_from_book(book: &OrderBook) -> Vec<BookEntryRecord> {
    book.iter()
        .map(|order| BookEntryRecord {
            order: OrderRecord {
                id: Some(order.id.clone()),
                amount: order.amount,
                price: order.price,
                extra: order.extra.clone(),
            },
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    const SAMPLE: &str = r#"{
        "Id": "exchange-01",
        "AvailableFunds": { "Crypto": 10.8503, "Euro": 117520.12 },
        "OrderBook": {
            "Bids": [
                { "Order": { "Id": null, "Time": "0001-01-01T00:00:00", "Type": "Buy", "Kind": "Limit", "Amount": 0.01, "Price": 2960.64 } }
            ],
            "Asks": [
                { "Order": { "Id": "ask-1", "Type": "Sell", "Amount": "0.405", "Price": 2964.29 } }
            ]
        }
    }"#;

    #[test]
    fn parses_the_exchange_file_layout() {
        let record: ExchangeRecord = serde_json::from_str(SAMPLE).unwrap();
        let snapshot = record.into_snapshot();

        assert_eq!(snapshot.id, "exchange-01");
        assert_eq!(snapshot.asset_balance, dec!(10.8503));
        assert_eq!(snapshot.cash_balance, dec!(117520.12));

        let bid = &snapshot.bids.orders()[0];
        assert_eq!(bid.id, "exchange-01-bid-0");
        assert_eq!(bid.amount, dec!(0.01));
        assert_eq!(bid.price, dec!(2960.64));
        assert_eq!(bid.extra.get("Kind"), Some(&Value::String("Limit".to_string())));

        let ask = &snapshot.asks.orders()[0];
        assert_eq!(ask.id, "ask-1");
        assert_eq!(ask.amount, dec!(0.405));
    }

    #[test]
    fn snapshot_survives_a_write_and_read() {
        let record: ExchangeRecord = serde_json::from_str(SAMPLE).unwrap();
        let snapshot = record.into_snapshot();

        let json = serde_json::to_string(&ExchangeRecord::from(&snapshot)).unwrap();
        let reloaded: ExchangeRecord = serde_json::from_str(&json).unwrap();

        assert_eq!(reloaded.into_snapshot(), snapshot);
        assert!(json.contains("\"Time\":\"0001-01-01T00:00:00\""));
    }

    #[test]
    fn missing_book_sides_default_to_empty() {
        let record: ExchangeRecord = serde_json::from_str(
            r#"{"Id": "x", "AvailableFunds": {"Crypto": 1, "Euro": 2}, "OrderBook": {"Asks": []}}"#,
        )
        .unwrap();

        assert!(record.order_book.bids.is_empty());
    }

    #[test]
    fn order_without_price_is_rejected() {
        let result: Result<ExchangeRecord, _> = serde_json::from_str(
            r#"{"Id": "x", "AvailableFunds": {"Crypto": 1, "Euro": 2},
                "OrderBook": {"Bids": [{"Order": {"Id": "b", "Amount": 1}}]}}"#,
        );

        assert!(result.is_err());
    }
}
