//! Durable storage contract
//!
//! Two append-oriented row shapes: orders (upsert keyed by `order_id`,
//! updating remaining quantity, status, and update time on conflict) and
//! trades (plain insert). A store commits one `PersistenceBatch` atomically;
//! relational backends are external collaborators implementing the same
//! trait.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io;
use std::sync::{Arc, Mutex};
use thiserror::Error;
use types::events::{Event, EventPayload};
use types::numeric::Price;
use types::order::{OrderStatus, OrderType, Side};

/// Storage errors. A failed commit loses that batch for the run; the
/// in-memory journal stays authoritative.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("commit failed: {reason}")]
    CommitFailed { reason: String },
}

/// Row shape of the `orders` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderRow {
    pub order_id: u64,
    pub user_id: String,
    pub symbol: String,
    pub order_type: OrderType,
    pub side: Side,
    pub price: Option<Price>,
    pub quantity: u64,
    pub remaining_qty: u64,
    pub status: OrderStatus,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Row shape of the `trades` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeRow {
    pub trade_id: u64,
    pub symbol: String,
    pub price: Price,
    pub quantity: u64,
    pub buyer_id: String,
    pub seller_id: String,
    pub executed_at: i64,
}

/// One transactional unit of work: order upserts plus trade inserts.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PersistenceBatch {
    pub orders: Vec<OrderRow>,
    pub trades: Vec<TradeRow>,
}

impl PersistenceBatch {
    pub fn row_count(&self) -> usize {
        self.orders.len() + self.trades.len()
    }

    pub fn is_empty(&self) -> bool {
        self.orders.is_empty() && self.trades.is_empty()
    }
}

/// Convert a journaled event into its row, if it has one. Market-data
/// updates are not persisted.
pub fn row_for_event(event: &Event) -> Option<RowKind> {
    match &event.payload {
        EventPayload::OrderPlaced(order) => Some(RowKind::Order(OrderRow {
            order_id: order.order_id,
            user_id: order.user_id.clone(),
            symbol: order.symbol.clone(),
            order_type: order.order_type,
            side: order.side,
            price: order.price,
            quantity: order.quantity,
            remaining_qty: order.remaining_quantity,
            status: order.status,
            created_at: order.timestamp,
            updated_at: event.timestamp,
        })),
        EventPayload::TradeExecuted(trade) => Some(RowKind::Trade(TradeRow {
            trade_id: trade.trade_id,
            symbol: trade.symbol.clone(),
            price: trade.price,
            quantity: trade.quantity,
            buyer_id: trade.buy_user_id.clone(),
            seller_id: trade.sell_user_id.clone(),
            executed_at: trade.timestamp,
        })),
        EventPayload::MarketDataUpdated(_) => None,
    }
}

/// A typed row produced from an event.
#[derive(Debug, Clone, PartialEq)]
pub enum RowKind {
    Order(OrderRow),
    Trade(TradeRow),
}

/// Atomic batch commit into durable storage.
pub trait EventStore: Send {
    fn commit(&mut self, batch: &PersistenceBatch) -> Result<(), StoreError>;
}

/// In-memory store implementing the two-table contract; the backend used
/// by tests.
#[derive(Debug, Default)]
pub struct MemoryStore {
    orders: BTreeMap<u64, OrderRow>,
    trades: Vec<TradeRow>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn order_count(&self) -> usize {
        self.orders.len()
    }

    pub fn trade_count(&self) -> usize {
        self.trades.len()
    }

    pub fn order(&self, order_id: u64) -> Option<&OrderRow> {
        self.orders.get(&order_id)
    }

    pub fn trades(&self) -> &[TradeRow] {
        &self.trades
    }
}

impl EventStore for MemoryStore {
    fn commit(&mut self, batch: &PersistenceBatch) -> Result<(), StoreError> {
        for row in &batch.orders {
            match self.orders.get_mut(&row.order_id) {
                // On conflict, only the mutable columns change
                Some(existing) => {
                    existing.remaining_qty = row.remaining_qty;
                    existing.status = row.status;
                    existing.updated_at = row.updated_at;
                }
                None => {
                    self.orders.insert(row.order_id, row.clone());
                }
            }
        }
        self.trades.extend(batch.trades.iter().cloned());
        Ok(())
    }
}

/// Cloneable handle over a shared `MemoryStore`, so a test can hand the
/// store to the persistence stage and still inspect it afterwards.
#[derive(Debug, Clone, Default)]
pub struct SharedMemoryStore {
    inner: Arc<Mutex<MemoryStore>>,
}

impl SharedMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn order_count(&self) -> usize {
        self.inner.lock().expect("store poisoned").order_count()
    }

    pub fn trade_count(&self) -> usize {
        self.inner.lock().expect("store poisoned").trade_count()
    }

    pub fn order(&self, order_id: u64) -> Option<OrderRow> {
        self.inner
            .lock()
            .expect("store poisoned")
            .order(order_id)
            .cloned()
    }
}

impl EventStore for SharedMemoryStore {
    fn commit(&mut self, batch: &PersistenceBatch) -> Result<(), StoreError> {
        self.inner.lock().expect("store poisoned").commit(batch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use types::order::{Order, TimeInForce};
    use types::trade::Trade;

    fn order_row(order_id: u64, remaining: u64, status: OrderStatus) -> OrderRow {
        OrderRow {
            order_id,
            user_id: "trader1".into(),
            symbol: "BTCUSD".into(),
            order_type: OrderType::Limit,
            side: Side::Buy,
            price: Some(Price::from_str("50000.00").unwrap()),
            quantity: 100,
            remaining_qty: remaining,
            status,
            created_at: 1_000,
            updated_at: 1_000,
        }
    }

    fn trade_row(trade_id: u64) -> TradeRow {
        TradeRow {
            trade_id,
            symbol: "BTCUSD".into(),
            price: Price::from_str("50000.00").unwrap(),
            quantity: 10,
            buyer_id: "b".into(),
            seller_id: "s".into(),
            executed_at: 2_000,
        }
    }

    #[test]
    fn test_memory_store_insert() {
        let mut store = MemoryStore::new();
        let batch = PersistenceBatch {
            orders: vec![order_row(1, 100, OrderStatus::Pending)],
            trades: vec![trade_row(1), trade_row(2)],
        };
        store.commit(&batch).unwrap();

        assert_eq!(store.order_count(), 1);
        assert_eq!(store.trade_count(), 2);
    }

    #[test]
    fn test_order_upsert_updates_mutable_columns_only() {
        let mut store = MemoryStore::new();
        store
            .commit(&PersistenceBatch {
                orders: vec![order_row(1, 100, OrderStatus::Pending)],
                trades: vec![],
            })
            .unwrap();

        let mut conflicting = order_row(1, 40, OrderStatus::PartiallyFilled);
        conflicting.user_id = "someone-else".into();
        conflicting.updated_at = 5_000;
        store
            .commit(&PersistenceBatch {
                orders: vec![conflicting],
                trades: vec![],
            })
            .unwrap();

        let row = store.order(1).unwrap();
        assert_eq!(store.order_count(), 1);
        assert_eq!(row.remaining_qty, 40);
        assert_eq!(row.status, OrderStatus::PartiallyFilled);
        assert_eq!(row.updated_at, 5_000);
        assert_eq!(row.user_id, "trader1", "immutable columns keep first write");
    }

    #[test]
    fn test_row_for_event_partitioning() {
        let order = Order::new(
            1,
            "trader1",
            "BTCUSD",
            OrderType::Limit,
            Side::Buy,
            Some(Price::from_str("50000.00").unwrap()),
            100,
            TimeInForce::Gtc,
            1_000,
        );
        let trade = Trade::new(
            1,
            1,
            2,
            "b",
            "s",
            "BTCUSD",
            Price::from_str("50000.00").unwrap(),
            10,
            2_000,
        );
        let market = types::market::Market::new(
            "BTCUSD",
            "Bitcoin/USD",
            chrono::NaiveTime::from_hms_opt(0, 0, 0).unwrap(),
            chrono::NaiveTime::from_hms_opt(23, 59, 0).unwrap(),
            Price::from_str("0.01").unwrap(),
            1,
            0,
        );

        assert!(matches!(
            row_for_event(&Event::order_placed(1, 1_000, order)),
            Some(RowKind::Order(_))
        ));
        assert!(matches!(
            row_for_event(&Event::trade_executed(2, 2_000, trade)),
            Some(RowKind::Trade(_))
        ));
        assert!(row_for_event(&Event::market_data_updated(3, 3_000, market)).is_none());
    }
}
