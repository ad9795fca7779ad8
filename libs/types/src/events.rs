//! Journaled event definitions
//!
//! Every state-changing action of the business-logic processor produces an
//! `Event` with a gap-free, strictly increasing `sequence_id`. Events are
//! immutable values and may be shared freely once published.
//!
//! `Ord` is by `sequence_id` so consumers can sort deterministically.

use crate::market::Market;
use crate::order::Order;
use crate::trade::Trade;
use serde::{Deserialize, Serialize};

/// A journaled exchange event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Gap-free, monotonically increasing sequence number.
    pub sequence_id: u64,
    /// Unix nanoseconds when the event was produced.
    pub timestamp: i64,
    /// Event-specific payload.
    #[serde(flatten)]
    pub payload: EventPayload,
}

/// Event payload variants, tagged for the wire contract.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum EventPayload {
    /// An order passed validation and entered matching.
    #[serde(rename = "ORDER_PLACED")]
    OrderPlaced(Order),
    /// A trade was executed between two orders.
    #[serde(rename = "TRADE_EXECUTED")]
    TradeExecuted(Trade),
    /// A market snapshot changed after executed trades.
    #[serde(rename = "MARKET_DATA_UPDATED")]
    MarketDataUpdated(Market),
}

impl Event {
    pub fn order_placed(sequence_id: u64, timestamp: i64, order: Order) -> Self {
        Self {
            sequence_id,
            timestamp,
            payload: EventPayload::OrderPlaced(order),
        }
    }

    pub fn trade_executed(sequence_id: u64, timestamp: i64, trade: Trade) -> Self {
        Self {
            sequence_id,
            timestamp,
            payload: EventPayload::TradeExecuted(trade),
        }
    }

    pub fn market_data_updated(sequence_id: u64, timestamp: i64, market: Market) -> Self {
        Self {
            sequence_id,
            timestamp,
            payload: EventPayload::MarketDataUpdated(market),
        }
    }

    /// Wire-contract type string.
    pub fn event_type(&self) -> &'static str {
        match &self.payload {
            EventPayload::OrderPlaced(_) => "ORDER_PLACED",
            EventPayload::TradeExecuted(_) => "TRADE_EXECUTED",
            EventPayload::MarketDataUpdated(_) => "MARKET_DATA_UPDATED",
        }
    }

    /// Symbol the event concerns.
    pub fn symbol(&self) -> &str {
        match &self.payload {
            EventPayload::OrderPlaced(order) => &order.symbol,
            EventPayload::TradeExecuted(trade) => &trade.symbol,
            EventPayload::MarketDataUpdated(market) => &market.symbol,
        }
    }
}

impl Eq for Event {}

impl Ord for Event {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.sequence_id.cmp(&other.sequence_id)
    }
}

impl PartialOrd for Event {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}
