//! Trade execution types
//!
//! A trade binds a buy order to a sell order at the resting order's price.
//! The buyer is always the BUY-side order regardless of which side was
//! resting when the match happened.

use crate::numeric::Price;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A completed trade between two orders. Immutable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub trade_id: u64,
    pub buy_order_id: u64,
    pub sell_order_id: u64,
    pub buy_user_id: String,
    pub sell_user_id: String,
    pub symbol: String,
    pub price: Price,
    pub quantity: u64,
    /// Match instant, Unix nanoseconds.
    pub timestamp: i64,
}

impl Trade {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        trade_id: u64,
        buy_order_id: u64,
        sell_order_id: u64,
        buy_user_id: impl Into<String>,
        sell_user_id: impl Into<String>,
        symbol: impl Into<String>,
        price: Price,
        quantity: u64,
        timestamp: i64,
    ) -> Self {
        Self {
            trade_id,
            buy_order_id,
            sell_order_id,
            buy_user_id: buy_user_id.into(),
            sell_user_id: sell_user_id.into(),
            symbol: symbol.into(),
            price,
            quantity,
            timestamp,
        }
    }

    /// Trade value (price x quantity).
    pub fn value(&self) -> Decimal {
        self.price.notional(self.quantity)
    }
}
