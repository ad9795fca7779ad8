//! Order book infrastructure
//!
//! Per-symbol book holding both sides, plus the price-level and side-book
//! building blocks.

pub mod ask_book;
pub mod bid_book;
pub mod price_level;

pub use ask_book::AskBook;
pub use bid_book::BidBook;
pub use price_level::{PriceLevel, RestingOrder};

use types::numeric::Price;
use types::order::{Order, Side};

/// Both sides of one symbol's book.
///
/// Holds only orders with remaining quantity that are eligible to rest.
/// Top-of-book queries use the zero-price sentinel for an empty side, so a
/// `Market` snapshot can be built without optional plumbing.
#[derive(Debug, Clone)]
pub struct OrderBook {
    symbol: String,
    pub bids: BidBook,
    pub asks: AskBook,
}

impl OrderBook {
    pub fn new(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            bids: BidBook::new(),
            asks: AskBook::new(),
        }
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    /// Rest an order on its side of the book.
    ///
    /// # Panics
    /// Panics if the order has no limit price; only limit orders rest.
    pub fn rest(&mut self, order: &Order) {
        let price = order
            .price
            .expect("resting order must carry a limit price");
        let entry = RestingOrder {
            order_id: order.order_id,
            user_id: order.user_id.clone(),
            remaining_quantity: order.remaining_quantity,
            timestamp: order.timestamp,
        };
        match order.side {
            Side::Buy => self.bids.insert(price, entry),
            Side::Sell => self.asks.insert(price, entry),
        }
    }

    /// Best bid price, or the zero sentinel when the side is empty.
    pub fn best_bid(&self) -> Price {
        self.bids.best_price().unwrap_or_else(Price::zero)
    }

    /// Best ask price, or the zero sentinel when the side is empty.
    pub fn best_ask(&self) -> Price {
        self.asks.best_price().unwrap_or_else(Price::zero)
    }

    /// Remaining quantity of the head order at the best bid.
    pub fn bid_qty(&self) -> u64 {
        self.bids.head().map(|(_, entry)| entry.remaining_quantity).unwrap_or(0)
    }

    /// Remaining quantity of the head order at the best ask.
    pub fn ask_qty(&self) -> u64 {
        self.asks.head().map(|(_, entry)| entry.remaining_quantity).unwrap_or(0)
    }

    /// Total resting orders across both sides.
    pub fn order_count(&self) -> usize {
        self.bids.order_count() + self.asks.order_count()
    }

    pub fn is_empty(&self) -> bool {
        self.bids.is_empty() && self.asks.is_empty()
    }
}
