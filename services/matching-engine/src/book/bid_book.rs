//! Bid (buy-side) order book
//!
//! Buy orders sorted by price descending (best bid first), FIFO within a
//! price. BTreeMap keeps iteration deterministic and best-side access at
//! O(log P) for P distinct prices.

use std::collections::BTreeMap;
use types::numeric::Price;

use super::price_level::{PriceLevel, RestingOrder};

/// Buy side of a book. The highest price is the best bid.
#[derive(Debug, Clone, Default)]
pub struct BidBook {
    levels: BTreeMap<Price, PriceLevel>,
}

impl BidBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rest an order at the given price.
    pub fn insert(&mut self, price: Price, entry: RestingOrder) {
        self.levels.entry(price).or_default().push(entry);
    }

    /// Best price and the order with time priority there.
    pub fn head(&self) -> Option<(Price, &RestingOrder)> {
        // BTreeMap iterates ascending; bids take the back
        self.levels
            .iter()
            .next_back()
            .and_then(|(price, level)| level.head().map(|entry| (*price, entry)))
    }

    /// Consume lots from the best bid's head order, dropping the price level
    /// once it empties.
    pub fn fill_head(&mut self, quantity: u64) {
        let (price, level) = self
            .levels
            .iter_mut()
            .next_back()
            .expect("fill_head on empty bid book");
        level.fill_head(quantity);
        if level.is_empty() {
            let price = *price;
            self.levels.remove(&price);
        }
    }

    /// Highest bid price.
    pub fn best_price(&self) -> Option<Price> {
        self.levels.keys().next_back().copied()
    }

    /// Top N price levels with their total quantities, best first.
    pub fn depth_snapshot(&self, depth: usize) -> Vec<(Price, u64)> {
        self.levels
            .iter()
            .rev()
            .take(depth)
            .map(|(price, level)| (*price, level.total_quantity()))
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    pub fn order_count(&self) -> usize {
        self.levels.values().map(|l| l.order_count()).sum()
    }
}
