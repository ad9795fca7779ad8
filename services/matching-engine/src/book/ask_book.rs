//! Ask (sell-side) order book
//!
//! Sell orders sorted by price ascending (best ask first), FIFO within a
//! price.

use std::collections::BTreeMap;
use types::numeric::Price;

use super::price_level::{PriceLevel, RestingOrder};

/// Sell side of a book. The lowest price is the best ask.
#[derive(Debug, Clone, Default)]
pub struct AskBook {
    levels: BTreeMap<Price, PriceLevel>,
}

impl AskBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rest an order at the given price.
    pub fn insert(&mut self, price: Price, entry: RestingOrder) {
        self.levels.entry(price).or_default().push(entry);
    }

    /// Best price and the order with time priority there.
    pub fn head(&self) -> Option<(Price, &RestingOrder)> {
        self.levels
            .iter()
            .next()
            .and_then(|(price, level)| level.head().map(|entry| (*price, entry)))
    }

    /// Consume lots from the best ask's head order, dropping the price level
    /// once it empties.
    pub fn fill_head(&mut self, quantity: u64) {
        let (price, level) = self
            .levels
            .iter_mut()
            .next()
            .expect("fill_head on empty ask book");
        level.fill_head(quantity);
        if level.is_empty() {
            let price = *price;
            self.levels.remove(&price);
        }
    }

    /// Lowest ask price.
    pub fn best_price(&self) -> Option<Price> {
        self.levels.keys().next().copied()
    }

    /// Top N price levels with their total quantities, best first.
    pub fn depth_snapshot(&self, depth: usize) -> Vec<(Price, u64)> {
        self.levels
            .iter()
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
