//! Price level with FIFO order queue
//!
//! A price level holds every resting order at one price point, in strict
//! arrival order. The head of the queue is always the order with time
//! priority at this price.

use std::collections::VecDeque;

/// A resting order as the book sees it: identity plus what is left to fill.
#[derive(Debug, Clone, PartialEq)]
pub struct RestingOrder {
    pub order_id: u64,
    pub user_id: String,
    pub remaining_quantity: u64,
    /// Ingestion timestamp of the order; ties at a price break on this.
    pub timestamp: i64,
}

/// All resting orders at a single price, FIFO.
#[derive(Debug, Clone, Default)]
pub struct PriceLevel {
    orders: VecDeque<RestingOrder>,
    total_quantity: u64,
}

impl PriceLevel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an order at the back of the queue (loses time priority to
    /// everything already resting here).
    pub fn push(&mut self, entry: RestingOrder) {
        self.total_quantity += entry.remaining_quantity;
        self.orders.push_back(entry);
    }

    /// The order with time priority at this price.
    pub fn head(&self) -> Option<&RestingOrder> {
        self.orders.front()
    }

    /// Consume `quantity` lots from the head order. A fully consumed head is
    /// removed; a partially consumed head keeps its place and timestamp.
    ///
    /// # Panics
    /// Panics if the level is empty or the head holds fewer lots.
    pub fn fill_head(&mut self, quantity: u64) {
        let head = self
            .orders
            .front_mut()
            .expect("fill_head on empty price level");
        assert!(
            head.remaining_quantity >= quantity,
            "fill exceeds head order remaining quantity"
        );
        head.remaining_quantity -= quantity;
        self.total_quantity -= quantity;
        if head.remaining_quantity == 0 {
            self.orders.pop_front();
        }
    }

    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }

    /// Sum of remaining quantities across all orders at this price.
    pub fn total_quantity(&self) -> u64 {
        self.total_quantity
    }

    pub fn order_count(&self) -> usize {
        self.orders.len()
    }
}
