//! Order lifecycle types
//!
//! Orders are immutable values: every fill produces a new `Order` with the
//! same identity and an updated remaining quantity and status. Order ids are
//! monotone `u64` values assigned by the business-logic processor.

use crate::numeric::Price;
use serde::{Deserialize, Serialize};

/// Order type (only MARKET and LIMIT are realized; STOP variants are
/// reserved for the wire contract).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderType {
    Market,
    Limit,
    Stop,
    StopLimit,
}

/// Order side (buyer or seller)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    /// Get the opposite side
    pub fn opposite(&self) -> Self {
        match self {
            Side::Buy => Side::Sell,
            Side::Sell => Side::Buy,
        }
    }
}

/// Time-in-force policy
///
/// GTC rests until filled, IOC matches what it can and discards the rest,
/// FOK requires a full immediate fill or aborts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TimeInForce {
    Gtc,
    Ioc,
    Fok,
}

/// Order status
///
/// PENDING -> (PARTIALLY_FILLED)* -> FILLED, or PENDING -> REJECTED at
/// validation. CANCELLED is reserved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    Pending,
    PartiallyFilled,
    Filled,
    Cancelled,
    Rejected,
}

impl OrderStatus {
    /// Check if status is terminal (no further transitions possible)
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            OrderStatus::Filled | OrderStatus::Cancelled | OrderStatus::Rejected
        )
    }
}

/// A trading order.
///
/// `price` is `None` for market orders. Invariants:
/// `remaining_quantity <= quantity`, and `status == Filled` exactly when
/// `remaining_quantity == 0`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub order_id: u64,
    pub user_id: String,
    pub symbol: String,
    pub order_type: OrderType,
    pub side: Side,
    pub price: Option<Price>,
    pub quantity: u64,
    pub remaining_quantity: u64,
    pub status: OrderStatus,
    /// Ingestion instant, Unix nanoseconds. Monotone with `order_id`.
    pub timestamp: i64,
    pub time_in_force: TimeInForce,
}

impl Order {
    /// Create a newly accepted order in PENDING state.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        order_id: u64,
        user_id: impl Into<String>,
        symbol: impl Into<String>,
        order_type: OrderType,
        side: Side,
        price: Option<Price>,
        quantity: u64,
        time_in_force: TimeInForce,
        timestamp: i64,
    ) -> Self {
        Self {
            order_id,
            user_id: user_id.into(),
            symbol: symbol.into(),
            order_type,
            side,
            price,
            quantity,
            remaining_quantity: quantity,
            status: OrderStatus::Pending,
            timestamp,
            time_in_force,
        }
    }

    /// Produce a new order value with `fill_quantity` lots filled.
    ///
    /// The remaining quantity saturates at zero; status moves to FILLED when
    /// nothing remains, PARTIALLY_FILLED otherwise.
    pub fn fill(&self, fill_quantity: u64) -> Self {
        let remaining = self.remaining_quantity.saturating_sub(fill_quantity);
        let status = if remaining == 0 {
            OrderStatus::Filled
        } else {
            OrderStatus::PartiallyFilled
        };
        Self {
            remaining_quantity: remaining,
            status,
            ..self.clone()
        }
    }

    /// Produce a new order value with the given status.
    pub fn with_status(&self, status: OrderStatus) -> Self {
        Self {
            status,
            ..self.clone()
        }
    }

    /// Lots filled so far.
    pub fn filled_quantity(&self) -> u64 {
        self.quantity - self.remaining_quantity
    }

    /// Check if order is completely filled
    pub fn is_filled(&self) -> bool {
        self.remaining_quantity == 0
    }

    /// Whether the order may rest in (or remain in) a book.
    pub fn is_active(&self) -> bool {
        matches!(
            self.status,
            OrderStatus::Pending | OrderStatus::PartiallyFilled
        )
    }

    /// Check quantity/status invariants.
    pub fn check_invariant(&self) -> bool {
        self.remaining_quantity <= self.quantity
            && ((self.status == OrderStatus::Filled) == (self.remaining_quantity == 0)
                || self.status == OrderStatus::Rejected
                || self.status == OrderStatus::Cancelled)
    }
}
