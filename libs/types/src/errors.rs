//! Error taxonomy for order intake
//!
//! Rejections are synchronous outcomes of validation: they consume no order
//! id and journal no event. Transport and persistence failures live with
//! their own crates.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Why an order submission was rejected before matching.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RejectReason {
    #[error("unknown market: {symbol}")]
    UnknownMarket { symbol: String },

    #[error("market {symbol} is not open for trading")]
    MarketClosed { symbol: String },

    #[error("invalid price: {detail}")]
    InvalidPrice { detail: String },

    #[error("invalid quantity: {detail}")]
    InvalidQuantity { detail: String },
}
