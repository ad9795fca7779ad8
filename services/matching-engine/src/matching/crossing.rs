//! Crossing detection
//!
//! A limit order crosses a resting order when its price is at least as
//! aggressive: buy at or above the resting ask, sell at or below the
//! resting bid. Market orders cross anything.

use types::numeric::Price;
use types::order::Side;

/// Whether an incoming limit order at `limit` can trade against a resting
/// order at `resting`.
pub fn crosses(incoming_side: Side, limit: Price, resting: Price) -> bool {
    match incoming_side {
        Side::Buy => limit >= resting,
        Side::Sell => limit <= resting,
    }
}
