//! Market state types
//!
//! A `Market` is an immutable snapshot keyed by symbol. Every state
//! transition produces a new value with a monotone `last_update_time`, which
//! keeps snapshots safe to share across threads after publication.

use crate::numeric::Price;
use crate::trade::Trade;
use chrono::{DateTime, NaiveTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Market trading status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MarketStatus {
    Closed,
    Open,
    Suspended,
    PreOpen,
    PostClose,
}

/// Immutable snapshot of a market's state.
///
/// `best_bid`/`best_ask` use the zero-price sentinel for an empty book side.
/// When `daily_volume > 0`, `daily_high >= last_price >= daily_low`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Market {
    pub symbol: String,
    pub name: String,
    pub status: MarketStatus,
    pub last_price: Price,
    pub best_bid: Price,
    pub best_ask: Price,
    pub bid_qty: u64,
    pub ask_qty: u64,
    pub daily_high: Price,
    pub daily_low: Price,
    pub daily_volume: u64,
    pub daily_turnover: Decimal,
    /// Unix nanoseconds of the last state transition.
    pub last_update_time: i64,
    /// Wall-clock time-of-day when the market opens.
    pub open_time: NaiveTime,
    /// Wall-clock time-of-day when the market closes.
    pub close_time: NaiveTime,
    pub tick_size: Price,
    pub min_order_size: u64,
}

impl Market {
    /// Create a new market in CLOSED status with empty daily statistics.
    pub fn new(
        symbol: impl Into<String>,
        name: impl Into<String>,
        open_time: NaiveTime,
        close_time: NaiveTime,
        tick_size: Price,
        min_order_size: u64,
        now: i64,
    ) -> Self {
        assert!(!tick_size.is_zero(), "tick size must be positive");
        Self {
            symbol: symbol.into(),
            name: name.into(),
            status: MarketStatus::Closed,
            last_price: Price::zero(),
            best_bid: Price::zero(),
            best_ask: Price::zero(),
            bid_qty: 0,
            ask_qty: 0,
            daily_high: Price::zero(),
            daily_low: Price::zero(),
            daily_volume: 0,
            daily_turnover: Decimal::ZERO,
            last_update_time: now,
            open_time,
            close_time,
            tick_size,
            min_order_size,
        }
    }

    /// Produce a new snapshot with the given status.
    pub fn with_status(&self, status: MarketStatus, now: i64) -> Self {
        Self {
            status,
            last_update_time: self.monotone(now),
            ..self.clone()
        }
    }

    /// Fold an executed trade into the daily statistics.
    ///
    /// Updates last price, high/low watermarks, volume, and turnover.
    pub fn apply_trade(&self, trade: &Trade, now: i64) -> Self {
        let new_high = self.daily_high.max(trade.price);
        let new_low = if self.daily_low.is_zero() {
            trade.price
        } else {
            self.daily_low.min(trade.price)
        };
        Self {
            last_price: trade.price,
            daily_high: new_high,
            daily_low: new_low,
            daily_volume: self.daily_volume + trade.quantity,
            daily_turnover: self.daily_turnover + trade.value(),
            last_update_time: self.monotone(now),
            ..self.clone()
        }
    }

    /// Produce a new snapshot with refreshed top-of-book quotes.
    pub fn with_quotes(
        &self,
        best_bid: Price,
        best_ask: Price,
        bid_qty: u64,
        ask_qty: u64,
        now: i64,
    ) -> Self {
        Self {
            best_bid,
            best_ask,
            bid_qty,
            ask_qty,
            last_update_time: self.monotone(now),
            ..self.clone()
        }
    }

    /// Whether the market accepts orders at the given instant: status must
    /// be OPEN and the time-of-day must fall within [open_time, close_time).
    pub fn is_open_at(&self, now: i64) -> bool {
        if self.status != MarketStatus::Open {
            return false;
        }
        let tod = time_of_day(now);
        tod >= self.open_time && tod < self.close_time
    }

    /// Validate a limit price: strictly positive and tick-aligned.
    pub fn is_valid_price(&self, price: Price) -> bool {
        price.is_tick_aligned(self.tick_size)
    }

    /// Validate an order size against the market minimum.
    pub fn is_valid_order_size(&self, quantity: u64) -> bool {
        quantity >= self.min_order_size
    }

    /// Bid/ask spread, or the zero sentinel when either side is empty.
    pub fn spread(&self) -> Price {
        if self.best_bid.is_zero() || self.best_ask.is_zero() {
            Price::zero()
        } else {
            self.best_ask - self.best_bid
        }
    }

    fn monotone(&self, now: i64) -> i64 {
        now.max(self.last_update_time)
    }
}

/// Time-of-day component of a Unix-nanosecond timestamp (UTC).
pub fn time_of_day(nanos: i64) -> NaiveTime {
    DateTime::from_timestamp_nanos(nanos).time()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trade::Trade;

    fn make_market() -> Market {
        Market::new(
            "BTCUSD",
            "Bitcoin/USD",
            NaiveTime::from_hms_opt(0, 0, 0).unwrap(),
            NaiveTime::from_hms_opt(23, 59, 0).unwrap(),
            Price::from_str("0.01").unwrap(),
            1,
            1_708_123_456_789_000_000,
        )
        .with_status(MarketStatus::Open, 1_708_123_456_789_000_000)
    }

    fn make_trade(price: &str, quantity: u64) -> Trade {
        Trade::new(
            1,
            10,
            11,
            "b",
            "s",
            "BTCUSD",
            Price::from_str(price).unwrap(),
            quantity,
            1_708_123_456_790_000_000,
        )
    }

    #[test]
    fn test_market_initial_state() {
        let market = make_market();
        assert_eq!(market.status, MarketStatus::Open);
        assert!(market.last_price.is_zero());
        assert_eq!(market.daily_volume, 0);
    }

    #[test]
    fn test_apply_trade_updates_stats() {
        let market = make_market();
        let updated = market.apply_trade(&make_trade("50001.00", 30), 1_708_123_456_790_000_000);

        assert_eq!(updated.last_price, Price::from_str("50001.00").unwrap());
        assert_eq!(updated.daily_high, Price::from_str("50001.00").unwrap());
        assert_eq!(updated.daily_low, Price::from_str("50001.00").unwrap());
        assert_eq!(updated.daily_volume, 30);
        assert_eq!(
            updated.daily_turnover,
            Price::from_str("50001.00").unwrap().notional(30)
        );
    }

    #[test]
    fn test_high_low_watermarks() {
        let market = make_market()
            .apply_trade(&make_trade("50000.00", 10), 1)
            .apply_trade(&make_trade("50010.00", 10), 2)
            .apply_trade(&make_trade("49990.00", 10), 3);

        assert_eq!(market.daily_high, Price::from_str("50010.00").unwrap());
        assert_eq!(market.daily_low, Price::from_str("49990.00").unwrap());
        assert_eq!(market.last_price, Price::from_str("49990.00").unwrap());
        assert_eq!(market.daily_volume, 30);
    }

    #[test]
    fn test_last_update_time_monotone() {
        let market = make_market();
        let t1 = market.last_update_time;
        // A stale clock reading must not move the update time backwards
        let updated = market.with_status(MarketStatus::Suspended, t1 - 1_000);
        assert_eq!(updated.last_update_time, t1);
    }

    #[test]
    fn test_is_open_at() {
        let market = make_market();
        assert!(market.is_open_at(1_708_123_456_789_000_000));

        let suspended = market.with_status(MarketStatus::Suspended, 1_708_123_456_789_000_001);
        assert!(!suspended.is_open_at(1_708_123_456_789_000_002));
    }

    #[test]
    fn test_is_open_at_respects_hours() {
        let market = Market::new(
            "BTCUSD",
            "Bitcoin/USD",
            NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            NaiveTime::from_hms_opt(17, 0, 0).unwrap(),
            Price::from_str("0.01").unwrap(),
            1,
            0,
        )
        .with_status(MarketStatus::Open, 0);

        // 1970-01-01 00:00 UTC is before 09:00 open
        assert!(!market.is_open_at(0));
        // 12:00 UTC is within hours
        assert!(market.is_open_at(12 * 3600 * 1_000_000_000));
        // 17:00 UTC is exactly the close boundary
        assert!(!market.is_open_at(17 * 3600 * 1_000_000_000));
    }

    #[test]
    fn test_price_validation() {
        let market = make_market();
        assert!(market.is_valid_price(Price::from_str("50000.01").unwrap()));
        assert!(!market.is_valid_price(Price::from_str("50000.005").unwrap()));
        assert!(!market.is_valid_price(Price::zero()));
    }

    #[test]
    fn test_order_size_validation() {
        let market = make_market();
        assert!(market.is_valid_order_size(1));
        assert!(!market.is_valid_order_size(0));
    }

    #[test]
    fn test_spread() {
        let market = make_market().with_quotes(
            Price::from_str("50000.00").unwrap(),
            Price::from_str("50001.00").unwrap(),
            10,
            20,
            1,
        );
        assert_eq!(market.spread(), Price::from_str("1.00").unwrap());

        let empty = make_market();
        assert!(empty.spread().is_zero());
    }

    #[test]
    fn test_market_serialization_roundtrip() {
        let market = make_market();
        let json = serde_json::to_string(&market).unwrap();
        assert!(json.contains("\"OPEN\""));
        let deserialized: Market = serde_json::from_str(&json).unwrap();
        assert_eq!(market, deserialized);
    }
}
