//! Randomized property tests over the business-logic processor
//!
//! A seeded order stream (deterministic across runs) drives the processor
//! single-threaded; the quantified invariants are then checked against the
//! journal, the trade history, and the active set.

use exchange_core::{ExchangeConfig, Processor, RecordingListener, OrderRequest};
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use rust_decimal::Decimal;
use std::collections::{BTreeMap, HashMap};
use types::events::EventPayload;
use types::market::Market;
use types::numeric::Price;
use types::order::{Order, OrderType, Side, TimeInForce};

// Midday UTC, inside the 00:00-23:59 trading window
fn fixed_noon() -> i64 {
    1_708_084_800_000_000_000
}

fn seeded_markets() -> Vec<Market> {
    ExchangeConfig::default()
        .markets
        .iter()
        .map(|seed| seed.to_market(fixed_noon()))
        .collect()
}

/// Deterministic random order stream around a 0.01 tick grid.
fn random_request(rng: &mut ChaCha8Rng) -> OrderRequest {
    let side = if rng.gen_bool(0.5) { Side::Buy } else { Side::Sell };
    let is_market = rng.gen_bool(0.2);
    let tif = match rng.gen_range(0..10) {
        0..=6 => TimeInForce::Gtc,
        7..=8 => TimeInForce::Ioc,
        _ => TimeInForce::Fok,
    };
    // 49990.00 ..= 50010.00 in exact 0.01 steps
    let ticks: i64 = 4_999_000 + rng.gen_range(0..=2_000);
    let price = Price::new(Decimal::new(ticks, 2));

    OrderRequest {
        user_id: format!("user{}", rng.gen_range(0..8)),
        symbol: "BTCUSD".to_string(),
        order_type: if is_market { OrderType::Market } else { OrderType::Limit },
        side,
        price: if is_market { None } else { Some(price) },
        quantity: rng.gen_range(1..=50),
        time_in_force: if is_market { TimeInForce::Ioc } else { tif },
    }
}

fn run_stream(seed: u64, count: usize) -> Processor<RecordingListener> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut processor =
        Processor::with_listener(seeded_markets(), RecordingListener::new()).with_clock(fixed_noon);
    for _ in 0..count {
        let request = random_request(&mut rng);
        processor.process(&request).unwrap();
    }
    processor
}

/// Orders as originally placed, keyed by id.
fn placed_orders(processor: &Processor<RecordingListener>) -> BTreeMap<u64, Order> {
    processor
        .journal()
        .events()
        .iter()
        .filter_map(|e| match &e.payload {
            EventPayload::OrderPlaced(order) => Some((order.order_id, order.clone())),
            _ => None,
        })
        .collect()
}

#[test]
fn conservation_of_quantity() {
    let processor = run_stream(42, 2_000);
    let placed = placed_orders(&processor);

    // Filled lots per order, counted from the trade history
    let mut filled: HashMap<u64, u64> = HashMap::new();
    for trade in processor.trades() {
        *filled.entry(trade.buy_order_id).or_insert(0) += trade.quantity;
        *filled.entry(trade.sell_order_id).or_insert(0) += trade.quantity;
    }

    // Per-order bounds, and the active set agrees with the trade history
    for (order_id, order) in &placed {
        let f = filled.get(order_id).copied().unwrap_or(0);
        assert!(f <= order.quantity, "order {} overfilled", order_id);
        if let Some(active) = processor.active_orders().get(order_id) {
            assert_eq!(
                active.remaining_quantity,
                order.quantity - f,
                "active order {} disagrees with trade history",
                order_id
            );
        }
    }

    // Every traded lot has exactly one buyer and one seller
    let total_traded: u64 = processor.trades().iter().map(|t| t.quantity).sum();
    let total_filled: u64 = filled.values().sum();
    assert_eq!(total_filled, 2 * total_traded);
}

#[test]
fn trade_price_is_the_resting_orders_price() {
    let processor = run_stream(7, 2_000);
    let placed = placed_orders(&processor);

    for trade in processor.trades() {
        // The maker is whichever side has the older (smaller) order id;
        // order ids are assigned in submission order.
        let maker_id = trade.buy_order_id.min(trade.sell_order_id);
        let maker = &placed[&maker_id];
        assert_eq!(
            Some(trade.price),
            maker.price,
            "trade {} not at the resting order's limit price",
            trade.trade_id
        );
    }
}

#[test]
fn incoming_order_never_trades_through_its_limit() {
    let processor = run_stream(11, 2_000);
    let placed = placed_orders(&processor);

    for trade in processor.trades() {
        let taker_id = trade.buy_order_id.max(trade.sell_order_id);
        let taker = &placed[&taker_id];
        if let Some(limit) = taker.price {
            match taker.side {
                Side::Buy => assert!(trade.price <= limit),
                Side::Sell => assert!(trade.price >= limit),
            }
        }
    }
}

#[test]
fn price_priority_within_a_sweep() {
    let processor = run_stream(13, 2_000);
    let placed = placed_orders(&processor);

    // Group trades by taker; a taker's successive trades walk outward
    // through the book, so its prices are monotone.
    let mut by_taker: BTreeMap<u64, Vec<&types::trade::Trade>> = BTreeMap::new();
    for trade in processor.trades() {
        let taker_id = trade.buy_order_id.max(trade.sell_order_id);
        by_taker.entry(taker_id).or_default().push(trade);
    }

    for (taker_id, trades) in by_taker {
        let taker = &placed[&taker_id];
        for pair in trades.windows(2) {
            match taker.side {
                Side::Buy => assert!(
                    pair[0].price <= pair[1].price,
                    "buy sweep of order {} got worse-then-better prices",
                    taker_id
                ),
                Side::Sell => assert!(
                    pair[0].price >= pair[1].price,
                    "sell sweep of order {} got worse-then-better prices",
                    taker_id
                ),
            }
        }
    }
}

#[test]
fn time_priority_at_equal_price() {
    let processor = run_stream(17, 2_000);

    // Within one taker's sweep, makers consumed at the same price must be
    // consumed in arrival order (order ids are submission-ordered).
    let mut by_taker: BTreeMap<u64, Vec<&types::trade::Trade>> = BTreeMap::new();
    for trade in processor.trades() {
        let taker_id = trade.buy_order_id.max(trade.sell_order_id);
        by_taker.entry(taker_id).or_default().push(trade);
    }

    for trades in by_taker.values() {
        let mut last_maker_at_price: BTreeMap<Price, u64> = BTreeMap::new();
        for trade in trades {
            let maker_id = trade.buy_order_id.min(trade.sell_order_id);
            if let Some(prev) = last_maker_at_price.get(&trade.price) {
                assert!(
                    *prev < maker_id,
                    "younger order beat an older one at the same price"
                );
            }
            last_maker_at_price.insert(trade.price, maker_id);
        }
    }
}

#[test]
fn ioc_and_fok_orders_never_rest() {
    let processor = run_stream(19, 2_000);

    for order in processor.active_orders().values() {
        assert_eq!(
            order.time_in_force,
            TimeInForce::Gtc,
            "order {} with TIF {:?} is resting",
            order.order_id,
            order.time_in_force
        );
    }
}

#[test]
fn market_data_is_monotone() {
    let processor = run_stream(23, 2_000);

    let mut volume = 0u64;
    let mut turnover = Decimal::ZERO;
    let mut high = Price::zero();
    let mut low: Option<Price> = None;

    for event in processor.journal().events() {
        if let EventPayload::MarketDataUpdated(market) = &event.payload {
            assert!(market.daily_volume >= volume, "volume decreased");
            assert!(market.daily_turnover >= turnover, "turnover decreased");
            assert!(market.daily_high >= high, "daily high decreased");
            if let Some(prev_low) = low {
                assert!(market.daily_low <= prev_low, "daily low increased");
            }
            assert!(market.daily_high >= market.last_price);
            assert!(market.last_price >= market.daily_low);

            volume = market.daily_volume;
            turnover = market.daily_turnover;
            high = market.daily_high;
            low = Some(market.daily_low);
        }
    }
    assert!(volume > 0, "stream produced no trades, property vacuous");
}

#[test]
fn journal_is_totally_ordered_and_well_formed() {
    let processor = run_stream(29, 2_000);
    let events = processor.journal().events();

    assert!(processor.journal().is_contiguous());

    // Per submission: ORDER_PLACED, then its trades, then MARKET_DATA_UPDATED
    // exactly when at least one trade happened.
    let mut i = 0;
    while i < events.len() {
        assert_eq!(
            events[i].event_type(),
            "ORDER_PLACED",
            "submission group must start with ORDER_PLACED at seq {}",
            events[i].sequence_id
        );
        i += 1;
        let mut trades = 0;
        while i < events.len() && events[i].event_type() == "TRADE_EXECUTED" {
            trades += 1;
            i += 1;
        }
        if trades > 0 {
            assert_eq!(
                events[i].event_type(),
                "MARKET_DATA_UPDATED",
                "trades must be followed by a market data update"
            );
            i += 1;
        } else if i < events.len() {
            assert_ne!(
                events[i].event_type(),
                "MARKET_DATA_UPDATED",
                "market data update without trades"
            );
        }
    }
}

#[test]
fn replaying_the_journal_reproduces_the_state() {
    let processor = run_stream(31, 1_000);
    let original = processor.snapshot();

    let rebuilt = Processor::replay(seeded_markets(), &original.journal).snapshot();

    assert_eq!(rebuilt.markets, original.markets);
    assert_eq!(rebuilt.active_orders, original.active_orders);
    assert_eq!(rebuilt.trades, original.trades);
    assert_eq!(rebuilt.journal, original.journal);
    assert_eq!(rebuilt.next_order_id, original.next_order_id);
    assert_eq!(rebuilt.next_trade_id, original.next_trade_id);
    assert_eq!(rebuilt.next_sequence_id, original.next_sequence_id);
}
