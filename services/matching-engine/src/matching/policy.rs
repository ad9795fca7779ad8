//! Matching policies
//!
//! Market orders sweep the opposite side from the best price outward; limit
//! orders trade while their price crosses the resting head, then rest any
//! GTC residual. In every trade the price is the resting order's price and
//! the buyer binding is by order side, not by who was resting.

use tracing::debug;
use types::numeric::Price;
use types::order::{Order, OrderType, Side, TimeInForce};
use types::trade::Trade;

use crate::book::{OrderBook, RestingOrder};
use crate::matching::crossing;

/// Allocates monotone trade ids and builds trades with the buyer/seller
/// bound by side.
#[derive(Debug)]
pub struct TradeFactory {
    next_trade_id: u64,
}

impl TradeFactory {
    pub fn new(starting_id: u64) -> Self {
        Self {
            next_trade_id: starting_id,
        }
    }

    /// Next id that will be assigned.
    pub fn peek_next_id(&self) -> u64 {
        self.next_trade_id
    }

    fn make(
        &mut self,
        incoming: &Order,
        resting: &RestingOrder,
        price: Price,
        quantity: u64,
        now: i64,
    ) -> Trade {
        let trade_id = self.next_trade_id;
        self.next_trade_id += 1;
        match incoming.side {
            Side::Buy => Trade::new(
                trade_id,
                incoming.order_id,
                resting.order_id,
                incoming.user_id.clone(),
                resting.user_id.clone(),
                incoming.symbol.clone(),
                price,
                quantity,
                now,
            ),
            Side::Sell => Trade::new(
                trade_id,
                resting.order_id,
                incoming.order_id,
                resting.user_id.clone(),
                incoming.user_id.clone(),
                incoming.symbol.clone(),
                price,
                quantity,
                now,
            ),
        }
    }
}

/// Outcome of matching one order against a book.
#[derive(Debug, Clone)]
pub struct MatchResult {
    /// The order as accepted, before any fills.
    pub original: Order,
    /// The order after matching, with remaining quantity and status updated.
    pub residual: Order,
    /// Trades in match order.
    pub trades: Vec<Trade>,
    /// Whether the residual was rested in the book (GTC limit leftovers).
    pub rested: bool,
}

impl MatchResult {
    pub fn is_fully_filled(&self) -> bool {
        self.residual.remaining_quantity == 0
    }
}

/// Match an order against its symbol's book.
///
/// The order must already be validated; stop orders are not realized and
/// never reach matching.
pub fn match_order(
    order: Order,
    book: &mut OrderBook,
    trades: &mut TradeFactory,
    now: i64,
) -> MatchResult {
    match order.order_type {
        OrderType::Market => match_market_order(order, book, trades, now),
        OrderType::Limit => match_limit_order(order, book, trades, now),
        OrderType::Stop | OrderType::StopLimit => {
            unreachable!("stop orders are rejected before matching")
        }
    }
}

/// Walk the opposite side from the best price outward, consuming resting
/// liquidity at each head's price until filled or the side is empty. Market
/// orders never rest.
fn match_market_order(
    order: Order,
    book: &mut OrderBook,
    trades: &mut TradeFactory,
    now: i64,
) -> MatchResult {
    let original = order.clone();
    let mut residual = order;
    let mut executed = Vec::new();

    while residual.remaining_quantity > 0 {
        let head = match residual.side {
            Side::Buy => book.asks.head(),
            Side::Sell => book.bids.head(),
        };
        let Some((resting_price, resting)) = head else {
            break;
        };

        let quantity = residual.remaining_quantity.min(resting.remaining_quantity);
        executed.push(trades.make(&residual, resting, resting_price, quantity, now));

        match residual.side {
            Side::Buy => book.asks.fill_head(quantity),
            Side::Sell => book.bids.fill_head(quantity),
        }
        residual = residual.fill(quantity);
    }

    debug!(
        order_id = original.order_id,
        trades = executed.len(),
        unfilled = residual.remaining_quantity,
        "market order matched"
    );

    MatchResult {
        original,
        residual,
        trades: executed,
        rested: false,
    }
}

/// Trade while the limit price crosses the resting head, then rest a GTC
/// residual. IOC and FOK residuals are discarded (FOK is handled as IOC).
fn match_limit_order(
    order: Order,
    book: &mut OrderBook,
    trades: &mut TradeFactory,
    now: i64,
) -> MatchResult {
    let limit = order
        .price
        .expect("limit order must carry a limit price");
    let original = order.clone();
    let mut residual = order;
    let mut executed = Vec::new();

    while residual.remaining_quantity > 0 {
        let head = match residual.side {
            Side::Buy => book.asks.head(),
            Side::Sell => book.bids.head(),
        };
        let Some((resting_price, resting)) = head else {
            break;
        };
        if !crossing::crosses(residual.side, limit, resting_price) {
            break;
        }

        let quantity = residual.remaining_quantity.min(resting.remaining_quantity);
        executed.push(trades.make(&residual, resting, resting_price, quantity, now));

        match residual.side {
            Side::Buy => book.asks.fill_head(quantity),
            Side::Sell => book.bids.fill_head(quantity),
        }
        residual = residual.fill(quantity);
    }

    let rested = residual.remaining_quantity > 0
        && residual.time_in_force == TimeInForce::Gtc;
    if rested {
        book.rest(&residual);
    }

    debug!(
        order_id = original.order_id,
        trades = executed.len(),
        unfilled = residual.remaining_quantity,
        rested,
        "limit order matched"
    );

    MatchResult {
        original,
        residual,
        trades: executed,
        rested,
    }
}
