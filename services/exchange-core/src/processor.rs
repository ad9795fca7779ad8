//! Business-logic processor
//!
//! The single-threaded heart of the exchange. Owns every market, book,
//! active order, the trade history, the event journal, and the three id
//! counters; nothing else reads or mutates them. Each inbound order runs
//! the same six steps: market check, validation, id assignment, matching,
//! state update, journal-and-publish.
//!
//! One timestamp is captured per submission and stamped on the order, its
//! trades, the market update, and every journaled event. Together with the
//! deterministic counters this makes the journal a faithful event source:
//! replaying it against the seeded catalog reproduces the state exactly.

use matching_engine::{match_order, MatchResult, OrderBook, TradeFactory};
use std::collections::BTreeMap;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{debug, info, warn};
use types::errors::RejectReason;
use types::events::{Event, EventPayload};
use types::market::Market;
use types::order::{Order, OrderType, Side, TimeInForce};
use types::trade::Trade;

use crate::journal::EventJournal;
use crate::listeners::{EventListener, NullListener};

/// An order submission as it arrives from the ingress collaborator.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderRequest {
    pub user_id: String,
    pub symbol: String,
    pub order_type: OrderType,
    pub side: Side,
    pub price: Option<types::numeric::Price>,
    pub quantity: u64,
    pub time_in_force: TimeInForce,
}

/// Read-only copy of the processor's state, taken on the processor thread.
#[derive(Debug, Clone)]
pub struct ExchangeSnapshot {
    pub markets: BTreeMap<String, Market>,
    pub active_orders: BTreeMap<u64, Order>,
    pub trades: Vec<Trade>,
    pub journal: Vec<Event>,
    pub next_order_id: u64,
    pub next_trade_id: u64,
    pub next_sequence_id: u64,
}

/// Wall clock in Unix nanoseconds.
fn system_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system clock before Unix epoch")
        .as_nanos() as i64
}

/// Single-threaded orchestrator over all exchange state.
pub struct Processor<L: EventListener> {
    markets: BTreeMap<String, Market>,
    books: BTreeMap<String, OrderBook>,
    active_orders: BTreeMap<u64, Order>,
    trades: Vec<Trade>,
    journal: EventJournal,
    next_order_id: u64,
    trade_factory: TradeFactory,
    listener: L,
    clock: fn() -> i64,
    /// Last timestamp handed out; submissions are clamped to be monotone
    /// with order ids even if the wall clock steps backwards.
    last_timestamp: i64,
}

impl Processor<NullListener> {
    /// Processor without an output stage.
    pub fn new(markets: Vec<Market>) -> Self {
        Self::with_listener(markets, NullListener)
    }

    /// Rebuild state by replaying a journal against the seeded catalog.
    ///
    /// Only `ORDER_PLACED` events are commands; trades and market updates
    /// are derived and re-emerge from re-processing.
    pub fn replay(markets: Vec<Market>, events: &[Event]) -> Self {
        info!(events = events.len(), "replaying journal to reconstruct state");
        let mut processor = Self::new(markets);
        for event in events {
            if let EventPayload::OrderPlaced(order) = &event.payload {
                let request = OrderRequest {
                    user_id: order.user_id.clone(),
                    symbol: order.symbol.clone(),
                    order_type: order.order_type,
                    side: order.side,
                    price: order.price,
                    quantity: order.quantity,
                    time_in_force: order.time_in_force,
                };
                processor
                    .process_at(&request, order.timestamp)
                    .expect("journaled order must re-validate during replay");
            }
        }
        info!("state reconstruction complete");
        processor
    }
}

impl<L: EventListener> Processor<L> {
    /// Processor with the production listener (the output-ring publisher).
    pub fn with_listener(markets: Vec<Market>, listener: L) -> Self {
        let mut market_map = BTreeMap::new();
        let mut books = BTreeMap::new();
        for market in markets {
            books.insert(market.symbol.clone(), OrderBook::new(market.symbol.clone()));
            market_map.insert(market.symbol.clone(), market);
        }
        info!(markets = ?market_map.keys().collect::<Vec<_>>(), "processor initialized");

        Self {
            markets: market_map,
            books,
            active_orders: BTreeMap::new(),
            trades: Vec::new(),
            journal: EventJournal::new(),
            next_order_id: 1,
            trade_factory: TradeFactory::new(1),
            listener,
            clock: system_now,
            last_timestamp: 0,
        }
    }

    /// Override the wall clock. Tests pin time to make runs reproducible.
    pub fn with_clock(mut self, clock: fn() -> i64) -> Self {
        self.clock = clock;
        self
    }

    /// Process one inbound order through the six-step transaction.
    ///
    /// Rejections are synchronous outcomes: no order id is consumed and no
    /// event is journaled.
    pub fn process(&mut self, request: &OrderRequest) -> Result<MatchResult, RejectReason> {
        let raw = (self.clock)();
        let now = raw.max(self.last_timestamp);
        self.process_at(request, now)
    }

    fn process_at(
        &mut self,
        request: &OrderRequest,
        now: i64,
    ) -> Result<MatchResult, RejectReason> {
        self.last_timestamp = now;

        // Step 1: market lookup and openness
        let market = match self.markets.get(&request.symbol) {
            Some(market) => market,
            None => {
                warn!(symbol = %request.symbol, "order rejected: unknown market");
                return Err(RejectReason::UnknownMarket {
                    symbol: request.symbol.clone(),
                });
            }
        };
        if !market.is_open_at(now) {
            warn!(symbol = %request.symbol, status = ?market.status, "order rejected: market closed");
            return Err(RejectReason::MarketClosed {
                symbol: request.symbol.clone(),
            });
        }

        // Step 2: validation against the market's rules
        validate(market, request)?;

        // Step 3: assign the order id and capture the submission instant
        let order_id = self.next_order_id;
        self.next_order_id += 1;
        let order = Order::new(
            order_id,
            request.user_id.clone(),
            request.symbol.clone(),
            request.order_type,
            request.side,
            request.price,
            request.quantity,
            request.time_in_force,
            now,
        );

        // Step 4: match by price-time priority
        let book = self
            .books
            .get_mut(&request.symbol)
            .expect("every market has a book");
        let result = match_order(order, book, &mut self.trade_factory, now);

        // Step 5: fold the result into owned state
        self.apply_match(&result, now);

        // Step 6: journal and publish
        self.journal_match(&result, now);

        debug!(
            order_id,
            trades = result.trades.len(),
            remaining = result.residual.remaining_quantity,
            rested = result.rested,
            "order processed"
        );

        Ok(result)
    }

    fn apply_match(&mut self, result: &MatchResult, now: i64) {
        // Resting makers consumed by these trades
        for trade in &result.trades {
            let maker_id = match result.original.side {
                Side::Buy => trade.sell_order_id,
                Side::Sell => trade.buy_order_id,
            };
            let filled = self
                .active_orders
                .get(&maker_id)
                .map(|maker| maker.fill(trade.quantity));
            if let Some(maker) = filled {
                if maker.is_filled() {
                    self.active_orders.remove(&maker_id);
                } else {
                    self.active_orders.insert(maker_id, maker);
                }
            }
        }

        // The incoming order joins the active set only if it rested
        if result.rested {
            self.active_orders
                .insert(result.residual.order_id, result.residual.clone());
        }

        self.trades.extend(result.trades.iter().cloned());

        // Market data reflects every executed trade plus the post-match book
        if !result.trades.is_empty() {
            let symbol = &result.original.symbol;
            let book = self.books.get(symbol).expect("every market has a book");
            let market = self.markets.get(symbol).expect("market checked in step 1");

            let mut updated = market.clone();
            for trade in &result.trades {
                updated = updated.apply_trade(trade, now);
            }
            updated = updated.with_quotes(
                book.best_bid(),
                book.best_ask(),
                book.bid_qty(),
                book.ask_qty(),
                now,
            );
            self.markets.insert(symbol.clone(), updated);
        }
    }

    fn journal_match(&mut self, result: &MatchResult, now: i64) {
        let placed = self
            .journal
            .append(now, EventPayload::OrderPlaced(result.original.clone()))
            .clone();
        self.listener.on_event(&placed);

        for trade in &result.trades {
            let executed = self
                .journal
                .append(now, EventPayload::TradeExecuted(trade.clone()))
                .clone();
            self.listener.on_event(&executed);
        }

        if !result.trades.is_empty() {
            let market = self
                .markets
                .get(&result.original.symbol)
                .expect("market checked in step 1")
                .clone();
            let updated = self
                .journal
                .append(now, EventPayload::MarketDataUpdated(market))
                .clone();
            self.listener.on_event(&updated);
        }
    }

    /// Copy the full state. Runs on the processor thread; external callers
    /// go through the query channel in the pipeline.
    pub fn snapshot(&self) -> ExchangeSnapshot {
        ExchangeSnapshot {
            markets: self.markets.clone(),
            active_orders: self.active_orders.clone(),
            trades: self.trades.clone(),
            journal: self.journal.events().to_vec(),
            next_order_id: self.next_order_id,
            next_trade_id: self.trade_factory.peek_next_id(),
            next_sequence_id: self.journal.next_sequence(),
        }
    }

    // Same-thread accessors

    pub fn market(&self, symbol: &str) -> Option<&Market> {
        self.markets.get(symbol)
    }

    pub fn order_book(&self, symbol: &str) -> Option<&OrderBook> {
        self.books.get(symbol)
    }

    pub fn active_orders(&self) -> &BTreeMap<u64, Order> {
        &self.active_orders
    }

    pub fn trades(&self) -> &[Trade] {
        &self.trades
    }

    pub fn journal(&self) -> &EventJournal {
        &self.journal
    }

    pub fn next_order_id(&self) -> u64 {
        self.next_order_id
    }
}

fn validate(market: &Market, request: &OrderRequest) -> Result<(), RejectReason> {
    if !market.is_valid_order_size(request.quantity) {
        return Err(RejectReason::InvalidQuantity {
            detail: format!(
                "quantity {} below minimum {}",
                request.quantity, market.min_order_size
            ),
        });
    }

    match request.order_type {
        OrderType::Limit => match request.price {
            Some(price) if market.is_valid_price(price) => Ok(()),
            Some(price) => Err(RejectReason::InvalidPrice {
                detail: format!(
                    "{} is not a positive multiple of tick size {}",
                    price, market.tick_size
                ),
            }),
            None => Err(RejectReason::InvalidPrice {
                detail: "limit order requires a price".to_string(),
            }),
        },
        OrderType::Market => match request.price {
            None => Ok(()),
            Some(price) if price.is_zero() => Ok(()),
            Some(price) => Err(RejectReason::InvalidPrice {
                detail: format!("market order must not specify a price, got {}", price),
            }),
        },
        OrderType::Stop | OrderType::StopLimit => Err(RejectReason::InvalidPrice {
            detail: "stop order types are not supported".to_string(),
        }),
    }
}
