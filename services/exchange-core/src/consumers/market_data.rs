//! Market data feed consumer
//!
//! Maintains the externally visible view of every market: the latest
//! snapshot per symbol and a capped ring of recent trades. This is what a
//! price display or feed gateway would read.

use std::collections::{BTreeMap, VecDeque};
use std::sync::{Arc, Mutex};
use tracing::debug;
use types::events::EventPayload;
use types::market::Market;
use types::trade::Trade;

use super::OutputSlot;

/// Recent trades kept per symbol.
const RECENT_TRADES_CAP: usize = 1_000;

#[derive(Debug, Default)]
struct FeedState {
    markets: BTreeMap<String, Market>,
    recent_trades: BTreeMap<String, VecDeque<Trade>>,
    events_seen: u64,
}

/// Shared handle to the market data view. Clone freely; the ring handler
/// and external readers share the same state.
#[derive(Debug, Clone, Default)]
pub struct MarketDataFeed {
    inner: Arc<Mutex<FeedState>>,
}

impl MarketDataFeed {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ring handler feeding this view.
    pub fn handler(&self) -> MarketDataHandler {
        MarketDataHandler {
            inner: Arc::clone(&self.inner),
        }
    }

    /// Latest snapshot for a symbol.
    pub fn market(&self, symbol: &str) -> Option<Market> {
        self.inner
            .lock()
            .expect("feed state poisoned")
            .markets
            .get(symbol)
            .cloned()
    }

    /// Most recent trades for a symbol, oldest first.
    pub fn recent_trades(&self, symbol: &str) -> Vec<Trade> {
        self.inner
            .lock()
            .expect("feed state poisoned")
            .recent_trades
            .get(symbol)
            .map(|q| q.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn events_seen(&self) -> u64 {
        self.inner.lock().expect("feed state poisoned").events_seen
    }
}

/// `EventHandler` half of the feed, owned by the consumer thread.
pub struct MarketDataHandler {
    inner: Arc<Mutex<FeedState>>,
}

impl disruptor::EventHandler<OutputSlot> for MarketDataHandler {
    fn on_event(&mut self, slot: &OutputSlot, _sequence: i64, _end_of_batch: bool) {
        let Some(event) = &slot.event else {
            return;
        };
        let mut state = self.inner.lock().expect("feed state poisoned");
        state.events_seen += 1;
        match &event.payload {
            EventPayload::MarketDataUpdated(market) => {
                state
                    .markets
                    .insert(market.symbol.clone(), market.clone());
            }
            EventPayload::TradeExecuted(trade) => {
                let queue = state
                    .recent_trades
                    .entry(trade.symbol.clone())
                    .or_default();
                if queue.len() >= RECENT_TRADES_CAP {
                    queue.pop_front();
                }
                queue.push_back(trade.clone());
            }
            EventPayload::OrderPlaced(_) => {}
        }
    }

    fn on_shutdown(&mut self) {
        let state = self.inner.lock().expect("feed state poisoned");
        debug!(
            markets = state.markets.len(),
            events = state.events_seen,
            "market data feed stopped"
        );
    }
}
