//! Client notification consumer
//!
//! Per-user bounded queues of order confirmations and fills. A trade
//! notifies both counterparties. Queues drop their oldest entry on overflow
//! and flag the user as lagging; the pipeline itself is never blocked by a
//! slow notification reader.

use std::collections::{BTreeMap, VecDeque};
use std::sync::{Arc, Mutex};
use tracing::{debug, warn};
use types::events::EventPayload;

use super::OutputSlot;

/// Default per-user queue capacity.
const QUEUE_CAP: usize = 1_000;

/// One message destined for a user.
#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    pub user_id: String,
    pub sequence_id: u64,
    pub kind: NotificationKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum NotificationKind {
    /// The user's order was accepted onto the exchange.
    OrderAccepted { order_id: u64, symbol: String },
    /// One of the user's orders traded.
    Fill {
        trade_id: u64,
        symbol: String,
        quantity: u64,
        as_buyer: bool,
    },
}

#[derive(Debug, Default)]
struct UserQueue {
    messages: VecDeque<Notification>,
    dropped: u64,
    lagging: bool,
}

#[derive(Debug, Default)]
struct HubState {
    queues: BTreeMap<String, UserQueue>,
    notifications_sent: u64,
}

/// Shared handle to the notification queues.
#[derive(Debug, Clone, Default)]
pub struct NotificationHub {
    inner: Arc<Mutex<HubState>>,
}

impl NotificationHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ring handler feeding this hub.
    pub fn handler(&self) -> NotificationHandler {
        NotificationHandler {
            inner: Arc::clone(&self.inner),
        }
    }

    /// Drain everything queued for a user, oldest first.
    pub fn take(&self, user_id: &str) -> Vec<Notification> {
        let mut state = self.inner.lock().expect("hub state poisoned");
        match state.queues.get_mut(user_id) {
            Some(queue) => {
                queue.lagging = false;
                queue.messages.drain(..).collect()
            }
            None => Vec::new(),
        }
    }

    pub fn pending(&self, user_id: &str) -> usize {
        self.inner
            .lock()
            .expect("hub state poisoned")
            .queues
            .get(user_id)
            .map(|q| q.messages.len())
            .unwrap_or(0)
    }

    pub fn dropped(&self, user_id: &str) -> u64 {
        self.inner
            .lock()
            .expect("hub state poisoned")
            .queues
            .get(user_id)
            .map(|q| q.dropped)
            .unwrap_or(0)
    }

    pub fn notifications_sent(&self) -> u64 {
        self.inner
            .lock()
            .expect("hub state poisoned")
            .notifications_sent
    }
}

/// `EventHandler` half of the hub, owned by the consumer thread.
pub struct NotificationHandler {
    inner: Arc<Mutex<HubState>>,
}

impl NotificationHandler {
    fn push(state: &mut HubState, notification: Notification) {
        let queue = state
            .queues
            .entry(notification.user_id.clone())
            .or_default();
        if queue.messages.len() >= QUEUE_CAP {
            queue.messages.pop_front();
            queue.dropped += 1;
            if !queue.lagging {
                queue.lagging = true;
                warn!(
                    user_id = %notification.user_id,
                    "notification queue overflow, dropping oldest"
                );
            }
        }
        queue.messages.push_back(notification);
        state.notifications_sent += 1;
    }
}

impl disruptor::EventHandler<OutputSlot> for NotificationHandler {
    fn on_event(&mut self, slot: &OutputSlot, _sequence: i64, _end_of_batch: bool) {
        let Some(event) = &slot.event else {
            return;
        };
        let mut state = self.inner.lock().expect("hub state poisoned");
        match &event.payload {
            EventPayload::OrderPlaced(order) => {
                Self::push(
                    &mut state,
                    Notification {
                        user_id: order.user_id.clone(),
                        sequence_id: event.sequence_id,
                        kind: NotificationKind::OrderAccepted {
                            order_id: order.order_id,
                            symbol: order.symbol.clone(),
                        },
                    },
                );
            }
            EventPayload::TradeExecuted(trade) => {
                for (user, as_buyer) in [(&trade.buy_user_id, true), (&trade.sell_user_id, false)]
                {
                    Self::push(
                        &mut state,
                        Notification {
                            user_id: user.clone(),
                            sequence_id: event.sequence_id,
                            kind: NotificationKind::Fill {
                                trade_id: trade.trade_id,
                                symbol: trade.symbol.clone(),
                                quantity: trade.quantity,
                                as_buyer,
                            },
                        },
                    );
                }
            }
            EventPayload::MarketDataUpdated(_) => {}
        }
    }

    fn on_shutdown(&mut self) {
        let state = self.inner.lock().expect("hub state poisoned");
        debug!(
            users = state.queues.len(),
            sent = state.notifications_sent,
            "notification hub stopped"
        );
    }
}
