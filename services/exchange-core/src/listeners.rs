//! Event listeners
//!
//! The processor hands every journaled event synchronously to its listener.
//! The listener is a capability fixed at startup and generic on the
//! processor, so the production path (publish to the output ring) is
//! statically dispatched; `FanoutListener` composes several listeners when a
//! deployment needs more than one.
//!
//! Listeners are one-way: they never call back into the processor.

use types::events::Event;

/// Receives each journaled event, in sequence order.
pub trait EventListener {
    fn on_event(&mut self, event: &Event);
}

/// Discards events. For processors run without an output stage.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullListener;

impl EventListener for NullListener {
    fn on_event(&mut self, _event: &Event) {}
}

/// Collects events in memory. Test instrumentation.
#[derive(Debug, Default)]
pub struct RecordingListener {
    pub events: Vec<Event>,
}

impl RecordingListener {
    pub fn new() -> Self {
        Self::default()
    }
}

impl EventListener for RecordingListener {
    fn on_event(&mut self, event: &Event) {
        self.events.push(event.clone());
    }
}

/// Dispatches each event to a fixed list of boxed listeners.
#[derive(Default)]
pub struct FanoutListener {
    listeners: Vec<Box<dyn EventListener + Send>>,
}

impl FanoutListener {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, listener: Box<dyn EventListener + Send>) {
        self.listeners.push(listener);
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }
}

impl EventListener for FanoutListener {
    fn on_event(&mut self, event: &Event) {
        for listener in &mut self.listeners {
            listener.on_event(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::Arc;
    use types::numeric::Price;
    use types::order::{Order, OrderType, Side, TimeInForce};

    fn sample_event(seq: u64) -> Event {
        Event::order_placed(
            seq,
            1_000,
            Order::new(
                seq,
                "trader1",
                "BTCUSD",
                OrderType::Limit,
                Side::Buy,
                Some(Price::from_str("50000.00").unwrap()),
                100,
                TimeInForce::Gtc,
                1_000,
            ),
        )
    }

    struct Counting(Arc<AtomicU64>);

    impl EventListener for Counting {
        fn on_event(&mut self, _event: &Event) {
            self.0.fetch_add(1, Ordering::Relaxed);
        }
    }

    #[test]
    fn test_recording_listener_keeps_order() {
        let mut listener = RecordingListener::new();
        listener.on_event(&sample_event(1));
        listener.on_event(&sample_event(2));

        let sequences: Vec<u64> = listener.events.iter().map(|e| e.sequence_id).collect();
        assert_eq!(sequences, vec![1, 2]);
    }

    #[test]
    fn test_fanout_reaches_every_listener() {
        let a = Arc::new(AtomicU64::new(0));
        let b = Arc::new(AtomicU64::new(0));

        let mut fanout = FanoutListener::new();
        fanout.push(Box::new(Counting(Arc::clone(&a))));
        fanout.push(Box::new(Counting(Arc::clone(&b))));
        assert_eq!(fanout.len(), 2);

        fanout.on_event(&sample_event(1));
        fanout.on_event(&sample_event(2));

        assert_eq!(a.load(Ordering::Relaxed), 2);
        assert_eq!(b.load(Ordering::Relaxed), 2);
    }
}
