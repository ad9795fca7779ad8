//! In-memory event journal
//!
//! The ordered, contiguous log of every state-changing event the processor
//! produces. Authoritative for the run: the processor's state is derivable
//! by replaying it against the seeded market catalog. Sequence ids start at
//! 1 and never gap; a gap is an internal invariant violation and aborts.

use types::events::{Event, EventPayload};

/// Append-only journal with gap-free sequence assignment.
#[derive(Debug, Default)]
pub struct EventJournal {
    events: Vec<Event>,
}

impl EventJournal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sequence id the next appended event will carry.
    pub fn next_sequence(&self) -> u64 {
        self.events.len() as u64 + 1
    }

    /// Assign the next sequence id and append.
    pub fn append(&mut self, timestamp: i64, payload: EventPayload) -> &Event {
        let event = Event {
            sequence_id: self.next_sequence(),
            timestamp,
            payload,
        };
        self.events.push(event);
        self.events.last().expect("journal cannot be empty after append")
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    /// Verify strict, contiguous ordering from 1.
    pub fn is_contiguous(&self) -> bool {
        self.events
            .iter()
            .enumerate()
            .all(|(i, e)| e.sequence_id == i as u64 + 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use types::numeric::Price;
    use types::order::{Order, OrderType, Side, TimeInForce};

    fn payload(order_id: u64) -> EventPayload {
        EventPayload::OrderPlaced(Order::new(
            order_id,
            "trader1",
            "BTCUSD",
            OrderType::Limit,
            Side::Buy,
            Some(Price::from_str("50000.00").unwrap()),
            100,
            TimeInForce::Gtc,
            1_000,
        ))
    }

    #[test]
    fn test_sequences_start_at_one_and_are_contiguous() {
        let mut journal = EventJournal::new();
        assert_eq!(journal.next_sequence(), 1);

        for i in 1..=5 {
            let event = journal.append(1_000 + i as i64, payload(i));
            assert_eq!(event.sequence_id, i);
        }

        assert_eq!(journal.len(), 5);
        assert!(journal.is_contiguous());
        assert_eq!(journal.next_sequence(), 6);
    }

    #[test]
    fn test_events_returned_in_order() {
        let mut journal = EventJournal::new();
        journal.append(1, payload(1));
        journal.append(2, payload(2));

        let sequences: Vec<u64> = journal.events().iter().map(|e| e.sequence_id).collect();
        assert_eq!(sequences, vec![1, 2]);
    }
}
