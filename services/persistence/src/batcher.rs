//! Size/time-bounded batch accumulation
//!
//! Events accumulate until the batch holds `batch_size` of them or
//! `batch_timeout` has elapsed since the first event in the current batch.
//! Rows are partitioned as they arrive: orders and trades into their tables,
//! market-data updates counted but never persisted.

use crate::store::{row_for_event, PersistenceBatch, RowKind};
use std::time::{Duration, Instant};
use types::events::Event;

/// Accumulates events into the next `PersistenceBatch`.
#[derive(Debug)]
pub struct EventBatcher {
    batch: PersistenceBatch,
    events_accumulated: usize,
    first_event_at: Option<Instant>,
    batch_size: usize,
    batch_timeout: Duration,
}

impl EventBatcher {
    pub fn new(batch_size: usize, batch_timeout: Duration) -> Self {
        assert!(batch_size >= 1, "batch size must be at least 1");
        Self {
            batch: PersistenceBatch::default(),
            events_accumulated: 0,
            first_event_at: None,
            batch_size,
            batch_timeout,
        }
    }

    /// Fold an event into the current batch.
    pub fn push(&mut self, event: &Event, now: Instant) {
        if self.first_event_at.is_none() {
            self.first_event_at = Some(now);
        }
        self.events_accumulated += 1;
        match row_for_event(event) {
            Some(RowKind::Order(row)) => self.batch.orders.push(row),
            Some(RowKind::Trade(row)) => self.batch.trades.push(row),
            None => {}
        }
    }

    /// Events accumulated since the last `take`, including non-persisted
    /// market-data updates.
    pub fn len(&self) -> usize {
        self.events_accumulated
    }

    pub fn is_empty(&self) -> bool {
        self.events_accumulated == 0
    }

    /// Whether the size bound has been hit.
    pub fn is_full(&self) -> bool {
        self.events_accumulated >= self.batch_size
    }

    /// Whether the batch should be committed now: full, or the timeout has
    /// elapsed since its first event.
    pub fn should_flush(&self, now: Instant) -> bool {
        if self.is_empty() {
            return false;
        }
        if self.is_full() {
            return true;
        }
        match self.first_event_at {
            Some(first) => now.duration_since(first) >= self.batch_timeout,
            None => false,
        }
    }

    /// Take the accumulated batch, resetting the accumulator.
    pub fn take(&mut self) -> PersistenceBatch {
        self.events_accumulated = 0;
        self.first_event_at = None;
        std::mem::take(&mut self.batch)
    }
}
