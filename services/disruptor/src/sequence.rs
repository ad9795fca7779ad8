//! Monotone sequence counters
//!
//! A `Sequence` tracks the progress of one party on a ring: the producer's
//! published cursor or a consumer's last processed slot. Counters start at
//! -1 ("nothing yet") and only ever move forward.
//!
//! Padded to a cache line so two counters never share one and ping-pong
//! between cores under contention.

use std::sync::atomic::{AtomicI64, Ordering};

/// Value of a sequence before anything has been claimed or processed.
pub const INITIAL_SEQUENCE: i64 = -1;

/// Cache-line-aligned atomic sequence counter.
#[repr(align(64))]
#[derive(Debug)]
pub struct Sequence {
    value: AtomicI64,
}

impl Sequence {
    /// Create a sequence at the given starting value.
    pub fn new(initial: i64) -> Self {
        Self {
            value: AtomicI64::new(initial),
        }
    }

    /// Read with acquire ordering. Pairs with `set` on the writer side so
    /// slot contents written before a publish are visible after this load.
    pub fn get(&self) -> i64 {
        self.value.load(Ordering::Acquire)
    }

    /// Relaxed read. Only valid for a counter this thread itself advances.
    pub fn get_relaxed(&self) -> i64 {
        self.value.load(Ordering::Relaxed)
    }

    /// Write with release ordering.
    pub fn set(&self, value: i64) {
        self.value.store(value, Ordering::Release);
    }
}

impl Default for Sequence {
    fn default() -> Self {
        Self::new(INITIAL_SEQUENCE)
    }
}

/// Minimum over a set of sequences, or `fallback` when the set is empty.
pub fn minimum_sequence(sequences: &[std::sync::Arc<Sequence>], fallback: i64) -> i64 {
    sequences
        .iter()
        .map(|s| s.get())
        .min()
        .unwrap_or(fallback)
}
