//! Bounded lock-free ring buffer
//!
//! A ring of `2^k` pre-allocated slots coordinated by monotone sequence
//! counters. The single producer claims slots, mutates them in place, and
//! publishes with a release store on the cursor; consumers observe a slot
//! only once its sequence is published and gate the producer through their
//! own sequences (the producer may not lap its slowest consumer).
//!
//! Wiring happens at startup: create the ring, attach every consumer, then
//! take the one producer. Taking the producer freezes the consumer set.

use crate::barrier::SequenceBarrier;
use crate::consumer::Consumer;
use crate::sequence::{minimum_sequence, Sequence, INITIAL_SEQUENCE};
use crate::wait::WaitStrategy;
use std::cell::UnsafeCell;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, OnceLock};
use thiserror::Error;
use tracing::info;

/// Errors raised while constructing or wiring a ring.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RingError {
    #[error("ring capacity must be a power of two, got {got}")]
    CapacityNotPowerOfTwo { got: usize },

    #[error("ring capacity must be at least 1")]
    ZeroCapacity,

    #[error("the single producer has already been taken")]
    ProducerAlreadyTaken,

    #[error("consumer wiring is frozen once the producer exists")]
    WiringFrozen,
}

/// Non-blocking claim failed: the ring has no free slot.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("ring buffer is full")]
pub struct RingFull;

pub(crate) struct RingCore<T> {
    pub(crate) slots: Box<[UnsafeCell<T>]>,
    pub(crate) mask: i64,
    pub(crate) capacity: i64,
    /// Highest published sequence. Shared so barriers can depend on it.
    pub(crate) cursor: Arc<Sequence>,
    /// Consumer sequences registered during wiring.
    registered: Mutex<Vec<Arc<Sequence>>>,
    /// Snapshot of `registered` taken when the producer is created.
    gating: OnceLock<Vec<Arc<Sequence>>>,
    producer_taken: AtomicBool,
}

// Slots are only written by the producer for claimed-but-unpublished
// sequences and only read by consumers for published ones; the claim gate
// guarantees the two ranges never overlap a live slot.
unsafe impl<T: Send> Send for RingCore<T> {}
unsafe impl<T: Send> Sync for RingCore<T> {}

impl<T> RingCore<T> {
    fn min_gate(&self) -> i64 {
        match self.gating.get() {
            Some(gating) => minimum_sequence(gating, self.cursor.get()),
            None => {
                let registered = self.registered.lock().expect("gating registry poisoned");
                minimum_sequence(&registered, self.cursor.get())
            }
        }
    }
}

/// Handle used to wire a ring: attach consumers, then take the producer.
pub struct RingBuffer<T> {
    core: Arc<RingCore<T>>,
    wait: WaitStrategy,
}

impl<T> Clone for RingBuffer<T> {
    fn clone(&self) -> Self {
        Self {
            core: Arc::clone(&self.core),
            wait: self.wait,
        }
    }
}

impl<T: Default + Send> RingBuffer<T> {
    /// Allocate a ring of `capacity` default-initialized slots.
    pub fn with_capacity(capacity: usize, wait: WaitStrategy) -> Result<Self, RingError> {
        if capacity == 0 {
            return Err(RingError::ZeroCapacity);
        }
        if !capacity.is_power_of_two() {
            return Err(RingError::CapacityNotPowerOfTwo { got: capacity });
        }
        let slots: Box<[UnsafeCell<T>]> = (0..capacity)
            .map(|_| UnsafeCell::new(T::default()))
            .collect();

        info!(capacity, strategy = ?wait, "ring buffer allocated");

        Ok(Self {
            core: Arc::new(RingCore {
                slots,
                mask: (capacity - 1) as i64,
                capacity: capacity as i64,
                cursor: Arc::new(Sequence::default()),
                registered: Mutex::new(Vec::new()),
                gating: OnceLock::new(),
                producer_taken: AtomicBool::new(false),
            }),
            wait,
        })
    }

    /// Number of slots.
    pub fn capacity(&self) -> usize {
        self.core.capacity as usize
    }

    /// Highest published sequence, or -1 before the first publish.
    pub fn cursor(&self) -> i64 {
        self.core.cursor.get()
    }

    /// Fraction of the ring between the producer cursor and the slowest
    /// consumer. 0.0 = drained, approaching 1.0 = producer about to block.
    pub fn utilization(&self) -> f64 {
        let used = self.core.cursor.get() - self.core.min_gate();
        used.max(0) as f64 / self.core.capacity as f64
    }

    /// Attach a consumer gated on the producer cursor (sibling fan-out:
    /// every such consumer sees every published slot, in sequence order).
    pub fn consumer(&self) -> Result<Consumer<T>, RingError> {
        let sequence = self.register_sequence()?;
        let barrier = SequenceBarrier::new(vec![self.cursor_sequence()]);
        Ok(Consumer::new(Arc::clone(&self.core), sequence, barrier, self.wait))
    }

    /// Attach a consumer that runs behind the given upstream consumers,
    /// observing a slot only after all of them have processed it.
    pub fn consumer_after(&self, upstream: &[&Consumer<T>]) -> Result<Consumer<T>, RingError> {
        assert!(!upstream.is_empty(), "dependent consumer needs upstreams");
        let sequence = self.register_sequence()?;
        let deps = upstream.iter().map(|c| c.sequence_handle()).collect();
        Ok(Consumer::new(
            Arc::clone(&self.core),
            sequence,
            SequenceBarrier::new(deps),
            self.wait,
        ))
    }

    /// Take the single producer. Freezes the consumer set: the gating
    /// snapshot the producer uses is fixed from this point on.
    pub fn producer(&self) -> Result<Producer<T>, RingError> {
        if self.core.producer_taken.swap(true, Ordering::AcqRel) {
            return Err(RingError::ProducerAlreadyTaken);
        }
        let gating = {
            let registered = self
                .core
                .registered
                .lock()
                .expect("gating registry poisoned");
            registered.clone()
        };
        self.core
            .gating
            .set(gating.clone())
            .expect("gating snapshot already frozen");

        Ok(Producer {
            core: Arc::clone(&self.core),
            wait: self.wait,
            gating,
            next: 0,
            cached_gate: INITIAL_SEQUENCE,
        })
    }

    fn register_sequence(&self) -> Result<Arc<Sequence>, RingError> {
        if self.core.gating.get().is_some() {
            return Err(RingError::WiringFrozen);
        }
        let sequence = Arc::new(Sequence::default());
        self.core
            .registered
            .lock()
            .expect("gating registry poisoned")
            .push(Arc::clone(&sequence));
        Ok(sequence)
    }

    fn cursor_sequence(&self) -> Arc<Sequence> {
        Arc::clone(&self.core.cursor)
    }
}

/// Single-producer claim/publish handle. Not cloneable; there is exactly one
/// per ring, so claims need no CAS, only a cached read of the gating
/// minimum.
pub struct Producer<T> {
    core: Arc<RingCore<T>>,
    wait: WaitStrategy,
    gating: Vec<Arc<Sequence>>,
    /// Next sequence to claim.
    next: i64,
    cached_gate: i64,
}

impl<T: Send> Producer<T> {
    /// Claim the next sequence, blocking via the wait strategy while the
    /// ring would overtake its slowest consumer.
    pub fn claim(&mut self) -> i64 {
        self.claim_batch(1)
    }

    /// Claim `count` consecutive sequences and return the highest.
    pub fn claim_batch(&mut self, count: usize) -> i64 {
        assert!(count >= 1, "must claim at least one slot");
        assert!(
            (count as i64) <= self.core.capacity,
            "cannot claim more slots than the ring holds"
        );
        let hi = self.next + count as i64 - 1;
        let wrap_point = hi - self.core.capacity;
        if wrap_point > self.cached_gate {
            let mut waiter = self.wait.waiter();
            loop {
                let gate = minimum_sequence(&self.gating, self.core.cursor.get());
                if wrap_point <= gate {
                    self.cached_gate = gate;
                    break;
                }
                waiter.idle();
            }
        }
        self.next = hi + 1;
        hi
    }

    /// Non-blocking claim: errors with `RingFull` instead of waiting.
    pub fn try_claim(&mut self) -> Result<i64, RingFull> {
        let hi = self.next;
        let wrap_point = hi - self.core.capacity;
        if wrap_point > self.cached_gate {
            let gate = minimum_sequence(&self.gating, self.core.cursor.get());
            if wrap_point > gate {
                return Err(RingFull);
            }
            self.cached_gate = gate;
        }
        self.next = hi + 1;
        Ok(hi)
    }

    /// Exclusive access to the slot for a claimed, unpublished sequence.
    pub fn slot_mut(&mut self, sequence: i64) -> &mut T {
        debug_assert!(
            sequence < self.next && sequence > self.core.cursor.get_relaxed(),
            "slot access outside the claimed window"
        );
        let index = (sequence & self.core.mask) as usize;
        // Safety: the sequence is claimed and unpublished, so no consumer
        // reads this slot yet, and `&mut self` makes the producer exclusive.
        unsafe { &mut *self.core.slots[index].get() }
    }

    /// Publish every claimed sequence up to and including `sequence` with a
    /// release store, making the slots visible to consumers.
    pub fn publish(&mut self, sequence: i64) {
        debug_assert!(
            sequence < self.next,
            "cannot publish a sequence that was never claimed"
        );
        self.core.cursor.set(sequence);
    }

    /// Slots currently free for claiming without blocking.
    pub fn remaining_capacity(&self) -> i64 {
        let gate = minimum_sequence(&self.gating, self.core.cursor.get());
        self.core.capacity - (self.next - 1 - gate)
    }
}
