//! Ring consumers
//!
//! A consumer owns its sequence, gates on a barrier (the producer cursor for
//! siblings, upstream consumer sequences for dependents), and hands each
//! published slot to an `EventHandler`. Parallel consumers observe the same
//! total order but make independent progress.

use crate::barrier::SequenceBarrier;
use crate::ring::RingCore;
use crate::sequence::Sequence;
use crate::wait::WaitStrategy;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tracing::debug;

/// Callback invoked for every published slot, in sequence order.
///
/// `end_of_batch` is true for the last slot of the currently available run,
/// which lets handlers batch side effects (flushes, commits) cheaply.
pub trait EventHandler<T> {
    fn on_event(&mut self, event: &T, sequence: i64, end_of_batch: bool);

    /// Called once after the consumer has drained and is about to exit.
    fn on_shutdown(&mut self) {}
}

/// A single consumer of a ring buffer.
pub struct Consumer<T> {
    core: Arc<RingCore<T>>,
    sequence: Arc<Sequence>,
    barrier: SequenceBarrier,
    wait: WaitStrategy,
}

impl<T: Send> Consumer<T> {
    pub(crate) fn new(
        core: Arc<RingCore<T>>,
        sequence: Arc<Sequence>,
        barrier: SequenceBarrier,
        wait: WaitStrategy,
    ) -> Self {
        Self {
            core,
            sequence,
            barrier,
            wait,
        }
    }

    /// Last processed sequence.
    pub fn sequence(&self) -> i64 {
        self.sequence.get()
    }

    pub(crate) fn sequence_handle(&self) -> Arc<Sequence> {
        Arc::clone(&self.sequence)
    }

    /// Process everything currently available without blocking. Returns the
    /// number of slots handled.
    pub fn poll<F>(&mut self, mut f: F) -> usize
    where
        F: FnMut(&T, i64, bool),
    {
        let next = self.sequence.get_relaxed() + 1;
        let available = self.barrier.available();
        if available < next {
            return 0;
        }
        for seq in next..=available {
            let index = (seq & self.core.mask) as usize;
            // Safety: seq <= the barrier minimum, so the slot is published
            // and the producer cannot reclaim it until this sequence advances.
            let slot = unsafe { &*self.core.slots[index].get() };
            f(slot, seq, seq == available);
        }
        self.sequence.set(available);
        (available - next + 1) as usize
    }

    /// Consume until `running` is cleared and every sequence published
    /// before the stop signal has been handled, then call `on_shutdown`.
    ///
    /// This is the thread body for dedicated consumer stages.
    pub fn run<H>(&mut self, handler: &mut H, running: &AtomicBool)
    where
        H: EventHandler<T>,
    {
        loop {
            let next = self.sequence.get_relaxed() + 1;
            match self.barrier.wait_for(next, self.wait, running) {
                Some(available) => {
                    for seq in next..=available {
                        let index = (seq & self.core.mask) as usize;
                        // Safety: as in `poll`, published and not yet reclaimable.
                        let slot = unsafe { &*self.core.slots[index].get() };
                        handler.on_event(slot, seq, seq == available);
                    }
                    self.sequence.set(available);
                }
                None => break,
            }
        }
        debug!(last_sequence = self.sequence.get_relaxed(), "consumer drained, shutting down");
        handler.on_shutdown();
    }
}
