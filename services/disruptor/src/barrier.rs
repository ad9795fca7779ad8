//! Sequence barriers
//!
//! A barrier is the set of upstream sequences a consumer must not pass. For
//! a sibling consumer that is the producer cursor alone; for a dependent
//! consumer it is the sequences of the consumers it runs behind.

use crate::sequence::{minimum_sequence, Sequence, INITIAL_SEQUENCE};
use crate::wait::WaitStrategy;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Gate on the minimum of a set of dependent sequences.
#[derive(Debug)]
pub struct SequenceBarrier {
    dependencies: Vec<Arc<Sequence>>,
}

impl SequenceBarrier {
    pub fn new(dependencies: Vec<Arc<Sequence>>) -> Self {
        assert!(
            !dependencies.is_empty(),
            "a barrier needs at least one upstream sequence"
        );
        Self { dependencies }
    }

    /// Highest sequence all dependencies have reached.
    pub fn available(&self) -> i64 {
        minimum_sequence(&self.dependencies, INITIAL_SEQUENCE)
    }

    /// Block via the wait strategy until `expected` is available.
    ///
    /// Returns the highest available sequence (`>= expected`), or `None`
    /// once `running` is cleared and everything already published has been
    /// observed (the shutdown drain contract).
    pub fn wait_for(
        &self,
        expected: i64,
        wait: WaitStrategy,
        running: &AtomicBool,
    ) -> Option<i64> {
        let mut waiter = wait.waiter();
        loop {
            let available = self.available();
            if available >= expected {
                return Some(available);
            }
            if !running.load(Ordering::Acquire) {
                // Re-check after observing the stop flag: anything published
                // before the flag flipped must still be drained.
                let available = self.available();
                if available >= expected {
                    return Some(available);
                }
                return None;
            }
            waiter.idle();
        }
    }
}
