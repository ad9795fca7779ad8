//! Lock-free ring-buffer transport
//!
//! Bounded single-producer/multi-consumer handoff coordinated entirely by
//! monotone sequence counters with release/acquire ordering; no locks on
//! any hot path. Supports sibling fan-out (every consumer sees every slot)
//! and dependent consumers behind an upstream barrier.
//!
//! # Wiring order
//!
//! ```text
//! let ring = RingBuffer::with_capacity(1 << 20, WaitStrategy::Yielding)?;
//! let consumer_a = ring.consumer()?;          // attach consumers first
//! let consumer_b = ring.consumer()?;
//! let producer = ring.producer()?;            // then take the one producer
//! ```
//!
//! Taking the producer freezes the consumer set; the producer gates on the
//! minimum of all consumer sequences and blocks (per the wait strategy) when
//! the ring would otherwise lap its slowest consumer.

pub mod barrier;
pub mod consumer;
pub mod ring;
pub mod sequence;
pub mod wait;

pub use barrier::SequenceBarrier;
pub use consumer::{Consumer, EventHandler};
pub use ring::{Producer, RingBuffer, RingError, RingFull};
pub use sequence::{Sequence, INITIAL_SEQUENCE};
pub use wait::{UnknownWaitStrategy, WaitStrategy};
