//! Cross-thread transport tests
//!
//! Exercises the ordering, fan-out, backpressure, and shutdown-drain
//! contracts with real threads.

use disruptor::{EventHandler, RingBuffer, WaitStrategy};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

struct Recorder {
    values: Vec<u64>,
    sequences: Vec<i64>,
}

impl Recorder {
    fn new() -> Self {
        Self {
            values: Vec::new(),
            sequences: Vec::new(),
        }
    }
}

impl EventHandler<u64> for Recorder {
    fn on_event(&mut self, event: &u64, sequence: i64, _end_of_batch: bool) {
        self.values.push(*event);
        self.sequences.push(sequence);
    }
}

#[test]
fn spsc_preserves_exact_order() {
    const COUNT: u64 = 100_000;
    let ring = RingBuffer::<u64>::with_capacity(4096, WaitStrategy::Yielding).unwrap();
    let mut consumer = ring.consumer().unwrap();
    let mut producer = ring.producer().unwrap();
    let running = Arc::new(AtomicBool::new(true));

    let handle = {
        let running = Arc::clone(&running);
        thread::spawn(move || {
            let mut recorder = Recorder::new();
            consumer.run(&mut recorder, &running);
            recorder
        })
    };

    for value in 0..COUNT {
        let seq = producer.claim();
        *producer.slot_mut(seq) = value;
        producer.publish(seq);
    }
    running.store(false, Ordering::Release);

    let recorder = handle.join().unwrap();
    assert_eq!(recorder.values.len(), COUNT as usize);
    for (i, value) in recorder.values.iter().enumerate() {
        assert_eq!(*value, i as u64, "value out of order at {}", i);
    }
    for (i, seq) in recorder.sequences.iter().enumerate() {
        assert_eq!(*seq, i as i64, "sequence gap at {}", i);
    }
}

#[test]
fn parallel_consumers_observe_same_total_order() {
    const COUNT: u64 = 20_000;
    let ring = RingBuffer::<u64>::with_capacity(1024, WaitStrategy::Yielding).unwrap();
    let mut consumers = Vec::new();
    for _ in 0..4 {
        consumers.push(ring.consumer().unwrap());
    }
    let mut producer = ring.producer().unwrap();
    let running = Arc::new(AtomicBool::new(true));

    let handles: Vec<_> = consumers
        .into_iter()
        .map(|mut consumer| {
            let running = Arc::clone(&running);
            thread::spawn(move || {
                let mut recorder = Recorder::new();
                consumer.run(&mut recorder, &running);
                recorder.values
            })
        })
        .collect();

    for value in 0..COUNT {
        let seq = producer.claim();
        *producer.slot_mut(seq) = value;
        producer.publish(seq);
    }
    running.store(false, Ordering::Release);

    let expected: Vec<u64> = (0..COUNT).collect();
    for handle in handles {
        let values = handle.join().unwrap();
        assert_eq!(values, expected, "a consumer diverged from the total order");
    }
}

#[test]
fn producer_blocks_until_slow_consumer_frees_slots() {
    const COUNT: u64 = 1_000;
    // Tiny ring so the producer must wrap many times
    let ring = RingBuffer::<u64>::with_capacity(8, WaitStrategy::Yielding).unwrap();
    let mut consumer = ring.consumer().unwrap();
    let mut producer = ring.producer().unwrap();
    let running = Arc::new(AtomicBool::new(true));

    let handle = {
        let running = Arc::clone(&running);
        thread::spawn(move || {
            let mut recorder = Recorder::new();
            consumer.run(&mut recorder, &running);
            recorder.values
        })
    };

    for value in 0..COUNT {
        let seq = producer.claim(); // blocks whenever the ring is full
        *producer.slot_mut(seq) = value;
        producer.publish(seq);
    }
    running.store(false, Ordering::Release);

    let values = handle.join().unwrap();
    assert_eq!(values.len(), COUNT as usize);
    assert_eq!(values.last(), Some(&(COUNT - 1)));
}

#[test]
fn dependent_consumer_never_overtakes_upstream() {
    const COUNT: u64 = 10_000;
    let ring = RingBuffer::<u64>::with_capacity(512, WaitStrategy::Yielding).unwrap();
    let upstream = ring.consumer().unwrap();
    let downstream = ring.consumer_after(&[&upstream]).unwrap();
    let mut producer = ring.producer().unwrap();
    let running = Arc::new(AtomicBool::new(true));

    let mut upstream = upstream;
    let upstream_handle = {
        let running = Arc::clone(&running);
        thread::spawn(move || {
            let mut recorder = Recorder::new();
            upstream.run(&mut recorder, &running);
            recorder.values
        })
    };
    let mut downstream = downstream;
    let downstream_handle = {
        let running = Arc::clone(&running);
        thread::spawn(move || {
            let mut recorder = Recorder::new();
            downstream.run(&mut recorder, &running);
            recorder.values
        })
    };

    for value in 0..COUNT {
        let seq = producer.claim();
        *producer.slot_mut(seq) = value;
        producer.publish(seq);
    }
    running.store(false, Ordering::Release);

    let expected: Vec<u64> = (0..COUNT).collect();
    assert_eq!(upstream_handle.join().unwrap(), expected);
    assert_eq!(downstream_handle.join().unwrap(), expected);
}

#[test]
fn shutdown_drains_published_slots() {
    let ring = RingBuffer::<u64>::with_capacity(64, WaitStrategy::Parking).unwrap();
    let mut consumer = ring.consumer().unwrap();
    let mut producer = ring.producer().unwrap();

    for value in 0..10u64 {
        let seq = producer.claim();
        *producer.slot_mut(seq) = value;
        producer.publish(seq);
    }

    // Flip the flag before the consumer thread even starts: everything
    // published beforehand must still come out.
    let running = Arc::new(AtomicBool::new(false));
    let handle = {
        let running = Arc::clone(&running);
        thread::spawn(move || {
            let mut recorder = Recorder::new();
            consumer.run(&mut recorder, &running);
            recorder.values
        })
    };

    let values = handle.join().unwrap();
    assert_eq!(values, (0..10).collect::<Vec<u64>>());
}
