//! Batched persistence stage
//!
//! A bounded queue decouples the event source from a dedicated worker
//! thread. `offer` never blocks: a full queue drops the event with a
//! diagnostic. The worker accumulates size/time-bounded batches and commits
//! them atomically through the store; a failed commit is logged and the
//! batch is lost for the run (the in-memory journal stays authoritative).
//!
//! On shutdown the stage stops accepting events, the worker drains what is
//! already queued and commits the remainder, and the join is bounded.

use crate::batcher::EventBatcher;
use crate::config::PersistenceConfig;
use crate::store::{EventStore, PersistenceBatch};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, SyncSender, TrySendError};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};
use types::events::Event;

/// How long `shutdown` waits for the worker to finish its drain.
const SHUTDOWN_JOIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Counters exported by the persistence stage.
#[derive(Debug, Default)]
pub struct PersistenceStats {
    pub events_enqueued: AtomicU64,
    pub events_dropped: AtomicU64,
    pub events_persisted: AtomicU64,
    pub batches_committed: AtomicU64,
    pub commit_failures: AtomicU64,
    /// Current backlog between `offer` and the worker. A gauge, not a
    /// cumulative counter; signed because the two sides race by a step.
    pub queue_depth: AtomicI64,
}

impl PersistenceStats {
    /// Export as a flat map for scraping.
    pub fn export(&self) -> BTreeMap<String, u64> {
        let mut m = BTreeMap::new();
        m.insert(
            "events_enqueued".to_string(),
            self.events_enqueued.load(Ordering::Relaxed),
        );
        m.insert(
            "events_dropped".to_string(),
            self.events_dropped.load(Ordering::Relaxed),
        );
        m.insert(
            "events_persisted".to_string(),
            self.events_persisted.load(Ordering::Relaxed),
        );
        m.insert(
            "batches_committed".to_string(),
            self.batches_committed.load(Ordering::Relaxed),
        );
        m.insert(
            "commit_failures".to_string(),
            self.commit_failures.load(Ordering::Relaxed),
        );
        m.insert(
            "queue_depth".to_string(),
            self.queue_depth.load(Ordering::Relaxed).max(0) as u64,
        );
        m
    }
}

/// Handle to a running persistence stage.
pub struct PersistenceStage {
    sender: Option<SyncSender<Event>>,
    worker: Option<JoinHandle<()>>,
    done: Receiver<()>,
    stats: Arc<PersistenceStats>,
}

impl PersistenceStage {
    /// Start the worker thread over the given store.
    pub fn spawn<S: EventStore + 'static>(store: S, config: PersistenceConfig) -> Self {
        let (sender, receiver) = mpsc::sync_channel::<Event>(config.queue_capacity);
        let (done_tx, done_rx) = mpsc::sync_channel::<()>(1);
        let stats = Arc::new(PersistenceStats::default());

        info!(
            batch_size = config.batch_size,
            batch_timeout_ms = config.batch_timeout_ms,
            queue_capacity = config.queue_capacity,
            "persistence stage starting"
        );

        let worker_stats = Arc::clone(&stats);
        let worker = thread::Builder::new()
            .name("persistence-batcher".to_string())
            .spawn(move || {
                run_worker(store, receiver, config, worker_stats);
                let _ = done_tx.send(());
            })
            .expect("failed to spawn persistence worker");

        Self {
            sender: Some(sender),
            worker: Some(worker),
            done: done_rx,
            stats,
        }
    }

    /// Enqueue an event without blocking. Returns false (after logging) when
    /// the queue is full or the stage has stopped; the event is dropped.
    pub fn offer(&self, event: Event) -> bool {
        let Some(sender) = &self.sender else {
            return false;
        };
        match sender.try_send(event) {
            Ok(()) => {
                self.stats.events_enqueued.fetch_add(1, Ordering::Relaxed);
                self.stats.queue_depth.fetch_add(1, Ordering::Relaxed);
                true
            }
            Err(TrySendError::Full(event)) => {
                self.stats.events_dropped.fetch_add(1, Ordering::Relaxed);
                warn!(
                    sequence_id = event.sequence_id,
                    event_type = event.event_type(),
                    "persistence queue full, dropping event"
                );
                false
            }
            Err(TrySendError::Disconnected(_)) => false,
        }
    }

    pub fn stats(&self) -> Arc<PersistenceStats> {
        Arc::clone(&self.stats)
    }

    /// Stop intake, let the worker drain and commit the remainder, and join
    /// with a bounded timeout. On timeout the worker is abandoned and its
    /// unpersisted remainder is lost.
    pub fn shutdown(mut self) {
        // Dropping the sender disconnects the channel; the worker drains
        // whatever is already queued and exits.
        self.sender.take();
        match self.done.recv_timeout(SHUTDOWN_JOIN_TIMEOUT) {
            Ok(()) => {
                if let Some(worker) = self.worker.take() {
                    let _ = worker.join();
                }
                info!(
                    persisted = self.stats.events_persisted.load(Ordering::Relaxed),
                    batches = self.stats.batches_committed.load(Ordering::Relaxed),
                    "persistence stage stopped"
                );
            }
            Err(_) => {
                error!(
                    timeout_secs = SHUTDOWN_JOIN_TIMEOUT.as_secs(),
                    "persistence worker did not stop in time, abandoning it"
                );
            }
        }
    }
}

fn run_worker<S: EventStore>(
    mut store: S,
    receiver: Receiver<Event>,
    config: PersistenceConfig,
    stats: Arc<PersistenceStats>,
) {
    let batch_timeout = config.batch_timeout();
    let mut batcher = EventBatcher::new(config.batch_size, batch_timeout);
    debug!("persistence worker loop starting");

    loop {
        match receiver.recv_timeout(batch_timeout) {
            Ok(event) => {
                stats.queue_depth.fetch_sub(1, Ordering::Relaxed);
                batcher.push(&event, Instant::now());
                // Greedily soak up whatever else is queued, up to the bound
                while !batcher.is_full() {
                    match receiver.try_recv() {
                        Ok(event) => {
                            stats.queue_depth.fetch_sub(1, Ordering::Relaxed);
                            batcher.push(&event, Instant::now());
                        }
                        Err(_) => break,
                    }
                }
            }
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => break,
        }

        if batcher.should_flush(Instant::now()) {
            commit_batch(&mut store, &mut batcher, &stats);
        }
    }

    // Shutdown drain: commit anything still accumulated
    if !batcher.is_empty() {
        commit_batch(&mut store, &mut batcher, &stats);
    }
    debug!("persistence worker loop terminated");
}

fn commit_batch<S: EventStore>(
    store: &mut S,
    batcher: &mut EventBatcher,
    stats: &PersistenceStats,
) {
    let events = batcher.len() as u64;
    let batch: PersistenceBatch = batcher.take();
    if batch.is_empty() && events == 0 {
        return;
    }
    match store.commit(&batch) {
        Ok(()) => {
            stats.events_persisted.fetch_add(events, Ordering::Relaxed);
            stats.batches_committed.fetch_add(1, Ordering::Relaxed);
            debug!(
                events,
                orders = batch.orders.len(),
                trades = batch.trades.len(),
                "batch committed"
            );
        }
        Err(err) => {
            stats.commit_failures.fetch_add(1, Ordering::Relaxed);
            error!(
                events,
                orders = batch.orders.len(),
                trades = batch.trades.len(),
                error = %err,
                "batch commit failed, events lost for this run"
            );
        }
    }
}
