//! Pipeline wiring
//!
//! Assembles the full exchange: submissions enter the input ring, the
//! business-logic processor consumes them on its own thread, journaled
//! events flow through the output ring, and four sibling consumers (market
//! data, audit, notifications, persistence) fan out behind it.
//!
//! ```text
//! submit -> [input ring] -> processor -> [output ring] -> market data
//!                                                      -> audit trail
//!                                                      -> notifications
//!                                                      -> persistence
//! ```
//!
//! External reads go through the same input lane as orders (`Query`
//! messages answered over a bounded channel), preserving the processor's
//! single-writer/single-reader discipline.

use disruptor::{Producer, RingBuffer, RingError, RingFull};
use persistence::{EventStore, PersistenceStage, PersistenceStats};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, SyncSender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{info, warn};
use types::events::Event;
use types::market::Market;
use types::numeric::Price;
use types::order::{OrderType, Side, TimeInForce};

use crate::config::ExchangeConfig;
use crate::consumers::{AuditTrail, MarketDataFeed, NotificationHub, OutputSlot};
use crate::listeners::EventListener;
use crate::processor::{ExchangeSnapshot, OrderRequest, Processor};

/// Slot type of the input ring.
#[derive(Debug, Default)]
pub enum InputMessage {
    /// Pre-allocation filler; never published.
    #[default]
    Noop,
    /// An order submission.
    Order(OrderRequest),
    /// A state query, answered on the processor thread.
    Query(SyncSender<ExchangeSnapshot>),
}

/// The production listener: publishes each journaled event to the output
/// ring as soon as the processor appends it.
struct OutputPublisher {
    producer: Producer<OutputSlot>,
}

impl EventListener for OutputPublisher {
    fn on_event(&mut self, event: &Event) {
        let seq = self.producer.claim();
        self.producer.slot_mut(seq).event = Some(event.clone());
        self.producer.publish(seq);
    }
}

/// Input-ring handler hosting the processor.
struct ProcessorHandler {
    processor: Processor<OutputPublisher>,
}

impl disruptor::EventHandler<InputMessage> for ProcessorHandler {
    fn on_event(&mut self, message: &InputMessage, _sequence: i64, _end_of_batch: bool) {
        match message {
            InputMessage::Noop => {}
            InputMessage::Order(request) => {
                if let Err(reason) = self.processor.process(request) {
                    warn!(user_id = %request.user_id, symbol = %request.symbol, %reason, "order rejected");
                }
            }
            InputMessage::Query(reply) => {
                // A closed reply channel just means the caller gave up
                let _ = reply.send(self.processor.snapshot());
            }
        }
    }

    fn on_shutdown(&mut self) {
        info!(
            journal_len = self.processor.journal().len(),
            trades = self.processor.trades().len(),
            "business-logic processor stopped"
        );
    }
}

/// Output-ring handler forwarding events into the persistence stage.
struct PersistenceForwarder {
    stage: Option<PersistenceStage>,
}

impl disruptor::EventHandler<OutputSlot> for PersistenceForwarder {
    fn on_event(&mut self, slot: &OutputSlot, _sequence: i64, _end_of_batch: bool) {
        if let (Some(stage), Some(event)) = (&self.stage, &slot.event) {
            stage.offer(event.clone());
        }
    }

    fn on_shutdown(&mut self) {
        if let Some(stage) = self.stage.take() {
            stage.shutdown();
        }
    }
}

fn wall_clock_nanos() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system clock before Unix epoch")
        .as_nanos() as i64
}

/// A running exchange instance.
pub struct Exchange {
    producer: Producer<InputMessage>,
    input_ring: RingBuffer<InputMessage>,
    output_ring: RingBuffer<OutputSlot>,
    input_running: Arc<AtomicBool>,
    output_running: Arc<AtomicBool>,
    processor_thread: Option<JoinHandle<()>>,
    consumer_threads: Vec<JoinHandle<()>>,
    market_data: MarketDataFeed,
    audit: AuditTrail,
    notifications: NotificationHub,
    persistence_stats: Arc<PersistenceStats>,
}

impl Exchange {
    /// Wire the rings, seed the markets, and start every stage.
    pub fn start<S: EventStore + 'static>(
        config: ExchangeConfig,
        store: S,
    ) -> Result<Self, RingError> {
        let now = wall_clock_nanos();
        let markets: Vec<Market> = config.markets.iter().map(|s| s.to_market(now)).collect();

        // Input lane: one consumer (the processor), then the producer
        let input_ring =
            RingBuffer::<InputMessage>::with_capacity(config.input_ring_size, config.wait_strategy)?;
        let input_consumer = input_ring.consumer()?;
        let producer = input_ring.producer()?;

        // Output lane: four sibling consumers, then the producer
        let output_ring =
            RingBuffer::<OutputSlot>::with_capacity(config.output_ring_size, config.wait_strategy)?;
        let market_data = MarketDataFeed::new();
        let audit = AuditTrail::new();
        let notifications = NotificationHub::new();

        let md_consumer = output_ring.consumer()?;
        let audit_consumer = output_ring.consumer()?;
        let notif_consumer = output_ring.consumer()?;
        let persist_consumer = output_ring.consumer()?;
        let output_producer = output_ring.producer()?;

        let stage = PersistenceStage::spawn(store, config.persistence.clone());
        let persistence_stats = stage.stats();

        let input_running = Arc::new(AtomicBool::new(true));
        let output_running = Arc::new(AtomicBool::new(true));

        let processor_thread = {
            let running = Arc::clone(&input_running);
            let mut consumer = input_consumer;
            thread::Builder::new()
                .name("business-logic-processor".to_string())
                .spawn(move || {
                    let publisher = OutputPublisher {
                        producer: output_producer,
                    };
                    let mut handler = ProcessorHandler {
                        processor: Processor::with_listener(markets, publisher),
                    };
                    consumer.run(&mut handler, &running);
                })
                .expect("failed to spawn processor thread")
        };

        let consumer_threads = vec![
            spawn_consumer(
                "market-data-consumer",
                md_consumer,
                market_data.handler(),
                Arc::clone(&output_running),
            ),
            spawn_consumer(
                "audit-consumer",
                audit_consumer,
                audit.handler(),
                Arc::clone(&output_running),
            ),
            spawn_consumer(
                "notification-consumer",
                notif_consumer,
                notifications.handler(),
                Arc::clone(&output_running),
            ),
            spawn_consumer(
                "persistence-consumer",
                persist_consumer,
                PersistenceForwarder { stage: Some(stage) },
                Arc::clone(&output_running),
            ),
        ];

        info!(
            input_ring = config.input_ring_size,
            output_ring = config.output_ring_size,
            markets = config.markets.len(),
            "exchange started"
        );

        Ok(Self {
            producer,
            input_ring,
            output_ring,
            input_running,
            output_running,
            processor_thread: Some(processor_thread),
            consumer_threads,
            market_data,
            audit,
            notifications,
            persistence_stats,
        })
    }

    /// Submit an order, blocking per the wait strategy if the ring is full.
    /// Returns once the order is accepted into the ring, not once matched;
    /// results arrive on the event stream.
    pub fn submit(&mut self, request: OrderRequest) {
        let seq = self.producer.claim();
        *self.producer.slot_mut(seq) = InputMessage::Order(request);
        self.producer.publish(seq);
    }

    /// Non-blocking submit for callers that cannot wait.
    pub fn try_submit(&mut self, request: OrderRequest) -> Result<(), RingFull> {
        let seq = self.producer.try_claim()?;
        *self.producer.slot_mut(seq) = InputMessage::Order(request);
        self.producer.publish(seq);
        Ok(())
    }

    /// Convenience submit mirroring the ingress contract.
    #[allow(clippy::too_many_arguments)]
    pub fn submit_order(
        &mut self,
        user_id: &str,
        symbol: &str,
        order_type: OrderType,
        side: Side,
        price: Option<Price>,
        quantity: u64,
        time_in_force: TimeInForce,
    ) {
        self.submit(OrderRequest {
            user_id: user_id.to_string(),
            symbol: symbol.to_string(),
            order_type,
            side,
            price,
            quantity,
            time_in_force,
        });
    }

    /// Read-only state snapshot, taken on the processor thread via the
    /// input lane. Acts as a barrier: every submission published before
    /// this call is reflected in the result.
    pub fn snapshot(&mut self) -> ExchangeSnapshot {
        let (tx, rx) = mpsc::sync_channel(1);
        let seq = self.producer.claim();
        *self.producer.slot_mut(seq) = InputMessage::Query(tx);
        self.producer.publish(seq);
        rx.recv()
            .expect("processor thread terminated before answering query")
    }

    pub fn market_data(&self) -> &MarketDataFeed {
        &self.market_data
    }

    pub fn audit(&self) -> &AuditTrail {
        &self.audit
    }

    pub fn notifications(&self) -> &NotificationHub {
        &self.notifications
    }

    pub fn persistence_stats(&self) -> Arc<PersistenceStats> {
        Arc::clone(&self.persistence_stats)
    }

    pub fn input_utilization(&self) -> f64 {
        self.input_ring.utilization()
    }

    pub fn output_utilization(&self) -> f64 {
        self.output_ring.utilization()
    }

    /// Cooperative shutdown: stop intake, let the processor drain the input
    /// ring, then let every output consumer drain what was published.
    /// Persistence commits its remainder and joins with a bounded timeout.
    pub fn shutdown(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        if self.processor_thread.is_none() && self.consumer_threads.is_empty() {
            return;
        }
        info!("exchange shutting down");

        self.input_running.store(false, Ordering::Release);
        if let Some(thread) = self.processor_thread.take() {
            let _ = thread.join();
        }

        self.output_running.store(false, Ordering::Release);
        for thread in self.consumer_threads.drain(..) {
            let _ = thread.join();
        }
        info!("exchange stopped");
    }
}

impl Drop for Exchange {
    fn drop(&mut self) {
        self.stop();
    }
}

fn spawn_consumer<H>(
    name: &str,
    mut consumer: disruptor::Consumer<OutputSlot>,
    mut handler: H,
    running: Arc<AtomicBool>,
) -> JoinHandle<()>
where
    H: disruptor::EventHandler<OutputSlot> + Send + 'static,
{
    thread::Builder::new()
        .name(name.to_string())
        .spawn(move || {
            consumer.run(&mut handler, &running);
        })
        .expect("failed to spawn output consumer")
}
