//! Batched event persistence
//!
//! The durable tail of the pipeline: a backpressure-aware stage that drains
//! journaled events, partitions them into order upserts and trade inserts,
//! and commits size/time-bounded batches atomically through an `EventStore`.
//!
//! Backends: `MemoryStore` for tests, `WalStore` (checksummed append-only
//! file) for durability without an external service. Relational databases
//! are collaborators that implement `EventStore` against the same two row
//! shapes.

pub mod batcher;
pub mod config;
pub mod consumer;
pub mod store;
pub mod wal;

pub use batcher::EventBatcher;
pub use config::{DatabaseConfig, PersistenceConfig};
pub use consumer::{PersistenceStage, PersistenceStats};
pub use store::{
    EventStore, MemoryStore, OrderRow, PersistenceBatch, SharedMemoryStore, StoreError, TradeRow,
};
pub use wal::WalStore;
