//! Exchange core
//!
//! The single-threaded business-logic processor and the pipeline that feeds
//! it: input ring in front, output ring with parallel market-data, audit,
//! notification, and persistence consumers behind. All exchange state lives
//! on the processor thread; everything downstream works from immutable
//! event values.

pub mod config;
pub mod consumers;
pub mod journal;
pub mod listeners;
pub mod pipeline;
pub mod processor;

pub use config::{ExchangeConfig, MarketSeed};
pub use consumers::{AuditTrail, MarketDataFeed, NotificationHub, OutputSlot};
pub use journal::EventJournal;
pub use listeners::{EventListener, FanoutListener, NullListener, RecordingListener};
pub use pipeline::{Exchange, InputMessage};
pub use processor::{ExchangeSnapshot, OrderRequest, Processor};
