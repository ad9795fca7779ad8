//! Output-ring consumers
//!
//! The parallel stages behind the business-logic processor: market data,
//! audit trail, client notifications, and the persistence forwarder. All
//! four are siblings on the output ring: each sees every event, in the
//! same total order, at its own pace.

pub mod audit;
pub mod market_data;
pub mod notification;

pub use audit::AuditTrail;
pub use market_data::MarketDataFeed;
pub use notification::NotificationHub;

use types::events::Event;

/// Slot type of the output ring. Pre-allocated empty; the processor's
/// publisher fills it with the next journaled event before publication.
#[derive(Debug, Default)]
pub struct OutputSlot {
    pub event: Option<Event>,
}
