//! Price-time-priority matching engine
//!
//! Per-symbol order books (sorted price levels with FIFO queues) and the
//! market/limit matching policies that walk them. The engine is purely
//! single-threaded state; the business-logic processor owns one book per
//! market and drives matching from its consumer loop.

pub mod book;
pub mod matching;

pub use book::{AskBook, BidBook, OrderBook, PriceLevel, RestingOrder};
pub use matching::{match_order, MatchResult, TradeFactory};
