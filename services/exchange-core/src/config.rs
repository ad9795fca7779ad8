//! Exchange configuration
//!
//! Ring capacities, wait strategy, persistence parameters, and the market
//! catalog seeded at startup. All recognized options deserialize from a
//! single document; defaults match the production tuning.

use chrono::NaiveTime;
use disruptor::WaitStrategy;
use persistence::{DatabaseConfig, PersistenceConfig};
use serde::{Deserialize, Serialize};
use types::market::{Market, MarketStatus};
use types::numeric::Price;

/// Parse an environment variable, keeping the default when the variable is
/// absent or unparseable.
fn env_or<T: std::str::FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(default)
}

/// A market to create (and open) at startup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketSeed {
    pub symbol: String,
    pub name: String,
    pub open_time: NaiveTime,
    pub close_time: NaiveTime,
    pub tick_size: Price,
    pub min_order_size: u64,
}

impl MarketSeed {
    fn new(symbol: &str, name: &str) -> Self {
        Self {
            symbol: symbol.to_string(),
            name: name.to_string(),
            open_time: NaiveTime::from_hms_opt(0, 0, 0).expect("valid open time"),
            close_time: NaiveTime::from_hms_opt(23, 59, 0).expect("valid close time"),
            tick_size: Price::from_str("0.01").expect("valid tick size"),
            min_order_size: 1,
        }
    }

    /// Build the seeded market, already OPEN.
    pub fn to_market(&self, now: i64) -> Market {
        Market::new(
            self.symbol.clone(),
            self.name.clone(),
            self.open_time,
            self.close_time,
            self.tick_size,
            self.min_order_size,
            now,
        )
        .with_status(MarketStatus::Open, now)
    }
}

/// Top-level configuration for an exchange instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExchangeConfig {
    /// Input ring capacity; must be a power of two.
    pub input_ring_size: usize,
    /// Output ring capacity; must be a power of two.
    pub output_ring_size: usize,
    pub wait_strategy: WaitStrategy,
    pub persistence: PersistenceConfig,
    pub markets: Vec<MarketSeed>,
}

impl Default for ExchangeConfig {
    fn default() -> Self {
        Self {
            input_ring_size: 1 << 20,
            output_ring_size: 1 << 20,
            wait_strategy: WaitStrategy::Yielding,
            persistence: PersistenceConfig::default(),
            markets: vec![
                MarketSeed::new("BTCUSD", "Bitcoin/USD"),
                MarketSeed::new("ETHUSD", "Ethereum/USD"),
            ],
        }
    }
}

impl ExchangeConfig {
    /// Defaults overridden by `INPUT_RING_SIZE`, `OUTPUT_RING_SIZE`,
    /// `WAIT_STRATEGY`, `BATCH_SIZE`, `BATCH_TIMEOUT_MS`, and
    /// `QUEUE_CAPACITY`, plus the database variables recognized by
    /// `DatabaseConfig::from_env`.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            input_ring_size: env_or("INPUT_RING_SIZE", defaults.input_ring_size),
            output_ring_size: env_or("OUTPUT_RING_SIZE", defaults.output_ring_size),
            wait_strategy: env_or("WAIT_STRATEGY", defaults.wait_strategy),
            persistence: PersistenceConfig {
                batch_size: env_or("BATCH_SIZE", defaults.persistence.batch_size),
                batch_timeout_ms: env_or(
                    "BATCH_TIMEOUT_MS",
                    defaults.persistence.batch_timeout_ms,
                ),
                queue_capacity: env_or("QUEUE_CAPACITY", defaults.persistence.queue_capacity),
                database: DatabaseConfig::from_env(),
            },
            markets: defaults.markets,
        }
    }

    /// Small rings and short batch windows for tests.
    pub fn for_testing() -> Self {
        Self {
            input_ring_size: 1 << 12,
            output_ring_size: 1 << 12,
            persistence: PersistenceConfig {
                batch_size: 100,
                batch_timeout_ms: 20,
                queue_capacity: 10_000,
                ..PersistenceConfig::default()
            },
            ..Self::default()
        }
    }
}
