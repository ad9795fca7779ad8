//! Persistence configuration
//!
//! Batch bounds, the intermediary queue capacity, and the connection options
//! handed to a relational backend. The bundled stores do not dial a
//! database; the db options ride along for deployments wiring an external
//! `EventStore`.

use serde::{Deserialize, Serialize};
use std::time::Duration;

const DEFAULT_DB_URL: &str = "postgres://localhost:5432/exchange";
const DEFAULT_DB_USERNAME: &str = "exchange_user";
const DEFAULT_DB_PASSWORD: &str = "exchange_password";

/// Connection options for a relational persistence collaborator.
///
/// Pool sizing is tuned for a single batching writer: a handful of
/// connections is plenty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub username: String,
    pub password: String,
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_DB_URL.to_string(),
            username: DEFAULT_DB_USERNAME.to_string(),
            password: DEFAULT_DB_PASSWORD.to_string(),
            max_connections: 4,
        }
    }
}

impl DatabaseConfig {
    /// Defaults overridden by `DB_URL`, `DB_USERNAME`, `DB_PASSWORD`.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            url: std::env::var("DB_URL").unwrap_or(defaults.url),
            username: std::env::var("DB_USERNAME").unwrap_or(defaults.username),
            password: std::env::var("DB_PASSWORD").unwrap_or(defaults.password),
            max_connections: defaults.max_connections,
        }
    }
}

/// Batching and queueing parameters of the persistence stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistenceConfig {
    /// Commit once this many events have accumulated.
    pub batch_size: usize,
    /// Commit once this long has passed since the batch's first event.
    pub batch_timeout_ms: u64,
    /// Capacity of the queue between the ring consumer and the batch
    /// worker. Overflow drops events with a diagnostic; the processor is
    /// never blocked by persistence.
    pub queue_capacity: usize,
    pub database: DatabaseConfig,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            batch_size: 1000,
            batch_timeout_ms: 100,
            queue_capacity: 100_000,
            database: DatabaseConfig::default(),
        }
    }
}

impl PersistenceConfig {
    pub fn batch_timeout(&self) -> Duration {
        Duration::from_millis(self.batch_timeout_ms)
    }
}
