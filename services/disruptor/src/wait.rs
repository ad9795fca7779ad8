//! Wait strategies
//!
//! Policy a party uses while it cannot make progress: the producer when the
//! ring would overtake its slowest consumer, a consumer when no new slot has
//! been published. None of them take locks; progress is observed through
//! memory-ordered sequence loads by the caller, which invokes `idle` between
//! checks.

use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;

/// How to burn time while waiting for a sequence to advance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WaitStrategy {
    /// Pure busy-spin. Lowest latency, one core pegged per waiter.
    Busy,
    /// Bounded spin, then cooperative yield, then a brief park.
    Yielding,
    /// Short spin then park in slices. Lowest CPU, highest wake-up latency.
    Parking,
}

impl WaitStrategy {
    /// Start a fresh wait episode.
    pub fn waiter(&self) -> Waiter {
        Waiter {
            strategy: *self,
            turns: 0,
        }
    }
}

impl Default for WaitStrategy {
    fn default() -> Self {
        WaitStrategy::Yielding
    }
}

impl FromStr for WaitStrategy {
    type Err = UnknownWaitStrategy;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "busy" => Ok(WaitStrategy::Busy),
            "yielding" => Ok(WaitStrategy::Yielding),
            "parking" => Ok(WaitStrategy::Parking),
            other => Err(UnknownWaitStrategy {
                name: other.to_string(),
            }),
        }
    }
}

/// Error for an unrecognized strategy name in configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown wait strategy: {name} (expected busy, yielding, or parking)")]
pub struct UnknownWaitStrategy {
    pub name: String,
}

const SPIN_TURNS: u32 = 100;
const YIELD_TURNS: u32 = 200;
const PARK_MICROS: u64 = 100;

/// Per-episode wait state. Escalates from spinning toward parking the longer
/// the episode lasts; `reset` drops back to spinning after progress.
#[derive(Debug)]
pub struct Waiter {
    strategy: WaitStrategy,
    turns: u32,
}

impl Waiter {
    /// Burn one turn.
    pub fn idle(&mut self) {
        match self.strategy {
            WaitStrategy::Busy => std::hint::spin_loop(),
            WaitStrategy::Yielding => {
                if self.turns < SPIN_TURNS {
                    std::hint::spin_loop();
                } else if self.turns < YIELD_TURNS {
                    std::thread::yield_now();
                } else {
                    std::thread::park_timeout(Duration::from_micros(PARK_MICROS));
                }
                self.turns = self.turns.saturating_add(1);
            }
            WaitStrategy::Parking => {
                if self.turns < SPIN_TURNS {
                    std::hint::spin_loop();
                } else {
                    std::thread::park_timeout(Duration::from_millis(1));
                }
                self.turns = self.turns.saturating_add(1);
            }
        }
    }

    /// Progress was made; restart the escalation ladder.
    pub fn reset(&mut self) {
        self.turns = 0;
    }
}
