//! Engine configuration options.

use crate::fixed::Fixed;
use crate::market::MarketParams;
use serde::{Deserialize, Serialize};

/// Engine configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Maximum number of events to retain per market.
    pub max_events: usize,
    /// Largest seed a market may be opened with.
    pub max_initial_liquidity: Fixed,
    /// Keep receipts keyed by intent id so retried trades are not applied twice.
    pub remember_intents: bool,
    /// Receipts kept per market. the oldest intent is forgotten once this is exceeded.
    pub max_intents: usize,
    /// Parameters for markets opened without their own.
    pub market_defaults: MarketParams,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_events: 100_000,
            max_initial_liquidity: Fixed::from_int(1_000_000_000),
            remember_intents: true,
            max_intents: 10_000,
            market_defaults: MarketParams::default(),
        }
    }
}
