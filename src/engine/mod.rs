// 8.0: the market ledger. the only place market and position state is mutated.
// each market lives in its own locked book; trades, resolution and claims are applied
// whole or not at all, and every change lands in the market's event log.

mod book;
mod config;
mod core;
mod queries;
mod resolution;
mod results;
mod trading;

pub use config::EngineConfig;
pub use core::Engine;
pub use results::{EngineError, OpenMarket, TradeIntent, TradeReceipt};
