// binary-amm: market maker core for binary (YES/NO) prediction markets.
// pools priced by a logarithmic market scoring rule, per-account share ledger,
// one-way resolution and unit payouts. all math is fixed-point and deterministic;
// the core never moves value, it emits instructions for a custody layer.
//
// file map (search X.0 for structs, X.1+ for logic):
//   1.x  types.rs: primitives: MarketId, AccountId, Outcome, Direction, Bps, Timestamp
//   2.x  fixed.rs: 18-decimal fixed point, rounding, exp / ln_1p series
//   3.x  curve.rs: LMSR cost function, quotes, pool split by price
//   4.x  position.rs: per-outcome holdings, cost basis, increase/reduce
//   5.x  payout.rs: redemption of resolved positions
//   6.x  events.rs: per-market event log, polled by cursor
//   7.x  settlement.rs: collect/deliver instructions for custody
//   8.x  engine/: market ledger: open, trade, resolve, claim, queries
//   9.x  config.rs: engine limits, market defaults, logging, env presets
//   market.rs: market params and state
//   accounting.rs: position valuation and P&L
//   clock.rs: time source

// core modules
pub mod curve;
pub mod engine;
pub mod fixed;
pub mod market;
pub mod position;
pub mod types;

// derived values
pub mod accounting;
pub mod payout;

// collaborator seams
pub mod clock;
pub mod config;
pub mod events;
pub mod settlement;

// re exports for convenience
pub use accounting::PositionValuation;
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{ConfigError, Environment, LoggingConfig, Settings};
pub use curve::{CurveError, CurveParams, CurveQuote, CurveState, Lmsr};
pub use engine::{Engine, EngineConfig, EngineError, OpenMarket, TradeIntent, TradeReceipt};
pub use events::{Event, EventId, EventPayload};
pub use fixed::{Fixed, FixedError};
pub use market::{Market, MarketError, MarketParams, MarketStatus};
pub use position::{Holding, Position};
pub use settlement::{SettlementId, SettlementInstruction, SettlementReason};
pub use types::*;
