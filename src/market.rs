//! Market parameters and state.
//!
//! A market is one binary question with its own pools, issued share totals,
//! trading window and lifecycle status.

use crate::curve::{CurveParams, CurveQuote, CurveState, Lmsr};
use crate::fixed::Fixed;
use crate::types::{Bps, Direction, MarketId, Outcome, Timestamp};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

/// Question text bounds, in characters.
pub const MIN_QUESTION_LEN: usize = 10;
pub const MAX_QUESTION_LEN: usize = 200;

/// Market status. `Open` is initial, `Resolved` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarketStatus {
    /// Trading allowed until `closes_at`
    #[default]
    Open,
    /// Outcome fixed, only payout bookkeeping remains
    Resolved,
}

/// Per-market trading parameters (immutable after open)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarketParams {
    /// Trading fee, charged on top of buys and taken out of sells
    pub fee: Bps,
    /// Neither outcome may be pushed below this implied probability
    pub probability_floor: Decimal,
    /// Smallest share amount per trade
    pub min_trade_shares: Fixed,
    /// Largest share amount per trade
    pub max_trade_shares: Fixed,
    /// Share amounts must be a multiple of this
    pub lot_size: Fixed,
}

impl Default for MarketParams {
    fn default() -> Self {
        Self {
            fee: Bps::zero(),
            probability_floor: dec!(0.0001),              // 0.01%
            min_trade_shares: Fixed::new(dec!(0.0001)),
            max_trade_shares: Fixed::from_int(1_000_000),
            lot_size: Fixed::new(dec!(0.0001)),
        }
    }
}

impl MarketParams {
    /// Check a requested share amount against size limits and lot size
    pub fn validate_shares(&self, shares: Fixed) -> Result<(), MarketError> {
        if !shares.is_positive() {
            return Err(MarketError::NonPositiveShares(shares));
        }
        if shares < self.min_trade_shares {
            return Err(MarketError::TradeTooSmall {
                shares,
                minimum: self.min_trade_shares,
            });
        }
        if shares > self.max_trade_shares {
            return Err(MarketError::TradeTooLarge {
                shares,
                maximum: self.max_trade_shares,
            });
        }
        let remainder = shares.value() % self.lot_size.value();
        if !remainder.is_zero() {
            return Err(MarketError::InvalidLotSize {
                shares,
                lot_size: self.lot_size,
            });
        }
        Ok(())
    }

    /// Internal consistency of the parameters themselves
    pub fn validate(&self) -> Result<(), MarketError> {
        if self.fee.value() >= 10_000 {
            return Err(MarketError::InvalidParams {
                reason: "fee must be below 100%".to_string(),
            });
        }
        if self.probability_floor <= Decimal::ZERO || self.probability_floor >= dec!(0.5) {
            return Err(MarketError::InvalidParams {
                reason: "probability floor must be in (0, 0.5)".to_string(),
            });
        }
        if !self.lot_size.is_positive() {
            return Err(MarketError::InvalidParams {
                reason: "lot size must be positive".to_string(),
            });
        }
        if !self.min_trade_shares.is_positive() || self.min_trade_shares > self.max_trade_shares {
            return Err(MarketError::InvalidParams {
                reason: "trade size bounds must satisfy 0 < min <= max".to_string(),
            });
        }
        Ok(())
    }
}

/// Check question text length after trimming
pub fn validate_question(question: &str) -> Result<(), MarketError> {
    let len = question.trim().chars().count();
    if !(MIN_QUESTION_LEN..=MAX_QUESTION_LEN).contains(&len) {
        return Err(MarketError::InvalidQuestion { len });
    }
    Ok(())
}

/// Dynamic market state (changes with trading and resolution)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Market {
    pub id: MarketId,
    pub question: String,
    pub status: MarketStatus,
    /// Pools and issued share totals
    pub curve: CurveState,
    /// Seed for each pool; also the LMSR depth
    pub initial_liquidity: Fixed,
    pub params: MarketParams,
    pub closes_at: Timestamp,
    pub resolved_outcome: Option<Outcome>,
    pub opened_at: Timestamp,
    pub resolved_at: Option<Timestamp>,
    /// Fees retained in the pools
    pub fees_collected: Fixed,
    /// Payouts handed to the settlement layer
    pub total_claimed: Fixed,
    /// Gross cost + proceeds across all trades
    pub volume: Fixed,
    pub trade_count: u64,
}

impl Market {
    pub fn new(
        id: MarketId,
        question: String,
        initial_liquidity: Fixed,
        closes_at: Timestamp,
        params: MarketParams,
        opened_at: Timestamp,
    ) -> Self {
        Self {
            id,
            question: question.trim().to_string(),
            status: MarketStatus::Open,
            curve: CurveState::seeded(initial_liquidity),
            initial_liquidity,
            params,
            closes_at,
            resolved_outcome: None,
            opened_at,
            resolved_at: None,
            fees_collected: Fixed::ZERO,
            total_claimed: Fixed::ZERO,
            volume: Fixed::ZERO,
            trade_count: 0,
        }
    }

    pub fn lmsr(&self) -> Lmsr {
        Lmsr::new(CurveParams {
            depth: self.initial_liquidity,
            fee: self.params.fee,
            probability_floor: self.params.probability_floor,
        })
    }

    pub fn is_open(&self) -> bool {
        self.status == MarketStatus::Open
    }

    pub fn is_resolved(&self) -> bool {
        self.status == MarketStatus::Resolved
    }

    /// Trading window: open status and strictly before `closes_at`
    pub fn accepts_trades_at(&self, now: Timestamp) -> bool {
        self.is_open() && now < self.closes_at
    }

    pub fn pool_yes(&self) -> Fixed {
        self.curve.pool_yes
    }

    pub fn pool_no(&self) -> Fixed {
        self.curve.pool_no
    }

    pub fn pool_total(&self) -> Fixed {
        self.curve.pool_total()
    }

    pub fn total_shares_yes(&self) -> Fixed {
        self.curve.shares_yes
    }

    pub fn total_shares_no(&self) -> Fixed {
        self.curve.shares_no
    }

    pub fn implied_probability(&self, outcome: Outcome) -> Decimal {
        self.curve.implied_probability(outcome)
    }

    /// Commit a priced trade. caller has already validated it against this state.
    pub fn apply_quote(&mut self, quote: &CurveQuote) {
        debug_assert_eq!(quote.before, self.curve, "quote priced against stale state");
        self.curve = quote.after;
        self.fees_collected = self.fees_collected + quote.fee;
        self.volume = self.volume + quote.gross;
        self.trade_count += 1;
    }

    /// One-way Open -> Resolved
    pub fn resolve(&mut self, outcome: Outcome, at: Timestamp) {
        debug_assert!(self.is_open(), "market resolved twice");
        self.status = MarketStatus::Resolved;
        self.resolved_outcome = Some(outcome);
        self.resolved_at = Some(at);
    }

    pub fn record_claim(&mut self, payout: Fixed) {
        self.total_claimed = self.total_claimed + payout;
    }

    /// Shares of the resolved outcome still owed a payout (zero while open)
    pub fn outstanding_liability(&self) -> Fixed {
        match self.resolved_outcome {
            Some(outcome) => self.curve.shares(outcome) - self.total_claimed,
            None => Fixed::ZERO,
        }
    }

    /// Pool value left once every winning share is redeemed
    pub fn residual_liquidity(&self) -> Option<Fixed> {
        let outcome = self.resolved_outcome?;
        Some(self.pool_total() - self.curve.shares(outcome))
    }

    pub fn quote(
        &self,
        outcome: Outcome,
        direction: Direction,
        shares: Fixed,
    ) -> Result<CurveQuote, crate::curve::CurveError> {
        self.lmsr().quote(&self.curve, outcome, direction, shares)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MarketError {
    #[error("share amount must be positive, got {0}")]
    NonPositiveShares(Fixed),

    #[error("share amount {shares} below minimum {minimum}")]
    TradeTooSmall { shares: Fixed, minimum: Fixed },

    #[error("share amount {shares} above maximum {maximum}")]
    TradeTooLarge { shares: Fixed, maximum: Fixed },

    #[error("share amount {shares} not aligned to lot size {lot_size}")]
    InvalidLotSize { shares: Fixed, lot_size: Fixed },

    #[error("question must be 10 to 200 characters, got {len}")]
    InvalidQuestion { len: usize },

    #[error("invalid market params: {reason}")]
    InvalidParams { reason: String },
}
