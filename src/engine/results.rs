// 8.0.2: intents, receipts and errors for engine operations.

use crate::curve::CurveError;
use crate::fixed::Fixed;
use crate::market::{MarketError, MarketParams};
use crate::types::{AccountId, Direction, IntentId, MarketId, Outcome, Timestamp};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Request to open a market.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenMarket {
    pub question: String,
    pub initial_liquidity: Fixed,
    pub closes_at: Timestamp,
    /// `None` uses the engine's market defaults
    pub params: Option<MarketParams>,
}

impl OpenMarket {
    pub fn new(question: impl Into<String>, initial_liquidity: Fixed, closes_at: Timestamp) -> Self {
        Self {
            question: question.into(),
            initial_liquidity,
            closes_at,
            params: None,
        }
    }

    pub fn with_params(mut self, params: MarketParams) -> Self {
        self.params = Some(params);
        self
    }
}

/// One buy or sell. `limit` is the max cost for a buy, the min proceeds for a sell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradeIntent {
    pub intent_id: Option<IntentId>,
    pub account: AccountId,
    pub outcome: Outcome,
    pub direction: Direction,
    pub shares: Fixed,
    pub limit: Fixed,
}

impl TradeIntent {
    pub fn buy(account: AccountId, outcome: Outcome, shares: Fixed, max_cost: Fixed) -> Self {
        Self {
            intent_id: None,
            account,
            outcome,
            direction: Direction::Buy,
            shares,
            limit: max_cost,
        }
    }

    pub fn sell(account: AccountId, outcome: Outcome, shares: Fixed, min_proceeds: Fixed) -> Self {
        Self {
            intent_id: None,
            account,
            outcome,
            direction: Direction::Sell,
            shares,
            limit: min_proceeds,
        }
    }

    pub fn with_id(mut self, intent_id: IntentId) -> Self {
        self.intent_id = Some(intent_id);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradeReceipt {
    pub market_id: MarketId,
    pub account_id: AccountId,
    pub outcome: Outcome,
    pub direction: Direction,
    pub shares: Fixed,
    /// cost paid for a buy, proceeds received for a sell. fee included.
    pub amount: Fixed,
    pub fee: Fixed,
    pub average_price: Decimal,
    pub pool_yes: Fixed,
    pub pool_no: Fixed,
    pub probability_yes: Decimal,
    pub executed_at: Timestamp,
    pub intent_id: Option<IntentId>,
    /// true when returned from the intent cache instead of executed
    pub replayed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EngineError {
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Market {0} is closed for trading")]
    MarketClosed(MarketId),

    #[error("Slippage exceeded: {amount} against limit {limit}")]
    SlippageExceeded { amount: Fixed, limit: Fixed },

    #[error("Insufficient shares: holding {held} {outcome}, requested {requested}")]
    InsufficientShares {
        outcome: Outcome,
        held: Fixed,
        requested: Fixed,
    },

    #[error("Insufficient liquidity: {0}")]
    InsufficientLiquidity(String),

    #[error("Market {0} is already resolved")]
    AlreadyResolved(MarketId),

    #[error("Market {market_id} is still open until {closes_at}")]
    MarketStillOpen {
        market_id: MarketId,
        closes_at: Timestamp,
    },

    #[error("Market {0} is not resolved")]
    MarketNotResolved(MarketId),

    #[error("{account_id} already claimed in {market_id}")]
    AlreadyClaimed {
        market_id: MarketId,
        account_id: AccountId,
    },

    #[error("{account_id} holds no winning shares in {market_id}")]
    NoPosition {
        market_id: MarketId,
        account_id: AccountId,
    },

    #[error("Market {0} not found")]
    MarketNotFound(MarketId),

    #[error("Arithmetic overflow")]
    ArithmeticOverflow,
}

impl From<MarketError> for EngineError {
    fn from(e: MarketError) -> Self {
        EngineError::InvalidParameter(e.to_string())
    }
}

impl From<CurveError> for EngineError {
    fn from(e: CurveError) -> Self {
        match e {
            CurveError::InvalidAmount(_) => EngineError::InvalidParameter(e.to_string()),
            CurveError::InsufficientLiquidity { reason } => EngineError::InsufficientLiquidity(reason),
            CurveError::Overflow => EngineError::ArithmeticOverflow,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn market_errors_are_invalid_parameters() {
        let err: EngineError = MarketError::NonPositiveShares(Fixed::ZERO).into();
        assert!(matches!(err, EngineError::InvalidParameter(_)));
    }

    #[test]
    fn curve_errors_map_by_kind() {
        let err: EngineError = CurveError::InsufficientLiquidity {
            reason: "band".to_string(),
        }
        .into();
        assert_eq!(err, EngineError::InsufficientLiquidity("band".to_string()));
        assert_eq!(EngineError::from(CurveError::Overflow), EngineError::ArithmeticOverflow);
    }

    #[test]
    fn intent_builders() {
        let intent = TradeIntent::sell(AccountId(2), Outcome::No, Fixed::from_int(5), Fixed::from_int(1))
            .with_id(IntentId(9));
        assert_eq!(intent.direction, Direction::Sell);
        assert_eq!(intent.limit, Fixed::from_int(1));
        assert_eq!(intent.intent_id, Some(IntentId(9)));
    }
}
