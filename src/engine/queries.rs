//! Read-only position queries. each copies out of the market's read lock.

use super::core::Engine;
use super::results::EngineError;
use crate::accounting::{self, PositionValuation};
use crate::fixed::Fixed;
use crate::position::Position;
use crate::types::{AccountId, MarketId};

impl Engine {
    pub fn position(&self, market_id: MarketId, account_id: AccountId) -> Result<Option<Position>, EngineError> {
        let book = self.book(market_id)?;
        let position = book.read().position(account_id).cloned();
        Ok(position)
    }

    /// Every position in the market, ordered by account
    pub fn positions(&self, market_id: MarketId) -> Result<Vec<Position>, EngineError> {
        let book = self.book(market_id)?;
        let mut positions: Vec<Position> = book.read().positions().cloned().collect();
        positions.sort_by_key(|p| p.account_id);
        Ok(positions)
    }

    /// Marked value of the account's shares. zero when it holds nothing.
    pub fn current_value(&self, market_id: MarketId, account_id: AccountId) -> Result<Fixed, EngineError> {
        let book = self.book(market_id)?;
        let book = book.read();
        let position = book.position_or_empty(account_id, book.market.opened_at);
        Ok(accounting::current_value(&position, &book.market)?)
    }

    pub fn unrealized_pnl(&self, market_id: MarketId, account_id: AccountId) -> Result<Fixed, EngineError> {
        let book = self.book(market_id)?;
        let book = book.read();
        let position = book.position_or_empty(account_id, book.market.opened_at);
        Ok(accounting::unrealized_pnl(&position, &book.market)?)
    }

    pub fn valuation(&self, market_id: MarketId, account_id: AccountId) -> Result<PositionValuation, EngineError> {
        let book = self.book(market_id)?;
        let book = book.read();
        let position = book.position_or_empty(account_id, book.market.opened_at);
        Ok(accounting::valuation(&position, &book.market)?)
    }

    /// Pool value left after every winning share is redeemed. `None` while open.
    pub fn residual_liquidity(&self, market_id: MarketId) -> Result<Option<Fixed>, EngineError> {
        let book = self.book(market_id)?;
        let residual = book.read().market.residual_liquidity();
        Ok(residual)
    }
}
