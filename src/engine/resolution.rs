//! Resolution and payout.
//!
//! `resolve` is the one-way Open -> Resolved transition. `claim` redeems a resolved
//! position exactly once.

use super::core::Engine;
use super::results::EngineError;
use crate::events::{ClaimedEvent, EventPayload, MarketResolvedEvent};
use crate::fixed::Fixed;
use crate::market::Market;
use crate::payout::{payout_for, PayoutError};
use crate::settlement::SettlementReason;
use crate::types::{AccountId, MarketId, Outcome};
use tracing::info;

impl Engine {
    /// Fix the winning outcome. allowed once, and only from `closes_at` on.
    pub fn resolve(&self, market_id: MarketId, outcome: Outcome) -> Result<Market, EngineError> {
        let book = self.book(market_id)?;
        let mut book = book.write();
        let now = self.now();

        if book.market.is_resolved() {
            return Err(EngineError::AlreadyResolved(market_id));
        }
        if now < book.market.closes_at {
            return Err(EngineError::MarketStillOpen {
                market_id,
                closes_at: book.market.closes_at,
            });
        }

        book.market.resolve(outcome, now);
        let pool_total = book.market.pool_total();
        let winning_shares = book.market.curve.shares(outcome);
        let losing_shares = book.market.curve.shares(outcome.opposite());
        book.events.emit(
            now,
            EventPayload::MarketResolved(MarketResolvedEvent {
                outcome,
                pool_total,
                winning_shares,
            }),
        );

        info!(
            market_id = %market_id,
            outcome = %outcome,
            pool_total = %pool_total,
            winning_shares = %winning_shares,
            losing_shares = %losing_shares,
            "Market resolved"
        );
        Ok(book.market.clone())
    }

    /// Redeem the account's winning shares at unit value. returns the amount queued for delivery.
    pub fn claim(&self, market_id: MarketId, account_id: AccountId) -> Result<Fixed, EngineError> {
        let book = self.book(market_id)?;
        let mut book = book.write();
        let now = self.now();

        let mut position = book.position_or_empty(account_id, now);
        let payout = payout_for(&position, &book.market).map_err(|e| match e {
            PayoutError::MarketNotResolved => EngineError::MarketNotResolved(market_id),
            PayoutError::AlreadyClaimed => EngineError::AlreadyClaimed {
                market_id,
                account_id,
            },
            PayoutError::NoWinningShares => EngineError::NoPosition {
                market_id,
                account_id,
            },
            PayoutError::Insolvent => EngineError::InsufficientLiquidity(e.to_string()),
        })?;

        position.mark_claimed(payout, now);
        book.positions.insert(account_id, position);
        book.market.record_claim(payout);
        book.settlements
            .deliver(account_id, payout, SettlementReason::Payout, None, now);
        book.events.emit(
            now,
            EventPayload::Claimed(ClaimedEvent {
                account_id,
                amount: payout,
            }),
        );

        info!(
            market_id = %market_id,
            account_id = %account_id,
            payout = %payout,
            outstanding = %book.market.outstanding_liability(),
            "Payout claimed"
        );
        Ok(payout)
    }
}
