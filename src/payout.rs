// 5.0: redemption math for resolved markets. each winning share redeems for one unit,
// losing shares for nothing. the engine applies the result; this module only decides.

use crate::fixed::Fixed;
use crate::market::Market;
use crate::position::Position;

pub const UNIT_REDEMPTION_VALUE: Fixed = Fixed::ONE;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum PayoutError {
    #[error("market is not resolved")]
    MarketNotResolved,

    #[error("position already claimed")]
    AlreadyClaimed,

    #[error("no shares of the winning outcome")]
    NoWinningShares,

    #[error("payout exceeds remaining pool value")]
    Insolvent,
}

// 5.1: what `claim` pays for this position, checked in precondition order.
pub fn payout_for(position: &Position, market: &Market) -> Result<Fixed, PayoutError> {
    let winner = market
        .resolved_outcome
        .ok_or(PayoutError::MarketNotResolved)?;
    if position.claimed {
        return Err(PayoutError::AlreadyClaimed);
    }

    let shares = position.shares(winner);
    if shares.is_zero() {
        return Err(PayoutError::NoWinningShares);
    }

    let payout = shares
        .checked_mul_down(UNIT_REDEMPTION_VALUE)
        .ok_or(PayoutError::Insolvent)?;
    // claims never pass the winning shares issued, nor the pool that backs them
    if payout > market.outstanding_liability() || market.total_claimed + payout > market.pool_total() {
        return Err(PayoutError::Insolvent);
    }
    Ok(payout)
}
