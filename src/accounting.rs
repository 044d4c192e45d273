//! Position accounting: read-only valuation of a position against its market.
//!
//! While the market is open each share class is marked at the curve's current
//! marginal price. This is informational, not an executable quote. Once resolved,
//! winning shares are worth the unit redemption value and losing shares nothing.

use crate::curve::CurveError;
use crate::fixed::Fixed;
use crate::market::Market;
use crate::payout::UNIT_REDEMPTION_VALUE;
use crate::position::Position;
use crate::types::Outcome;
use serde::{Deserialize, Serialize};

/// Shares, value and P&L for one account in one market.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionValuation {
    pub shares_yes: Fixed,
    pub shares_no: Fixed,
    pub value_yes: Fixed,
    pub value_no: Fixed,
    pub current_value: Fixed,
    pub cost_basis: Fixed,
    pub unrealized_pnl: Fixed,
    pub realized_pnl: Fixed,
    /// what `claim` would pay right now
    pub claimable: Fixed,
    pub claimed: bool,
}

/// Value of one share class.
pub fn outcome_value(
    position: &Position,
    market: &Market,
    outcome: Outcome,
) -> Result<Fixed, CurveError> {
    if position.claimed {
        return Ok(Fixed::ZERO);
    }
    let shares = position.shares(outcome);
    if shares.is_zero() {
        return Ok(Fixed::ZERO);
    }

    match market.resolved_outcome {
        Some(winner) if winner == outcome => shares
            .checked_mul_down(UNIT_REDEMPTION_VALUE)
            .ok_or(CurveError::Overflow),
        Some(_) => Ok(Fixed::ZERO),
        None => {
            let price = market.lmsr().marginal_price(
                market.total_shares_yes(),
                market.total_shares_no(),
                outcome,
            )?;
            shares.mul_decimal_down(price).ok_or(CurveError::Overflow)
        }
    }
}

pub fn current_value(position: &Position, market: &Market) -> Result<Fixed, CurveError> {
    let yes = outcome_value(position, market, Outcome::Yes)?;
    let no = outcome_value(position, market, Outcome::No)?;
    Ok(yes + no)
}

/// current value - cost basis. a claimed position has nothing left unrealized.
pub fn unrealized_pnl(position: &Position, market: &Market) -> Result<Fixed, CurveError> {
    if position.claimed {
        return Ok(Fixed::ZERO);
    }
    Ok(current_value(position, market)? - position.cost_basis())
}

/// realized over sells, plus payout - remaining basis once claimed
pub fn realized_pnl(position: &Position) -> Fixed {
    if position.claimed {
        position.realized_pnl + position.payout - position.cost_basis()
    } else {
        position.realized_pnl
    }
}

pub fn claimable(position: &Position, market: &Market) -> Fixed {
    if position.claimed {
        return Fixed::ZERO;
    }
    match market.resolved_outcome {
        Some(winner) => position.shares(winner),
        None => Fixed::ZERO,
    }
}

pub fn valuation(position: &Position, market: &Market) -> Result<PositionValuation, CurveError> {
    let value_yes = outcome_value(position, market, Outcome::Yes)?;
    let value_no = outcome_value(position, market, Outcome::No)?;
    let current_value = value_yes + value_no;
    let unrealized = if position.claimed {
        Fixed::ZERO
    } else {
        current_value - position.cost_basis()
    };

    Ok(PositionValuation {
        shares_yes: position.shares_yes(),
        shares_no: position.shares_no(),
        value_yes,
        value_no,
        current_value,
        cost_basis: position.cost_basis(),
        unrealized_pnl: unrealized,
        realized_pnl: realized_pnl(position),
        claimable: claimable(position, market),
        claimed: position.claimed,
    })
}
