// 4.0: per-account share holdings in one market. one Holding per outcome so a sell only
// releases the cost basis of the outcome sold.
// 4.1 has increase/reduce logic at the bottom.

use crate::fixed::Fixed;
use crate::types::{AccountId, MarketId, Outcome, Timestamp};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Holding {
    pub shares: Fixed,
    /// amount paid for the shares still held
    pub cost_basis: Fixed,
}

impl Holding {
    pub fn is_empty(&self) -> bool {
        self.shares.is_zero()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub account_id: AccountId,
    pub market_id: MarketId,
    pub yes: Holding,
    pub no: Holding,
    /// proceeds minus released basis, summed over sells
    pub realized_pnl: Fixed,
    pub claimed: bool,
    /// amount paid out at claim, zero until then
    pub payout: Fixed,
    pub opened_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Position {
    pub fn new(account_id: AccountId, market_id: MarketId, timestamp: Timestamp) -> Self {
        Self {
            account_id,
            market_id,
            yes: Holding::default(),
            no: Holding::default(),
            realized_pnl: Fixed::ZERO,
            claimed: false,
            payout: Fixed::ZERO,
            opened_at: timestamp,
            updated_at: timestamp,
        }
    }

    pub fn holding(&self, outcome: Outcome) -> &Holding {
        match outcome {
            Outcome::Yes => &self.yes,
            Outcome::No => &self.no,
        }
    }

    fn holding_mut(&mut self, outcome: Outcome) -> &mut Holding {
        match outcome {
            Outcome::Yes => &mut self.yes,
            Outcome::No => &mut self.no,
        }
    }

    pub fn shares(&self, outcome: Outcome) -> Fixed {
        self.holding(outcome).shares
    }

    pub fn shares_yes(&self) -> Fixed {
        self.yes.shares
    }

    pub fn shares_no(&self) -> Fixed {
        self.no.shares
    }

    /// total paid for everything still held
    pub fn cost_basis(&self) -> Fixed {
        self.yes.cost_basis + self.no.cost_basis
    }

    pub fn is_empty(&self) -> bool {
        self.yes.is_empty() && self.no.is_empty()
    }

    // one-time flip at claim. shares stay on record.
    pub fn mark_claimed(&mut self, payout: Fixed, timestamp: Timestamp) {
        debug_assert!(!self.claimed, "position claimed twice");
        self.claimed = true;
        self.payout = payout;
        self.updated_at = timestamp;
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PositionUpdate {
    pub new_position: Position,
    /// basis released by this sell
    pub basis_released: Fixed,
    /// proceeds - basis_released
    pub realized_pnl: Fixed,
}

// 4.1: buy. shares and basis both grow by what was bought and paid.
pub fn increase_position(
    position: &Position,
    outcome: Outcome,
    shares: Fixed,
    cost: Fixed,
    timestamp: Timestamp,
) -> Position {
    debug_assert!(shares.is_positive(), "increase must add shares");

    let mut next = position.clone();
    let holding = next.holding_mut(outcome);
    holding.shares = holding.shares + shares;
    holding.cost_basis = holding.cost_basis + cost;
    next.updated_at = timestamp;
    next
}

// 4.2: sell. basis released pro-rata to the fraction of the holding sold.
// selling the whole holding releases the whole basis, no rounding dust left behind.
pub fn reduce_position(
    position: &Position,
    outcome: Outcome,
    shares: Fixed,
    proceeds: Fixed,
    timestamp: Timestamp,
) -> PositionUpdate {
    let held = position.holding(outcome);
    debug_assert!(shares.is_positive(), "reduce amount must be positive");
    debug_assert!(shares <= held.shares, "reduce beyond holding");

    let shares = shares.min(held.shares);
    let basis_released = if shares == held.shares {
        held.cost_basis
    } else {
        held.cost_basis
            .value()
            .checked_mul(shares.value())
            .and_then(|scaled| scaled.checked_div(held.shares.value()))
            .map(Fixed::round_down)
            .unwrap_or(Fixed::ZERO)
            .min(held.cost_basis)
    };
    let realized = proceeds - basis_released;

    let mut next = position.clone();
    let holding = next.holding_mut(outcome);
    holding.shares = holding.shares - shares;
    holding.cost_basis = holding.cost_basis - basis_released;
    next.realized_pnl = next.realized_pnl + realized;
    next.updated_at = timestamp;

    PositionUpdate {
        new_position: next,
        basis_released,
        realized_pnl: realized,
    }
}
