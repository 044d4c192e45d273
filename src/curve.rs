// 3.0: the cost function. logarithmic market scoring rule over issued shares:
//   C(qYes, qNo) = b * ln(e^(qYes/b) + e^(qNo/b))
// evaluated as max(q) + b * ln(1 + e^(-|qYes - qNo| / b)) so nothing overflows.
// a buy costs C(after) - C(before), a sell pays C(before) - C(after). the pool total moves by
// exactly that amount and is split between the outcomes by the curve's marginal price, so
// poolYes / (poolYes + poolNo) is the implied probability.
// 3.1 has quoting, 3.2 the pool split.

use crate::fixed::{self, Fixed};
use crate::types::{Bps, Direction, Outcome};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CurveError {
    #[error("share amount must be positive, got {0}")]
    InvalidAmount(Fixed),

    #[error("insufficient liquidity: {reason}")]
    InsufficientLiquidity { reason: String },

    #[error("arithmetic overflow evaluating the cost function")]
    Overflow,
}

/// Curve parameters fixed at market open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurveParams {
    /// LMSR depth `b`. larger depth means less price impact per share.
    pub depth: Fixed,
    /// Fee charged on top of buys and deducted from sells. stays in the pools.
    pub fee: Bps,
    /// Smallest implied probability a trade may leave either outcome at.
    pub probability_floor: Decimal,
}

/// Pools plus the issued share totals they are derived from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurveState {
    pub pool_yes: Fixed,
    pub pool_no: Fixed,
    pub shares_yes: Fixed,
    pub shares_no: Fixed,
}

impl CurveState {
    /// Equal pools, nothing issued: 50/50.
    pub fn seeded(initial_liquidity: Fixed) -> Self {
        Self {
            pool_yes: initial_liquidity,
            pool_no: initial_liquidity,
            shares_yes: Fixed::ZERO,
            shares_no: Fixed::ZERO,
        }
    }

    pub fn pool(&self, outcome: Outcome) -> Fixed {
        match outcome {
            Outcome::Yes => self.pool_yes,
            Outcome::No => self.pool_no,
        }
    }

    pub fn shares(&self, outcome: Outcome) -> Fixed {
        match outcome {
            Outcome::Yes => self.shares_yes,
            Outcome::No => self.shares_no,
        }
    }

    pub fn pool_total(&self) -> Fixed {
        self.pool_yes + self.pool_no
    }

    /// outcome pool / total pool
    pub fn implied_probability(&self, outcome: Outcome) -> Decimal {
        self.pool(outcome)
            .ratio_of(self.pool_total())
            .unwrap_or(Decimal::ZERO)
    }

    fn with_shares(&self, outcome: Outcome, shares: Fixed) -> Self {
        let mut next = *self;
        match outcome {
            Outcome::Yes => next.shares_yes = shares,
            Outcome::No => next.shares_no = shares,
        }
        next
    }
}

/// Result of pricing one trade. nothing is applied until the ledger commits `after`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurveQuote {
    pub outcome: Outcome,
    pub direction: Direction,
    pub shares: Fixed,
    /// Curve integral for the trade, before fees.
    pub gross: Fixed,
    pub fee: Fixed,
    /// What the trader pays (buy) or receives (sell).
    pub amount: Fixed,
    pub before: CurveState,
    pub after: CurveState,
}

impl CurveQuote {
    pub fn average_price(&self) -> Decimal {
        self.amount.ratio_of(self.shares).unwrap_or(Decimal::ZERO)
    }

    pub fn probability_before(&self) -> Decimal {
        self.before.implied_probability(Outcome::Yes)
    }

    pub fn probability_after(&self) -> Decimal {
        self.after.implied_probability(Outcome::Yes)
    }
}

/// LMSR cost function. pure and deterministic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Lmsr {
    params: CurveParams,
}

impl Lmsr {
    pub fn new(params: CurveParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &CurveParams {
        &self.params
    }

    /// C(q) at full decimal precision.
    pub fn cost(&self, shares_yes: Fixed, shares_no: Fixed) -> Result<Decimal, CurveError> {
        let b = self.params.depth.value();
        let high = shares_yes.max(shares_no).value();
        let tail = self.tail(shares_yes, shares_no)?;
        let log_term = fixed::ln_1p(tail).ok_or(CurveError::Overflow)?;
        b.checked_mul(log_term)
            .and_then(|scaled| high.checked_add(scaled))
            .ok_or(CurveError::Overflow)
    }

    /// dC/dq for the outcome: e^(q/b) / (e^(qYes/b) + e^(qNo/b)). the two prices sum to one.
    pub fn marginal_price(
        &self,
        shares_yes: Fixed,
        shares_no: Fixed,
        outcome: Outcome,
    ) -> Result<Decimal, CurveError> {
        let tail = self.tail(shares_yes, shares_no)?;
        let leading = Decimal::ONE
            .checked_div(Decimal::ONE + tail)
            .ok_or(CurveError::Overflow)?;
        let trailing = Decimal::ONE - leading;

        let yes_leads = shares_yes >= shares_no;
        let price_yes = if yes_leads { leading } else { trailing };
        Ok(match outcome {
            Outcome::Yes => price_yes,
            Outcome::No => Decimal::ONE - price_yes,
        })
    }

    // e^(-|qYes - qNo| / b). zero once the gap is far past the band, so extreme states
    // surface as a band rejection rather than an overflow.
    fn tail(&self, shares_yes: Fixed, shares_no: Fixed) -> Result<Decimal, CurveError> {
        let gap = (shares_yes - shares_no).abs().value();
        let exponent = gap
            .checked_div(self.params.depth.value())
            .ok_or(CurveError::Overflow)?;
        fixed::exp_decay(exponent).ok_or(CurveError::Overflow)
    }

    // 3.1: price a trade against `state` without mutating anything.
    pub fn quote(
        &self,
        state: &CurveState,
        outcome: Outcome,
        direction: Direction,
        shares: Fixed,
    ) -> Result<CurveQuote, CurveError> {
        if !shares.is_positive() {
            return Err(CurveError::InvalidAmount(shares));
        }
        match direction {
            Direction::Buy => self.quote_buy(state, outcome, shares),
            Direction::Sell => self.quote_sell(state, outcome, shares),
        }
    }

    pub fn quote_buy(
        &self,
        state: &CurveState,
        outcome: Outcome,
        shares: Fixed,
    ) -> Result<CurveQuote, CurveError> {
        let issued = state
            .shares(outcome)
            .checked_add(shares)
            .ok_or(CurveError::Overflow)?;
        let moved = state.with_shares(outcome, issued);

        let before = self.cost(state.shares_yes, state.shares_no)?;
        let after = self.cost(moved.shares_yes, moved.shares_no)?;
        let gross = Fixed::round_up(after.checked_sub(before).ok_or(CurveError::Overflow)?);
        let fee = gross
            .mul_decimal_up(self.params.fee.as_fraction())
            .ok_or(CurveError::Overflow)?;
        let amount = gross.checked_add(fee).ok_or(CurveError::Overflow)?;

        let total = state
            .pool_total()
            .checked_add(amount)
            .ok_or(CurveError::Overflow)?;
        let after_state = self.split_pools(moved, total)?;

        Ok(CurveQuote {
            outcome,
            direction: Direction::Buy,
            shares,
            gross,
            fee,
            amount,
            before: *state,
            after: after_state,
        })
    }

    pub fn quote_sell(
        &self,
        state: &CurveState,
        outcome: Outcome,
        shares: Fixed,
    ) -> Result<CurveQuote, CurveError> {
        let outstanding = state.shares(outcome);
        if shares > outstanding {
            return Err(CurveError::InsufficientLiquidity {
                reason: format!("sell of {} {} exceeds {} issued", shares, outcome, outstanding),
            });
        }
        let moved = state.with_shares(outcome, outstanding - shares);

        let before = self.cost(state.shares_yes, state.shares_no)?;
        let after = self.cost(moved.shares_yes, moved.shares_no)?;
        let gross = Fixed::round_down(before.checked_sub(after).ok_or(CurveError::Overflow)?);
        let fee = gross
            .mul_decimal_up(self.params.fee.as_fraction())
            .ok_or(CurveError::Overflow)?
            .min(gross);
        let amount = gross - fee;

        let total = state
            .pool_total()
            .checked_sub(amount)
            .ok_or(CurveError::Overflow)?;
        if !total.is_positive() {
            return Err(CurveError::InsufficientLiquidity {
                reason: format!("sell would pay {} from a pool of {}", amount, state.pool_total()),
            });
        }
        let after_state = self.split_pools(moved, total)?;

        Ok(CurveQuote {
            outcome,
            direction: Direction::Sell,
            shares,
            gross,
            fee,
            amount,
            before: *state,
            after: after_state,
        })
    }

    // 3.2: split the pool total by marginal price. rejects states outside the probability band,
    // which also keeps both pools strictly positive.
    fn split_pools(&self, moved: CurveState, total: Fixed) -> Result<CurveState, CurveError> {
        let price_yes = self.marginal_price(moved.shares_yes, moved.shares_no, Outcome::Yes)?;
        let floor = self.params.probability_floor;
        if price_yes < floor || price_yes > Decimal::ONE - floor {
            return Err(CurveError::InsufficientLiquidity {
                reason: format!(
                    "implied probability {} would leave the [{}, {}] band",
                    price_yes.round_dp(6),
                    floor,
                    Decimal::ONE - floor
                ),
            });
        }

        let pool_yes = total
            .mul_decimal_down(price_yes)
            .ok_or(CurveError::Overflow)?;
        let pool_no = total - pool_yes;
        if !pool_yes.is_positive() || !pool_no.is_positive() {
            return Err(CurveError::InsufficientLiquidity {
                reason: "trade would empty a pool".to_string(),
            });
        }

        Ok(CurveState {
            pool_yes,
            pool_no,
            ..moved
        })
    }
}
