// 2.0: fixed-point quantities. every share count, pool balance, cost and payout is a Fixed:
// a decimal normalized to 18 fractional digits (integer mantissa, no floats anywhere).
// 2.1 at the bottom has the exp / ln series the cost function needs.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, Neg, Sub};

/// Number of fractional digits carried by every `Fixed`.
pub const DECIMALS: u32 = 18;

// 10^18, the wire scale.
const RAW_SCALE: i128 = 1_000_000_000_000_000_000;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FixedError {
    #[error("raw value {0} does not fit a 96-bit decimal mantissa")]
    OutOfRange(i128),
}

/// Signed fixed-point quantity with `DECIMALS` fractional digits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "Decimal", into = "Decimal")]
pub struct Fixed(Decimal);

impl Fixed {
    pub const ZERO: Fixed = Fixed(Decimal::ZERO);
    pub const ONE: Fixed = Fixed(Decimal::ONE);

    /// Rounds to the nearest representable value (ties to even).
    pub fn new(value: Decimal) -> Self {
        Self(value.round_dp_with_strategy(DECIMALS, RoundingStrategy::MidpointNearestEven))
    }

    /// Rounds toward +infinity. Used for amounts a trader pays.
    pub fn round_up(value: Decimal) -> Self {
        Self(value.round_dp_with_strategy(DECIMALS, RoundingStrategy::ToPositiveInfinity))
    }

    /// Rounds toward -infinity. Used for amounts a trader receives.
    pub fn round_down(value: Decimal) -> Self {
        Self(value.round_dp_with_strategy(DECIMALS, RoundingStrategy::ToNegativeInfinity))
    }

    pub fn from_int(value: i64) -> Self {
        Self(Decimal::from(value))
    }

    /// Builds from the wire form: an integer scaled by 10^18.
    pub fn from_raw(raw: i128) -> Result<Self, FixedError> {
        Decimal::try_from_i128_with_scale(raw, DECIMALS)
            .map(|d| Self(d.normalize()))
            .map_err(|_| FixedError::OutOfRange(raw))
    }

    /// The wire form: this value times 10^18 as an integer.
    pub fn to_raw(&self) -> i128 {
        // scale never exceeds DECIMALS after construction
        let scale = self.0.scale().min(DECIMALS);
        self.0.mantissa() * 10i128.pow(DECIMALS - scale)
    }

    pub fn value(&self) -> Decimal {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    pub fn is_positive(&self) -> bool {
        self.0 > Decimal::ZERO
    }

    pub fn is_negative(&self) -> bool {
        self.0 < Decimal::ZERO
    }

    pub fn abs(&self) -> Self {
        Self(self.0.abs())
    }

    pub fn checked_add(&self, other: Fixed) -> Option<Fixed> {
        self.0.checked_add(other.0).map(Self)
    }

    pub fn checked_sub(&self, other: Fixed) -> Option<Fixed> {
        self.0.checked_sub(other.0).map(Self)
    }

    pub fn checked_mul_down(&self, other: Fixed) -> Option<Fixed> {
        self.0.checked_mul(other.0).map(Self::round_down)
    }

    pub fn checked_mul_up(&self, other: Fixed) -> Option<Fixed> {
        self.0.checked_mul(other.0).map(Self::round_up)
    }

    pub fn checked_div_down(&self, other: Fixed) -> Option<Fixed> {
        self.0.checked_div(other.0).map(Self::round_down)
    }

    /// Multiplies by a raw decimal factor (probabilities, fee fractions) and rounds down.
    pub fn mul_decimal_down(&self, factor: Decimal) -> Option<Fixed> {
        self.0.checked_mul(factor).map(Self::round_down)
    }

    pub fn mul_decimal_up(&self, factor: Decimal) -> Option<Fixed> {
        self.0.checked_mul(factor).map(Self::round_up)
    }

    pub fn min(self, other: Fixed) -> Fixed {
        if self <= other {
            self
        } else {
            other
        }
    }

    pub fn max(self, other: Fixed) -> Fixed {
        if self >= other {
            self
        } else {
            other
        }
    }

    /// `self` as a fraction of `whole`, at full decimal precision.
    pub fn ratio_of(&self, whole: Fixed) -> Option<Decimal> {
        if whole.is_zero() {
            return None;
        }
        self.0.checked_div(whole.0)
    }
}

impl Add for Fixed {
    type Output = Fixed;

    fn add(self, rhs: Fixed) -> Fixed {
        Fixed(self.0 + rhs.0)
    }
}

impl Sub for Fixed {
    type Output = Fixed;

    fn sub(self, rhs: Fixed) -> Fixed {
        Fixed(self.0 - rhs.0)
    }
}

impl Neg for Fixed {
    type Output = Fixed;

    fn neg(self) -> Fixed {
        Fixed(-self.0)
    }
}

impl Sum for Fixed {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Fixed::ZERO, |acc, x| acc + x)
    }
}

impl<'a> Sum<&'a Fixed> for Fixed {
    fn sum<I: Iterator<Item = &'a Self>>(iter: I) -> Self {
        iter.fold(Fixed::ZERO, |acc, x| acc + *x)
    }
}

impl From<Decimal> for Fixed {
    fn from(value: Decimal) -> Self {
        Fixed::new(value)
    }
}

impl From<Fixed> for Decimal {
    fn from(value: Fixed) -> Self {
        value.0
    }
}

impl fmt::Display for Fixed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.normalize())
    }
}

// 2.1: transcendental helpers on raw decimals. deterministic series, no floats.

const E: Decimal = dec!(2.7182818284590452353602874714);
const MAX_SERIES_TERMS: u32 = 96;
// e^64 still fits the mantissa
const MAX_EXP_ARGUMENT: u32 = 64;

/// e^x. Splits x into integer and fractional parts: e^n by repeated multiplication,
/// e^f by Taylor series. Negative arguments go through the reciprocal.
pub fn exp(x: Decimal) -> Option<Decimal> {
    if x.is_zero() {
        return Some(Decimal::ONE);
    }
    if x.is_sign_negative() {
        let positive = exp(-x)?;
        return Decimal::ONE.checked_div(positive);
    }

    let whole = x.trunc();
    let frac = x.checked_sub(whole)?;
    let n = whole.to_u32()?;
    if n > MAX_EXP_ARGUMENT {
        return None;
    }

    let mut sum = Decimal::ONE;
    let mut term = Decimal::ONE;
    for i in 1..=MAX_SERIES_TERMS {
        term = term.checked_mul(frac)?.checked_div(Decimal::from(i))?;
        if term.is_zero() {
            break;
        }
        sum = sum.checked_add(term)?;
    }

    let mut scale = Decimal::ONE;
    for _ in 0..n {
        scale = scale.checked_mul(E)?;
    }
    sum.checked_mul(scale)
}

/// e^(-x) for x >= 0. Past the exp domain the result is below the decimal's resolution,
/// so it saturates to zero instead of failing.
pub fn exp_decay(x: Decimal) -> Option<Decimal> {
    if x < Decimal::ZERO {
        return None;
    }
    if x > Decimal::from(MAX_EXP_ARGUMENT) {
        return Some(Decimal::ZERO);
    }
    exp(-x)
}

/// ln(1 + x) for x in [0, 1] via ln(1 + x) = 2 atanh(x / (2 + x)).
pub fn ln_1p(x: Decimal) -> Option<Decimal> {
    if x.is_sign_negative() || x > Decimal::ONE {
        return None;
    }
    if x.is_zero() {
        return Some(Decimal::ZERO);
    }

    let z = x.checked_div(Decimal::TWO.checked_add(x)?)?;
    let z_squared = z.checked_mul(z)?;

    let mut sum = z;
    let mut power = z;
    for k in 1..=MAX_SERIES_TERMS {
        power = power.checked_mul(z_squared)?;
        let term = power.checked_div(Decimal::from(2 * k + 1))?;
        if term.is_zero() {
            break;
        }
        sum = sum.checked_add(term)?;
    }
    sum.checked_mul(Decimal::TWO)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: Decimal, b: Decimal, tolerance: Decimal) -> bool {
        (a - b).abs() <= tolerance
    }

    #[test]
    fn rounding_directions() {
        let third = Decimal::ONE / Decimal::from(3);
        let up = Fixed::round_up(third);
        let down = Fixed::round_down(third);
        assert!(up > down);
        assert_eq!(up.to_raw() - down.to_raw(), 1);
        assert_eq!(down.to_raw(), 333_333_333_333_333_333);
    }

    #[test]
    fn raw_round_trip_keeps_scale() {
        let amount = Fixed::new(dec!(1234.5));
        assert_eq!(amount.to_raw(), 1_234_500_000_000_000_000_000);
        assert_eq!(Fixed::from_raw(amount.to_raw()).unwrap(), amount);
        assert_eq!(Fixed::from_raw(1).unwrap().value(), dec!(0.000000000000000001));
    }

    #[test]
    fn raw_out_of_range() {
        assert!(matches!(Fixed::from_raw(i128::MAX), Err(FixedError::OutOfRange(_))));
    }

    #[test]
    fn fractional_digits_are_capped() {
        let tiny = Fixed::new(dec!(0.0000000000000000004));
        assert!(tiny.is_zero());
        let half_ulp_up = Fixed::round_up(dec!(0.0000000000000000004));
        assert_eq!(half_ulp_up.to_raw(), 1);
    }

    #[test]
    fn exp_matches_known_values() {
        let tolerance = dec!(0.000000000000000000001);
        assert_eq!(exp(Decimal::ZERO).unwrap(), Decimal::ONE);
        assert!(close(exp(Decimal::ONE).unwrap(), E, tolerance));
        // e^-1 = 0.36787944117144232159552377016146
        assert!(close(
            exp(-Decimal::ONE).unwrap(),
            dec!(0.3678794411714423215955237702),
            tolerance
        ));
        // e^2.5 = 12.182493960703473438070175951167966
        assert!(close(
            exp(dec!(2.5)).unwrap(),
            dec!(12.182493960703473438070175951),
            dec!(0.00000000000000000001)
        ));
    }

    #[test]
    fn exp_is_monotonic_over_small_steps() {
        let mut previous = exp(dec!(-9)).unwrap();
        let mut x = dec!(-9);
        while x < dec!(9) {
            x += dec!(0.37);
            let current = exp(x).unwrap();
            assert!(current > previous);
            previous = current;
        }
    }

    #[test]
    fn exp_rejects_huge_arguments() {
        assert!(exp(dec!(100)).is_none());
    }

    #[test]
    fn exp_decay_saturates_past_the_domain() {
        assert!(close(exp_decay(Decimal::ONE).unwrap(), exp(-Decimal::ONE).unwrap(), Decimal::ZERO));
        assert!(exp_decay(dec!(60)).unwrap() > Decimal::ZERO);
        assert_eq!(exp_decay(dec!(64.5)).unwrap(), Decimal::ZERO);
        assert_eq!(exp_decay(dec!(1000000)).unwrap(), Decimal::ZERO);
        assert!(exp_decay(dec!(-1)).is_none());
    }

    #[test]
    fn ln_1p_matches_known_values() {
        let tolerance = dec!(0.000000000000000000001);
        // ln 2 = 0.69314718055994530941723212145818
        assert!(close(ln_1p(Decimal::ONE).unwrap(), dec!(0.6931471805599453094172321215), tolerance));
        // ln 1.5 = 0.40546510810816438197801311546435
        assert!(close(ln_1p(dec!(0.5)).unwrap(), dec!(0.4054651081081643819780131155), tolerance));
        assert_eq!(ln_1p(Decimal::ZERO).unwrap(), Decimal::ZERO);
        assert!(ln_1p(dec!(-0.1)).is_none());
        assert!(ln_1p(dec!(1.5)).is_none());
    }

    #[test]
    fn ln_1p_inverts_exp() {
        let x = dec!(0.3);
        let y = exp(x).unwrap() - Decimal::ONE;
        assert!(close(ln_1p(y).unwrap(), x, dec!(0.00000000000000000001)));
    }

    #[test]
    fn arithmetic_and_sum() {
        let a = Fixed::from_int(10);
        let b = Fixed::new(dec!(2.5));
        assert_eq!(a + b, Fixed::new(dec!(12.5)));
        assert_eq!(a - b, Fixed::new(dec!(7.5)));
        assert_eq!(-b, Fixed::new(dec!(-2.5)));
        assert_eq!(a.checked_mul_down(b), Some(Fixed::from_int(25)));
        assert_eq!(vec![a, b].iter().sum::<Fixed>(), Fixed::new(dec!(12.5)));
        assert_eq!(b.ratio_of(a), Some(dec!(0.25)));
        assert_eq!(a.ratio_of(Fixed::ZERO), None);
    }

    #[test]
    fn deserialization_rounds_to_scale() {
        let parsed: Fixed = serde_json::from_str("\"0.0000000000000000015\"").unwrap();
        assert_eq!(parsed.to_raw(), 2);
        let json = serde_json::to_string(&Fixed::new(dec!(3.25))).unwrap();
        assert_eq!(serde_json::from_str::<Fixed>(&json).unwrap(), Fixed::new(dec!(3.25)));
    }
}
