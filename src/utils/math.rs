//! Fixed-point arithmetic.
//!
//! All wrapper amounts and rates are unsigned 18-decimal fixed-point
//! numbers. Products and quotients are computed in a 256-bit intermediate
//! and rounded half-up, so `a * b` never overflows before the division.

use std::fmt;
use std::ops::{Add, Sub};
use std::str::FromStr;

use ethnum::U256;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{Error, Result};
use crate::utils::constants::{BPS_DIVISOR, DECIMALS};

// ═══════════════════════════════════════════════════════════════════════════════
// FIXED POINT TYPE
// ═══════════════════════════════════════════════════════════════════════════════

/// Fixed-point number with 18 decimal places precision
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct FixedPoint(u128);

impl FixedPoint {
    /// Scale factor: 10^18
    pub const SCALE: u128 = 1_000_000_000_000_000_000;

    /// Zero value
    pub const ZERO: Self = Self(0);

    /// One (1.0)
    pub const ONE: Self = Self(Self::SCALE);

    /// Largest representable value
    pub const MAX: Self = Self(u128::MAX);

    /// Create a new FixedPoint from raw value
    pub const fn from_raw(raw: u128) -> Self {
        Self(raw)
    }

    /// Create from an integer (scales up)
    pub fn from_integer(value: u64) -> Self {
        Self((value as u128) * Self::SCALE)
    }

    /// Create from basis points (100 bps = 1%)
    pub fn from_bps(bps: u64) -> Self {
        Self((bps as u128) * Self::SCALE / (BPS_DIVISOR as u128))
    }

    /// Get the raw underlying value
    pub fn raw(&self) -> u128 {
        self.0
    }

    /// Check if value is zero
    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Checked addition
    pub fn checked_add(self, other: Self) -> Option<Self> {
        self.0.checked_add(other.0).map(Self)
    }

    /// Checked subtraction
    pub fn checked_sub(self, other: Self) -> Option<Self> {
        self.0.checked_sub(other.0).map(Self)
    }

    /// Addition that fails with `ArithmeticOverflow`
    pub fn try_add(self, other: Self) -> Result<Self> {
        self.checked_add(other)
            .ok_or_else(|| Error::overflow(format!("{} + {}", self, other)))
    }

    /// Subtraction that fails with `ArithmeticOverflow` on underflow
    pub fn try_sub(self, other: Self) -> Result<Self> {
        self.checked_sub(other)
            .ok_or_else(|| Error::overflow(format!("{} - {}", self, other)))
    }

    /// Saturating subtraction (clamps at zero)
    pub fn saturating_sub(self, other: Self) -> Self {
        Self(self.0.saturating_sub(other.0))
    }

    /// Minimum of two values
    pub fn min(self, other: Self) -> Self {
        Self(self.0.min(other.0))
    }

    /// Maximum of two values
    pub fn max(self, other: Self) -> Self {
        Self(self.0.max(other.0))
    }

    /// `round(self * other / SCALE)`, half-up
    pub fn mul_round(self, other: Self) -> Result<Self> {
        mul_round(self, other)
    }

    /// `round(self * SCALE / other)`, half-up
    pub fn div_round(self, other: Self) -> Result<Self> {
        div_round(self, other)
    }
}

fn narrow(value: U256, operation: &str) -> Result<FixedPoint> {
    if value > U256::from(u128::MAX) {
        return Err(Error::overflow(operation));
    }
    Ok(FixedPoint(value.as_u128()))
}

/// Computes `round(a * b / SCALE)` with round-half-up
pub fn mul_round(a: FixedPoint, b: FixedPoint) -> Result<FixedPoint> {
    let scale = U256::from(FixedPoint::SCALE);
    // a, b < 2^128 so the product and the half-scale bias fit in 256 bits
    let product = U256::from(a.0) * U256::from(b.0);
    narrow((product + scale / 2) / scale, "mul_round")
}

/// Computes `round(a * SCALE / b)` with round-half-up
pub fn div_round(a: FixedPoint, b: FixedPoint) -> Result<FixedPoint> {
    if b.is_zero() {
        return Err(Error::overflow("div_round by zero"));
    }
    let numerator = U256::from(a.0) * U256::from(FixedPoint::SCALE);
    let divisor = U256::from(b.0);
    // floor((2n + d) / 2d) == floor(n/d + 1/2)
    let two = U256::new(2);
    narrow((numerator * two + divisor) / (divisor * two), "div_round")
}

// ═══════════════════════════════════════════════════════════════════════════════
// OPERATOR / TRAIT IMPLS
// ═══════════════════════════════════════════════════════════════════════════════

impl Add for FixedPoint {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0 + rhs.0)
    }
}

impl Sub for FixedPoint {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Self(self.0 - rhs.0)
    }
}

impl fmt::Display for FixedPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let whole = self.0 / Self::SCALE;
        let frac = self.0 % Self::SCALE;
        if frac == 0 {
            return write!(f, "{}", whole);
        }
        let digits = format!("{:018}", frac);
        write!(f, "{}.{}", whole, digits.trim_end_matches('0'))
    }
}

impl FromStr for FixedPoint {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = |reason: &str| Error::InvalidParameter {
            name: "amount".into(),
            reason: format!("{}: {:?}", reason, s),
        };

        let parsed = Decimal::from_str(s.trim()).map_err(|_| invalid("not a decimal number"))?;
        if parsed.is_sign_negative() && !parsed.is_zero() {
            return Err(invalid("negative amount"));
        }

        let rounded = if parsed.scale() > DECIMALS {
            parsed.round_dp_with_strategy(DECIMALS, RoundingStrategy::MidpointAwayFromZero)
        } else {
            parsed
        };

        let mantissa = rounded.mantissa().unsigned_abs();
        let factor = 10u128.pow(DECIMALS - rounded.scale());
        mantissa
            .checked_mul(factor)
            .map(Self)
            .ok_or_else(|| invalid("out of range"))
    }
}

impl From<u64> for FixedPoint {
    fn from(value: u64) -> Self {
        Self::from_integer(value)
    }
}

impl Serialize for FixedPoint {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for FixedPoint {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn fp(s: &str) -> FixedPoint {
        s.parse().unwrap()
    }

    #[test]
    fn test_fixed_point_basic() {
        let one = FixedPoint::ONE;
        let two = FixedPoint::from_integer(2);

        assert_eq!(one + one, two);
        assert_eq!(two - one, one);
        assert_eq!(one.mul_round(two).unwrap(), two);
        assert_eq!(two.div_round(one).unwrap(), two);
    }

    #[test]
    fn test_from_bps() {
        assert_eq!(FixedPoint::from_bps(100), fp("0.01"));
        assert_eq!(FixedPoint::from_bps(30), fp("0.003"));
    }

    #[test]
    fn test_parse_and_display() {
        assert_eq!(fp("100.3").raw(), 100_300_000_000_000_000_000);
        assert_eq!(fp("0.000000000000000001").raw(), 1);
        assert_eq!(fp("1000").to_string(), "1000");
        assert_eq!(fp("100.30").to_string(), "100.3");
        assert_eq!(fp("0.05").to_string(), "0.05");
        assert!("-1".parse::<FixedPoint>().is_err());
        assert!("abc".parse::<FixedPoint>().is_err());
    }

    #[test]
    fn test_parse_rounds_extra_precision() {
        assert_eq!(fp("0.0000000000000000015").raw(), 2);
        assert_eq!(fp("0.0000000000000000014").raw(), 1);
    }

    #[test]
    fn test_mul_round_half_up() {
        // 1.5e-18 rounds to 2e-18
        let a = FixedPoint::from_raw(3);
        let half = fp("0.5");
        assert_eq!(mul_round(a, half).unwrap().raw(), 2);

        // 1e-18 * 0.4 = 0.4e-18 rounds down
        let b = FixedPoint::from_raw(1);
        assert_eq!(mul_round(b, fp("0.4")).unwrap().raw(), 0);
    }

    #[test]
    fn test_mul_round_fee_example() {
        assert_eq!(mul_round(fp("200"), fp("0.01")).unwrap(), fp("2"));
    }

    #[test]
    fn test_div_round_burn_example() {
        let principal = div_round(fp("100.3"), fp("1.003")).unwrap();
        assert_eq!(principal, fp("100"));
    }

    #[test]
    fn test_div_round_half_up() {
        // 1e-18 / 2 = 0.5e-18 rounds up
        assert_eq!(div_round(FixedPoint::from_raw(1), fp("2")).unwrap().raw(), 1);
        // 1e-18 / 3 rounds down
        assert_eq!(div_round(FixedPoint::from_raw(1), fp("3")).unwrap().raw(), 0);
        // 2/3
        assert_eq!(
            div_round(fp("2"), fp("3")).unwrap().raw(),
            666_666_666_666_666_667
        );
    }

    #[test]
    fn test_wide_intermediate() {
        // a * b overflows u128 but the scaled result fits
        let big = FixedPoint::from_raw(u128::MAX / 2);
        assert_eq!(mul_round(big, FixedPoint::ONE).unwrap(), big);
        assert_eq!(div_round(big, FixedPoint::ONE).unwrap(), big);
    }

    #[test]
    fn test_overflow_detected() {
        let err = mul_round(FixedPoint::MAX, fp("2")).unwrap_err();
        assert!(matches!(err, Error::ArithmeticOverflow { .. }));

        let err = div_round(FixedPoint::MAX, fp("0.5")).unwrap_err();
        assert!(matches!(err, Error::ArithmeticOverflow { .. }));

        assert!(div_round(FixedPoint::ONE, FixedPoint::ZERO).is_err());
        assert!(FixedPoint::MAX.try_add(FixedPoint::ONE).is_err());
        assert!(FixedPoint::ZERO.try_sub(FixedPoint::ONE).is_err());
    }

    #[test]
    fn test_serde_as_decimal_string() {
        let json = serde_json::to_string(&fp("12.5")).unwrap();
        assert_eq!(json, "\"12.5\"");
        let back: FixedPoint = serde_json::from_str(&json).unwrap();
        assert_eq!(back, fp("12.5"));
    }

    proptest! {
        #[test]
        fn prop_mul_by_one_is_identity(raw in 0u128..=u128::MAX) {
            let x = FixedPoint::from_raw(raw);
            prop_assert_eq!(mul_round(x, FixedPoint::ONE).unwrap(), x);
        }

        #[test]
        fn prop_mul_round_within_half_unit(a in 0u128..1u128 << 100, b in 0u128..1u128 << 64) {
            let exact = U256::from(a) * U256::from(b);
            let got = mul_round(FixedPoint::from_raw(a), FixedPoint::from_raw(b)).unwrap();
            let scaled = U256::from(got.raw()) * U256::from(FixedPoint::SCALE);
            let diff = if scaled > exact { scaled - exact } else { exact - scaled };
            prop_assert!(diff * U256::new(2) <= U256::from(FixedPoint::SCALE));
        }

        #[test]
        fn prop_fee_never_exceeds_amount(amount in 0u128..1u128 << 100, bps in 0u64..=10_000) {
            let amount = FixedPoint::from_raw(amount);
            let fee = mul_round(amount, FixedPoint::from_bps(bps)).unwrap();
            prop_assert!(fee <= amount);
        }
    }
}
