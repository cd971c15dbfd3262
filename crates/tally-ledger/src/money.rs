//! Fixed-point money type.
//!
//! # Motivation
//!
//! Every currency amount in the ledger is an `i64` count of minor units
//! (centavos, cents). Raw `i64` is error-prone: it mixes freely with ids,
//! counts and other integers. `Cents` wraps the raw value so the type system
//! keeps money arithmetic closed over money.
//!
//! # Scale
//!
//! 1 peso = `Cents::new(100)`. The scale is fixed at two fractional digits,
//! which is what the office bills in.
//!
//! # Boundary conversion
//!
//! Amounts enter and leave the engine as decimal text (`"1234.56"`).
//! [`Cents::parse_decimal`] converts digit by digit with no floating point and
//! refuses anything it cannot represent exactly (a third fractional digit is
//! an error, never a rounding). `Display` is the exact inverse.

use std::ops::{Add, AddAssign, Neg, Sub, SubAssign};

use serde::{Deserialize, Serialize};

/// Minor units per major unit.
pub const CENTS_SCALE: i64 = 100;

/// Number of fractional digits accepted at the decimal boundary.
pub const FRACTION_DIGITS: usize = 2;

// ---------------------------------------------------------------------------
// Cents newtype
// ---------------------------------------------------------------------------

/// A signed monetary amount in minor units.
///
/// There is intentionally no `From<i64>`: callers construct with
/// [`Cents::new`] (raw minor units), [`Cents::from_major`] or
/// [`Cents::parse_decimal`].
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cents(i64);

impl Cents {
    /// Zero monetary amount.
    pub const ZERO: Cents = Cents(0);

    /// Maximum representable value.
    pub const MAX: Cents = Cents(i64::MAX);

    /// Minimum representable value.
    pub const MIN: Cents = Cents(i64::MIN);

    /// Construct from a raw count of minor units.
    #[inline]
    pub const fn new(raw: i64) -> Self {
        Cents(raw)
    }

    /// Construct from whole major units (`from_major(5)` == `5.00`).
    #[inline]
    pub const fn from_major(major: i64) -> Self {
        Cents(major * CENTS_SCALE)
    }

    /// Extract the raw minor-unit count (for storage binds).
    #[inline]
    pub const fn raw(self) -> i64 {
        self.0
    }

    #[inline]
    pub fn checked_add(self, rhs: Cents) -> Option<Cents> {
        self.0.checked_add(rhs.0).map(Cents)
    }

    #[inline]
    pub fn checked_sub(self, rhs: Cents) -> Option<Cents> {
        self.0.checked_sub(rhs.0).map(Cents)
    }

    /// Absolute value. `Cents::MIN.abs()` saturates to `Cents::MAX`.
    #[inline]
    pub fn abs(self) -> Cents {
        Cents(self.0.saturating_abs())
    }

    #[inline]
    pub fn is_zero(self) -> bool {
        self.0 == 0
    }

    /// `true` if strictly greater than zero.
    #[inline]
    pub fn is_positive(self) -> bool {
        self.0 > 0
    }

    #[inline]
    pub fn is_negative(self) -> bool {
        self.0 < 0
    }

    /// Parse a user-facing decimal string into exact minor units.
    ///
    /// Accepted: optional sign, digits, optional `.` or `,` followed by one or
    /// two digits. Surrounding whitespace is ignored.
    pub fn parse_decimal(input: &str) -> Result<Cents, MoneyParseError> {
        let s = input.trim();
        if s.is_empty() {
            return Err(MoneyParseError::Empty);
        }

        let (negative, body) = match s.as_bytes()[0] {
            b'-' => (true, &s[1..]),
            b'+' => (false, &s[1..]),
            _ => (false, s),
        };

        let (int_part, frac_part) = match body.find(['.', ',']) {
            Some(idx) => (&body[..idx], Some(&body[idx + 1..])),
            None => (body, None),
        };

        if int_part.is_empty() && frac_part.map_or(true, str::is_empty) {
            return Err(MoneyParseError::Malformed(input.to_string()));
        }
        if !int_part.bytes().all(|b| b.is_ascii_digit()) {
            return Err(MoneyParseError::Malformed(input.to_string()));
        }

        let mut major: i64 = 0;
        for b in int_part.bytes() {
            major = major
                .checked_mul(10)
                .and_then(|m| m.checked_add(i64::from(b - b'0')))
                .ok_or_else(|| MoneyParseError::Overflow(input.to_string()))?;
        }

        let mut minor: i64 = 0;
        if let Some(frac) = frac_part {
            if frac.is_empty() || !frac.bytes().all(|b| b.is_ascii_digit()) {
                return Err(MoneyParseError::Malformed(input.to_string()));
            }
            if frac.len() > FRACTION_DIGITS {
                return Err(MoneyParseError::TooManyFractionDigits(input.to_string()));
            }
            for b in frac.bytes() {
                minor = minor * 10 + i64::from(b - b'0');
            }
            // "1.5" means 1.50
            for _ in frac.len()..FRACTION_DIGITS {
                minor *= 10;
            }
        }

        let raw = major
            .checked_mul(CENTS_SCALE)
            .and_then(|m| m.checked_add(minor))
            .ok_or_else(|| MoneyParseError::Overflow(input.to_string()))?;

        Ok(Cents(if negative { -raw } else { raw }))
    }
}

// ---------------------------------------------------------------------------
// Parse errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MoneyParseError {
    Empty,
    Malformed(String),
    TooManyFractionDigits(String),
    Overflow(String),
}

impl std::fmt::Display for MoneyParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Empty => write!(f, "amount is empty"),
            Self::Malformed(s) => write!(f, "amount is not a decimal number: {s:?}"),
            Self::TooManyFractionDigits(s) => write!(
                f,
                "amount has more than {FRACTION_DIGITS} fractional digits: {s:?}"
            ),
            Self::Overflow(s) => write!(f, "amount out of range: {s:?}"),
        }
    }
}

impl std::error::Error for MoneyParseError {}

// ---------------------------------------------------------------------------
// Arithmetic operators (closed over Cents)
// ---------------------------------------------------------------------------

impl Add for Cents {
    type Output = Cents;
    #[inline]
    fn add(self, rhs: Cents) -> Cents {
        Cents(self.0 + rhs.0)
    }
}

impl Sub for Cents {
    type Output = Cents;
    #[inline]
    fn sub(self, rhs: Cents) -> Cents {
        Cents(self.0 - rhs.0)
    }
}

impl Neg for Cents {
    type Output = Cents;
    #[inline]
    fn neg(self) -> Cents {
        Cents(-self.0)
    }
}

impl AddAssign for Cents {
    #[inline]
    fn add_assign(&mut self, rhs: Cents) {
        self.0 += rhs.0;
    }
}

impl SubAssign for Cents {
    #[inline]
    fn sub_assign(&mut self, rhs: Cents) {
        self.0 -= rhs.0;
    }
}

impl std::iter::Sum for Cents {
    fn sum<I: Iterator<Item = Cents>>(iter: I) -> Cents {
        iter.fold(Cents::ZERO, |acc, c| acc + c)
    }
}

// ---------------------------------------------------------------------------
// Display
// ---------------------------------------------------------------------------

impl std::fmt::Display for Cents {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // unsigned_abs keeps i64::MIN printable
        let mag = self.0.unsigned_abs();
        let major = mag / CENTS_SCALE as u64;
        let minor = mag % CENTS_SCALE as u64;
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(f, "{sign}{major}.{minor:02}")
    }
}

impl std::str::FromStr for Cents {
    type Err = MoneyParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Cents::parse_decimal(s)
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_whole_and_fractional_amounts() {
        assert_eq!(Cents::parse_decimal("1234.56").unwrap(), Cents::new(123_456));
        assert_eq!(Cents::parse_decimal("5000").unwrap(), Cents::new(500_000));
        assert_eq!(Cents::parse_decimal("0.5").unwrap(), Cents::new(50));
        assert_eq!(Cents::parse_decimal(".05").unwrap(), Cents::new(5));
        assert_eq!(Cents::parse_decimal("12,30").unwrap(), Cents::new(1_230));
        assert_eq!(Cents::parse_decimal("  7.00 ").unwrap(), Cents::new(700));
    }

    #[test]
    fn parses_signed_amounts() {
        assert_eq!(Cents::parse_decimal("-2.75").unwrap(), Cents::new(-275));
        assert_eq!(Cents::parse_decimal("+2.75").unwrap(), Cents::new(275));
    }

    #[test]
    fn rejects_third_fraction_digit_instead_of_rounding() {
        assert_eq!(
            Cents::parse_decimal("0.105"),
            Err(MoneyParseError::TooManyFractionDigits("0.105".to_string()))
        );
    }

    #[test]
    fn rejects_malformed_input() {
        assert_eq!(Cents::parse_decimal(""), Err(MoneyParseError::Empty));
        assert!(matches!(Cents::parse_decimal("abc"), Err(MoneyParseError::Malformed(_))));
        assert!(matches!(Cents::parse_decimal("1.2.3"), Err(MoneyParseError::Malformed(_))));
        assert!(matches!(Cents::parse_decimal("1."), Err(MoneyParseError::Malformed(_))));
        assert!(matches!(Cents::parse_decimal("-"), Err(MoneyParseError::Malformed(_))));
        assert!(matches!(Cents::parse_decimal("1e3"), Err(MoneyParseError::Malformed(_))));
    }

    #[test]
    fn rejects_overflow() {
        assert!(matches!(
            Cents::parse_decimal("99999999999999999999"),
            Err(MoneyParseError::Overflow(_))
        ));
    }

    #[test]
    fn display_is_inverse_of_parse() {
        for s in ["0.00", "1.50", "-2.75", "123456.78", "-0.05"] {
            assert_eq!(Cents::parse_decimal(s).unwrap().to_string(), s);
        }
    }

    #[test]
    fn display_keeps_sign_below_one_unit() {
        assert_eq!(Cents::new(-5).to_string(), "-0.05");
    }

    #[test]
    fn display_min_does_not_panic() {
        assert!(Cents::MIN.to_string().starts_with('-'));
    }

    #[test]
    fn from_major_scales() {
        assert_eq!(Cents::from_major(5_000), Cents::new(500_000));
    }

    #[test]
    fn sum_over_iterator() {
        let total: Cents = [Cents::new(100), Cents::new(-30), Cents::new(5)]
            .into_iter()
            .sum();
        assert_eq!(total, Cents::new(75));
    }

    #[test]
    fn checked_add_detects_overflow() {
        assert_eq!(Cents::MAX.checked_add(Cents::new(1)), None);
        assert_eq!(Cents::new(1).checked_add(Cents::new(2)), Some(Cents::new(3)));
    }

    #[test]
    fn abs_of_min_saturates_to_max() {
        assert_eq!(Cents::MIN.abs(), Cents::MAX);
    }
}
