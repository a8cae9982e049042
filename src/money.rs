//! Monetary values.
//!
//! Money is handled as [Decimal] in Rust and stored as integer cents in the
//! database, so sums and balance adjustments never go through binary floating
//! point. Values entering the system are rounded to cents using
//! midpoint-away-from-zero rounding.

use std::fmt::Display;

use rust_decimal::{Decimal, RoundingStrategy, prelude::ToPrimitive};
use serde::{Deserialize, Serialize};

use crate::Error;

/// The number of decimal places money is kept to.
const MONEY_SCALE: u32 = 2;

/// Round `value` to cents, with midpoints rounded away from zero.
pub fn round_money(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(MONEY_SCALE, RoundingStrategy::MidpointAwayFromZero)
}

/// Convert a value in cents, as stored in the database, to a decimal.
pub(crate) fn from_cents(cents: i64) -> Decimal {
    Decimal::new(cents, MONEY_SCALE)
}

/// Convert a decimal to cents, rounding to the nearest cent first.
///
/// # Errors
/// Returns [Error::InvalidAmount] if the value does not fit in 64-bit cents.
pub(crate) fn to_cents(value: Decimal) -> Result<i64, Error> {
    (round_money(value) * Decimal::ONE_HUNDRED)
        .to_i64()
        .ok_or(Error::InvalidAmount(value))
}

/// A strictly positive amount of money, rounded to cents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Amount(Decimal);

impl Amount {
    /// Create an amount from a decimal value, rounding to cents.
    ///
    /// # Errors
    /// Returns [Error::InvalidAmount] if the rounded value is not greater than
    /// zero or cannot be stored.
    pub fn new(value: Decimal) -> Result<Self, Error> {
        let rounded = round_money(value);

        if rounded <= Decimal::ZERO {
            return Err(Error::InvalidAmount(value));
        }

        to_cents(rounded)?;

        Ok(Self(rounded))
    }

    /// Create an amount from a value in cents read from the database.
    pub(crate) fn from_cents_unchecked(cents: i64) -> Self {
        Self(from_cents(cents))
    }

    /// The amount in cents.
    pub(crate) fn cents(&self) -> i64 {
        // Construction guarantees the value fits.
        to_cents(self.0).unwrap_or_default()
    }

    /// The amount as a decimal.
    pub fn value(&self) -> Decimal {
        self.0
    }
}

impl TryFrom<Decimal> for Amount {
    type Error = Error;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Amount> for Decimal {
    fn from(amount: Amount) -> Self {
        amount.0
    }
}

impl Display for Amount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    use crate::Error;

    use super::{Amount, from_cents, round_money, to_cents};

    #[test]
    fn rounds_midpoints_away_from_zero() {
        assert_eq!(round_money(dec!(0.125)), dec!(0.13));
        assert_eq!(round_money(dec!(-0.125)), dec!(-0.13));
        assert_eq!(round_money(dec!(2.344)), dec!(2.34));
    }

    #[test]
    fn cents_conversion_is_exact() {
        assert_eq!(to_cents(dec!(1234.56)), Ok(123456));
        assert_eq!(from_cents(123456), dec!(1234.56));
        assert_eq!(from_cents(-5), dec!(-0.05));
    }

    #[test]
    fn amount_rounds_to_cents() {
        let amount = Amount::new(dec!(10.005)).unwrap();

        assert_eq!(amount.value(), dec!(10.01));
        assert_eq!(amount.cents(), 1001);
    }

    #[test]
    fn amount_rejects_zero_and_negative_values() {
        assert_eq!(
            Amount::new(Decimal::ZERO),
            Err(Error::InvalidAmount(Decimal::ZERO))
        );
        assert_eq!(Amount::new(dec!(-1)), Err(Error::InvalidAmount(dec!(-1))));
        // Rounds to zero cents.
        assert_eq!(
            Amount::new(dec!(0.004)),
            Err(Error::InvalidAmount(dec!(0.004)))
        );
    }

    #[test]
    fn amount_serializes_as_number() {
        let amount = Amount::new(dec!(12.34)).unwrap();

        let json = serde_json::to_string(&amount).unwrap();

        assert_eq!(json, "12.34");
    }
}
