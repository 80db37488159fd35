//! Money Module
//!
//! Fixed-point monetary amounts. All balances, order costs and ledger
//! amounts go through [`Amount`]; there is no floating point anywhere in
//! the money path.
//!
//! ## Representation
//! - Backed by `rust_decimal::Decimal`, stored as `NUMERIC(20, 2)`
//! - Exactly [`MONEY_SCALE`] fractional digits (minor units)
//! - Never negative; arithmetic that would go below zero or above
//!   [`Amount::MAX`] returns `None`
//!
//! ## Usage
//! ```rust
//! use balance_service::money::Amount;
//! use rust_decimal::Decimal;
//!
//! let balance = Amount::new(Decimal::new(10050, 2)).unwrap(); // 100.50
//! let cost = Amount::positive(Decimal::from(40)).unwrap();
//! assert_eq!(balance.checked_sub(cost).unwrap().to_string(), "60.50");
//! assert!(cost.checked_sub(balance).is_none());
//! ```

use std::fmt;

use rust_decimal::prelude::*;
use serde::Serialize;
use thiserror::Error;

/// Number of fractional digits kept for every amount
pub const MONEY_SCALE: u32 = 2;

/// Money validation errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MoneyError {
    #[error("Precision overflow: provided {provided} decimals, max allowed {max}")]
    PrecisionOverflow { provided: u32, max: u32 },

    #[error("Amount must be positive")]
    NotPositive,

    #[error("Amount cannot be negative")]
    Negative,

    #[error("Amount too large")]
    Overflow,
}

/// Non-negative fixed-point monetary amount
///
/// Not `Deserialize`: untrusted input enters through
/// [`Amount::new`] / [`Amount::positive`] only.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, sqlx::Type,
)]
#[serde(transparent)]
#[sqlx(transparent)]
pub struct Amount(Decimal);

impl Amount {
    pub const ZERO: Amount = Amount(Decimal::ZERO);

    /// Largest amount representable by a `NUMERIC(20, 2)` column
    pub const MAX: Amount = Amount(Decimal::from_parts(
        0x630F_FFFF,
        0x6BC7_5E2D,
        0x0000_0005,
        false,
        MONEY_SCALE,
    ));

    /// Validate a non-negative decimal
    ///
    /// # Errors
    /// * `Negative` - value below zero
    /// * `PrecisionOverflow` - more than [`MONEY_SCALE`] significant fractional digits
    /// * `Overflow` - above [`Amount::MAX`]
    pub fn new(value: Decimal) -> Result<Self, MoneyError> {
        if value.is_sign_negative() && !value.is_zero() {
            return Err(MoneyError::Negative);
        }

        let normalized = value.normalize();
        if normalized.scale() > MONEY_SCALE {
            return Err(MoneyError::PrecisionOverflow {
                provided: normalized.scale(),
                max: MONEY_SCALE,
            });
        }

        let mut scaled = normalized;
        scaled.rescale(MONEY_SCALE);
        // -0 normalizes to 0 but keeps its sign bit
        scaled.set_sign_positive(true);

        if scaled > Self::MAX.0 {
            return Err(MoneyError::Overflow);
        }
        Ok(Self(scaled))
    }

    /// Validate an operation amount: like [`Amount::new`] but zero is rejected
    pub fn positive(value: Decimal) -> Result<Self, MoneyError> {
        let amount = Self::new(value)?;
        if amount.is_zero() {
            return Err(MoneyError::NotPositive);
        }
        Ok(amount)
    }

    /// Build from an integer count of minor units (cents)
    pub fn from_minor_units(units: u64) -> Result<Self, MoneyError> {
        Self::new(Decimal::from_i128_with_scale(units as i128, MONEY_SCALE))
    }

    /// Get the inner Decimal value
    pub fn as_decimal(&self) -> Decimal {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// `self + rhs`, `None` above [`Amount::MAX`]
    pub fn checked_add(self, rhs: Amount) -> Option<Amount> {
        let sum = self.0.checked_add(rhs.0)?;
        (sum <= Self::MAX.0).then_some(Amount(sum))
    }

    /// `self - rhs`, `None` if the result would be negative
    pub fn checked_sub(self, rhs: Amount) -> Option<Amount> {
        (self.0 >= rhs.0).then(|| Amount(self.0 - rhs.0))
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Amount> for Decimal {
    fn from(amount: Amount) -> Self {
        amount.0
    }
}

impl TryFrom<Decimal> for Amount {
    type Error = MoneyError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Amount::new(value)
    }
}
