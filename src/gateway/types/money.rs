//! Money input type for API boundary enforcement
//!
//! `StrictDecimal` accepts a JSON string or a JSON number. Strings are
//! format checked before parsing; business validation (positive, at most
//! two decimals) happens in [`StrictDecimal::to_amount`].

use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::de::{self, Deserializer, Visitor};
use serde::{Deserialize, Serialize};

use crate::money::{Amount, MoneyError};

/// Format-validated decimal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StrictDecimal(Decimal);

impl StrictDecimal {
    /// Convert into an operation amount (strictly positive, 2 decimals max)
    pub fn to_amount(self) -> Result<Amount, MoneyError> {
        Amount::positive(self.0)
    }

    #[cfg(test)]
    pub fn from_decimal(d: Decimal) -> Self {
        Self(d)
    }
}

impl std::ops::Deref for StrictDecimal {
    type Target = Decimal;
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

/// Validate the textual form of an amount
fn parse_strict(s: &str) -> Result<Decimal, String> {
    if s.is_empty() {
        return Err("Amount cannot be empty".to_string());
    }
    // Reject .5 format (must be 0.5)
    if s.starts_with('.') {
        return Err("Invalid format: use 0.5 not .5".to_string());
    }
    // Reject 5. format (must be 5.0 or 5)
    if s.ends_with('.') {
        return Err("Invalid format: use 5.0 not 5.".to_string());
    }
    if s.contains('e') || s.contains('E') {
        return Err("Invalid format: scientific notation not allowed".to_string());
    }
    if s.starts_with('+') {
        return Err("Invalid format: + prefix not allowed".to_string());
    }

    let d = Decimal::from_str(s).map_err(|e| format!("Invalid decimal: {}", e))?;
    if d.is_sign_negative() && !d.is_zero() {
        return Err("Amount cannot be negative".to_string());
    }
    Ok(d)
}

struct StrictDecimalVisitor;

impl<'de> Visitor<'de> for StrictDecimalVisitor {
    type Value = StrictDecimal;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a non-negative decimal number or decimal string")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
        parse_strict(v).map(StrictDecimal).map_err(E::custom)
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
        Ok(StrictDecimal(Decimal::from(v)))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
        if v < 0 {
            return Err(E::custom("Amount cannot be negative"));
        }
        Ok(StrictDecimal(Decimal::from(v)))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Self::Value, E> {
        if !v.is_finite() {
            return Err(E::custom("Invalid decimal"));
        }
        if v < 0.0 {
            return Err(E::custom("Amount cannot be negative"));
        }
        // Shortest round-trip text of the float, e.g. 0.1 -> "0.1"
        Decimal::from_str(&v.to_string())
            .map(StrictDecimal)
            .map_err(|e| E::custom(format!("Invalid decimal: {}", e)))
    }
}

impl<'de> Deserialize<'de> for StrictDecimal {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(StrictDecimalVisitor)
    }
}

impl Serialize for StrictDecimal {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        // Serialize as string to preserve precision
        serializer.serialize_str(&self.0.to_string())
    }
}
