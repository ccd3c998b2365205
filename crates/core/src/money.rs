//! Monetary amounts and currency codes.
//!
//! Amounts are integers in the currency's smallest unit (e.g. cents).
//! Formatting for display belongs to the presentation layer.

use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};
use crate::value_object::ValueObject;

/// ISO 4217 style three-letter currency code, always uppercase.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Currency(String);

impl Currency {
    /// Currency used when nothing more specific is known.
    pub const DEFAULT_CODE: &'static str = "USD";

    pub fn new(code: impl AsRef<str>) -> DomainResult<Self> {
        let code = code.as_ref().trim();
        if code.len() != 3 || !code.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(DomainError::validation(format!(
                "currency code must be three letters, got '{code}'"
            )));
        }
        Ok(Self(code.to_ascii_uppercase()))
    }

    pub fn code(&self) -> &str {
        &self.0
    }
}

impl Default for Currency {
    fn default() -> Self {
        Self(Self::DEFAULT_CODE.to_string())
    }
}

impl core::fmt::Display for Currency {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

impl core::str::FromStr for Currency {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for Currency {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Currency> for String {
    fn from(value: Currency) -> Self {
        value.0
    }
}

impl ValueObject for Currency {}

/// An amount of money in minor units.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Money {
    amount: i64,
    currency: Currency,
}

impl Money {
    pub fn new(amount: i64, currency: Currency) -> Self {
        Self { amount, currency }
    }

    pub fn zero(currency: Currency) -> Self {
        Self::new(0, currency)
    }

    /// Amount in the currency's smallest unit.
    pub fn amount(&self) -> i64 {
        self.amount
    }

    pub fn currency(&self) -> &Currency {
        &self.currency
    }

    pub fn is_zero(&self) -> bool {
        self.amount == 0
    }

    /// Adds two amounts of the same currency.
    pub fn checked_add(&self, other: &Money) -> DomainResult<Money> {
        if self.currency != other.currency {
            return Err(DomainError::invariant(format!(
                "cannot add {} to {}",
                other.currency, self.currency
            )));
        }
        let amount = self
            .amount
            .checked_add(other.amount)
            .ok_or_else(|| DomainError::invariant("money amount overflow"))?;
        Ok(Money::new(amount, self.currency.clone()))
    }
}

impl ValueObject for Money {}
