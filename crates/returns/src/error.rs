//! Field-level validation errors and the returns error type.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use rma_core::DomainError;

/// Stable error codes recorded in [`ValidationErrors`].
pub mod codes {
    pub const MUST_BE_PRESENT: &str = "must_be_present";
    pub const ORDER_MISSING_SHIPPED_UNITS: &str = "order_missing_shipped_units";
    pub const ITEMS_ALREADY_AWAITING_EXCHANGE: &str = "items_already_awaiting_exchange";
    pub const AMOUNT_OVERFLOW: &str = "amount_overflow";
}

/// Field used for errors that don't belong to a single attribute.
pub const BASE: &str = "base";

/// A single validation failure attached to a field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    pub field: String,
    pub code: String,
}

impl FieldError {
    pub fn full_message(&self) -> String {
        format!("{} {}", self.field, self.code)
    }
}

/// Ordered collection of field errors.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ValidationErrors {
    entries: Vec<FieldError>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: impl Into<String>, code: impl Into<String>) {
        self.entries.push(FieldError {
            field: field.into(),
            code: code.into(),
        });
    }

    pub fn extend(&mut self, other: &ValidationErrors) {
        self.entries.extend(other.entries.iter().cloned());
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &FieldError> {
        self.entries.iter()
    }

    /// Codes recorded against `field`, in insertion order.
    pub fn on(&self, field: &str) -> Vec<&str> {
        self.entries
            .iter()
            .filter(|e| e.field == field)
            .map(|e| e.code.as_str())
            .collect()
    }

    pub fn contains(&self, field: &str, code: &str) -> bool {
        self.entries.iter().any(|e| e.field == field && e.code == code)
    }

    pub fn full_messages(&self) -> Vec<String> {
        self.entries.iter().map(FieldError::full_message).collect()
    }
}

impl core::fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.full_messages().join("; "))
    }
}

/// Result type used by the returns domain.
pub type ReturnsResult<T> = Result<T, ReturnsError>;

#[derive(Debug, Error)]
pub enum ReturnsError {
    /// The authorization failed validation; nothing was persisted.
    #[error("return authorization is invalid: {0}")]
    Validation(ValidationErrors),

    /// The expedited exchange reimbursement could not be saved. Aborts the
    /// save that triggered it.
    #[error("expedited exchange reimbursement could not be created: {0}")]
    ReimbursementCreationFailed(ValidationErrors),

    /// Every generated number collided with an existing one.
    #[error("no free return authorization number after {attempts} attempts")]
    NumberSpaceExhausted { attempts: u32 },

    /// The existence check against assigned numbers failed.
    #[error("return authorization number lookup failed: {0}")]
    NumberLookup(String),

    #[error(transparent)]
    Domain(#[from] DomainError),
}

impl ReturnsError {
    /// Field errors carried by this error, if any.
    pub fn validation_errors(&self) -> Option<&ValidationErrors> {
        match self {
            ReturnsError::Validation(errors) | ReturnsError::ReimbursementCreationFailed(errors) => {
                Some(errors)
            }
            _ => None,
        }
    }
}
