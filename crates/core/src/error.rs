//! Errors raised by return authorization domain rules.

use thiserror::Error;

pub type DomainResult<T> = Result<T, DomainError>;

/// Deterministic rule failures. Storage and transport problems are reported
/// by the infra layer's own error types.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Malformed input, e.g. a currency code that isn't three letters.
    #[error("validation failed: {0}")]
    Validation(String),

    /// A rule the aggregate must always satisfy would be broken, e.g. a money
    /// sum that no longer fits in minor units.
    #[error("invariant violated: {0}")]
    InvariantViolation(String),

    /// An id or RA number that doesn't parse.
    #[error("invalid identifier: {0}")]
    InvalidId(String),

    /// Version mismatch on save.
    #[error("conflict: {0}")]
    Conflict(String),
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn invariant(msg: impl Into<String>) -> Self {
        Self::InvariantViolation(msg.into())
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }
}
