//! Human-readable return authorization numbers.
//!
//! A number is `RA` followed by nine random decimal digits. Uniqueness is
//! checked against the numbers already handed out and retried on collision; the
//! store's unique constraint stays the authoritative backstop, since two
//! concurrent creations can still race between the check and the insert.

use core::str::FromStr;

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use rma_core::DomainError;

use crate::authorization::ReturnAuthorization;
use crate::collaborators::ReturnItem;
use crate::error::{ReturnsError, ReturnsResult};

pub const NUMBER_PREFIX: &str = "RA";
pub const NUMBER_DIGITS: usize = 9;

/// `RA` + 9 digits, e.g. `RA048213775`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AuthorizationNumber(String);

impl AuthorizationNumber {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for AuthorizationNumber {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s.strip_prefix(NUMBER_PREFIX).ok_or_else(|| {
            DomainError::invalid_id(format!("AuthorizationNumber: missing '{NUMBER_PREFIX}' prefix in '{s}'"))
        })?;

        if digits.len() != NUMBER_DIGITS || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(DomainError::invalid_id(format!(
                "AuthorizationNumber: expected {NUMBER_DIGITS} digits after prefix in '{s}'"
            )));
        }

        Ok(Self(s.to_string()))
    }
}

impl TryFrom<String> for AuthorizationNumber {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<AuthorizationNumber> for String {
    fn from(value: AuthorizationNumber) -> Self {
        value.0
    }
}

impl core::fmt::Display for AuthorizationNumber {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Read access to the set of numbers already assigned.
pub trait NumberIndex {
    type Error: core::fmt::Debug;

    fn contains(&self, number: &AuthorizationNumber) -> Result<bool, Self::Error>;
}

impl<N> NumberIndex for &N
where
    N: NumberIndex + ?Sized,
{
    type Error = N::Error;

    fn contains(&self, number: &AuthorizationNumber) -> Result<bool, Self::Error> {
        (**self).contains(number)
    }
}

/// Generates unique numbers with a bounded number of attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NumberGenerator {
    max_attempts: u32,
}

impl Default for NumberGenerator {
    fn default() -> Self {
        Self::new(Self::DEFAULT_MAX_ATTEMPTS)
    }
}

impl NumberGenerator {
    pub const DEFAULT_MAX_ATTEMPTS: u32 = 100;

    /// A budget of zero is treated as one attempt.
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Draw a random candidate without checking uniqueness.
    pub fn candidate<R: Rng + ?Sized>(rng: &mut R) -> AuthorizationNumber {
        let mut number = String::with_capacity(NUMBER_PREFIX.len() + NUMBER_DIGITS);
        number.push_str(NUMBER_PREFIX);
        for _ in 0..NUMBER_DIGITS {
            let digit: u8 = rng.gen_range(0..10);
            number.push(char::from(b'0' + digit));
        }
        AuthorizationNumber(number)
    }

    pub fn generate<N: NumberIndex>(&self, index: &N) -> ReturnsResult<AuthorizationNumber> {
        self.generate_with(&mut rand::thread_rng(), index)
    }

    pub fn generate_with<R, N>(&self, rng: &mut R, index: &N) -> ReturnsResult<AuthorizationNumber>
    where
        R: Rng + ?Sized,
        N: NumberIndex,
    {
        for attempt in 1..=self.max_attempts {
            let candidate = Self::candidate(rng);
            let taken = index
                .contains(&candidate)
                .map_err(|e| ReturnsError::NumberLookup(format!("{e:?}")))?;
            if !taken {
                return Ok(candidate);
            }
            debug!(number = %candidate, attempt, "return authorization number collision");
        }

        warn!(attempts = self.max_attempts, "return authorization number space exhausted");
        Err(ReturnsError::NumberSpaceExhausted {
            attempts: self.max_attempts,
        })
    }

    /// Give `authorization` a number unless it already has one.
    pub fn assign<I, N>(
        &self,
        authorization: &mut ReturnAuthorization<I>,
        index: &N,
    ) -> ReturnsResult<AuthorizationNumber>
    where
        I: ReturnItem,
        N: NumberIndex,
    {
        self.assign_with(&mut rand::thread_rng(), authorization, index)
    }

    pub fn assign_with<R, I, N>(
        &self,
        rng: &mut R,
        authorization: &mut ReturnAuthorization<I>,
        index: &N,
    ) -> ReturnsResult<AuthorizationNumber>
    where
        R: Rng + ?Sized,
        I: ReturnItem,
        N: NumberIndex,
    {
        if let Some(existing) = authorization.number() {
            return Ok(existing.clone());
        }
        let number = self.generate_with(rng, index)?;
        authorization.set_number(number.clone());
        Ok(number)
    }
}
