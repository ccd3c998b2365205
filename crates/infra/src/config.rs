//! Runtime configuration for the returns service.
//!
//! | variable                  | default | meaning                                   |
//! |---------------------------|---------|-------------------------------------------|
//! | `RMA_EXPEDITED_EXCHANGES` | `false` | reimburse exchanges at authorization time |
//! | `RMA_DEFAULT_CURRENCY`    | `USD`   | currency when the order has none          |
//! | `RMA_NUMBER_MAX_ATTEMPTS` | `100`   | draws before number generation gives up   |

use serde::{Deserialize, Serialize};
use tracing::warn;

use rma_core::Currency;
use rma_returns::NumberGenerator;

pub const EXPEDITED_EXCHANGES_VAR: &str = "RMA_EXPEDITED_EXCHANGES";
pub const DEFAULT_CURRENCY_VAR: &str = "RMA_DEFAULT_CURRENCY";
pub const NUMBER_MAX_ATTEMPTS_VAR: &str = "RMA_NUMBER_MAX_ATTEMPTS";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReturnsConfig {
    pub expedited_exchanges: bool,
    pub default_currency: Currency,
    pub number_max_attempts: u32,
}

impl Default for ReturnsConfig {
    fn default() -> Self {
        Self {
            expedited_exchanges: false,
            default_currency: Currency::default(),
            number_max_attempts: NumberGenerator::DEFAULT_MAX_ATTEMPTS,
        }
    }
}

impl ReturnsConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup. Missing keys keep their defaults;
    /// unparsable values are logged and ignored.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(raw) = lookup(EXPEDITED_EXCHANGES_VAR) {
            match parse_flag(&raw) {
                Some(flag) => config.expedited_exchanges = flag,
                None => warn!(var = EXPEDITED_EXCHANGES_VAR, value = %raw, "ignoring invalid flag"),
            }
        }

        if let Some(raw) = lookup(DEFAULT_CURRENCY_VAR) {
            match Currency::new(raw.trim()) {
                Ok(currency) => config.default_currency = currency,
                Err(e) => warn!(var = DEFAULT_CURRENCY_VAR, value = %raw, error = %e, "ignoring invalid currency"),
            }
        }

        if let Some(raw) = lookup(NUMBER_MAX_ATTEMPTS_VAR) {
            match raw.trim().parse::<u32>() {
                Ok(attempts) if attempts > 0 => config.number_max_attempts = attempts,
                _ => warn!(var = NUMBER_MAX_ATTEMPTS_VAR, value = %raw, "ignoring invalid attempt budget"),
            }
        }

        config
    }

    pub fn number_generator(&self) -> NumberGenerator {
        NumberGenerator::new(self.number_max_attempts)
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
