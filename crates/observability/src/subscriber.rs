//! `tracing` subscriber construction.
//!
//! Filtering comes from `RUST_LOG` when set, otherwise from the given default
//! directive.

use tracing_subscriber::EnvFilter;

/// Directive used when `RUST_LOG` is unset or unparsable.
pub const DEFAULT_FILTER: &str = "info";

fn filter(default_directive: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive))
}

/// JSON lines with timestamps, no targets.
pub fn init(default_directive: &str) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter(default_directive))
        .json()
        .with_timer(tracing_subscriber::fmt::time::SystemTime)
        .with_target(false)
        .try_init();
}

pub fn init_for_tests() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter("debug"))
        .with_test_writer()
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeated_initialization_is_harmless() {
        init_for_tests();
        init_for_tests();
        init(DEFAULT_FILTER);
        tracing::info!(component = "observability", "subscriber installed");
    }
}
