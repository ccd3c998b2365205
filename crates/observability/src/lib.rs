//! Process-wide logging setup for the returns services.

/// Install the JSON subscriber. Later calls are no-ops.
pub fn init() {
    subscriber::init(subscriber::DEFAULT_FILTER);
}

/// Install a human-readable subscriber that writes through the test harness
/// so output is captured per test. Later calls are no-ops.
pub fn init_for_tests() {
    subscriber::init_for_tests();
}

pub mod subscriber;
