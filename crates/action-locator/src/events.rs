use std::time::Duration;

use tracing::debug;

pub fn emit_resolve(strategy: Option<&str>, matched: usize, returned: usize, duration: Duration) {
    debug!(
        target: "locator.events",
        strategy = strategy.unwrap_or("none"),
        matched,
        returned,
        elapsed_us = duration.as_micros() as u64,
        "locator.resolve.finished"
    );
}
