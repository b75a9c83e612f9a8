use std::time::Duration;

use tracing::debug;

pub fn emit_snapshot(url: &str, node_count: usize, source: &str, duration: Duration) {
    debug!(
        target: "perceiver.events",
        url,
        node_count,
        source,
        elapsed_us = duration.as_micros() as u64,
        "structural.snapshot.recorded"
    );
}

pub fn emit_diff(change_count: usize, unchanged: bool, duration: Duration) {
    debug!(
        target: "perceiver.events",
        change_count,
        unchanged,
        elapsed_us = duration.as_micros() as u64,
        "structural.diff.generated"
    );
}
