//! Per-session state for the command loop.
//!
//! - Bounded action history with redacted targets and JSON export
//! - Current/previous snapshot window
//! - Per-intent retry counters and session statistics

pub mod errors;
pub mod history;
pub mod redact;
pub mod window;

pub use errors::StateError;
pub use history::{
    ActionHistory, AttemptOutcome, HistoryEntry, HistorySink, InMemoryHistory, NoopHistory,
    SessionStats,
};
pub use redact::{redact_text, redact_url};
pub use window::{RetryCounters, SnapshotWindow};
