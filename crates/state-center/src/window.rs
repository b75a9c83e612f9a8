//! Current/previous snapshot pair and per-intent retry counters

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Holds at most two captures: the newest and the one before it.
#[derive(Clone, Debug)]
pub struct SnapshotWindow<S> {
    current: Option<S>,
    previous: Option<S>,
}

impl<S> Default for SnapshotWindow<S> {
    fn default() -> Self {
        Self {
            current: None,
            previous: None,
        }
    }
}

impl<S> SnapshotWindow<S> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes `snapshot` current; the old current becomes previous and the old previous is dropped.
    pub fn push(&mut self, snapshot: S) {
        self.previous = self.current.replace(snapshot);
    }

    pub fn current(&self) -> Option<&S> {
        self.current.as_ref()
    }

    pub fn previous(&self) -> Option<&S> {
        self.previous.as_ref()
    }

    pub fn clear(&mut self) {
        self.current = None;
        self.previous = None;
    }
}

/// Retries spent per intent kind over the session's life.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryCounters {
    counts: HashMap<String, u32>,
}

impl RetryCounters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, intent: &str, retries: u32) {
        if retries == 0 {
            return;
        }
        let count = self.counts.entry(intent.to_string()).or_default();
        *count = count.saturating_add(retries);
    }

    pub fn get(&self, intent: &str) -> u32 {
        self.counts.get(intent).copied().unwrap_or(0)
    }

    pub fn total(&self) -> u32 {
        self.counts.values().fold(0u32, |acc, n| acc.saturating_add(*n))
    }

    pub fn reset(&mut self) {
        self.counts.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_keeps_two() {
        let mut window = SnapshotWindow::new();
        assert!(window.current().is_none());
        window.push(1);
        window.push(2);
        window.push(3);
        assert_eq!(window.current(), Some(&3));
        assert_eq!(window.previous(), Some(&2));
        window.clear();
        assert!(window.previous().is_none());
    }

    #[test]
    fn retry_counters_accumulate_per_intent() {
        let mut counters = RetryCounters::new();
        counters.add("click", 2);
        counters.add("click", 1);
        counters.add("navigate", 0);
        assert_eq!(counters.get("click"), 3);
        assert_eq!(counters.get("navigate"), 0);
        assert_eq!(counters.total(), 3);
    }
}
