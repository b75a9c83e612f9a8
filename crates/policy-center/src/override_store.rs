use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use serde_json::Value;

/// Runtime overrides keyed by policy path, applied in path order.
#[derive(Clone, Debug, Default)]
pub struct RuntimeOverrideStore {
    entries: BTreeMap<String, RuntimeOverrideEntry>,
}

#[derive(Clone, Debug)]
pub struct RuntimeOverrideEntry {
    pub value: Value,
    pub expires_at: Option<Instant>,
}

impl RuntimeOverrideStore {
    pub fn insert(&mut self, key: String, value: Value, ttl: Option<Duration>) {
        let expires_at = ttl.map(|dur| Instant::now() + dur);
        self.entries
            .insert(key, RuntimeOverrideEntry { value, expires_at });
    }

    pub fn remove(&mut self, key: &str) -> bool {
        self.entries.remove(key).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drops expired entries and returns the rest.
    pub fn active_entries(&mut self) -> Vec<(String, Value)> {
        let now = Instant::now();
        self.entries.retain(|_, entry| {
            entry
                .expires_at
                .map(|expires| expires > now)
                .unwrap_or(true)
        });
        self.entries
            .iter()
            .map(|(key, entry)| (key.clone(), entry.value.clone()))
            .collect()
    }
}
