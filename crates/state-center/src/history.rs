//! Bounded, redacted action history

use std::collections::VecDeque;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use lighthouse_core_types::ActionId;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::to_writer_pretty;

use crate::errors::StateError;

/// Result of one dispatch attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptOutcome {
    Success,
    TransientFailure,
    FatalFailure,
    Aborted,
}

impl AttemptOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            AttemptOutcome::Success => "success",
            AttemptOutcome::TransientFailure => "transient_failure",
            AttemptOutcome::FatalFailure => "fatal_failure",
            AttemptOutcome::Aborted => "aborted",
        }
    }
}

/// One attempt, already redacted. Safe to log and export.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub recorded_at: DateTime<Utc>,
    pub action_id: ActionId,
    /// 1-based.
    pub attempt: u32,
    pub kind: String,
    pub outcome: AttemptOutcome,
    pub target: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl HistoryEntry {
    pub fn new(
        action_id: ActionId,
        attempt: u32,
        kind: impl Into<String>,
        outcome: AttemptOutcome,
        target: impl Into<String>,
    ) -> Self {
        Self {
            recorded_at: Utc::now(),
            action_id,
            attempt,
            kind: kind.into(),
            outcome,
            target: target.into(),
            detail: None,
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

/// Attempt counters for spoken "how am I doing" answers and audits.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionStats {
    pub total_attempts: u64,
    pub successful: u64,
    pub failed: u64,
    pub aborted: u64,
    pub pages_visited: u64,
}

impl SessionStats {
    /// Share of attempts that succeeded; zero before the first attempt.
    pub fn success_rate(&self) -> f64 {
        if self.total_attempts == 0 {
            return 0.0;
        }
        self.successful as f64 / self.total_attempts as f64
    }
}

#[derive(Debug)]
struct BoundedRing<T> {
    capacity: usize,
    data: VecDeque<T>,
}

impl<T> BoundedRing<T> {
    fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            data: VecDeque::new(),
        }
    }

    fn len(&self) -> usize {
        self.data.len()
    }
}

impl<T: Clone> BoundedRing<T> {
    fn push(&mut self, item: T) {
        if self.data.len() == self.capacity {
            self.data.pop_front();
        }
        self.data.push_back(item);
    }

    fn snapshot(&self) -> Vec<T> {
        self.data.iter().cloned().collect()
    }
}

/// Oldest entries fall off once `capacity` is reached; stats keep counting.
#[derive(Debug)]
pub struct ActionHistory {
    ring: BoundedRing<HistoryEntry>,
    stats: SessionStats,
    last_page: Option<String>,
}

#[derive(Serialize)]
struct HistoryExport<'a> {
    #[serde(with = "chrono::serde::ts_milliseconds")]
    exported_at: DateTime<Utc>,
    capacity: usize,
    stats: &'a SessionStats,
    entries: Vec<HistoryEntry>,
}

impl ActionHistory {
    pub fn new(capacity: usize) -> Self {
        Self {
            ring: BoundedRing::new(capacity),
            stats: SessionStats::default(),
            last_page: None,
        }
    }

    pub fn record(&mut self, entry: HistoryEntry) {
        self.stats.total_attempts = self.stats.total_attempts.saturating_add(1);
        match entry.outcome {
            AttemptOutcome::Success => self.stats.successful = self.stats.successful.saturating_add(1),
            AttemptOutcome::TransientFailure | AttemptOutcome::FatalFailure => {
                self.stats.failed = self.stats.failed.saturating_add(1)
            }
            AttemptOutcome::Aborted => self.stats.aborted = self.stats.aborted.saturating_add(1),
        }
        self.ring.push(entry);
    }

    /// Counts a page visit when `url` differs from the last one seen.
    pub fn note_page(&mut self, url: &str) {
        if self.last_page.as_deref() == Some(url) {
            return;
        }
        self.last_page = Some(url.to_string());
        self.stats.pages_visited = self.stats.pages_visited.saturating_add(1);
    }

    pub fn entries(&self) -> Vec<HistoryEntry> {
        self.ring.snapshot()
    }

    /// Most recent `count` entries, oldest first.
    pub fn recent(&self, count: usize) -> Vec<HistoryEntry> {
        let skip = self.ring.len().saturating_sub(count);
        self.ring.data.iter().skip(skip).cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.ring.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ring.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.ring.capacity
    }

    pub fn stats(&self) -> SessionStats {
        self.stats.clone()
    }

    pub fn export_json(&self) -> Result<String, StateError> {
        let export = self.export();
        serde_json::to_string_pretty(&export).map_err(StateError::from)
    }

    pub fn write_json<P: AsRef<Path>>(&self, path: P) -> Result<(), StateError> {
        let export = self.export();
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        to_writer_pretty(&mut writer, &export)?;
        writer.flush()?;
        Ok(())
    }

    fn export(&self) -> HistoryExport<'_> {
        HistoryExport {
            exported_at: Utc::now(),
            capacity: self.ring.capacity,
            stats: &self.stats,
            entries: self.entries(),
        }
    }
}

/// Where the executor reports attempts.
#[async_trait]
pub trait HistorySink: Send + Sync {
    async fn append(&self, entry: HistoryEntry) -> Result<(), StateError>;
}

/// Shared history; the session and exporters read it while the executor appends.
#[derive(Debug)]
pub struct InMemoryHistory {
    inner: Mutex<ActionHistory>,
}

impl InMemoryHistory {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(ActionHistory::new(capacity)),
        }
    }

    pub fn entries(&self) -> Vec<HistoryEntry> {
        self.inner.lock().entries()
    }

    pub fn recent(&self, count: usize) -> Vec<HistoryEntry> {
        self.inner.lock().recent(count)
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }

    pub fn stats(&self) -> SessionStats {
        self.inner.lock().stats()
    }

    pub fn note_page(&self, url: &str) {
        self.inner.lock().note_page(url);
    }

    pub fn export_json(&self) -> Result<String, StateError> {
        self.inner.lock().export_json()
    }

    pub fn write_json<P: AsRef<Path>>(&self, path: P) -> Result<(), StateError> {
        self.inner.lock().write_json(path)
    }
}

#[async_trait]
impl HistorySink for InMemoryHistory {
    async fn append(&self, entry: HistoryEntry) -> Result<(), StateError> {
        self.inner.lock().record(entry);
        Ok(())
    }
}

/// Discards everything; for tests and one-off executions.
pub struct NoopHistory;

#[async_trait]
impl HistorySink for NoopHistory {
    async fn append(&self, _entry: HistoryEntry) -> Result<(), StateError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    fn entry(attempt: u32, outcome: AttemptOutcome) -> HistoryEntry {
        HistoryEntry::new(ActionId::new(), attempt, "click", outcome, "button Save")
    }

    #[test]
    fn ring_drops_oldest_but_stats_keep_counting() {
        let mut history = ActionHistory::new(2);
        history.record(entry(1, AttemptOutcome::TransientFailure));
        history.record(entry(2, AttemptOutcome::TransientFailure));
        history.record(entry(3, AttemptOutcome::Success));

        assert_eq!(history.len(), 2);
        let attempts: Vec<u32> = history.entries().iter().map(|e| e.attempt).collect();
        assert_eq!(attempts, vec![2, 3]);
        let stats = history.stats();
        assert_eq!(stats.total_attempts, 3);
        assert_eq!(stats.successful, 1);
        assert_eq!(stats.failed, 2);
        assert!((stats.success_rate() - 1.0 / 3.0).abs() < f64::EPSILON);
        assert_eq!(history.recent(1)[0].attempt, 3);
    }

    #[test]
    fn zero_capacity_still_keeps_one() {
        let mut history = ActionHistory::new(0);
        history.record(entry(1, AttemptOutcome::Success));
        history.record(entry(2, AttemptOutcome::Success));
        assert_eq!(history.capacity(), 1);
        assert_eq!(history.len(), 1);
    }

    #[test]
    fn page_visits_count_changes_only() {
        let mut history = ActionHistory::new(4);
        history.note_page("https://example.com");
        history.note_page("https://example.com");
        history.note_page("https://example.com/about");
        assert_eq!(history.stats().pages_visited, 2);
    }

    #[tokio::test]
    async fn exports_json_to_disk() {
        let history = InMemoryHistory::new(8);
        history
            .append(entry(1, AttemptOutcome::Success).with_detail("clicked"))
            .await
            .unwrap();
        NoopHistory
            .append(entry(1, AttemptOutcome::Aborted))
            .await
            .unwrap();

        let json = history.export_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["entries"].as_array().unwrap().len(), 1);
        assert_eq!(value["entries"][0]["outcome"], "success");
        assert_eq!(value["stats"]["successful"], 1);

        let file = NamedTempFile::new().expect("tempfile");
        history.write_json(file.path()).expect("write history");
        let written = std::fs::read_to_string(file.path()).expect("read history");
        assert!(written.contains("\"capacity\": 8"));
    }
}
