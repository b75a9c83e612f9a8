//! Per-session state: snapshot window, pending follow-up, counters, history.

use std::sync::Arc;

use action_gate::host_of;
use action_locator::Candidate;
use chrono::{DateTime, Utc};
use lighthouse_core_types::SessionId;
use lighthouse_state_center::{InMemoryHistory, RetryCounters, SnapshotWindow};
use perceiver_structural::{AccessibilitySnapshot, Diff};
use serde::{Deserialize, Serialize};

use crate::intent::Intent;
use crate::plan::ActionPlan;

/// Controller state, derived from the pending follow-up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoopState {
    Idle,
    AwaitingConfirmation,
    AwaitingDisambiguation,
}

/// The one question the session is waiting on.
#[derive(Debug, Clone)]
pub enum PendingFollowUp {
    /// A gated plan, waiting for "confirm" or "cancel".
    Confirmation { plan: ActionPlan },
    /// A numbered listing; the choice picks from `candidates` as stored.
    Disambiguation {
        intent: Intent,
        candidates: Vec<Candidate>,
    },
}

impl PendingFollowUp {
    pub fn state(&self) -> LoopState {
        match self {
            PendingFollowUp::Confirmation { .. } => LoopState::AwaitingConfirmation,
            PendingFollowUp::Disambiguation { .. } => LoopState::AwaitingDisambiguation,
        }
    }
}

#[derive(Debug)]
pub struct SessionState {
    pub id: SessionId,
    pub snapshots: SnapshotWindow<Arc<AccessibilitySnapshot>>,
    pub last_diff: Option<Diff>,
    pub pending: Option<PendingFollowUp>,
    pub retries: RetryCounters,
    pub history: Arc<InMemoryHistory>,
    pub created_at: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
}

impl SessionState {
    pub fn new(id: SessionId, history_capacity: usize) -> Self {
        let now = Utc::now();
        Self {
            id,
            snapshots: SnapshotWindow::new(),
            last_diff: None,
            pending: None,
            retries: RetryCounters::new(),
            history: Arc::new(InMemoryHistory::new(history_capacity)),
            created_at: now,
            last_activity: now,
        }
    }

    pub fn loop_state(&self) -> LoopState {
        self.pending
            .as_ref()
            .map(PendingFollowUp::state)
            .unwrap_or(LoopState::Idle)
    }

    pub fn touch(&mut self) {
        self.last_activity = Utc::now();
    }

    pub fn current_snapshot(&self) -> Option<&Arc<AccessibilitySnapshot>> {
        self.snapshots.current()
    }

    /// Host of the page the session is on.
    pub fn domain(&self) -> Option<String> {
        self.current_snapshot()
            .and_then(|snapshot| host_of(&snapshot.url))
    }

    pub fn record_snapshot(&mut self, snapshot: Arc<AccessibilitySnapshot>) {
        self.history.note_page(&snapshot.url);
        self.snapshots.push(snapshot);
    }

    /// Drops any pending follow-up; returns whether one was pending.
    pub fn discard_pending(&mut self) -> bool {
        self.pending.take().is_some()
    }

    /// Seconds since the last intent.
    pub fn idle_secs(&self, now: DateTime<Utc>) -> i64 {
        (now - self.last_activity).num_seconds().max(0)
    }
}
