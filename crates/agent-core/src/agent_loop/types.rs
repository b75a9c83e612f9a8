//! Results returned by the loop controller.

use action_primitives::ExecutionReport;
use serde::{Deserialize, Serialize};

use crate::ports::SpeechSignal;
use crate::session::LoopState;
use crate::summarizer::Utterance;

/// How one `handle()` call ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoopOutcome {
    /// The intent ran, or the question was answered.
    Completed,
    /// The gate refused the action.
    SafetyDenied,
    /// Waiting for "confirm" or "cancel".
    ConfirmationRequired,
    /// Waiting for a number from the listing.
    AmbiguousTarget,
    /// Nothing on the page matched the target.
    NoMatchFound,
    /// Retry budget exhausted on transient driver errors.
    TransientDriverFailure,
    /// The driver failed in a way retries cannot fix; the session stays usable.
    FatalDriverFailure,
    /// The action or the pending question was dropped.
    Cancelled,
    /// The intent did not fit the current state.
    Clarification,
    /// Low-confidence transcript or an explicit request for help.
    Help,
}

impl LoopOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            LoopOutcome::Completed => "completed",
            LoopOutcome::SafetyDenied => "safety_denied",
            LoopOutcome::ConfirmationRequired => "confirmation_required",
            LoopOutcome::AmbiguousTarget => "ambiguous_target",
            LoopOutcome::NoMatchFound => "no_match_found",
            LoopOutcome::TransientDriverFailure => "transient_driver_failure",
            LoopOutcome::FatalDriverFailure => "fatal_driver_failure",
            LoopOutcome::Cancelled => "cancelled",
            LoopOutcome::Clarification => "clarification",
            LoopOutcome::Help => "help",
        }
    }

    /// Outcomes that leave a follow-up pending.
    pub fn is_suspended(&self) -> bool {
        matches!(
            self,
            LoopOutcome::ConfirmationRequired | LoopOutcome::AmbiguousTarget
        )
    }
}

/// What the user hears, plus the execution record when something ran.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpokenResult {
    pub status: LoopOutcome,
    pub utterance: Utterance,
    /// Controller state after this call.
    pub state: LoopState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub report: Option<ExecutionReport>,
    /// Set when a speech sink was attached.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speech: Option<SpeechSignal>,
}

impl SpokenResult {
    pub fn new(status: LoopOutcome, utterance: Utterance) -> Self {
        Self {
            status,
            utterance,
            state: LoopState::Idle,
            report: None,
            speech: None,
        }
    }

    pub fn with_report(mut self, report: ExecutionReport) -> Self {
        self.report = Some(report);
        self
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.utterance.hint = Some(hint.into());
        self
    }

    pub fn is_success(&self) -> bool {
        self.status == LoopOutcome::Completed
    }

    /// Spoken text.
    pub fn text(&self) -> String {
        self.utterance.render()
    }
}
