//! Core data types for action execution

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use lighthouse_core_types::{ActionId, SessionId};
use lighthouse_policy_center::ExecutorPolicy;
use lighthouse_state_center::{redact_text, redact_url};
use perceiver_structural::NodeId;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::errors::DriverError;

/// Execution context for one action
///
/// Carries the ids used in logs and history, plus the session's
/// cancellation token for cooperative cancellation.
#[derive(Clone, Debug)]
pub struct ExecCtx {
    /// Unique identifier for this action
    pub action_id: ActionId,

    /// Session the action belongs to
    pub session: SessionId,

    /// Cancellation token for cooperative cancellation
    pub cancel_token: CancellationToken,
}

impl ExecCtx {
    pub fn new(session: SessionId, cancel_token: CancellationToken) -> Self {
        Self {
            action_id: ActionId::new(),
            session,
            cancel_token,
        }
    }

    /// Check if this context has been cancelled
    pub fn is_cancelled(&self) -> bool {
        self.cancel_token.is_cancelled()
    }
}

/// Text the user dictated into a field; never printed in full.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TypedText(pub String);

impl TypedText {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn redacted(&self) -> String {
        redact_text(&self.0)
    }
}

impl fmt::Debug for TypedText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.redacted())
    }
}

impl From<&str> for TypedText {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScrollDirection {
    Up,
    Down,
    Top,
    Bottom,
}

impl ScrollDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScrollDirection::Up => "up",
            ScrollDirection::Down => "down",
            ScrollDirection::Top => "top",
            ScrollDirection::Bottom => "bottom",
        }
    }
}

/// One browser-level step. Element targets carry the node id from the
/// snapshot they were resolved against, plus the spoken label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "primitive", rename_all = "snake_case")]
pub enum PrimitiveAction {
    Navigate {
        url: String,
    },
    Click {
        node: NodeId,
        label: String,
    },
    Type {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        node: Option<NodeId>,
        label: String,
        text: TypedText,
        /// Press enter after typing.
        #[serde(default)]
        submit: bool,
    },
    Submit {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        node: Option<NodeId>,
        label: String,
    },
    Scroll {
        direction: ScrollDirection,
    },
    Back,
    Forward,
}

impl PrimitiveAction {
    pub fn kind_name(&self) -> &'static str {
        match self {
            PrimitiveAction::Navigate { .. } => "navigate",
            PrimitiveAction::Click { .. } => "click",
            PrimitiveAction::Type { .. } => "type",
            PrimitiveAction::Submit { .. } => "submit",
            PrimitiveAction::Scroll { .. } => "scroll",
            PrimitiveAction::Back => "back",
            PrimitiveAction::Forward => "forward",
        }
    }

    /// Target description safe for history and logs.
    pub fn redacted_target(&self) -> String {
        match self {
            PrimitiveAction::Navigate { url } => redact_url(url),
            PrimitiveAction::Click { label, .. } | PrimitiveAction::Submit { label, .. } => {
                label.clone()
            }
            PrimitiveAction::Type { label, text, .. } => {
                format!("{label} <- {}", text.redacted())
            }
            PrimitiveAction::Scroll { direction } => direction.as_str().to_string(),
            PrimitiveAction::Back | PrimitiveAction::Forward => String::new(),
        }
    }
}

/// Result of a bounded wait for the page to settle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdleStatus {
    Idle,
    TimedOut,
}

/// Final outcome of an execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", content = "cause", rename_all = "snake_case")]
pub enum ExecutionOutcome {
    Success,
    /// Retry budget exhausted; carries the last cause.
    TransientFailure(DriverError),
    FatalFailure(DriverError),
    Aborted,
}

impl ExecutionOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            ExecutionOutcome::Success => "success",
            ExecutionOutcome::TransientFailure(_) => "transient_failure",
            ExecutionOutcome::FatalFailure(_) => "fatal_failure",
            ExecutionOutcome::Aborted => "aborted",
        }
    }

    pub fn cause(&self) -> Option<&DriverError> {
        match self {
            ExecutionOutcome::TransientFailure(cause) | ExecutionOutcome::FatalFailure(cause) => {
                Some(cause)
            }
            ExecutionOutcome::Success | ExecutionOutcome::Aborted => None,
        }
    }
}

/// Action execution report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionReport {
    pub action_id: ActionId,

    pub outcome: ExecutionOutcome,

    /// Dispatches made, including the first
    pub attempts: u32,

    /// The page had not settled before at least one dispatch
    pub stale_state: bool,

    /// When the execution started
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub started_at: DateTime<Utc>,

    /// When the execution finished
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub finished_at: DateTime<Utc>,

    /// Total latency in milliseconds
    pub latency_ms: u64,
}

impl ExecutionReport {
    pub fn is_success(&self) -> bool {
        matches!(self.outcome, ExecutionOutcome::Success)
    }

    pub fn retries(&self) -> u32 {
        self.attempts.saturating_sub(1)
    }
}

/// Executor tuning
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecutorConfig {
    pub idle_timeout: Duration,
    pub max_retries: u32,
    /// First backoff; doubles on each further retry.
    pub backoff: Duration,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            idle_timeout: Duration::from_millis(10_000),
            max_retries: 2,
            backoff: Duration::from_millis(500),
        }
    }
}

impl From<&ExecutorPolicy> for ExecutorConfig {
    fn from(policy: &ExecutorPolicy) -> Self {
        Self {
            idle_timeout: Duration::from_millis(policy.idle_timeout_ms),
            max_retries: policy.max_retries,
            backoff: Duration::from_millis(policy.backoff_ms),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn typed_text_is_never_shown() {
        let action = PrimitiveAction::Type {
            node: Some(NodeId(4)),
            label: "text field Password".into(),
            text: TypedText::from("hunter2"),
            submit: false,
        };
        assert!(!format!("{action:?}").contains("hunter2"));
        assert_eq!(
            action.redacted_target(),
            "text field Password <- [redacted: 7 chars]"
        );
    }

    #[test]
    fn navigate_target_masks_query() {
        let action = PrimitiveAction::Navigate {
            url: "https://example.com/reset?token=abc".into(),
        };
        assert_eq!(action.redacted_target(), "https://example.com/reset?token=***");
    }

    #[test]
    fn outcome_serializes_with_cause() {
        let outcome = ExecutionOutcome::FatalFailure(DriverError::protocol("bad"));
        let value = serde_json::to_value(&outcome).unwrap();
        assert_eq!(value["outcome"], "fatal_failure");
        assert_eq!(value["cause"]["kind"], "protocol");
    }
}
