//! Configuration for the command loop, derived from the policy view.

use std::time::Duration;

use action_gate::SafetyConfig;
use action_locator::ResolveOptions;
use action_primitives::ExecutorConfig;
use lighthouse_policy_center::{default_snapshot, PolicyView};
use perceiver_structural::DiffPolicy;

use crate::errors::AgentError;
use crate::summarizer::MAX_ACTIONS;

/// Everything one controller consults. Built once per policy revision.
#[derive(Debug, Clone)]
pub struct LoopConfig {
    /// Allowlist, restricted kinds and per-domain rules.
    pub safety: SafetyConfig,

    /// Idle wait and retry budget.
    pub executor: ExecutorConfig,

    /// Cap on numbered candidate listings.
    pub resolver: ResolveOptions,

    /// Churn filters for change detection.
    pub diff: DiffPolicy,

    /// Transcripts classified below this get a help response.
    /// Default: 0.7
    pub confidence_threshold: f64,

    /// Upper bound on one spoken response.
    /// Default: 15000 ms
    pub speech_timeout: Duration,

    /// Action lines per utterance, never above three.
    pub max_actions: usize,

    /// Entries kept in each session's history ring.
    /// Default: 64
    pub history_capacity: usize,
}

impl LoopConfig {
    pub fn from_policy(view: &PolicyView) -> Result<Self, AgentError> {
        let threshold = view.nlu.confidence_threshold;
        if !(0.0..=1.0).contains(&threshold) {
            return Err(AgentError::config(format!(
                "nlu.confidence_threshold must be between 0 and 1, got {threshold}"
            )));
        }
        if view.speech.timeout_ms == 0 {
            return Err(AgentError::config("speech.timeout_ms must be positive"));
        }
        if view.resolver.max_candidates == 0 {
            return Err(AgentError::config("resolver.max_candidates must be positive"));
        }

        let mut diff = DiffPolicy::default();
        if !view.diff.ignored_roles.is_empty() {
            diff.ignored_roles = view.diff.ignored_roles.clone();
        }
        if !view.diff.ignored_name_markers.is_empty() {
            diff.ignored_name_markers = view.diff.ignored_name_markers.clone();
        }
        diff.max_events = view.diff.max_events;

        Ok(Self {
            safety: SafetyConfig::try_from(&view.safety)?,
            executor: ExecutorConfig::from(&view.executor),
            resolver: ResolveOptions {
                max_candidates: view.resolver.max_candidates,
            },
            diff,
            confidence_threshold: threshold,
            speech_timeout: Duration::from_millis(view.speech.timeout_ms),
            max_actions: view.speech.max_actions.clamp(1, MAX_ACTIONS),
            history_capacity: view.session.history_capacity.max(1),
        })
    }

    /// Built-in policy defaults.
    pub fn builtin() -> Result<Self, AgentError> {
        Self::from_policy(&default_snapshot().view())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_defaults_match_policy() {
        let config = LoopConfig::builtin().expect("defaults are valid");
        assert_eq!(config.executor.max_retries, 2);
        assert_eq!(config.executor.backoff, Duration::from_millis(500));
        assert_eq!(config.resolver.max_candidates, 9);
        assert!((config.confidence_threshold - 0.7).abs() < f64::EPSILON);
        assert_eq!(config.speech_timeout, Duration::from_millis(15_000));
        assert_eq!(config.history_capacity, 64);
        assert!(config.safety.is_host_allowed("google.com"));
    }

    #[test]
    fn out_of_range_threshold_is_rejected() {
        let mut view = default_snapshot().view();
        view.nlu.confidence_threshold = 1.5;
        let err = LoopConfig::from_policy(&view).unwrap_err();
        assert!(matches!(err, AgentError::Config(_)));
        assert_eq!(err.severity(), 3);
    }

    #[test]
    fn bad_safety_entries_surface_as_gate_errors() {
        let mut view = default_snapshot().view();
        view.safety.restricted_actions.push("teleport".into());
        assert!(matches!(
            LoopConfig::from_policy(&view),
            Err(AgentError::Gate(_))
        ));
    }
}
