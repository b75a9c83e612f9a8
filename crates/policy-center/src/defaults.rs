use crate::model::{
    ExecutorPolicy, NluPolicy, PolicySnapshot, ResolverPolicy, SafetyPolicy, SessionPolicy,
    SpeechPolicy, StructuralDiffPolicy,
};

pub fn default_snapshot() -> PolicySnapshot {
    PolicySnapshot {
        rev: 1,
        safety: SafetyPolicy {
            allowed_domains: ["google.com", "amazon.com", "github.com", "wikipedia.org", "example.com"]
                .into_iter()
                .map(String::from)
                .collect(),
            restricted_actions: ["delete", "purchase", "payment", "account_change"]
                .into_iter()
                .map(String::from)
                .collect(),
            domain_rules: Vec::new(),
        },
        executor: ExecutorPolicy {
            idle_timeout_ms: 10_000,
            max_retries: 2,
            backoff_ms: 500,
        },
        nlu: NluPolicy {
            confidence_threshold: 0.7,
        },
        session: SessionPolicy {
            history_capacity: 64,
            idle_timeout_secs: 3_600,
            max_sessions: 10,
            cleanup_interval_secs: 300,
        },
        resolver: ResolverPolicy { max_candidates: 9 },
        diff: StructuralDiffPolicy {
            ignored_roles: vec!["timer".into(), "marquee".into()],
            ignored_name_markers: vec!["advertisement".into(), "sponsored".into()],
            max_events: None,
        },
        speech: SpeechPolicy {
            timeout_ms: 15_000,
            max_actions: 3,
        },
        provenance: Default::default(),
    }
}
