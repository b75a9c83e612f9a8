use std::collections::HashMap;

use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct PolicySnapshot {
    pub rev: u64,
    pub safety: SafetyPolicy,
    pub executor: ExecutorPolicy,
    pub nlu: NluPolicy,
    pub session: SessionPolicy,
    pub resolver: ResolverPolicy,
    pub diff: StructuralDiffPolicy,
    pub speech: SpeechPolicy,
    pub provenance: HashMap<String, PolicyProvenance>,
}

#[derive(Clone, Debug, Serialize, Deserialize, Default, PartialEq)]
pub struct SafetyPolicy {
    /// Hosts a navigation may reach. `*.example.com` also admits subdomains.
    pub allowed_domains: Vec<String>,
    /// Action kinds that always need a spoken confirmation.
    pub restricted_actions: Vec<String>,
    #[serde(default)]
    pub domain_rules: Vec<DomainRulePolicy>,
}

#[derive(Clone, Debug, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(default)]
pub struct DomainRulePolicy {
    pub domain: String,
    pub allowed_subdomains: Vec<String>,
    pub restricted_paths: Vec<String>,
    pub blocked_actions: Vec<String>,
    pub confirm_actions: Vec<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct ExecutorPolicy {
    pub idle_timeout_ms: u64,
    pub max_retries: u32,
    pub backoff_ms: u64,
}

#[derive(Clone, Debug, Serialize, Deserialize, Default, PartialEq)]
pub struct NluPolicy {
    pub confidence_threshold: f64,
}

#[derive(Clone, Debug, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct SessionPolicy {
    pub history_capacity: usize,
    pub idle_timeout_secs: u64,
    pub max_sessions: usize,
    pub cleanup_interval_secs: u64,
}

#[derive(Clone, Debug, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct ResolverPolicy {
    pub max_candidates: usize,
}

#[derive(Clone, Debug, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct StructuralDiffPolicy {
    pub ignored_roles: Vec<String>,
    pub ignored_name_markers: Vec<String>,
    pub max_events: Option<usize>,
}

#[derive(Clone, Debug, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct SpeechPolicy {
    pub timeout_ms: u64,
    pub max_actions: usize,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PolicyProvenance {
    pub path: String,
    pub source: PolicySource,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum PolicySource {
    Builtin,
    File,
    Env,
    Cli,
    RuntimeOverride,
}

/// What components read; provenance stays with the snapshot.
#[derive(Clone, Debug)]
pub struct PolicyView {
    pub rev: u64,
    pub safety: SafetyPolicy,
    pub executor: ExecutorPolicy,
    pub nlu: NluPolicy,
    pub session: SessionPolicy,
    pub resolver: ResolverPolicy,
    pub diff: StructuralDiffPolicy,
    pub speech: SpeechPolicy,
}

impl From<PolicySnapshot> for PolicyView {
    fn from(snapshot: PolicySnapshot) -> Self {
        Self {
            rev: snapshot.rev,
            safety: snapshot.safety,
            executor: snapshot.executor,
            nlu: snapshot.nlu,
            session: snapshot.session,
            resolver: snapshot.resolver,
            diff: snapshot.diff,
            speech: snapshot.speech,
        }
    }
}

impl PolicySnapshot {
    pub fn set_provenance(&mut self, path: &str, source: PolicySource) {
        self.provenance.insert(
            path.to_string(),
            PolicyProvenance {
                path: path.to_string(),
                source,
            },
        );
    }

    pub fn source_of(&self, path: &str) -> Option<PolicySource> {
        self.provenance.get(path).map(|entry| entry.source)
    }

    pub fn view(&self) -> PolicyView {
        PolicyView::from(self.clone())
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RuntimeOverrideSpec {
    pub path: String,
    pub value: serde_json::Value,
    pub owner: String,
    pub reason: String,
    pub ttl_seconds: u64,
}
