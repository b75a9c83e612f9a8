use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::sync::{watch, Mutex};
use tokio::time::sleep;
use tracing::{info, warn};

use crate::errors::PolicyError;
use crate::model::{PolicySnapshot, PolicySource, PolicyView, RuntimeOverrideSpec};
use crate::override_store::RuntimeOverrideStore;

#[async_trait]
pub trait PolicyCenter: Send + Sync {
    async fn snapshot(&self) -> Arc<PolicySnapshot>;
    async fn apply_override(&self, override_spec: RuntimeOverrideSpec) -> Result<(), PolicyError>;
    fn subscribe(&self) -> watch::Receiver<Arc<PolicySnapshot>>;
}

struct PolicyState {
    base: PolicySnapshot,
    overrides: RuntimeOverrideStore,
    rev_counter: u64,
}

impl PolicyState {
    fn new(base: PolicySnapshot) -> Self {
        let rev_counter = base.rev;
        Self {
            base,
            overrides: RuntimeOverrideStore::default(),
            rev_counter,
        }
    }

    fn recompute(&mut self) -> Result<PolicySnapshot, PolicyError> {
        let mut next = self.base.clone();
        for (path, value) in self.overrides.active_entries() {
            apply_override_to_snapshot(&mut next, &path, &value, PolicySource::RuntimeOverride)?;
        }
        self.rev_counter = self.rev_counter.saturating_add(1);
        next.rev = self.rev_counter;
        Ok(next)
    }
}

/// Holds the live snapshot; readers never wait on writers.
pub struct InMemoryPolicyCenter {
    state: Arc<Mutex<PolicyState>>,
    current: Arc<ArcSwap<PolicySnapshot>>,
    watch_tx: watch::Sender<Arc<PolicySnapshot>>,
}

impl InMemoryPolicyCenter {
    pub fn new(snapshot: PolicySnapshot) -> Self {
        let current = Arc::new(snapshot.clone());
        let (watch_tx, _watch_rx) = watch::channel(Arc::clone(&current));
        Self {
            state: Arc::new(Mutex::new(PolicyState::new(snapshot))),
            current: Arc::new(ArcSwap::new(current)),
            watch_tx,
        }
    }

    /// Lock-free read of the current snapshot.
    pub fn current(&self) -> Arc<PolicySnapshot> {
        self.current.load_full()
    }

    pub fn view(&self) -> PolicyView {
        self.current().view()
    }

    fn publish(
        current: &ArcSwap<PolicySnapshot>,
        watch_tx: &watch::Sender<Arc<PolicySnapshot>>,
        snapshot: PolicySnapshot,
    ) {
        let snapshot = Arc::new(snapshot);
        current.store(Arc::clone(&snapshot));
        let _ = watch_tx.send(snapshot);
    }
}

#[async_trait]
impl PolicyCenter for InMemoryPolicyCenter {
    async fn snapshot(&self) -> Arc<PolicySnapshot> {
        self.current()
    }

    async fn apply_override(&self, override_spec: RuntimeOverrideSpec) -> Result<(), PolicyError> {
        let ttl = if override_spec.ttl_seconds > 0 {
            Some(Duration::from_secs(override_spec.ttl_seconds))
        } else {
            None
        };
        let mut guard = self.state.lock().await;
        // validate against a scratch copy before storing
        guard
            .base
            .with_override(&override_spec.path, &override_spec.value)?;
        guard
            .overrides
            .insert(override_spec.path.clone(), override_spec.value.clone(), ttl);
        let snapshot = guard.recompute()?;
        drop(guard);
        info!(
            path = %override_spec.path,
            owner = %override_spec.owner,
            reason = %override_spec.reason,
            "policy override applied"
        );
        InMemoryPolicyCenter::publish(&self.current, &self.watch_tx, snapshot);

        if let Some(ttl) = ttl {
            let state = Arc::clone(&self.state);
            let current = Arc::clone(&self.current);
            let watch_tx = self.watch_tx.clone();
            let path = override_spec.path.clone();
            tokio::spawn(async move {
                sleep(ttl).await;
                let mut guard = state.lock().await;
                if guard.overrides.remove(&path) {
                    match guard.recompute() {
                        Ok(snapshot) => {
                            drop(guard);
                            InMemoryPolicyCenter::publish(&current, &watch_tx, snapshot);
                        }
                        Err(err) => {
                            warn!("policy override expiry recompute failed: {err}");
                        }
                    }
                }
            });
        }

        Ok(())
    }

    fn subscribe(&self) -> watch::Receiver<Arc<PolicySnapshot>> {
        self.watch_tx.subscribe()
    }
}

impl PolicySnapshot {
    /// Copy of this snapshot with one runtime override applied.
    pub fn with_override(&self, path: &str, value: &Value) -> Result<PolicySnapshot, PolicyError> {
        let mut next = self.clone();
        apply_override_to_snapshot(&mut next, path, value, PolicySource::RuntimeOverride)?;
        Ok(next)
    }
}

pub(crate) fn apply_override_to_snapshot(
    snapshot: &mut PolicySnapshot,
    path: &str,
    value: &Value,
    source: PolicySource,
) -> Result<(), PolicyError> {
    let changed = match path {
        "safety.allowed_domains" => {
            merge(&mut snapshot.safety.allowed_domains, to_string_list(value)?)
        }
        "safety.restricted_actions" => merge(
            &mut snapshot.safety.restricted_actions,
            to_string_list(value)?,
        ),
        "safety.domain_rules" => merge(&mut snapshot.safety.domain_rules, to_typed(value)?),
        "executor.idle_timeout_ms" => {
            merge(&mut snapshot.executor.idle_timeout_ms, to_u64(value)?)
        }
        "executor.max_retries" => merge(&mut snapshot.executor.max_retries, to_u32(value)?),
        "executor.backoff_ms" => merge(&mut snapshot.executor.backoff_ms, to_u64(value)?),
        "nlu.confidence_threshold" => merge(
            &mut snapshot.nlu.confidence_threshold,
            to_unit_interval(value)?,
        ),
        "session.history_capacity" => merge(
            &mut snapshot.session.history_capacity,
            to_positive_usize(value)?,
        ),
        "session.idle_timeout_secs" => {
            merge(&mut snapshot.session.idle_timeout_secs, to_u64(value)?)
        }
        "session.max_sessions" => merge(
            &mut snapshot.session.max_sessions,
            to_positive_usize(value)?,
        ),
        "session.cleanup_interval_secs" => {
            merge(&mut snapshot.session.cleanup_interval_secs, to_u64(value)?)
        }
        "resolver.max_candidates" => {
            let max = to_positive_usize(value)?;
            if max > 9 {
                return Err(PolicyError::InvalidValue(format!(
                    "resolver.max_candidates must be at most 9, got {max}"
                )));
            }
            merge(&mut snapshot.resolver.max_candidates, max)
        }
        "diff.ignored_roles" => merge(&mut snapshot.diff.ignored_roles, to_string_list(value)?),
        "diff.ignored_name_markers" => merge(
            &mut snapshot.diff.ignored_name_markers,
            to_string_list(value)?,
        ),
        "diff.max_events" => {
            let max = if value.is_null() {
                None
            } else {
                Some(to_positive_usize(value)?)
            };
            merge(&mut snapshot.diff.max_events, max)
        }
        "speech.timeout_ms" => merge(&mut snapshot.speech.timeout_ms, to_u64(value)?),
        "speech.max_actions" => merge(
            &mut snapshot.speech.max_actions,
            to_positive_usize(value)?,
        ),
        path => return Err(PolicyError::UnsupportedPath(path.to_string())),
    };
    if changed {
        snapshot.set_provenance(path, source);
    }
    Ok(())
}

fn merge<T: PartialEq>(target: &mut T, candidate: T) -> bool {
    if *target == candidate {
        return false;
    }
    *target = candidate;
    true
}

fn to_u64(value: &Value) -> Result<u64, PolicyError> {
    value
        .as_u64()
        .ok_or_else(|| PolicyError::InvalidValue(format!("expected non-negative integer, got {value}")))
}

fn to_u32(value: &Value) -> Result<u32, PolicyError> {
    to_u64(value).and_then(|v| {
        u32::try_from(v).map_err(|_| PolicyError::InvalidValue(format!("value {v} exceeds u32")))
    })
}

fn to_positive_usize(value: &Value) -> Result<usize, PolicyError> {
    match to_u64(value)? {
        0 => Err(PolicyError::InvalidValue("expected a value of at least 1".into())),
        v => Ok(v as usize),
    }
}

fn to_unit_interval(value: &Value) -> Result<f64, PolicyError> {
    let number = value
        .as_f64()
        .ok_or_else(|| PolicyError::InvalidValue(format!("expected number, got {value}")))?;
    if !(0.0..=1.0).contains(&number) {
        return Err(PolicyError::InvalidValue(format!(
            "expected a value between 0 and 1, got {number}"
        )));
    }
    Ok(number)
}

/// Arrays of strings, or one string separated by commas or semicolons.
fn to_string_list(value: &Value) -> Result<Vec<String>, PolicyError> {
    match value {
        Value::Array(items) => items
            .iter()
            .map(|item| {
                item.as_str()
                    .map(|text| text.trim().to_string())
                    .ok_or_else(|| PolicyError::InvalidValue(format!("expected string, got {item}")))
            })
            .collect(),
        Value::String(text) => Ok(text
            .split([',', ';'])
            .map(str::trim)
            .filter(|item| !item.is_empty())
            .map(String::from)
            .collect()),
        Value::Null => Ok(Vec::new()),
        other => Err(PolicyError::InvalidValue(format!(
            "expected list of strings, got {other}"
        ))),
    }
}

fn to_typed<T: DeserializeOwned>(value: &Value) -> Result<T, PolicyError> {
    serde_json::from_value(value.clone()).map_err(|err| PolicyError::InvalidValue(err.to_string()))
}
