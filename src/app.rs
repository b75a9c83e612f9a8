//! Wiring shared by the subcommands: the policy center, the loop config
//! derived from it, and the session pool.

use std::sync::Arc;
use std::time::Duration;

use action_gate::{decide, ProposedAction, SafetyVerdict};
use action_primitives::BrowserDriver;
use agent_core::{AgentError, LoopConfig, LoopController, SessionHandle, SessionPool, SpeechSink};
use lighthouse_core_types::SessionId;
use lighthouse_policy_center::{
    InMemoryPolicyCenter, PolicyCenter, PolicySnapshot, RuntimeOverrideSpec,
};
use parking_lot::{Mutex, RwLock};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::classifier::KeywordClassifier;

pub struct App {
    policy: InMemoryPolicyCenter,
    updates: Mutex<watch::Receiver<Arc<PolicySnapshot>>>,
    config: RwLock<LoopConfig>,
    sessions: Arc<SessionPool>,
}

impl App {
    pub fn new(snapshot: PolicySnapshot) -> Result<Self, AgentError> {
        let policy = InMemoryPolicyCenter::new(snapshot);
        let view = policy.view();
        let config = LoopConfig::from_policy(&view)?;
        let sessions = Arc::new(SessionPool::from_policy(&view.session));
        debug!(rev = view.rev, "loop config built from policy");
        Ok(Self {
            updates: Mutex::new(PolicyCenter::subscribe(&policy)),
            policy,
            config: RwLock::new(config),
            sessions,
        })
    }

    pub fn policy(&self) -> Arc<PolicySnapshot> {
        self.policy.current()
    }

    /// Loop config for the current policy revision.
    pub fn config(&self) -> LoopConfig {
        self.refresh();
        self.config.read().clone()
    }

    pub fn sessions(&self) -> &SessionPool {
        &self.sessions
    }

    /// Rebuilds the loop config when the policy center published a new
    /// revision. Returns `true` when the config changed.
    pub fn refresh(&self) -> bool {
        let mut updates = self.updates.lock();
        if !updates.has_changed().unwrap_or(false) {
            return false;
        }
        let snapshot = Arc::clone(&updates.borrow_and_update());
        match LoopConfig::from_policy(&snapshot.view()) {
            Ok(config) => {
                *self.config.write() = config;
                debug!(rev = snapshot.rev, "loop config rebuilt from policy");
                true
            }
            Err(err) => {
                warn!(rev = snapshot.rev, "policy revision rejected: {err}");
                false
            }
        }
    }

    /// Applies a runtime override; `ttl_seconds` of zero keeps it until restart.
    ///
    /// The override is checked against the loop config before it is stored.
    pub async fn apply_override(
        &self,
        path: &str,
        value: serde_json::Value,
        ttl_seconds: u64,
    ) -> Result<(), AgentError> {
        let candidate = self
            .policy
            .current()
            .with_override(path, &value)
            .map_err(|err| AgentError::config(err.to_string()))?;
        LoopConfig::from_policy(&candidate.view())?;
        let request = RuntimeOverrideSpec {
            path: path.to_string(),
            value,
            owner: "cli".into(),
            reason: "interactive override".into(),
            ttl_seconds,
        };
        PolicyCenter::apply_override(&self.policy, request)
            .await
            .map_err(|err| AgentError::config(err.to_string()))?;
        self.refresh();
        info!(path, ttl_seconds, "runtime override applied");
        Ok(())
    }

    /// Evicts idle sessions every `session.cleanup_interval_secs` until `shutdown`.
    pub fn spawn_sweeper(&self, shutdown: CancellationToken) -> JoinHandle<()> {
        let interval = Duration::from_secs(self.policy.current().session.cleanup_interval_secs.max(1));
        self.sessions.spawn_sweeper(interval, shutdown)
    }

    /// Verdict for navigating to `url` from a fresh session.
    pub fn check_url(&self, url: &str) -> SafetyVerdict {
        decide(&ProposedAction::navigate(url), None, &self.config().safety)
    }

    /// Opens a session on `driver` with the keyword classifier attached.
    pub fn open_session(
        &self,
        id: SessionId,
        driver: Arc<dyn BrowserDriver>,
        speech: Option<Arc<dyn SpeechSink>>,
    ) -> Result<Arc<SessionHandle>, AgentError> {
        let mut controller = LoopController::new(id, self.config(), driver)
            .with_classifier(Arc::new(KeywordClassifier::new()));
        if let Some(speech) = speech {
            controller = controller.with_speech(speech);
        }
        self.sessions.insert(controller)
    }
}
