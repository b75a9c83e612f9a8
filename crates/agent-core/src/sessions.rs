//! Session handles and the caller-owned session pool.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use lighthouse_core_types::SessionId;
use lighthouse_policy_center::SessionPolicy;
use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::agent_loop::{LoopConfig, LoopController, SpokenResult};
use crate::errors::AgentError;
use crate::intent::Intent;

/// Serialises intents for one session; `cancel` never waits for the in-flight one.
pub struct SessionHandle {
    id: SessionId,
    controller: tokio::sync::Mutex<LoopController>,
    cancel: Mutex<CancellationToken>,
    last_activity: Mutex<DateTime<Utc>>,
}

impl SessionHandle {
    pub fn new(controller: LoopController) -> Self {
        let id = controller.session_id().clone();
        let token = controller.cancellation_token();
        Self {
            id,
            controller: tokio::sync::Mutex::new(controller),
            cancel: Mutex::new(token),
            last_activity: Mutex::new(Utc::now()),
        }
    }

    pub fn id(&self) -> &SessionId {
        &self.id
    }

    pub fn last_activity(&self) -> DateTime<Utc> {
        *self.last_activity.lock()
    }

    /// Queued behind any call already running on this session.
    pub async fn handle(&self, intent: Intent) -> SpokenResult {
        let mut controller = self.controller.lock().await;
        self.settle(&mut controller);
        *self.last_activity.lock() = Utc::now();
        let mut result = controller.handle(intent).await;
        if self.settle(&mut controller) {
            result.state = controller.loop_state();
        }
        result
    }

    pub async fn handle_transcript(&self, transcript: &str) -> SpokenResult {
        let mut controller = self.controller.lock().await;
        self.settle(&mut controller);
        *self.last_activity.lock() = Utc::now();
        let mut result = controller.handle_transcript(transcript).await;
        if self.settle(&mut controller) {
            result.state = controller.loop_state();
        }
        result
    }

    /// Trips the session token. Pending state is dropped now when the session
    /// is idle, otherwise as soon as the in-flight call returns.
    ///
    /// Returns `true` when the reset happened immediately.
    pub fn cancel(&self) -> bool {
        self.cancel.lock().cancel();
        match self.controller.try_lock() {
            Ok(mut controller) => {
                self.settle(&mut controller);
                true
            }
            Err(_) => {
                debug!(target: "loop", session = %self.id, "cancel deferred to in-flight call");
                false
            }
        }
    }

    /// Whether an intent is being handled right now.
    pub fn is_busy(&self) -> bool {
        self.controller.try_lock().is_err()
    }

    /// Applies `config` once any in-flight call has finished.
    pub async fn reconfigure(&self, config: LoopConfig) {
        self.controller.lock().await.reconfigure(config);
    }

    /// Read access to the controller, waiting for any in-flight call.
    pub async fn inspect<R>(&self, read: impl FnOnce(&LoopController) -> R) -> R {
        let controller = self.controller.lock().await;
        read(&controller)
    }

    /// Clears pending state after a cancel and installs a fresh token.
    fn settle(&self, controller: &mut LoopController) -> bool {
        if !controller.cancellation_token().is_cancelled() {
            return false;
        }
        let dropped = controller.discard_pending();
        *self.cancel.lock() = controller.refresh_token();
        info!(target: "loop", session = %self.id, dropped_pending = dropped, "cancel applied");
        true
    }
}

/// Maps session ids to handles. Owned by the caller; there is no global pool.
pub struct SessionPool {
    sessions: DashMap<SessionId, Arc<SessionHandle>>,
    max_sessions: usize,
    idle_timeout: Duration,
}

impl SessionPool {
    pub fn new(max_sessions: usize, idle_timeout: Duration) -> Self {
        Self {
            sessions: DashMap::new(),
            max_sessions: max_sessions.max(1),
            idle_timeout,
        }
    }

    pub fn from_policy(policy: &SessionPolicy) -> Self {
        Self::new(
            policy.max_sessions,
            Duration::from_secs(policy.idle_timeout_secs),
        )
    }

    /// Adds a session, sweeping idle ones first when the pool is full.
    pub fn insert(&self, controller: LoopController) -> Result<Arc<SessionHandle>, AgentError> {
        let id = controller.session_id().clone();
        if !self.sessions.contains_key(&id) && self.sessions.len() >= self.max_sessions {
            self.sweep_idle(Utc::now());
            if self.sessions.len() >= self.max_sessions {
                return Err(AgentError::SessionLimit(self.max_sessions));
            }
        }
        let handle = Arc::new(SessionHandle::new(controller));
        if let Some(previous) = self.sessions.insert(id.clone(), Arc::clone(&handle)) {
            previous.cancel();
        }
        info!(target: "loop", session = %id, active = self.sessions.len(), "session opened");
        Ok(handle)
    }

    pub fn get(&self, id: &SessionId) -> Option<Arc<SessionHandle>> {
        self.sessions.get(id).map(|entry| Arc::clone(entry.value()))
    }

    pub fn require(&self, id: &SessionId) -> Result<Arc<SessionHandle>, AgentError> {
        self.get(id)
            .ok_or_else(|| AgentError::UnknownSession(id.to_string()))
    }

    /// Removes and cancels a session.
    pub fn remove(&self, id: &SessionId) -> Option<Arc<SessionHandle>> {
        let (_, handle) = self.sessions.remove(id)?;
        handle.cancel();
        info!(target: "loop", session = %id, "session closed");
        Some(handle)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn ids(&self) -> Vec<SessionId> {
        self.sessions.iter().map(|entry| entry.key().clone()).collect()
    }

    /// Evicts sessions idle longer than the timeout; busy sessions are kept.
    pub fn sweep_idle(&self, now: DateTime<Utc>) -> Vec<SessionId> {
        let expired: Vec<SessionId> = self
            .sessions
            .iter()
            .filter(|entry| {
                let handle = entry.value();
                let idle = (now - handle.last_activity()).to_std().unwrap_or_default();
                !handle.is_busy() && idle > self.idle_timeout
            })
            .map(|entry| entry.key().clone())
            .collect();
        for id in &expired {
            if let Some((_, handle)) = self.sessions.remove(id) {
                handle.cancel();
            }
        }
        if !expired.is_empty() {
            info!(
                target: "loop",
                evicted = expired.len(),
                active = self.sessions.len(),
                "idle sessions evicted"
            );
        }
        expired
    }

    /// Sweeps on a fixed interval until `shutdown` is cancelled.
    pub fn spawn_sweeper(
        self: &Arc<Self>,
        interval: Duration,
        shutdown: CancellationToken,
    ) -> JoinHandle<()> {
        let pool = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.tick().await;
            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    _ = ticker.tick() => {
                        pool.sweep_idle(Utc::now());
                    }
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use action_locator::TargetDescriptor;
    use action_primitives::{
        BrowserDriver, DriverError, IdleStatus, PrimitiveAction, ScrollDirection,
    };
    use async_trait::async_trait;
    use perceiver_structural::{AccessibilitySnapshot, SnapshotBuilder};
    use tokio::sync::Notify;

    use crate::agent_loop::LoopOutcome;
    use crate::session::LoopState;

    /// Fails the first dispatch with a stale element, then succeeds.
    struct FlakyDriver {
        dispatched: Notify,
        calls: parking_lot::Mutex<u32>,
    }

    impl FlakyDriver {
        fn new() -> Self {
            Self {
                dispatched: Notify::new(),
                calls: parking_lot::Mutex::new(0),
            }
        }
    }

    #[async_trait]
    impl BrowserDriver for FlakyDriver {
        async fn get_snapshot(&self) -> Result<AccessibilitySnapshot, DriverError> {
            let mut page = SnapshotBuilder::new("https://example.com/account", "Account");
            let root = page.root();
            page.child(root, "button", "Delete account");
            Ok(page.build())
        }

        async fn dispatch(&self, _action: &PrimitiveAction) -> Result<(), DriverError> {
            let first = {
                let mut calls = self.calls.lock();
                *calls += 1;
                *calls == 1
            };
            self.dispatched.notify_one();
            if first {
                Err(DriverError::stale_element("node detached"))
            } else {
                Ok(())
            }
        }

        async fn navigate(&self, _url: &str) -> Result<(), DriverError> {
            Ok(())
        }

        async fn wait_idle(&self, _timeout: Duration) -> Result<IdleStatus, DriverError> {
            Ok(IdleStatus::Idle)
        }
    }

    fn controller(id: &str, driver: Arc<FlakyDriver>) -> LoopController {
        let config = LoopConfig::builtin().expect("defaults are valid");
        LoopController::new(SessionId::from(id), config, driver)
    }

    #[test]
    fn pool_refuses_sessions_past_the_limit() {
        let pool = SessionPool::new(1, Duration::from_secs(3_600));
        let driver = Arc::new(FlakyDriver::new());
        pool.insert(controller("a", driver.clone())).expect("first fits");
        let err = pool
            .insert(controller("b", driver.clone()))
            .err()
            .expect("second is refused");
        assert!(matches!(err, AgentError::SessionLimit(1)));
        assert!(err.is_retryable());

        // replacing an existing id does not count against the limit
        assert!(pool.insert(controller("a", driver)).is_ok());
        assert_eq!(pool.len(), 1);
    }

    #[test]
    fn idle_sessions_are_swept() {
        let pool = SessionPool::new(4, Duration::from_secs(60));
        let driver = Arc::new(FlakyDriver::new());
        pool.insert(controller("a", driver)).expect("fits");

        assert!(pool.sweep_idle(Utc::now()).is_empty());
        let later = Utc::now() + chrono::Duration::seconds(120);
        assert_eq!(pool.sweep_idle(later), vec![SessionId::from("a")]);
        assert!(pool.is_empty());
        assert!(matches!(
            pool.require(&SessionId::from("a")),
            Err(AgentError::UnknownSession(_))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn sweeper_evicts_idle_sessions_on_its_interval() {
        let pool = Arc::new(SessionPool::new(4, Duration::ZERO));
        pool.insert(controller("a", Arc::new(FlakyDriver::new())))
            .expect("fits");
        // idleness is measured on the wall clock
        std::thread::sleep(Duration::from_millis(5));

        let shutdown = CancellationToken::new();
        let sweeper = pool.spawn_sweeper(Duration::from_secs(30), shutdown.clone());
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(pool.len(), 1);

        tokio::time::sleep(Duration::from_secs(21)).await;
        assert!(pool.is_empty());

        shutdown.cancel();
        sweeper.await.expect("sweeper stops");
    }

    #[tokio::test]
    async fn reconfigure_reaches_the_controller() {
        let handle = SessionHandle::new(controller("s", Arc::new(FlakyDriver::new())));
        let mut config = LoopConfig::builtin().expect("defaults are valid");
        config.executor.max_retries = 5;
        config.max_actions = 1;
        handle.reconfigure(config).await;

        let (retries, actions) = handle
            .inspect(|controller| {
                (
                    controller.config().executor.max_retries,
                    controller.config().max_actions,
                )
            })
            .await;
        assert_eq!((retries, actions), (5, 1));
    }

    #[tokio::test]
    async fn cancel_on_an_idle_session_drops_the_pending_question() {
        let handle = SessionHandle::new(controller("s", Arc::new(FlakyDriver::new())));
        let target = TargetDescriptor::new()
            .with_role("button")
            .with_name("Delete account");
        let result = handle.handle(Intent::Click { target }).await;
        assert_eq!(result.status, LoopOutcome::ConfirmationRequired);
        assert_eq!(result.state, LoopState::AwaitingConfirmation);

        assert!(handle.cancel());
        let state = handle.inspect(|controller| controller.loop_state()).await;
        assert_eq!(state, LoopState::Idle);

        // a fresh token: the next intent runs normally
        let result = handle.handle(Intent::Confirm).await;
        assert_eq!(result.status, LoopOutcome::Clarification);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_reaches_an_action_in_flight() {
        let driver = Arc::new(FlakyDriver::new());
        let handle = Arc::new(SessionHandle::new(controller("s", driver.clone())));

        let running = {
            let handle = Arc::clone(&handle);
            tokio::spawn(async move {
                handle
                    .handle(Intent::Scroll {
                        direction: ScrollDirection::Down,
                    })
                    .await
            })
        };
        driver.dispatched.notified().await;
        assert!(handle.is_busy());
        assert!(!handle.cancel());

        let result = running.await.expect("task completes");
        assert_eq!(result.status, LoopOutcome::Cancelled);
        assert_eq!(result.state, LoopState::Idle);
        let report = result.report.expect("executor ran");
        assert_eq!(report.attempts, 1);

        let again = handle
            .handle(Intent::Scroll {
                direction: ScrollDirection::Down,
            })
            .await;
        assert_eq!(again.status, LoopOutcome::Completed);
    }
}
