//! Action executor - dispatch with idle wait, bounded retry and cancellation
//!
//! Steps per attempt:
//! 1. Check cancellation
//! 2. Wait for page idle (timeout marks the state stale, never fails)
//! 3. Dispatch through the driver
//! 4. Append one redacted history entry
//! 5. On a transient failure, back off and go again while budget remains

use std::time::{Duration, Instant};

use chrono::Utc;
use lighthouse_state_center::{AttemptOutcome, HistoryEntry, HistorySink};
use tracing::{debug, info, warn};

use crate::driver::BrowserDriver;
use crate::errors::DriverError;
use crate::retry::RetryBudget;
use crate::types::{ExecCtx, ExecutionOutcome, ExecutionReport, ExecutorConfig, IdleStatus, PrimitiveAction};

/// Runs primitive actions against a driver.
#[derive(Debug, Clone, Default)]
pub struct ActionExecutor {
    config: ExecutorConfig,
}

impl ActionExecutor {
    pub fn new(config: ExecutorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    /// Executes `action`, retrying transient failures within a fresh budget.
    ///
    /// An in-flight dispatch is never interrupted; cancellation is observed
    /// before each attempt and after each backoff.
    pub async fn execute(
        &self,
        ctx: &ExecCtx,
        action: &PrimitiveAction,
        driver: &dyn BrowserDriver,
        history: &dyn HistorySink,
    ) -> ExecutionReport {
        let started_at = Utc::now();
        let start_instant = Instant::now();
        let mut budget = RetryBudget::from_config(&self.config);
        let mut attempts = 0u32;
        let mut stale_state = false;
        let kind = action.kind_name();
        let target = action.redacted_target();

        info!(
            target: "executor",
            action_id = %ctx.action_id,
            session = %ctx.session,
            kind,
            redacted_target = %target,
            "executing action"
        );

        let outcome = loop {
            if ctx.is_cancelled() {
                self.record(ctx, history, attempts + 1, kind, AttemptOutcome::Aborted, &target, None)
                    .await;
                break ExecutionOutcome::Aborted;
            }

            if !self.wait_idle(ctx, driver).await {
                stale_state = true;
            }

            attempts += 1;
            let result = match action {
                PrimitiveAction::Navigate { url } => driver.navigate(url).await,
                other => driver.dispatch(other).await,
            };

            match result {
                Ok(()) => {
                    self.record(ctx, history, attempts, kind, AttemptOutcome::Success, &target, None)
                        .await;
                    break ExecutionOutcome::Success;
                }
                Err(err) if err.is_transient() => {
                    self.record(
                        ctx,
                        history,
                        attempts,
                        kind,
                        AttemptOutcome::TransientFailure,
                        &target,
                        Some(&err),
                    )
                    .await;
                    let Some(delay) = budget.next_delay() else {
                        break ExecutionOutcome::TransientFailure(err);
                    };
                    debug!(
                        target: "executor",
                        action_id = %ctx.action_id,
                        attempt = attempts,
                        delay_ms = delay.as_millis() as u64,
                        cause = %err,
                        "transient failure, backing off"
                    );
                    tokio::select! {
                        _ = tokio::time::sleep(delay) => {}
                        _ = ctx.cancel_token.cancelled() => {}
                    }
                }
                Err(err) => {
                    self.record(
                        ctx,
                        history,
                        attempts,
                        kind,
                        AttemptOutcome::FatalFailure,
                        &target,
                        Some(&err),
                    )
                    .await;
                    break ExecutionOutcome::FatalFailure(err);
                }
            }
        };

        let latency_ms = start_instant.elapsed().as_millis() as u64;
        info!(
            target: "executor",
            action_id = %ctx.action_id,
            session = %ctx.session,
            kind,
            attempts,
            stale_state,
            latency_ms,
            outcome = outcome.label(),
            "action finished"
        );

        ExecutionReport {
            action_id: ctx.action_id.clone(),
            outcome,
            attempts,
            stale_state,
            started_at,
            finished_at: Utc::now(),
            latency_ms,
        }
    }

    /// True when the page settled in time.
    async fn wait_idle(&self, ctx: &ExecCtx, driver: &dyn BrowserDriver) -> bool {
        let timeout = self.config.idle_timeout;
        // driver gets the same bound; the outer timeout only guards a driver that ignores it
        let guard = timeout.saturating_add(Duration::from_millis(50));
        match tokio::time::timeout(guard, driver.wait_idle(timeout)).await {
            Ok(Ok(IdleStatus::Idle)) => true,
            Ok(Ok(IdleStatus::TimedOut)) | Err(_) => {
                warn!(
                    target: "executor",
                    action_id = %ctx.action_id,
                    timeout_ms = timeout.as_millis() as u64,
                    "page did not settle, proceeding on stale state"
                );
                false
            }
            Ok(Err(err)) => {
                warn!(
                    target: "executor",
                    action_id = %ctx.action_id,
                    cause = %err,
                    "idle wait failed, proceeding on stale state"
                );
                false
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    async fn record(
        &self,
        ctx: &ExecCtx,
        history: &dyn HistorySink,
        attempt: u32,
        kind: &str,
        outcome: AttemptOutcome,
        target: &str,
        cause: Option<&DriverError>,
    ) {
        let mut entry = HistoryEntry::new(ctx.action_id.clone(), attempt, kind, outcome, target);
        if let Some(cause) = cause {
            entry = entry.with_detail(cause.to_string());
        }
        debug!(
            target: "executor",
            action_id = %ctx.action_id,
            attempt,
            outcome = outcome.as_str(),
            "attempt recorded"
        );
        if let Err(err) = history.append(entry).await {
            warn!(target: "executor", action_id = %ctx.action_id, error = %err, "history append failed");
        }
    }
}
