//! Loop controller: one intent in, one spoken result out.
//!
//! Each call walks gate, resolve, execute, observe, diff and summarise for a
//! single session. The controller suspends (returns with a pending follow-up)
//! when it needs a confirmation or a choice from a numbered listing.

use std::sync::Arc;
use std::time::Instant;

use action_gate::{decide, host_of, ActionKind, SafetyVerdict};
use action_locator::{resolve_with_options, Candidate, ResolveResult, TargetDescriptor};
use action_primitives::{
    ActionExecutor, BrowserDriver, DriverError, DriverErrorKind, ExecCtx, ExecutionOutcome,
    ExecutionReport, PrimitiveAction,
};
use lighthouse_core_types::SessionId;
use lighthouse_state_center::{
    redact_url, AttemptOutcome, HistoryEntry, HistorySink, InMemoryHistory,
};
use perceiver_structural::{diff_with_policy, AccessibilitySnapshot, AxNode};
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::config::LoopConfig;
use super::types::{LoopOutcome, SpokenResult};
use crate::describe::{describe_page, list_elements, numbered};
use crate::intent::Intent;
use crate::plan::{ActionPlan, RetrySpec};
use crate::ports::{IntentClassifier, SpeechSignal, SpeechSink};
use crate::session::{LoopState, PendingFollowUp, SessionState};
use crate::summarizer::{capitalize, summarize_diff, Utterance};

const HELP_TEXT: &str = "You can say: go to a site, click a button, type some text, \
describe this page, list the links, what changed, scroll down, go back, or stop";

/// Drives one session. Owns the driver; never shared between sessions.
pub struct LoopController {
    config: LoopConfig,
    driver: Arc<dyn BrowserDriver>,
    executor: ActionExecutor,
    state: SessionState,
    cancel_token: CancellationToken,
    classifier: Option<Arc<dyn IntentClassifier>>,
    speech: Option<Arc<dyn SpeechSink>>,
}

impl LoopController {
    /// Create a controller for a fresh session.
    pub fn new(session: SessionId, config: LoopConfig, driver: Arc<dyn BrowserDriver>) -> Self {
        let state = SessionState::new(session, config.history_capacity);
        Self {
            executor: ActionExecutor::new(config.executor),
            config,
            driver,
            state,
            cancel_token: CancellationToken::new(),
            classifier: None,
            speech: None,
        }
    }

    /// Attach the classifier used by [`Self::handle_transcript`].
    pub fn with_classifier(mut self, classifier: Arc<dyn IntentClassifier>) -> Self {
        self.classifier = Some(classifier);
        self
    }

    /// Attach a speech sink; every result is spoken through it.
    pub fn with_speech(mut self, speech: Arc<dyn SpeechSink>) -> Self {
        self.speech = Some(speech);
        self
    }

    pub fn config(&self) -> &LoopConfig {
        &self.config
    }

    /// Swaps in a config built from a newer policy revision. The history ring
    /// keeps the capacity it was created with.
    pub fn reconfigure(&mut self, config: LoopConfig) {
        self.executor = ActionExecutor::new(config.executor);
        self.config = config;
        debug!(target: "loop", session = %self.state.id, "loop config replaced");
    }

    pub fn session(&self) -> &SessionState {
        &self.state
    }

    pub fn session_id(&self) -> &SessionId {
        &self.state.id
    }

    pub fn loop_state(&self) -> LoopState {
        self.state.loop_state()
    }

    pub fn history(&self) -> Arc<InMemoryHistory> {
        Arc::clone(&self.state.history)
    }

    /// Token observed by the executor; cancelling it stops the in-flight action.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel_token.clone()
    }

    /// Replaces a tripped token so later intents can run.
    pub fn refresh_token(&mut self) -> CancellationToken {
        if self.cancel_token.is_cancelled() {
            self.cancel_token = CancellationToken::new();
        }
        self.cancel_token.clone()
    }

    /// Drops the pending follow-up, if any.
    pub fn discard_pending(&mut self) -> bool {
        self.state.discard_pending()
    }

    /// Always callable: drops any pending question and stops the current action.
    pub fn cancel(&mut self) -> SpokenResult {
        self.cancel_token.cancel();
        let had_pending = self.state.discard_pending();
        self.refresh_token();
        info!(
            target: "loop",
            session = %self.state.id,
            had_pending,
            "session cancelled"
        );
        let message = if had_pending { "Cancelled" } else { "Stopped" };
        SpokenResult::new(LoopOutcome::Cancelled, Utterance::message(message))
    }

    /// Classifies a transcript and handles it; low confidence gets a help response.
    pub async fn handle_transcript(&mut self, transcript: &str) -> SpokenResult {
        let Some(classifier) = self.classifier.clone() else {
            warn!(target: "loop", session = %self.state.id, "no intent classifier attached");
            let result = help("I can't understand commands right now");
            return self.finish(result).await;
        };
        match classifier.classify(transcript).await {
            Ok(classified) if classified.confidence >= self.config.confidence_threshold => {
                self.handle(classified.intent).await
            }
            Ok(classified) => {
                debug!(
                    target: "loop",
                    session = %self.state.id,
                    intent = classified.intent.name(),
                    confidence = classified.confidence,
                    "low confidence transcript"
                );
                let result = help("Sorry, I didn't catch that");
                self.finish(result).await
            }
            Err(err) => {
                warn!(target: "loop", session = %self.state.id, error = %err, "classification failed");
                let result = help("Sorry, I didn't catch that");
                self.finish(result).await
            }
        }
    }

    /// Handles one intent against the current state.
    pub async fn handle(&mut self, intent: Intent) -> SpokenResult {
        let started = Instant::now();
        self.state.touch();
        let from = self.state.loop_state();
        let name = intent.name();

        let result = match self.state.pending.take() {
            Some(PendingFollowUp::Confirmation { plan }) => {
                self.on_confirmation(plan, intent).await
            }
            Some(PendingFollowUp::Disambiguation {
                intent: original,
                candidates,
            }) => self.on_disambiguation(original, candidates, intent).await,
            None => self.on_idle(intent).await,
        };

        let result = self.finish(result).await;
        info!(
            target: "loop",
            session = %self.state.id,
            intent = name,
            from = ?from,
            to = ?result.state,
            status = result.status.as_str(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "intent handled"
        );
        result
    }

    async fn finish(&mut self, mut result: SpokenResult) -> SpokenResult {
        result.state = self.state.loop_state();
        result.speech = self.speak(&result.utterance).await;
        result
    }

    async fn speak(&self, utterance: &Utterance) -> Option<SpeechSignal> {
        let sink = self.speech.as_ref()?;
        match timeout(self.config.speech_timeout, sink.speak(utterance)).await {
            Ok(Ok(signal)) => Some(signal),
            Ok(Err(err)) => {
                warn!(target: "loop", session = %self.state.id, error = %err, "speech failed");
                Some(SpeechSignal::Cancelled)
            }
            Err(_) => {
                warn!(
                    target: "loop",
                    session = %self.state.id,
                    timeout_ms = self.config.speech_timeout.as_millis() as u64,
                    "speech timed out"
                );
                Some(SpeechSignal::Cancelled)
            }
        }
    }

    async fn on_confirmation(&mut self, plan: ActionPlan, intent: Intent) -> SpokenResult {
        match intent {
            Intent::Confirm => self.run_plan(plan).await,
            Intent::Cancel | Intent::Stop => cancelled(format!("Okay, I won't {}", plan.describe())),
            _ => {
                let prompt = format!("Say confirm to {}, or cancel", plan.describe());
                self.state.pending = Some(PendingFollowUp::Confirmation { plan });
                clarification(prompt)
            }
        }
    }

    async fn on_disambiguation(
        &mut self,
        original: Intent,
        candidates: Vec<Candidate>,
        intent: Intent,
    ) -> SpokenResult {
        match intent {
            Intent::SelectOrdinal { index } if (1..=candidates.len()).contains(&index) => {
                let chosen = &candidates[index - 1];
                debug!(
                    target: "loop",
                    session = %self.state.id,
                    index,
                    label = %chosen.label,
                    "candidate chosen"
                );
                match self.plan_for_node(&original, &chosen.node, &chosen.label) {
                    Some(plan) => self.gate_and_run(plan).await,
                    None => clarification("I can't act on that choice"),
                }
            }
            Intent::SelectOrdinal { .. } => {
                let prompt = format!("Please choose a number from 1 to {}", candidates.len());
                self.state.pending = Some(PendingFollowUp::Disambiguation {
                    intent: original,
                    candidates,
                });
                clarification(prompt)
            }
            Intent::Cancel | Intent::Stop => cancelled("Okay, cancelled"),
            Intent::Describe | Intent::ListElements { .. } => self.on_idle(intent).await,
            _ => {
                let prompt = format!(
                    "Say a number from 1 to {} to choose, or cancel",
                    candidates.len()
                );
                self.state.pending = Some(PendingFollowUp::Disambiguation {
                    intent: original,
                    candidates,
                });
                clarification(prompt)
            }
        }
    }

    async fn on_idle(&mut self, intent: Intent) -> SpokenResult {
        let retry = RetrySpec::from(&self.config.executor);
        match intent {
            Intent::Help => SpokenResult::new(LoopOutcome::Help, Utterance::message(HELP_TEXT)),
            Intent::Confirm => clarification("There is nothing to confirm"),
            Intent::SelectOrdinal { .. } => {
                clarification("There is no list to choose from")
                    .with_hint("Say list links to hear one")
            }
            Intent::Cancel | Intent::Stop => cancelled("Okay"),
            Intent::Describe => self.describe().await,
            Intent::ListElements { role } => self.list(role.as_deref()).await,
            Intent::WhatChanged => self.what_changed(),
            Intent::Navigate { url } => {
                let plan = ActionPlan::untargeted(
                    "navigate",
                    ActionKind::Navigate,
                    PrimitiveAction::Navigate { url },
                    retry,
                );
                self.gate_and_run(plan).await
            }
            Intent::Scroll { direction } => {
                let plan = ActionPlan::untargeted(
                    "scroll",
                    ActionKind::Scroll,
                    PrimitiveAction::Scroll { direction },
                    retry,
                );
                self.gate_and_run(plan).await
            }
            Intent::Back => {
                let plan =
                    ActionPlan::untargeted("back", ActionKind::Back, PrimitiveAction::Back, retry);
                self.gate_and_run(plan).await
            }
            Intent::Forward => {
                let plan = ActionPlan::untargeted(
                    "forward",
                    ActionKind::Forward,
                    PrimitiveAction::Forward,
                    retry,
                );
                self.gate_and_run(plan).await
            }
            Intent::Click { .. } | Intent::Type { .. } | Intent::Submit { .. } => {
                self.targeted(intent).await
            }
        }
    }

    /// Click, type and submit: find the element, then gate and run.
    async fn targeted(&mut self, intent: Intent) -> SpokenResult {
        let snapshot = match self.observe().await {
            Ok(snapshot) => snapshot,
            Err(err) => return self.observe_failure(err),
        };

        let descriptor = match &intent {
            Intent::Click { target } => target.clone(),
            Intent::Type {
                target: Some(target),
                ..
            }
            | Intent::Submit {
                target: Some(target),
            } => target.clone(),
            Intent::Type { target: None, .. } => {
                if let Some(focused) = snapshot.focused().filter(|node| node.is_editable()) {
                    let label = focused.summary().to_string();
                    return match self.plan_for_node(&intent, focused, &label) {
                        Some(plan) => self.gate_and_run(plan).await,
                        None => clarification("I can't type there"),
                    };
                }
                TargetDescriptor::new().with_role("textbox")
            }
            Intent::Submit { target: None } => {
                let plan = ActionPlan::untargeted(
                    "submit",
                    ActionKind::Submit,
                    PrimitiveAction::Submit {
                        node: None,
                        label: "form".to_string(),
                    },
                    RetrySpec::from(&self.config.executor),
                );
                return self.gate_and_run(plan).await;
            }
            _ => return clarification("I can't act on that"),
        };

        match resolve_with_options(&descriptor, &snapshot, &self.config.resolver) {
            Err(err) => {
                debug!(target: "loop", session = %self.state.id, error = %err, "descriptor rejected");
                clarification("Which element do you mean?")
                    .with_hint("Name it, for example: click the Search button")
            }
            Ok(ResolveResult::None) => SpokenResult::new(
                LoopOutcome::NoMatchFound,
                Utterance::message(format!(
                    "I couldn't find {} on this page",
                    descriptor.describe()
                ))
                .with_hint("Say list buttons or list links to hear what is here"),
            ),
            Ok(ResolveResult::One(candidate)) => {
                match self.plan_for_node(&intent, &candidate.node, &candidate.label) {
                    Some(plan) => {
                        let plan = ActionPlan {
                            descriptor: Some(descriptor),
                            ..plan
                        };
                        self.gate_and_run(plan).await
                    }
                    None => clarification("I can't act on that"),
                }
            }
            Ok(ResolveResult::Many(candidates)) => {
                let labels: Vec<String> = candidates
                    .iter()
                    .map(|candidate| candidate.label.clone())
                    .collect();
                let message = format!(
                    "I found {} matches for {}: {}. Which one?",
                    candidates.len(),
                    descriptor.describe(),
                    numbered(&labels)
                );
                info!(
                    target: "loop",
                    session = %self.state.id,
                    candidates = candidates.len(),
                    "awaiting disambiguation"
                );
                self.state.pending = Some(PendingFollowUp::Disambiguation { intent, candidates });
                SpokenResult::new(
                    LoopOutcome::AmbiguousTarget,
                    Utterance::message(message).with_hint("Say a number, or cancel"),
                )
            }
        }
    }

    /// Primitive for an element-level intent acting on `node`.
    fn plan_for_node(&self, intent: &Intent, node: &AxNode, label: &str) -> Option<ActionPlan> {
        let retry = RetrySpec::from(&self.config.executor);
        let (base, primitive, descriptor) = match intent {
            Intent::Click { target } => (
                ActionKind::Click,
                PrimitiveAction::Click {
                    node: node.id,
                    label: label.to_string(),
                },
                Some(target.clone()),
            ),
            Intent::Type { target, text } => (
                ActionKind::Type,
                PrimitiveAction::Type {
                    node: Some(node.id),
                    label: label.to_string(),
                    text: text.clone(),
                    submit: false,
                },
                target.clone(),
            ),
            Intent::Submit { target } => (
                ActionKind::Submit,
                PrimitiveAction::Submit {
                    node: Some(node.id),
                    label: label.to_string(),
                },
                target.clone(),
            ),
            _ => return None,
        };
        Some(ActionPlan::targeted(
            intent.name(),
            base,
            primitive,
            descriptor,
            node,
            retry,
        ))
    }

    async fn gate_and_run(&mut self, plan: ActionPlan) -> SpokenResult {
        let domain = self.state.domain();
        let verdict = decide(&plan.proposed(), domain.as_deref(), &self.config.safety);
        let plan = plan.with_verdict(verdict.clone());
        match verdict {
            SafetyVerdict::Allow => self.run_plan(plan).await,
            SafetyVerdict::Deny { reason } => {
                warn!(
                    target: "loop",
                    session = %self.state.id,
                    action_id = %plan.action_id,
                    kind = plan.kind.as_str(),
                    reason = %reason,
                    "action denied"
                );
                SpokenResult::new(
                    LoopOutcome::SafetyDenied,
                    Utterance::message(format!("I can't {}: {reason}", plan.describe())),
                )
            }
            SafetyVerdict::RequireConfirmation { reason } => {
                let message = format!(
                    "{}. Do you want me to {}?",
                    capitalize(&reason),
                    plan.describe()
                );
                info!(
                    target: "loop",
                    session = %self.state.id,
                    action_id = %plan.action_id,
                    kind = plan.kind.as_str(),
                    "awaiting confirmation"
                );
                self.state.pending = Some(PendingFollowUp::Confirmation { plan });
                SpokenResult::new(
                    LoopOutcome::ConfirmationRequired,
                    Utterance::message(message).with_hint("Say confirm or cancel"),
                )
            }
        }
    }

    async fn run_plan(&mut self, plan: ActionPlan) -> SpokenResult {
        let ctx = ExecCtx {
            action_id: plan.action_id.clone(),
            session: self.state.id.clone(),
            cancel_token: self.cancel_token.clone(),
        };
        let history = Arc::clone(&self.state.history);
        let report = self
            .executor
            .execute(&ctx, &plan.primitive, self.driver.as_ref(), history.as_ref())
            .await;
        self.state.retries.add(&plan.intent, report.retries());

        match report.outcome.clone() {
            ExecutionOutcome::Success => self.after_success(plan, report).await,
            ExecutionOutcome::Aborted => {
                cancelled(format!("Stopped before I could {}", plan.describe())).with_report(report)
            }
            ExecutionOutcome::TransientFailure(cause) => {
                warn!(
                    target: "loop",
                    session = %self.state.id,
                    action_id = %plan.action_id,
                    attempts = report.attempts,
                    cause = %cause,
                    "retry budget exhausted"
                );
                let attempts = report.attempts;
                SpokenResult::new(
                    LoopOutcome::TransientDriverFailure,
                    Utterance::message(format!(
                        "The page didn't respond, so I couldn't {}. I tried {attempts} times",
                        plan.describe()
                    ))
                    .with_hint("You can try again in a moment"),
                )
                .with_report(report)
            }
            ExecutionOutcome::FatalFailure(cause) => {
                error!(
                    target: "loop",
                    session = %self.state.id,
                    action_id = %plan.action_id,
                    cause_kind = cause.kind.as_str(),
                    cause = %cause,
                    severity = cause.severity(),
                    "action failed"
                );
                SpokenResult::new(
                    LoopOutcome::FatalDriverFailure,
                    Utterance::message(format!(
                        "Something went wrong in the browser while trying to {}",
                        plan.describe()
                    ))
                    .with_hint("You can try again or describe the page"),
                )
                .with_report(report)
            }
        }
    }

    /// Observe, check for a disallowed redirect, diff, store and summarise.
    async fn after_success(&mut self, plan: ActionPlan, report: ExecutionReport) -> SpokenResult {
        let snapshot = match self.driver.get_snapshot().await {
            Ok(snapshot) => Arc::new(snapshot),
            Err(err) => {
                warn!(
                    target: "loop",
                    session = %self.state.id,
                    action_id = %plan.action_id,
                    error = %err,
                    "post-action snapshot failed"
                );
                return SpokenResult::new(
                    LoopOutcome::Completed,
                    Utterance::message(completed_line(&plan))
                        .with_hint("I couldn't read the page afterwards"),
                )
                .with_report(report);
            }
        };

        let previous_host = self.state.domain();
        if let Some(host) = host_of(&snapshot.url) {
            if previous_host.as_deref() != Some(host.as_str())
                && !self.config.safety.is_host_allowed(&host)
            {
                return self.leave_disallowed(plan, report, &snapshot, host).await;
            }
        }

        let previous = self.state.current_snapshot().cloned();
        let diff = diff_with_policy(previous.as_deref(), &snapshot, &self.config.diff);
        let mut utterance = Utterance::message(completed_line(&plan));
        summarize_diff(&mut utterance, &diff, &snapshot, self.config.max_actions);
        if diff.is_empty() {
            utterance.push_action("Nothing on the page changed", self.config.max_actions);
        }
        if report.stale_state {
            utterance.hint = Some("The page was still loading, so this may be out of date".into());
        }
        debug!(
            target: "loop",
            session = %self.state.id,
            action_id = %plan.action_id,
            changes = diff.len(),
            "post-action diff"
        );
        self.state.record_snapshot(snapshot);
        self.state.last_diff = Some(diff);

        SpokenResult::new(LoopOutcome::Completed, utterance).with_report(report)
    }

    /// Reports a landing off the allowlist as a fatal driver failure and goes back.
    async fn leave_disallowed(
        &mut self,
        plan: ActionPlan,
        report: ExecutionReport,
        snapshot: &AccessibilitySnapshot,
        host: String,
    ) -> SpokenResult {
        let cause = DriverError::new(
            DriverErrorKind::DisallowedRedirect,
            format!("landed on {host}"),
        );
        warn!(
            target: "loop",
            session = %self.state.id,
            action_id = %plan.action_id,
            url = %redact_url(&snapshot.url),
            "redirected off the allowlist"
        );
        let entry = HistoryEntry::new(
            plan.action_id.clone(),
            report.attempts.saturating_add(1),
            plan.primitive.kind_name(),
            AttemptOutcome::FatalFailure,
            redact_url(&snapshot.url),
        )
        .with_detail(cause.to_string());
        if let Err(err) = self.state.history.append(entry).await {
            warn!(target: "loop", session = %self.state.id, error = %err, "history append failed");
        }
        if let Err(err) = self.driver.dispatch(&PrimitiveAction::Back).await {
            warn!(target: "loop", session = %self.state.id, error = %err, "could not leave the page");
        }
        SpokenResult::new(
            LoopOutcome::FatalDriverFailure,
            Utterance::message(format!(
                "That went to {host}, which is not on the list of allowed sites, so I went back"
            )),
        )
        .with_report(report)
    }

    async fn observe(&mut self) -> Result<Arc<AccessibilitySnapshot>, DriverError> {
        let snapshot = Arc::new(self.driver.get_snapshot().await?);
        if let Some(current) = self.state.current_snapshot() {
            if current.content_hash != snapshot.content_hash {
                let diff = diff_with_policy(Some(current), &snapshot, &self.config.diff);
                self.state.last_diff = Some(diff);
            }
        }
        self.state.record_snapshot(Arc::clone(&snapshot));
        Ok(snapshot)
    }

    fn observe_failure(&self, err: DriverError) -> SpokenResult {
        error!(
            target: "loop",
            session = %self.state.id,
            cause_kind = err.kind.as_str(),
            cause = %err,
            "snapshot failed"
        );
        let status = if err.is_transient() {
            LoopOutcome::TransientDriverFailure
        } else {
            LoopOutcome::FatalDriverFailure
        };
        SpokenResult::new(
            status,
            Utterance::message("I couldn't read the page").with_hint("You can try again"),
        )
    }

    async fn describe(&mut self) -> SpokenResult {
        match self.observe().await {
            Ok(snapshot) => SpokenResult::new(
                LoopOutcome::Completed,
                describe_page(&snapshot).utterance(self.config.max_actions),
            ),
            Err(err) => self.observe_failure(err),
        }
    }

    async fn list(&mut self, role: Option<&str>) -> SpokenResult {
        let snapshot = match self.observe().await {
            Ok(snapshot) => snapshot,
            Err(err) => return self.observe_failure(err),
        };
        let items: Vec<String> =
            list_elements(&snapshot, role, self.config.resolver.max_candidates)
                .iter()
                .map(ToString::to_string)
                .collect();
        let what = role.unwrap_or("controls");
        let message = if items.is_empty() {
            format!("There are no {what} on this page")
        } else {
            format!("{} {what}: {}", items.len(), numbered(&items))
        };
        SpokenResult::new(LoopOutcome::Completed, Utterance::message(message))
    }

    fn what_changed(&self) -> SpokenResult {
        let (Some(diff), Some(snapshot)) = (&self.state.last_diff, self.state.current_snapshot())
        else {
            return SpokenResult::new(
                LoopOutcome::Completed,
                Utterance::message("Nothing has happened yet"),
            );
        };
        if diff.is_empty() {
            return SpokenResult::new(
                LoopOutcome::Completed,
                Utterance::message("Nothing changed after the last action"),
            );
        }
        let mut utterance = Utterance::message("Here is what changed");
        summarize_diff(&mut utterance, diff, snapshot, self.config.max_actions);
        SpokenResult::new(LoopOutcome::Completed, utterance)
    }
}

fn completed_line(plan: &ActionPlan) -> String {
    let target = plan
        .target
        .as_ref()
        .map(ToString::to_string)
        .unwrap_or_else(|| "the field".to_string());
    match &plan.primitive {
        PrimitiveAction::Navigate { .. } => "Page opened".to_string(),
        PrimitiveAction::Click { .. } => format!("Pressed {target}"),
        PrimitiveAction::Type { .. } => format!("Typed into {target}"),
        PrimitiveAction::Submit { node: None, .. } => "Submitted the form".to_string(),
        PrimitiveAction::Submit { .. } => format!("Submitted {target}"),
        PrimitiveAction::Scroll { direction } => format!("Scrolled {}", direction.as_str()),
        PrimitiveAction::Back => "Went back".to_string(),
        PrimitiveAction::Forward => "Went forward".to_string(),
    }
}

fn help(lead: &str) -> SpokenResult {
    SpokenResult::new(
        LoopOutcome::Help,
        Utterance::message(lead).with_hint(HELP_TEXT),
    )
}

fn clarification(message: impl Into<String>) -> SpokenResult {
    SpokenResult::new(LoopOutcome::Clarification, Utterance::message(message))
}

fn cancelled(message: impl Into<String>) -> SpokenResult {
    SpokenResult::new(LoopOutcome::Cancelled, Utterance::message(message))
}
