use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use action_gate::SafetyConfig;
use action_locator::TargetDescriptor;
use action_primitives::{BrowserDriver, DriverError, IdleStatus, PrimitiveAction};
use agent_core::{
    AgentError, ClassifiedIntent, Intent, IntentClassifier, LoopConfig, LoopController,
    LoopOutcome, LoopState, PendingFollowUp,
};
use async_trait::async_trait;
use lighthouse_core_types::SessionId;
use lighthouse_state_center::AttemptOutcome;
use parking_lot::Mutex;
use perceiver_structural::{AccessibilitySnapshot, SnapshotBuilder};
use pretty_assertions::assert_eq;

const SHOP: &str = "https://example.com/shop";
const DEALS: &str = "https://example.com/deals";
const TRACKER: &str = "https://tracker.evil.test/landing";
const CARDS: &str = "https://example.com/wallet";

/// Serves canned pages; clicking a link follows its scripted transition.
struct MockDriver {
    pages: HashMap<String, AccessibilitySnapshot>,
    links: HashMap<String, String>,
    current: Mutex<String>,
    back_stack: Mutex<Vec<String>>,
    failures: Mutex<VecDeque<DriverError>>,
    log: Mutex<Vec<String>>,
}

impl MockDriver {
    fn new() -> Self {
        let pages = [shop_page(), deals_page(), tracker_page(), cards_page()]
            .into_iter()
            .map(|page| (page.url.clone(), page))
            .collect();
        let links = [("Deals", DEALS), ("Partner offer", TRACKER)]
            .into_iter()
            .map(|(name, url)| (name.to_string(), url.to_string()))
            .collect();
        Self {
            pages,
            links,
            current: Mutex::new(SHOP.to_string()),
            back_stack: Mutex::new(Vec::new()),
            failures: Mutex::new(VecDeque::new()),
            log: Mutex::new(Vec::new()),
        }
    }

    fn starting_at(self, url: &str) -> Self {
        *self.current.lock() = url.to_string();
        self
    }

    fn failing_with(self, failures: Vec<DriverError>) -> Self {
        *self.failures.lock() = failures.into();
        self
    }

    fn log(&self) -> Vec<String> {
        self.log.lock().clone()
    }

    fn current_url(&self) -> String {
        self.current.lock().clone()
    }

    fn go(&self, url: &str) {
        let mut current = self.current.lock();
        self.back_stack.lock().push(current.clone());
        *current = url.to_string();
    }

    fn next_failure(&self) -> Result<(), DriverError> {
        match self.failures.lock().pop_front() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl BrowserDriver for MockDriver {
    async fn get_snapshot(&self) -> Result<AccessibilitySnapshot, DriverError> {
        let url = self.current_url();
        self.pages
            .get(&url)
            .cloned()
            .ok_or_else(|| DriverError::protocol(format!("no page at {url}")))
    }

    async fn dispatch(&self, action: &PrimitiveAction) -> Result<(), DriverError> {
        let entry = match action {
            PrimitiveAction::Click { node, .. } => format!("click {}", node.0),
            other => other.kind_name().to_string(),
        };
        self.log.lock().push(entry);
        self.next_failure()?;

        match action {
            PrimitiveAction::Click { node, .. } => {
                let url = self.current_url();
                let target = self
                    .pages
                    .get(&url)
                    .and_then(|page| page.node(*node))
                    .and_then(|node| self.links.get(&node.name))
                    .cloned();
                if let Some(target) = target {
                    self.go(&target);
                }
            }
            PrimitiveAction::Back => {
                let previous = self.back_stack.lock().pop();
                if let Some(previous) = previous {
                    *self.current.lock() = previous;
                }
            }
            _ => {}
        }
        Ok(())
    }

    async fn navigate(&self, url: &str) -> Result<(), DriverError> {
        self.log.lock().push(format!("navigate {url}"));
        self.next_failure()?;
        self.go(url);
        Ok(())
    }

    async fn wait_idle(&self, _timeout: Duration) -> Result<IdleStatus, DriverError> {
        Ok(IdleStatus::Idle)
    }
}

fn shop_page() -> AccessibilitySnapshot {
    let mut page = SnapshotBuilder::new(SHOP, "Shop");
    let root = page.root();
    let main = page.child(root, "main", "");
    page.child_with(main, |node| {
        node.role = "heading".into();
        node.name = "Shop".into();
        node.level = Some(1);
    });
    let list = page.child(main, "list", "Products");
    for product in ["Red mug", "Blue mug", "Green mug", "Tea pot"] {
        let item = page.child(list, "listitem", product);
        page.child(item, "button", "Add to cart");
    }
    page.child(main, "link", "Deals");
    page.child(main, "link", "Partner offer");
    page.child(main, "button", "Delete account");
    page.build()
}

fn deals_page() -> AccessibilitySnapshot {
    let mut page = SnapshotBuilder::new(DEALS, "Deals");
    let root = page.root();
    let main = page.child(root, "main", "");
    page.child_with(main, |node| {
        node.role = "heading".into();
        node.name = "Deals".into();
        node.level = Some(1);
    });
    page.child(main, "link", "Back to shop");
    page.build()
}

fn tracker_page() -> AccessibilitySnapshot {
    let mut page = SnapshotBuilder::new(TRACKER, "Win a prize");
    let root = page.root();
    page.child(root, "button", "Claim");
    page.build()
}

fn cards_page() -> AccessibilitySnapshot {
    let mut page = SnapshotBuilder::new(CARDS, "Wallet");
    let root = page.root();
    let main = page.child(root, "main", "");
    for card in ["Visa", "Mastercard"] {
        page.child(main, "heading", card);
        page.child(main, "button", "Delete card");
    }
    page.build()
}

fn controller(driver: Arc<MockDriver>) -> LoopController {
    let config = LoopConfig::builtin().expect("defaults are valid");
    LoopController::new(SessionId::from("test-session"), config, driver)
}

fn click(role: &str, name: &str) -> Intent {
    Intent::Click {
        target: TargetDescriptor::new().with_role(role).with_name(name),
    }
}

struct FixedClassifier(ClassifiedIntent);

#[async_trait]
impl IntentClassifier for FixedClassifier {
    async fn classify(&self, _transcript: &str) -> Result<ClassifiedIntent, AgentError> {
        Ok(self.0.clone())
    }
}

#[tokio::test]
async fn navigation_off_the_allowlist_is_denied_without_dispatch() {
    let driver = Arc::new(MockDriver::new());
    let mut config = LoopConfig::builtin().expect("defaults are valid");
    config.safety = SafetyConfig::new(&["google.com"], []).expect("valid allowlist");
    let mut loop_ctl = LoopController::new(SessionId::from("s"), config, driver.clone());

    let result = loop_ctl
        .handle(Intent::Navigate {
            url: "https://malicious-site.test".into(),
        })
        .await;

    assert_eq!(result.status, LoopOutcome::SafetyDenied);
    assert!(result.text().contains("malicious-site.test"));
    assert!(result.report.is_none());
    assert!(driver.log().is_empty());
    assert!(loop_ctl.history().is_empty());
}

#[tokio::test]
async fn sensitive_click_waits_for_confirmation_and_cancel_dispatches_nothing() {
    let driver = Arc::new(MockDriver::new());
    let mut loop_ctl = controller(driver.clone());

    let result = loop_ctl.handle(click("button", "Delete account")).await;
    assert_eq!(result.status, LoopOutcome::ConfirmationRequired);
    assert_eq!(result.state, LoopState::AwaitingConfirmation);
    assert!(result.text().contains("Delete account"));

    let result = loop_ctl.handle(Intent::Cancel).await;
    assert_eq!(result.status, LoopOutcome::Cancelled);
    assert_eq!(result.state, LoopState::Idle);
    assert!(driver.log().is_empty());
}

#[tokio::test]
async fn confirm_runs_the_stored_plan() {
    let driver = Arc::new(MockDriver::new());
    let mut loop_ctl = controller(driver.clone());

    loop_ctl.handle(click("button", "Delete account")).await;

    // an unrelated intent keeps the question open
    let result = loop_ctl.handle(Intent::WhatChanged).await;
    assert_eq!(result.status, LoopOutcome::Clarification);
    assert_eq!(result.state, LoopState::AwaitingConfirmation);

    let result = loop_ctl.handle(Intent::Confirm).await;
    assert_eq!(result.status, LoopOutcome::Completed);
    assert_eq!(result.state, LoopState::Idle);
    assert_eq!(driver.log().len(), 1);
    assert!(driver.log()[0].starts_with("click "));
    assert!(result.text().starts_with("Pressed button Delete account"));
}

#[tokio::test]
async fn duplicate_targets_are_listed_and_the_choice_is_dispatched() {
    let driver = Arc::new(MockDriver::new());
    let mut loop_ctl = controller(driver.clone());

    let result = loop_ctl.handle(click("button", "Add to cart")).await;
    assert_eq!(result.status, LoopOutcome::AmbiguousTarget);
    assert_eq!(result.state, LoopState::AwaitingDisambiguation);
    assert!(result.text().contains("I found 4 matches"));

    let candidates = match &loop_ctl.session().pending {
        Some(PendingFollowUp::Disambiguation { candidates, .. }) => candidates.clone(),
        other => panic!("expected a disambiguation, got {other:?}"),
    };
    assert_eq!(candidates.len(), 4);
    let labels: HashSet<&str> = candidates.iter().map(|c| c.label.as_str()).collect();
    assert_eq!(labels.len(), 4);

    let result = loop_ctl.handle(Intent::SelectOrdinal { index: 3 }).await;
    assert_eq!(result.status, LoopOutcome::Completed);
    assert_eq!(driver.log(), vec![format!("click {}", candidates[2].node.id.0)]);
}

#[tokio::test]
async fn out_of_range_choice_keeps_the_listing() {
    let driver = Arc::new(MockDriver::new());
    let mut loop_ctl = controller(driver.clone());

    loop_ctl.handle(click("button", "Add to cart")).await;
    let result = loop_ctl.handle(Intent::SelectOrdinal { index: 9 }).await;

    assert_eq!(result.status, LoopOutcome::Clarification);
    assert_eq!(result.state, LoopState::AwaitingDisambiguation);
    assert!(result.text().contains("from 1 to 4"));
    assert!(driver.log().is_empty());

    let result = loop_ctl.handle(Intent::SelectOrdinal { index: 1 }).await;
    assert_eq!(result.status, LoopOutcome::Completed);
}

#[tokio::test]
async fn describe_and_list_drop_the_listing_and_run() {
    let driver = Arc::new(MockDriver::new());
    let mut loop_ctl = controller(driver.clone());

    for intent in [
        Intent::Describe,
        Intent::ListElements {
            role: Some("links".into()),
        },
    ] {
        let result = loop_ctl.handle(click("button", "Add to cart")).await;
        assert_eq!(result.state, LoopState::AwaitingDisambiguation);

        let result = loop_ctl.handle(intent).await;
        assert_eq!(result.status, LoopOutcome::Completed);
        assert_eq!(result.state, LoopState::Idle);
        assert!(loop_ctl.session().pending.is_none());
    }

    // the numbers no longer refer to anything
    let result = loop_ctl.handle(Intent::SelectOrdinal { index: 1 }).await;
    assert_eq!(result.status, LoopOutcome::Clarification);
    assert!(driver.log().is_empty());
}

#[tokio::test]
async fn cancel_or_stop_drops_the_listing() {
    let driver = Arc::new(MockDriver::new());
    let mut loop_ctl = controller(driver.clone());

    for intent in [Intent::Cancel, Intent::Stop] {
        loop_ctl.handle(click("button", "Add to cart")).await;
        let result = loop_ctl.handle(intent).await;
        assert_eq!(result.status, LoopOutcome::Cancelled);
        assert_eq!(result.state, LoopState::Idle);
        assert!(loop_ctl.session().pending.is_none());
    }
    assert!(driver.log().is_empty());
}

#[tokio::test]
async fn unrelated_intent_keeps_the_listing() {
    let driver = Arc::new(MockDriver::new());
    let mut loop_ctl = controller(driver.clone());

    loop_ctl.handle(click("button", "Add to cart")).await;
    let result = loop_ctl
        .handle(Intent::Navigate {
            url: "https://example.com/deals".into(),
        })
        .await;

    assert_eq!(result.status, LoopOutcome::Clarification);
    assert_eq!(result.state, LoopState::AwaitingDisambiguation);
    assert!(result.text().contains("from 1 to 4"), "{}", result.text());
    assert!(driver.log().is_empty());
    assert_eq!(driver.current_url(), SHOP);

    let result = loop_ctl.handle(Intent::SelectOrdinal { index: 2 }).await;
    assert_eq!(result.status, LoopOutcome::Completed);
    assert_eq!(driver.log().len(), 1);
}

#[tokio::test]
async fn choosing_a_sensitive_candidate_asks_first() {
    let driver = Arc::new(MockDriver::new().starting_at(CARDS));
    let mut loop_ctl = controller(driver.clone());

    let result = loop_ctl.handle(click("button", "Delete card")).await;
    assert_eq!(result.status, LoopOutcome::AmbiguousTarget);

    let result = loop_ctl.handle(Intent::SelectOrdinal { index: 1 }).await;
    assert_eq!(result.status, LoopOutcome::ConfirmationRequired);
    assert_eq!(result.state, LoopState::AwaitingConfirmation);
    assert!(driver.log().is_empty());

    let result = loop_ctl.handle(Intent::Confirm).await;
    assert_eq!(result.status, LoopOutcome::Completed);
    assert_eq!(driver.log().len(), 1);
}

#[tokio::test]
async fn missing_target_is_reported() {
    let driver = Arc::new(MockDriver::new());
    let mut loop_ctl = controller(driver.clone());

    let result = loop_ctl.handle(click("button", "Checkout now please")).await;
    assert_eq!(result.status, LoopOutcome::NoMatchFound);
    assert_eq!(result.state, LoopState::Idle);
    assert!(driver.log().is_empty());
}

#[tokio::test(start_paused = true)]
async fn transient_failures_within_budget_complete() {
    let driver = Arc::new(MockDriver::new().failing_with(vec![
        DriverError::stale_element("node detached"),
        DriverError::timeout("dispatch timed out"),
    ]));
    let mut loop_ctl = controller(driver.clone());
    assert_eq!(loop_ctl.config().executor.max_retries, 2);

    let result = loop_ctl.handle(click("link", "Deals")).await;

    assert_eq!(result.status, LoopOutcome::Completed);
    let report = result.report.as_ref().expect("executor ran");
    assert_eq!(report.attempts, 3);
    assert_eq!(report.retries(), 2);

    let entries = loop_ctl.history().entries();
    assert_eq!(entries.len(), 3);
    assert_eq!(entries[0].outcome, AttemptOutcome::TransientFailure);
    assert_eq!(entries[1].outcome, AttemptOutcome::TransientFailure);
    assert_eq!(entries[2].outcome, AttemptOutcome::Success);
    assert_eq!(loop_ctl.session().retries.get("click"), 2);
    assert_eq!(driver.current_url(), DEALS);
}

#[tokio::test(start_paused = true)]
async fn exhausted_budget_is_a_transient_failure() {
    let driver = Arc::new(MockDriver::new().failing_with(vec![
        DriverError::stale_element("one"),
        DriverError::stale_element("two"),
        DriverError::stale_element("three"),
    ]));
    let mut loop_ctl = controller(driver.clone());

    let result = loop_ctl.handle(click("link", "Deals")).await;

    assert_eq!(result.status, LoopOutcome::TransientDriverFailure);
    assert_eq!(result.state, LoopState::Idle);
    assert_eq!(driver.log().len(), 3);
    assert_eq!(loop_ctl.history().len(), 3);
}

#[tokio::test]
async fn redirect_to_a_disallowed_host_goes_back() {
    let driver = Arc::new(MockDriver::new());
    let mut loop_ctl = controller(driver.clone());

    let result = loop_ctl.handle(click("link", "Partner offer")).await;

    assert_eq!(result.status, LoopOutcome::FatalDriverFailure);
    assert!(result.text().contains("tracker.evil.test"));
    assert_eq!(driver.current_url(), SHOP);
    assert_eq!(driver.log().last().map(String::as_str), Some("back"));

    let entries = loop_ctl.history().entries();
    let last = entries.last().expect("history recorded");
    assert_eq!(last.outcome, AttemptOutcome::FatalFailure);
    assert!(last.detail.as_deref().unwrap_or_default().contains("tracker.evil.test"));
}

#[tokio::test]
async fn what_changed_replays_the_last_diff() {
    let driver = Arc::new(MockDriver::new());
    let mut loop_ctl = controller(driver.clone());

    let result = loop_ctl.handle(Intent::WhatChanged).await;
    assert_eq!(result.text(), "Nothing has happened yet.");

    let result = loop_ctl.handle(click("link", "Deals")).await;
    assert_eq!(result.status, LoopOutcome::Completed);
    assert!(result.text().contains("Page: Deals"));

    let result = loop_ctl.handle(Intent::WhatChanged).await;
    assert_eq!(result.status, LoopOutcome::Completed);
    let text = result.text();
    assert!(text.starts_with("Here is what changed"));
    assert!(text.contains("Deals"));
}

#[tokio::test]
async fn describe_reads_heading_and_controls() {
    let driver = Arc::new(MockDriver::new());
    let mut loop_ctl = controller(driver);

    let result = loop_ctl.handle(Intent::Describe).await;

    assert_eq!(result.status, LoopOutcome::Completed);
    let text = result.text();
    assert!(text.starts_with("Main heading: Shop"), "{text}");
    assert!(text.contains("You can use:"), "{text}");
    assert!(text.contains("Page: Shop"), "{text}");
}

#[tokio::test]
async fn list_links_numbers_them() {
    let driver = Arc::new(MockDriver::new());
    let mut loop_ctl = controller(driver);

    let result = loop_ctl
        .handle(Intent::ListElements {
            role: Some("links".into()),
        })
        .await;

    assert_eq!(result.status, LoopOutcome::Completed);
    let text = result.text();
    assert!(text.starts_with("2 links: 1, "), "{text}");
    assert!(text.contains("Partner offer"), "{text}");
}

#[tokio::test]
async fn low_confidence_transcript_gets_help() {
    let driver = Arc::new(MockDriver::new());
    let classifier = Arc::new(FixedClassifier(ClassifiedIntent::new(
        click("button", "Add to cart"),
        0.3,
    )));
    let mut loop_ctl = controller(driver.clone()).with_classifier(classifier);

    let result = loop_ctl.handle_transcript("ad two cart maybe").await;

    assert_eq!(result.status, LoopOutcome::Help);
    assert_eq!(result.state, LoopState::Idle);
    assert!(result.text().contains("didn't catch"));
    assert!(driver.log().is_empty());
}

#[tokio::test]
async fn stop_while_idle_is_harmless() {
    let driver = Arc::new(MockDriver::new());
    let mut loop_ctl = controller(driver);

    let result = loop_ctl.cancel();
    assert_eq!(result.status, LoopOutcome::Cancelled);
    assert!(!loop_ctl.cancellation_token().is_cancelled());

    let result = loop_ctl.handle(Intent::Describe).await;
    assert_eq!(result.status, LoopOutcome::Completed);
}

