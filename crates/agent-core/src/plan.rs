//! Executable plans and their wire schema.

use action_gate::{ActionKind, ProposedAction, SafetyVerdict};
use action_locator::TargetDescriptor;
use action_primitives::{ExecutorConfig, PrimitiveAction};
use lighthouse_core_types::ActionId;
use perceiver_structural::{AxNode, NodeSummary};
use serde::{Deserialize, Serialize};

/// Retry settings carried with a plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetrySpec {
    pub max: u32,
    pub backoff_ms: u64,
}

impl From<&ExecutorConfig> for RetrySpec {
    fn from(config: &ExecutorConfig) -> Self {
        Self {
            max: config.max_retries,
            backoff_ms: config.backoff.as_millis() as u64,
        }
    }
}

/// One intent turned into a browser step, with the gate's verdict attached.
///
/// Lives for one `handle()` call, or while the session waits for a confirmation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionPlan {
    pub action_id: ActionId,
    pub intent: String,
    pub kind: ActionKind,
    pub primitive: PrimitiveAction,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub descriptor: Option<TargetDescriptor>,
    /// Element the step acts on, once resolved.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<NodeSummary>,
    /// Accessible name fed to the gate's keyword classification.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_text: Option<String>,
    pub verdict: SafetyVerdict,
    pub retry: RetrySpec,
}

impl ActionPlan {
    /// Plan for a step without an element target (navigate, scroll, history moves).
    pub fn untargeted(
        intent: &str,
        kind: ActionKind,
        primitive: PrimitiveAction,
        retry: RetrySpec,
    ) -> Self {
        Self {
            action_id: ActionId::new(),
            intent: intent.to_string(),
            kind,
            primitive,
            descriptor: None,
            target: None,
            target_text: None,
            verdict: SafetyVerdict::Allow,
            retry,
        }
    }

    /// Plan acting on a resolved element; the kind is refined from the element's name.
    pub fn targeted(
        intent: &str,
        base: ActionKind,
        primitive: PrimitiveAction,
        descriptor: Option<TargetDescriptor>,
        node: &AxNode,
        retry: RetrySpec,
    ) -> Self {
        let name = node.display_name();
        let target_text = (!name.is_empty()).then_some(name);
        Self {
            action_id: ActionId::new(),
            intent: intent.to_string(),
            kind: ActionKind::classify(base, target_text.as_deref()),
            primitive,
            descriptor,
            target: Some(node.summary()),
            target_text,
            verdict: SafetyVerdict::Allow,
            retry,
        }
    }

    pub fn with_verdict(mut self, verdict: SafetyVerdict) -> Self {
        self.verdict = verdict;
        self
    }

    /// What the gate sees.
    pub fn proposed(&self) -> ProposedAction {
        let url = match &self.primitive {
            PrimitiveAction::Navigate { url } => Some(url.clone()),
            _ => None,
        };
        ProposedAction {
            kind: self.kind,
            url,
            target_text: self.target_text.clone(),
        }
    }

    /// Spoken description, e.g. "press button Delete account".
    pub fn describe(&self) -> String {
        match (&self.primitive, &self.target) {
            (PrimitiveAction::Navigate { url }, _) => format!("go to {}", spoken_url(url)),
            (PrimitiveAction::Click { .. }, Some(target)) => format!("press {target}"),
            (PrimitiveAction::Type { .. }, Some(target)) => format!("type into {target}"),
            (PrimitiveAction::Type { .. }, None) => "type into the focused field".to_string(),
            (PrimitiveAction::Submit { .. }, Some(target)) => format!("submit {target}"),
            (PrimitiveAction::Submit { .. }, None) => "submit the form".to_string(),
            (PrimitiveAction::Scroll { direction }, _) => format!("scroll {}", direction.as_str()),
            (PrimitiveAction::Back, _) => "go back".to_string(),
            (PrimitiveAction::Forward, _) => "go forward".to_string(),
            (PrimitiveAction::Click { label, .. }, None) => format!("press {label}"),
        }
    }

    pub fn to_schema(&self) -> ActionSchema {
        let descriptor = self.descriptor.clone().unwrap_or_default();
        let mut by = Vec::new();
        if descriptor.role.is_some() {
            by.push("role".to_string());
        }
        if descriptor.name.is_some() {
            by.push("name".to_string());
        }
        if descriptor.hint.is_some() {
            by.push("text".to_string());
        }
        if descriptor.ordinal.is_some() {
            by.push("ordinal".to_string());
        }
        ActionSchema {
            intent: self.intent.clone(),
            target: TargetSchema {
                by,
                role: descriptor.role,
                name: descriptor.name,
                ordinal: descriptor.ordinal,
            },
            safety: SafetySchema {
                confirmation_required: self.verdict.requires_confirmation(),
            },
            retry: self.retry,
        }
    }
}

/// Host and path, without scheme or query.
fn spoken_url(url: &str) -> String {
    let trimmed = url
        .trim()
        .trim_start_matches("https://")
        .trim_start_matches("http://");
    let without_query = trimmed.split(['?', '#']).next().unwrap_or(trimmed);
    without_query.trim_end_matches('/').to_string()
}

/// Fixed wire form of a plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionSchema {
    pub intent: String,
    pub target: TargetSchema,
    pub safety: SafetySchema,
    pub retry: RetrySpec,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetSchema {
    pub by: Vec<String>,
    pub role: Option<String>,
    pub name: Option<String>,
    pub ordinal: Option<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SafetySchema {
    pub confirmation_required: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use perceiver_structural::NodeId;
    use pretty_assertions::assert_eq;

    fn retry() -> RetrySpec {
        RetrySpec {
            max: 2,
            backoff_ms: 500,
        }
    }

    #[test]
    fn schema_lists_the_fields_used() {
        let node = AxNode::new(NodeId(3), "button", "Add to cart");
        let descriptor = TargetDescriptor::new()
            .with_role("button")
            .with_name("Add to cart")
            .with_ordinal(2);
        let plan = ActionPlan::targeted(
            "click",
            ActionKind::Click,
            PrimitiveAction::Click {
                node: node.id,
                label: "button Add to cart".into(),
            },
            Some(descriptor),
            &node,
            retry(),
        );

        let value = serde_json::to_value(plan.to_schema()).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "intent": "click",
                "target": {"by": ["role", "name", "ordinal"], "role": "button", "name": "Add to cart", "ordinal": 2},
                "safety": {"confirmation_required": false},
                "retry": {"max": 2, "backoff_ms": 500}
            })
        );
    }

    #[test]
    fn kind_is_refined_from_the_element_name() {
        let node = AxNode::new(NodeId(1), "button", "Delete account");
        let plan = ActionPlan::targeted(
            "click",
            ActionKind::Click,
            PrimitiveAction::Click {
                node: node.id,
                label: "button Delete account".into(),
            },
            None,
            &node,
            retry(),
        )
        .with_verdict(SafetyVerdict::RequireConfirmation {
            reason: "delete needs confirmation".into(),
        });

        assert_eq!(plan.kind, ActionKind::Delete);
        assert_eq!(plan.proposed().target_text.as_deref(), Some("Delete account"));
        assert!(plan.to_schema().safety.confirmation_required);
        assert_eq!(plan.describe(), "press button Delete account");
    }

    #[test]
    fn navigation_description_drops_scheme_and_query() {
        let plan = ActionPlan::untargeted(
            "navigate",
            ActionKind::Navigate,
            PrimitiveAction::Navigate {
                url: "https://github.com/search?q=rust".into(),
            },
            retry(),
        );
        assert_eq!(plan.describe(), "go to github.com/search");
        assert_eq!(
            plan.proposed().url.as_deref(),
            Some("https://github.com/search?q=rust")
        );
        assert!(plan.to_schema().target.by.is_empty());
    }
}
