//! Core types for the pre-action gate

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::GateError;

/// Kind of browser action, including the sensitive kinds derived from target text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    Navigate,
    Click,
    Type,
    Submit,
    Scroll,
    Back,
    Forward,
    Delete,
    Purchase,
    Payment,
    AccountChange,
    Logout,
    Unsubscribe,
}

impl ActionKind {
    pub const ALL: [ActionKind; 13] = [
        ActionKind::Navigate,
        ActionKind::Click,
        ActionKind::Type,
        ActionKind::Submit,
        ActionKind::Scroll,
        ActionKind::Back,
        ActionKind::Forward,
        ActionKind::Delete,
        ActionKind::Purchase,
        ActionKind::Payment,
        ActionKind::AccountChange,
        ActionKind::Logout,
        ActionKind::Unsubscribe,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ActionKind::Navigate => "navigate",
            ActionKind::Click => "click",
            ActionKind::Type => "type",
            ActionKind::Submit => "submit",
            ActionKind::Scroll => "scroll",
            ActionKind::Back => "back",
            ActionKind::Forward => "forward",
            ActionKind::Delete => "delete",
            ActionKind::Purchase => "purchase",
            ActionKind::Payment => "payment",
            ActionKind::AccountChange => "account_change",
            ActionKind::Logout => "logout",
            ActionKind::Unsubscribe => "unsubscribe",
        }
    }

    /// Phrase used in spoken confirmation prompts.
    pub fn spoken(&self) -> &'static str {
        match self {
            ActionKind::AccountChange => "account change",
            ActionKind::Logout => "sign out",
            other => other.as_str(),
        }
    }

    /// Kinds only ever produced by target-text classification.
    pub fn is_sensitive(&self) -> bool {
        matches!(
            self,
            ActionKind::Delete
                | ActionKind::Purchase
                | ActionKind::Payment
                | ActionKind::AccountChange
                | ActionKind::Logout
                | ActionKind::Unsubscribe
        )
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActionKind {
    type Err = GateError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_ascii_lowercase().replace(['-', ' '], "_");
        ActionKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == normalized)
            .ok_or_else(|| GateError::UnknownActionKind(value.to_string()))
    }
}

/// Action about to be executed, as seen by the gate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProposedAction {
    pub kind: ActionKind,
    /// Destination for navigations.
    pub url: Option<String>,
    /// Accessible name of the element being acted on, when known.
    pub target_text: Option<String>,
}

impl ProposedAction {
    pub fn navigate(url: impl Into<String>) -> Self {
        Self {
            kind: ActionKind::Navigate,
            url: Some(url.into()),
            target_text: None,
        }
    }

    /// Interaction whose kind is refined from the target text.
    pub fn on_target(base: ActionKind, target_text: Option<&str>) -> Self {
        Self {
            kind: ActionKind::classify(base, target_text),
            url: None,
            target_text: target_text.map(str::to_string),
        }
    }

    /// The action's own kind followed by any other sensitive kind its target text names.
    pub fn kinds(&self) -> Vec<ActionKind> {
        let mut kinds = vec![self.kind];
        for kind in ActionKind::sensitive_matches(self.kind, self.target_text.as_deref()) {
            if !kinds.contains(&kind) {
                kinds.push(kind);
            }
        }
        kinds
    }

    pub fn simple(kind: ActionKind) -> Self {
        Self {
            kind,
            url: None,
            target_text: None,
        }
    }
}

/// Gate decision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "verdict", rename_all = "snake_case")]
pub enum SafetyVerdict {
    Allow,
    RequireConfirmation { reason: String },
    Deny { reason: String },
}

impl SafetyVerdict {
    pub fn is_allow(&self) -> bool {
        matches!(self, SafetyVerdict::Allow)
    }

    pub fn is_deny(&self) -> bool {
        matches!(self, SafetyVerdict::Deny { .. })
    }

    pub fn requires_confirmation(&self) -> bool {
        matches!(self, SafetyVerdict::RequireConfirmation { .. })
    }

    pub fn reason(&self) -> Option<&str> {
        match self {
            SafetyVerdict::Allow => None,
            SafetyVerdict::RequireConfirmation { reason } | SafetyVerdict::Deny { reason } => {
                Some(reason)
            }
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            SafetyVerdict::Allow => "allow",
            SafetyVerdict::RequireConfirmation { .. } => "confirm",
            SafetyVerdict::Deny { .. } => "deny",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_names_round_trip() {
        for kind in ActionKind::ALL {
            assert_eq!(kind.as_str().parse::<ActionKind>().unwrap(), kind);
        }
        assert_eq!(
            "Account-Change".parse::<ActionKind>().unwrap(),
            ActionKind::AccountChange
        );
        assert!(matches!(
            "teleport".parse::<ActionKind>(),
            Err(GateError::UnknownActionKind(_))
        ));
    }

    #[test]
    fn verdict_serializes_with_tag() {
        let verdict = SafetyVerdict::Deny {
            reason: "blocked".into(),
        };
        let json = serde_json::to_value(&verdict).unwrap();
        assert_eq!(json["verdict"], "deny");
        assert_eq!(verdict.reason(), Some("blocked"));
    }
}
