//! Sensitive-action detection from the words on the target element

use once_cell::sync::Lazy;
use regex::Regex;

use crate::types::ActionKind;

/// Most destructive family first.
static SENSITIVE_PATTERNS: Lazy<Vec<(ActionKind, Regex)>> = Lazy::new(|| {
    let families: [(ActionKind, &[&str]); 6] = [
        (ActionKind::Delete, &["delete", "remove", "destroy", "erase"]),
        (
            ActionKind::Payment,
            &["payment", "billing", "credit card", "paypal", "pay now"],
        ),
        (
            ActionKind::Purchase,
            &["buy", "purchase", "order", "checkout", "check out", "pay"],
        ),
        (
            ActionKind::AccountChange,
            &["password", "email", "profile", "settings"],
        ),
        (
            ActionKind::Unsubscribe,
            &["unsubscribe", "opt out", "opt-out"],
        ),
        (ActionKind::Logout, &["logout", "log out", "sign out", "sign-out", "exit"]),
    ];
    families
        .into_iter()
        .filter_map(|(kind, words)| {
            let alternatives = words
                .iter()
                .map(|word| regex::escape(word))
                .collect::<Vec<_>>()
                .join("|");
            Regex::new(&format!(r"(?i)\b(?:{alternatives})\b"))
                .ok()
                .map(|regex| (kind, regex))
        })
        .collect()
});

impl ActionKind {
    /// Refines a click or submit into the most destructive sensitive kind its
    /// target text names.
    ///
    /// Other kinds, and targets without text, pass through unchanged.
    pub fn classify(base: ActionKind, target_text: Option<&str>) -> ActionKind {
        if !matches!(base, ActionKind::Click | ActionKind::Submit) {
            return base;
        }
        ActionKind::sensitive_matches(base, target_text)
            .into_iter()
            .next()
            .unwrap_or(base)
    }

    /// Every sensitive family the target text names, most destructive first.
    ///
    /// Empty for kinds that never act on a control's meaning (typing, scrolling, history).
    pub fn sensitive_matches(base: ActionKind, target_text: Option<&str>) -> Vec<ActionKind> {
        if !matches!(base, ActionKind::Click | ActionKind::Submit) && !base.is_sensitive() {
            return Vec::new();
        }
        let Some(text) = target_text.map(str::trim).filter(|text| !text.is_empty()) else {
            return Vec::new();
        };
        SENSITIVE_PATTERNS
            .iter()
            .filter(|(_, pattern)| pattern.is_match(text))
            .map(|(kind, _)| *kind)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_sensitive_targets() {
        let cases = [
            ("Delete", ActionKind::Delete),
            ("Remove item", ActionKind::Delete),
            ("Buy now", ActionKind::Purchase),
            ("Proceed to checkout", ActionKind::Purchase),
            ("Add payment method", ActionKind::Payment),
            ("Change password", ActionKind::AccountChange),
            ("Sign out", ActionKind::Logout),
            ("Unsubscribe", ActionKind::Unsubscribe),
            ("Opt out", ActionKind::Unsubscribe),
        ];
        for (text, expected) in cases {
            assert_eq!(
                ActionKind::classify(ActionKind::Click, Some(text)),
                expected,
                "{text}"
            );
        }
    }

    #[test]
    fn ordinary_targets_keep_their_kind() {
        assert_eq!(
            ActionKind::classify(ActionKind::Click, Some("Add to cart")),
            ActionKind::Click
        );
        // word boundaries, not substrings
        assert_eq!(
            ActionKind::classify(ActionKind::Click, Some("Paypalooza news")),
            ActionKind::Click
        );
        assert_eq!(
            ActionKind::classify(ActionKind::Submit, None),
            ActionKind::Submit
        );
    }

    #[test]
    fn only_clicks_and_submits_are_refined() {
        assert_eq!(
            ActionKind::classify(ActionKind::Type, Some("Email")),
            ActionKind::Type
        );
        assert_eq!(
            ActionKind::classify(ActionKind::Scroll, Some("Delete")),
            ActionKind::Scroll
        );
    }

    #[test]
    fn destructive_words_win_over_milder_ones() {
        let cases = [
            ("Exit and delete account", ActionKind::Delete),
            ("Unsubscribe and delete my data", ActionKind::Delete),
            ("Sign out and pay now", ActionKind::Payment),
            ("Remove subscription", ActionKind::Delete),
        ];
        for (text, expected) in cases {
            assert_eq!(
                ActionKind::classify(ActionKind::Click, Some(text)),
                expected,
                "{text}"
            );
        }
    }

    #[test]
    fn every_named_family_is_reported() {
        assert_eq!(
            ActionKind::sensitive_matches(ActionKind::Click, Some("Sign out and pay now")),
            vec![ActionKind::Payment, ActionKind::Purchase, ActionKind::Logout]
        );
        assert_eq!(
            ActionKind::sensitive_matches(ActionKind::Logout, Some("Unsubscribe and exit")),
            vec![ActionKind::Unsubscribe, ActionKind::Logout]
        );
        assert!(ActionKind::sensitive_matches(ActionKind::Type, Some("Delete")).is_empty());
        assert!(ActionKind::sensitive_matches(ActionKind::Click, Some("Add to cart")).is_empty());
    }
}
