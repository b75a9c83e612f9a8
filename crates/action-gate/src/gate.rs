//! The gate decision itself

use tracing::debug;
use url::Url;

use crate::rules::{normalize_host, SafetyConfig};
use crate::types::{ActionKind, ProposedAction, SafetyVerdict};

const BLOCKED_SCHEMES: &[&str] = &["javascript:", "data:", "file:", "ftp:", "mailto:"];

/// Parsed navigation destination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Destination {
    pub url: Url,
    pub host: String,
}

/// Parses a spoken or typed address, adding `https://` when no scheme is given.
pub fn parse_destination(raw: &str) -> Result<Destination, String> {
    let trimmed = raw.trim();
    let lowered = trimmed.to_ascii_lowercase();
    if let Some(scheme) = BLOCKED_SCHEMES.iter().find(|scheme| lowered.starts_with(*scheme)) {
        return Err(format!("{} links are not allowed", scheme.trim_end_matches(':')));
    }
    let candidate = if trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("https://{trimmed}")
    };
    let url = Url::parse(&candidate)
        .map_err(|_| format!("I could not understand the address {trimmed}"))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(format!("{} links are not allowed", url.scheme()));
    }
    let host = url
        .host_str()
        .map(normalize_host)
        .filter(|host| !host.is_empty())
        .ok_or_else(|| format!("the address {trimmed} has no site name"))?;
    Ok(Destination { url, host })
}

/// Host of a page URL, normalised the same way allowlist entries are.
pub fn host_of(url: &str) -> Option<String> {
    parse_destination(url).ok().map(|destination| destination.host)
}

/// Decides whether `action` may run. Pure: same inputs, same verdict.
///
/// Deny wins over confirmation, and restricted kinds are never allowed outright.
pub fn decide(
    action: &ProposedAction,
    session_domain: Option<&str>,
    config: &SafetyConfig,
) -> SafetyVerdict {
    let verdict = evaluate(action, session_domain, config);
    debug!(
        target: "gate",
        kind = action.kind.as_str(),
        session_domain = session_domain.unwrap_or(""),
        verdict = verdict.label(),
        "safety gate decided"
    );
    verdict
}

fn evaluate(
    action: &ProposedAction,
    session_domain: Option<&str>,
    config: &SafetyConfig,
) -> SafetyVerdict {
    let mut confirmation: Option<String> = None;

    if action.kind == ActionKind::Navigate {
        let Some(raw) = action.url.as_deref() else {
            return deny("there is no address to go to");
        };
        let destination = match parse_destination(raw) {
            Ok(destination) => destination,
            Err(reason) => return deny(reason),
        };
        if !config.is_host_allowed(&destination.host) {
            return deny(format!(
                "{} is not on the list of allowed sites",
                destination.host
            ));
        }
        if let Some(rule) = config.rule_for(&destination.host) {
            if rule.blocked_actions.contains(&ActionKind::Navigate) {
                return deny(format!("navigation is blocked on {}", destination.host));
            }
            let path = destination.url.path();
            if let Some(prefix) = rule
                .restricted_paths
                .iter()
                .find(|prefix| path.starts_with(prefix.as_str()))
            {
                confirmation = Some(format!(
                    "{prefix} on {} is a restricted area",
                    destination.host
                ));
            }
        }
    }

    let kinds = action.kinds();
    let session_rule = session_domain
        .map(normalize_host)
        .and_then(|host| config.rule_for(&host).map(|rule| (host, rule)));
    if let Some((host, rule)) = &session_rule {
        if let Some(kind) = kinds.iter().find(|kind| rule.blocked_actions.contains(*kind)) {
            return deny(format!("{} actions are blocked on {host}", kind.spoken()));
        }
    }

    if let Some(kind) = kinds.iter().find(|kind| config.restricted.contains(*kind)) {
        return SafetyVerdict::RequireConfirmation {
            reason: restricted_reason(action, *kind),
        };
    }
    if let Some((host, rule)) = &session_rule {
        if let Some(kind) = kinds.iter().find(|kind| rule.confirm_actions.contains(*kind)) {
            return SafetyVerdict::RequireConfirmation {
                reason: format!("{} actions need confirmation on {host}", kind.spoken()),
            };
        }
    }
    match confirmation {
        Some(reason) => SafetyVerdict::RequireConfirmation { reason },
        None => SafetyVerdict::Allow,
    }
}

fn restricted_reason(action: &ProposedAction, kind: ActionKind) -> String {
    match action.target_text.as_deref().filter(|text| !text.trim().is_empty()) {
        Some(text) => format!("\"{}\" is a {} action", text.trim(), kind.spoken()),
        None => format!("this is a {} action", kind.spoken()),
    }
}

fn deny(reason: impl Into<String>) -> SafetyVerdict {
    SafetyVerdict::Deny {
        reason: reason.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::DomainRule;

    fn config() -> SafetyConfig {
        SafetyConfig::new(
            &["google.com", "*.wikipedia.org", "example.com"],
            [
                ActionKind::Delete,
                ActionKind::Purchase,
                ActionKind::Payment,
                ActionKind::AccountChange,
            ],
        )
        .unwrap()
    }

    #[test]
    fn navigation_outside_allowlist_is_denied() {
        let config = SafetyConfig::new(&["google.com"], []).unwrap();
        let verdict = decide(
            &ProposedAction::navigate("https://malicious-site.test"),
            None,
            &config,
        );
        assert!(verdict.is_deny());
        assert!(verdict.reason().unwrap().contains("malicious-site.test"));
    }

    #[test]
    fn allowlisted_navigation_is_allowed() {
        for url in [
            "https://google.com/search?q=rust",
            "www.google.com",
            "HTTPS://WWW.GOOGLE.COM/",
            "en.wikipedia.org/wiki/Rust",
            "http://example.com.",
        ] {
            let verdict = decide(&ProposedAction::navigate(url), None, &config());
            assert_eq!(verdict, SafetyVerdict::Allow, "{url}");
        }
    }

    #[test]
    fn lookalike_hosts_are_not_substring_matches() {
        for url in [
            "https://notgoogle.com",
            "https://google.com.evil.test",
            "https://mail.google.com",
            "https://example.co",
        ] {
            let verdict = decide(&ProposedAction::navigate(url), None, &config());
            assert!(verdict.is_deny(), "{url}");
        }
    }

    #[test]
    fn non_web_schemes_and_garbage_are_denied() {
        for url in [
            "javascript:alert(1)",
            "data:text/html,hi",
            "file:///etc/passwd",
            "ftp://example.com/file",
            "mailto:someone@example.com",
            "http://",
            "https://exa mple.com",
        ] {
            let verdict = decide(&ProposedAction::navigate(url), None, &config());
            assert!(verdict.is_deny(), "{url}");
        }
        let missing = ProposedAction {
            kind: ActionKind::Navigate,
            url: None,
            target_text: None,
        };
        assert!(decide(&missing, None, &config()).is_deny());
    }

    #[test]
    fn restricted_kinds_never_allow() {
        let config = config();
        for kind in ActionKind::ALL {
            for domain in [None, Some("example.com"), Some("unknown.test")] {
                let action = ProposedAction::simple(kind);
                let verdict = decide(&action, domain, &config);
                if config.restricted.contains(&kind) {
                    assert!(!verdict.is_allow(), "{kind} on {domain:?}");
                }
            }
        }
    }

    #[test]
    fn restricted_click_needs_confirmation_with_reason() {
        let action = ProposedAction::on_target(ActionKind::Click, Some("Delete account"));
        let verdict = decide(&action, Some("example.com"), &config());
        assert_eq!(
            verdict,
            SafetyVerdict::RequireConfirmation {
                reason: "\"Delete account\" is a delete action".into()
            }
        );
    }

    #[test]
    fn mixed_targets_confirm_on_the_destructive_part() {
        for (text, kind) in [
            ("Exit and delete account", "delete"),
            ("Unsubscribe and delete my data", "delete"),
            ("Sign out and pay now", "payment"),
        ] {
            let action = ProposedAction::on_target(ActionKind::Click, Some(text));
            let verdict = decide(&action, Some("example.com"), &config());
            assert_eq!(
                verdict,
                SafetyVerdict::RequireConfirmation {
                    reason: format!("\"{text}\" is a {kind} action")
                },
                "{text}"
            );
        }
    }

    #[test]
    fn any_restricted_kind_named_by_the_target_counts() {
        let config = SafetyConfig::new(&["example.com"], [ActionKind::Logout]).unwrap();
        let action = ProposedAction::on_target(ActionKind::Click, Some("Delete and sign out"));
        assert_eq!(action.kind, ActionKind::Delete);
        assert_eq!(
            decide(&action, Some("example.com"), &config),
            SafetyVerdict::RequireConfirmation {
                reason: "\"Delete and sign out\" is a sign out action".into()
            }
        );
    }

    #[test]
    fn ordinary_actions_are_allowed() {
        for kind in [
            ActionKind::Click,
            ActionKind::Type,
            ActionKind::Scroll,
            ActionKind::Back,
            ActionKind::Logout,
        ] {
            let verdict = decide(&ProposedAction::simple(kind), Some("example.com"), &config());
            assert_eq!(verdict, SafetyVerdict::Allow, "{kind}");
        }
    }

    #[test]
    fn domain_rules_add_confirmations_and_blocks() {
        let mut rule = DomainRule::new("example.com");
        rule.confirm_actions.insert(ActionKind::Submit);
        rule.blocked_actions.insert(ActionKind::Unsubscribe);
        rule.restricted_paths.push("/admin".into());
        let config = config().with_rule(rule);

        let submit = decide(
            &ProposedAction::simple(ActionKind::Submit),
            Some("www.example.com"),
            &config,
        );
        assert!(submit.requires_confirmation());

        let unsubscribe = decide(
            &ProposedAction::simple(ActionKind::Unsubscribe),
            Some("example.com"),
            &config,
        );
        assert!(unsubscribe.is_deny());

        let admin = decide(
            &ProposedAction::navigate("https://example.com/admin/users"),
            None,
            &config,
        );
        assert!(admin.requires_confirmation());

        let elsewhere = decide(
            &ProposedAction::simple(ActionKind::Submit),
            Some("google.com"),
            &config,
        );
        assert_eq!(elsewhere, SafetyVerdict::Allow);
    }

    #[test]
    fn decisions_are_deterministic() {
        let action = ProposedAction::navigate("https://en.wikipedia.org/wiki/Ferris");
        let first = decide(&action, Some("google.com"), &config());
        for _ in 0..10 {
            assert_eq!(decide(&action, Some("google.com"), &config()), first);
        }
    }

    #[test]
    fn host_of_normalises() {
        assert_eq!(
            host_of("https://WWW.Example.com/a?b=c").as_deref(),
            Some("example.com")
        );
        assert_eq!(host_of("javascript:void(0)"), None);
    }
}
