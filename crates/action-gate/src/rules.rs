//! Allowlist and per-domain rule model

use std::collections::BTreeSet;

use lighthouse_policy_center::{DomainRulePolicy, SafetyPolicy};
use serde::{Deserialize, Serialize};

use crate::errors::GateError;
use crate::types::ActionKind;

/// One allowlisted host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllowEntry {
    pub host: String,
    /// Set by a leading `*.`; the bare host stays allowed too.
    pub include_subdomains: bool,
}

impl AllowEntry {
    pub fn parse(raw: &str) -> Result<Self, GateError> {
        let trimmed = raw.trim().to_ascii_lowercase();
        let (host, include_subdomains) = match trimmed.strip_prefix("*.") {
            Some(rest) => (rest.to_string(), true),
            None => (trimmed, false),
        };
        let host = normalize_host(&host);
        if host.is_empty() || host.contains(['/', ':', '*', ' ']) {
            return Err(GateError::InvalidRule(format!(
                "allowlist entry '{raw}' is not a host name"
            )));
        }
        Ok(Self {
            host,
            include_subdomains,
        })
    }

    pub fn matches(&self, host: &str) -> bool {
        host == self.host
            || (self.include_subdomains
                && host
                    .strip_suffix(self.host.as_str())
                    .is_some_and(|prefix| prefix.ends_with('.')))
    }
}

/// Extra rules for one site.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainRule {
    pub domain: String,
    /// Subdomain labels admitted in addition to the bare domain, e.g. `mail`.
    pub allowed_subdomains: Vec<String>,
    /// Path prefixes whose navigation needs confirmation.
    pub restricted_paths: Vec<String>,
    pub blocked_actions: BTreeSet<ActionKind>,
    pub confirm_actions: BTreeSet<ActionKind>,
}

impl DomainRule {
    pub fn new(domain: &str) -> Self {
        Self {
            domain: normalize_host(domain),
            ..Self::default()
        }
    }

    /// True for the domain itself or any host beneath it.
    pub fn covers(&self, host: &str) -> bool {
        host == self.domain
            || host
                .strip_suffix(self.domain.as_str())
                .is_some_and(|prefix| prefix.ends_with('.'))
    }

    fn admits_subdomain(&self, host: &str) -> bool {
        let Some(prefix) = host
            .strip_suffix(self.domain.as_str())
            .and_then(|prefix| prefix.strip_suffix('.'))
        else {
            return false;
        };
        self.allowed_subdomains
            .iter()
            .any(|label| label == "*" || label.eq_ignore_ascii_case(prefix))
    }
}

impl TryFrom<&DomainRulePolicy> for DomainRule {
    type Error = GateError;

    fn try_from(policy: &DomainRulePolicy) -> Result<Self, Self::Error> {
        let domain = normalize_host(&policy.domain);
        if domain.is_empty() {
            return Err(GateError::InvalidRule("domain rule without a domain".into()));
        }
        Ok(Self {
            domain,
            allowed_subdomains: policy
                .allowed_subdomains
                .iter()
                .map(|label| label.trim().to_ascii_lowercase())
                .collect(),
            restricted_paths: policy.restricted_paths.clone(),
            blocked_actions: parse_kinds(&policy.blocked_actions)?,
            confirm_actions: parse_kinds(&policy.confirm_actions)?,
        })
    }
}

fn parse_kinds(raw: &[String]) -> Result<BTreeSet<ActionKind>, GateError> {
    raw.iter().map(|kind| kind.parse()).collect()
}

/// Everything the gate consults. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SafetyConfig {
    pub allowlist: Vec<AllowEntry>,
    pub restricted: BTreeSet<ActionKind>,
    pub domain_rules: Vec<DomainRule>,
}

impl SafetyConfig {
    pub fn new(
        allowed: &[&str],
        restricted: impl IntoIterator<Item = ActionKind>,
    ) -> Result<Self, GateError> {
        Ok(Self {
            allowlist: allowed
                .iter()
                .map(|entry| AllowEntry::parse(entry))
                .collect::<Result<_, _>>()?,
            restricted: restricted.into_iter().collect(),
            domain_rules: Vec::new(),
        })
    }

    pub fn with_rule(mut self, rule: DomainRule) -> Self {
        self.domain_rules.push(rule);
        self
    }

    /// Most specific rule covering `host`.
    pub fn rule_for(&self, host: &str) -> Option<&DomainRule> {
        self.domain_rules
            .iter()
            .filter(|rule| rule.covers(host))
            .max_by_key(|rule| rule.domain.len())
    }

    pub fn is_host_allowed(&self, host: &str) -> bool {
        if self.allowlist.iter().any(|entry| entry.matches(host)) {
            return true;
        }
        self.domain_rules.iter().any(|rule| {
            rule.admits_subdomain(host)
                && self.allowlist.iter().any(|entry| entry.matches(&rule.domain))
        })
    }
}

impl TryFrom<&SafetyPolicy> for SafetyConfig {
    type Error = GateError;

    fn try_from(policy: &SafetyPolicy) -> Result<Self, Self::Error> {
        Ok(Self {
            allowlist: policy
                .allowed_domains
                .iter()
                .map(|entry| AllowEntry::parse(entry))
                .collect::<Result<_, _>>()?,
            restricted: parse_kinds(&policy.restricted_actions)?,
            domain_rules: policy
                .domain_rules
                .iter()
                .map(DomainRule::try_from)
                .collect::<Result<_, _>>()?,
        })
    }
}

/// Lowercases, drops a trailing dot and a leading `www.`.
pub fn normalize_host(host: &str) -> String {
    let lowered = host.trim().trim_end_matches('.').to_ascii_lowercase();
    match lowered.strip_prefix("www.") {
        Some(rest) => rest.to_string(),
        None => lowered,
    }
}
