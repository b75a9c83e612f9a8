//! Core types for locator system

use perceiver_structural::AxNode;
use serde::{Deserialize, Serialize};

/// Matching rule, tried in fallback order until one produces matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LocatorStrategy {
    /// Role and accessible name equal (case and whitespace insensitive)
    ExactRoleName,

    /// Role equal, name contained in name, text or aria-label
    RoleSubstring,

    /// Token overlap between the request and the element's words
    FuzzyText,
}

impl LocatorStrategy {
    /// Get strategy name as string
    pub fn name(&self) -> &'static str {
        match self {
            LocatorStrategy::ExactRoleName => "exact",
            LocatorStrategy::RoleSubstring => "role-substring",
            LocatorStrategy::FuzzyText => "fuzzy",
        }
    }

    /// Get all strategies in fallback order
    pub fn fallback_chain() -> Vec<LocatorStrategy> {
        vec![
            LocatorStrategy::ExactRoleName,
            LocatorStrategy::RoleSubstring,
            LocatorStrategy::FuzzyText,
        ]
    }
}

/// What the user asked for, e.g. "the second Add to cart button".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetDescriptor {
    pub role: Option<String>,
    pub name: Option<String>,
    /// 1-based position among the matches.
    pub ordinal: Option<usize>,
    /// Free text used to narrow ties ("in the sidebar", "under Deals").
    pub hint: Option<String>,
}

impl TargetDescriptor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.role = Some(role.into());
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_ordinal(mut self, ordinal: usize) -> Self {
        self.ordinal = Some(ordinal);
        self
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    pub(crate) fn role_text(&self) -> Option<&str> {
        non_blank(self.role.as_deref())
    }

    pub(crate) fn name_text(&self) -> Option<&str> {
        non_blank(self.name.as_deref())
    }

    pub(crate) fn hint_text(&self) -> Option<&str> {
        non_blank(self.hint.as_deref())
    }

    /// Nothing to match on.
    pub fn is_empty(&self) -> bool {
        self.role_text().is_none() && self.name_text().is_none() && self.hint_text().is_none()
    }

    /// Short description used in "I couldn't find ..." responses.
    pub fn describe(&self) -> String {
        match (self.name_text(), self.role_text()) {
            (Some(name), Some(role)) => format!("{name} {role}"),
            (Some(name), None) => name.to_string(),
            (None, Some(role)) => role.to_string(),
            (None, None) => self.hint_text().unwrap_or("that").to_string(),
        }
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}

/// Element candidate for locator resolution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    /// Matched node from the snapshot the resolver ran on
    pub node: AxNode,

    /// Spoken label, unique within one result list
    pub label: String,

    /// Strategy that produced this candidate
    pub strategy: LocatorStrategy,

    /// Match score (0.0-1.0)
    pub score: f64,

    /// Additional metadata about the match
    pub metadata: CandidateMetadata,
}

impl Candidate {
    /// Check if this is a high-confidence match (>= 0.8)
    pub fn is_high_confidence(&self) -> bool {
        self.score >= 0.8
    }
}

/// Candidate metadata
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CandidateMetadata {
    /// Position in document order
    pub dom_index: usize,

    /// Nearest preceding heading
    pub heading: Option<String>,

    /// Enclosing landmark, as spoken
    pub landmark: Option<String>,
}

/// Outcome of one resolution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "result", content = "candidates", rename_all = "snake_case")]
pub enum ResolveResult {
    None,
    One(Candidate),
    Many(Vec<Candidate>),
}

impl ResolveResult {
    pub fn len(&self) -> usize {
        match self {
            ResolveResult::None => 0,
            ResolveResult::One(_) => 1,
            ResolveResult::Many(candidates) => candidates.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, ResolveResult::None)
    }
}

/// Resolver tuning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolveOptions {
    /// Upper bound on a Many list; spoken ordinals stop at nine.
    pub max_candidates: usize,
}

impl Default for ResolveOptions {
    fn default() -> Self {
        Self { max_candidates: 9 }
    }
}
