//! Element matching strategies
//!
//! Three strategies in fallback order:
//! 1. Exact - role and accessible name equal
//! 2. Role substring - role equal, name contained in the element's words
//! 3. Fuzzy - token overlap over name, inner text and aria-label

use perceiver_structural::model::normalize_text;
use perceiver_structural::{AccessibilitySnapshot, AxNode};

use crate::types::{LocatorStrategy, TargetDescriptor};

/// Roles that carry text but are never a target on their own.
const STRUCTURAL_TEXT_ROLES: &[&str] = &[
    "statictext",
    "generic",
    "none",
    "presentation",
    "inlinetextbox",
    "linebreak",
    "rootwebarea",
    "webarea",
];

const TEXT_INPUT_ROLES: &[&str] = &["textbox", "searchbox", "combobox"];

const STOPWORDS: &[&str] = &["the", "a", "an", "on", "in", "of", "to", "for", "and", "my"];

const FUZZY_THRESHOLD: f64 = 0.5;

/// One strategy hit before labelling.
#[derive(Debug, Clone, Copy)]
pub struct Match<'a> {
    pub node: &'a AxNode,
    pub score: f64,
}

/// Strategy trait for element matching
pub trait Strategy {
    /// Collect matches from the targetable pool, in document order
    fn collect<'a>(
        &self,
        descriptor: &TargetDescriptor,
        snapshot: &'a AccessibilitySnapshot,
        pool: &[&'a AxNode],
    ) -> Vec<Match<'a>>;

    /// Get strategy type
    fn strategy_type(&self) -> LocatorStrategy;

    /// Get strategy name
    fn name(&self) -> &'static str {
        self.strategy_type().name()
    }
}

pub fn strategy_for(kind: LocatorStrategy) -> Box<dyn Strategy> {
    match kind {
        LocatorStrategy::ExactRoleName => Box::new(ExactStrategy),
        LocatorStrategy::RoleSubstring => Box::new(RoleSubstringStrategy),
        LocatorStrategy::FuzzyText => Box::new(FuzzyStrategy),
    }
}

/// Perceivable nodes that can be acted on, in document order.
pub fn targetable_pool(snapshot: &AccessibilitySnapshot) -> Vec<&AxNode> {
    snapshot
        .perceivable()
        .filter(|node| {
            let role = node.role.to_ascii_lowercase();
            !STRUCTURAL_TEXT_ROLES.contains(&role.as_str())
        })
        .collect()
}

/// Maps spoken role words onto ARIA roles.
pub fn canonical_role(role: &str) -> String {
    let lowered = normalize_text(&role.to_lowercase());
    let canonical = match lowered.as_str() {
        "text field" | "field" | "input" | "text box" | "box" | "edit" => "textbox",
        "search box" | "search field" | "search" => "searchbox",
        "image" | "picture" | "photo" => "img",
        "check box" | "tick box" => "checkbox",
        "radio button" | "option button" => "radio",
        "dropdown" | "drop down" | "select" | "combo box" => "combobox",
        "menu item" => "menuitem",
        "tab item" => "tab",
        "toggle" => "switch",
        "title" => "heading",
        "hyperlink" => "link",
        other => other,
    };
    canonical.to_string()
}

/// Role equality with the text-input family treated as one role.
pub fn role_matches(wanted: &str, node: &AxNode) -> bool {
    let wanted = canonical_role(wanted);
    let actual = node.role.to_ascii_lowercase();
    if wanted == actual {
        return true;
    }
    if wanted == "img" && actual == "image" {
        return true;
    }
    TEXT_INPUT_ROLES.contains(&wanted.as_str()) && TEXT_INPUT_ROLES.contains(&actual.as_str())
}

fn folded(text: &str) -> String {
    normalize_text(text).to_lowercase()
}

/// Name, inner text and aria-label; the words a user would read aloud.
fn surface_texts(node: &AxNode) -> impl Iterator<Item = String> + '_ {
    [
        Some(node.name.as_str()),
        node.text.as_deref(),
        node.aria_label.as_deref(),
    ]
    .into_iter()
    .flatten()
    .map(folded)
    .filter(|text| !text.is_empty())
}

/// Lowercase word tokens without stopwords; trailing plural `s` folded.
pub fn tokens(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|token| !token.is_empty() && !STOPWORDS.contains(token))
        .map(|token| {
            if token.len() > 3 && token.ends_with('s') && !token.ends_with("ss") {
                token[..token.len() - 1].to_string()
            } else {
                token.to_string()
            }
        })
        .collect()
}

/// Share of `query` tokens present in `haystack`.
pub fn overlap(query: &[String], haystack: &[String]) -> f64 {
    if query.is_empty() {
        return 0.0;
    }
    let hits = query
        .iter()
        .filter(|token| haystack.contains(token))
        .count();
    hits as f64 / query.len() as f64
}

/// Exact role + name
pub struct ExactStrategy;

impl Strategy for ExactStrategy {
    fn collect<'a>(
        &self,
        descriptor: &TargetDescriptor,
        _snapshot: &'a AccessibilitySnapshot,
        pool: &[&'a AxNode],
    ) -> Vec<Match<'a>> {
        let Some(name) = descriptor.name_text().map(folded) else {
            return Vec::new();
        };
        let matches: Vec<Match<'a>> = pool
            .iter()
            .copied()
            .filter(|node| {
                descriptor
                    .role_text()
                    .map(|role| role_matches(role, node))
                    .unwrap_or(true)
            })
            .filter(|node| folded(&node.name) == name)
            .map(|node| Match { node, score: 1.0 })
            .collect();

        // Without a role, "Sign in" means the control rather than the heading.
        if descriptor.role_text().is_none() && matches.iter().any(|m| m.node.is_interactive()) {
            return matches
                .into_iter()
                .filter(|m| m.node.is_interactive())
                .collect();
        }
        matches
    }

    fn strategy_type(&self) -> LocatorStrategy {
        LocatorStrategy::ExactRoleName
    }
}

/// Role + substring; role alone when no name was given
pub struct RoleSubstringStrategy;

impl Strategy for RoleSubstringStrategy {
    fn collect<'a>(
        &self,
        descriptor: &TargetDescriptor,
        _snapshot: &'a AccessibilitySnapshot,
        pool: &[&'a AxNode],
    ) -> Vec<Match<'a>> {
        let Some(role) = descriptor.role_text() else {
            return Vec::new();
        };
        let name = descriptor.name_text().map(folded);
        pool.iter()
            .copied()
            .filter(|node| role_matches(role, node))
            .filter_map(|node| match &name {
                None => Some(Match { node, score: 0.8 }),
                Some(name) => surface_texts(node)
                    .filter(|text| text.contains(name.as_str()))
                    .map(|text| 0.5 + 0.4 * (name.len() as f64 / text.len().max(1) as f64))
                    .reduce(f64::max)
                    .map(|score| Match { node, score }),
            })
            .collect()
    }

    fn strategy_type(&self) -> LocatorStrategy {
        LocatorStrategy::RoleSubstring
    }
}

/// Token overlap over the element's words
pub struct FuzzyStrategy;

impl Strategy for FuzzyStrategy {
    fn collect<'a>(
        &self,
        descriptor: &TargetDescriptor,
        _snapshot: &'a AccessibilitySnapshot,
        pool: &[&'a AxNode],
    ) -> Vec<Match<'a>> {
        let query_text = [descriptor.name_text(), descriptor.hint_text()]
            .into_iter()
            .flatten()
            .collect::<Vec<_>>()
            .join(" ");
        let query = tokens(&query_text);
        if query.is_empty() {
            return Vec::new();
        }
        pool.iter()
            .copied()
            .filter(|node| {
                descriptor
                    .role_text()
                    .map(|role| role_matches(role, node))
                    .unwrap_or(true)
            })
            .filter_map(|node| {
                let words: Vec<String> = surface_texts(node)
                    .flat_map(|text| tokens(&text))
                    .collect();
                let score = overlap(&query, &words);
                (score >= FUZZY_THRESHOLD).then_some(Match { node, score })
            })
            .collect()
    }

    fn strategy_type(&self) -> LocatorStrategy {
        LocatorStrategy::FuzzyText
    }
}
