//! Page overview for "describe this page" and "list the links".

use action_locator::canonical_role;
use perceiver_structural::{AccessibilitySnapshot, AxNode, NodeId, NodeSummary};
use serde::{Deserialize, Serialize};

use crate::summarizer::{error_line, Utterance};

/// Roles offered as "things you can do here", with their base importance.
const ACTIONABLE_ROLES: &[(&str, u32)] = &[
    ("button", 10),
    ("link", 8),
    ("textbox", 6),
    ("searchbox", 6),
    ("combobox", 5),
    ("checkbox", 4),
    ("radio", 4),
    ("slider", 3),
];

const NOTIFICATION_ROLES: &[&str] = &["alert", "status", "log", "marquee"];

/// Actionable elements kept in a description.
pub const TOP_ACTIONABLE: usize = 5;

const TEXT_CHARS: usize = 120;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionableElement {
    pub node: NodeId,
    pub summary: NodeSummary,
    pub importance: u32,
}

/// What a listener needs to orient on a page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageDescription {
    pub title: String,
    pub url: String,
    pub landmarks: Vec<String>,
    pub main_heading: Option<String>,
    pub focused: Option<NodeSummary>,
    pub actionable: Vec<ActionableElement>,
    pub notifications: Vec<String>,
    pub errors: Vec<String>,
}

/// Importance used to rank actionable elements; `None` for anything else.
pub fn importance(node: &AxNode) -> Option<u32> {
    let base = ACTIONABLE_ROLES
        .iter()
        .find(|(role, _)| node.role_is(role))
        .map(|(_, score)| *score)?;
    let mut score = base;
    if !node.display_name().is_empty() {
        score += 5;
    }
    if node
        .description
        .as_deref()
        .is_some_and(|description| !description.trim().is_empty())
    {
        score += 2;
    }
    Some(score)
}

pub fn describe_page(snapshot: &AccessibilitySnapshot) -> PageDescription {
    let landmarks = snapshot
        .landmarks()
        .filter_map(|node| {
            let kind = node.landmark?;
            let name = node.display_name();
            Some(if name.is_empty() || name.eq_ignore_ascii_case(kind.label()) {
                kind.label().to_string()
            } else {
                format!("{} ({name})", kind.label())
            })
        })
        .collect();

    let mut actionable: Vec<ActionableElement> = snapshot
        .perceivable()
        .filter(|node| !node.states.disabled)
        .filter_map(|node| {
            importance(node).map(|importance| ActionableElement {
                node: node.id,
                summary: node.summary(),
                importance,
            })
        })
        .collect();
    // stable: document order breaks ties
    actionable.sort_by(|a, b| b.importance.cmp(&a.importance));
    actionable.truncate(TOP_ACTIONABLE);

    let mut notifications = Vec::new();
    let mut errors = Vec::new();
    for node in snapshot.perceivable() {
        if !NOTIFICATION_ROLES.iter().any(|role| node.role_is(role)) {
            continue;
        }
        let text = snapshot.text_content(node.id, TEXT_CHARS);
        if text.is_empty() {
            continue;
        }
        if node.role_is("alert") && text.to_lowercase().contains("error") {
            errors.push(text);
        } else {
            notifications.push(text);
        }
    }

    PageDescription {
        title: snapshot.title.trim().to_string(),
        url: snapshot.url.clone(),
        landmarks,
        main_heading: snapshot
            .main_heading()
            .map(|heading| heading.display_name())
            .filter(|name| !name.is_empty()),
        focused: snapshot.focused().map(AxNode::summary),
        actionable,
        notifications,
        errors,
    }
}

impl PageDescription {
    pub fn utterance(&self, max_actions: usize) -> Utterance {
        let mut lead = match &self.main_heading {
            Some(heading) => format!("Main heading: {heading}"),
            None => "This page has no main heading".to_string(),
        };
        if !self.landmarks.is_empty() {
            lead.push_str(&format!(". Sections: {}", self.landmarks.join(", ")));
        }
        if !self.actionable.is_empty() {
            let items: Vec<String> = self
                .actionable
                .iter()
                .map(|element| element.summary.to_string())
                .collect();
            lead.push_str(&format!(". You can use: {}", items.join(", ")));
        }

        let mut utterance = Utterance::message(lead);
        if !self.title.is_empty() {
            utterance.title = Some(self.title.clone());
        }
        utterance.focus = self.focused.as_ref().map(NodeSummary::to_string);
        if let Some(error) = self.errors.first() {
            utterance.set_notification(error_line(error));
        } else if let Some(notice) = self.notifications.first() {
            utterance.set_notification(notice.clone());
        }
        for extra in self.errors.iter().skip(1) {
            utterance.push_action(error_line(extra), max_actions);
        }
        utterance
    }
}

/// Perceivable elements matching `role` (spoken aliases accepted), or the
/// interactive ones when no role is given, in document order.
pub fn list_elements(
    snapshot: &AccessibilitySnapshot,
    role: Option<&str>,
    limit: usize,
) -> Vec<NodeSummary> {
    let wanted: Option<[String; 2]> = role.map(|role| {
        let role = role.trim();
        let singular = match role.strip_suffix('s') {
            Some(stem) if !stem.ends_with('s') => stem,
            _ => role,
        };
        [canonical_role(role), canonical_role(singular)]
    });
    snapshot
        .perceivable()
        .filter(|node| match &wanted {
            Some(roles) => roles.iter().any(|role| node.role_is(role)),
            None => node.is_interactive(),
        })
        .map(AxNode::summary)
        .take(limit)
        .collect()
}

/// Numbered reading of a listing: "1, link Home. 2, link Deals."
pub fn numbered(items: &[String]) -> String {
    items
        .iter()
        .enumerate()
        .map(|(index, item)| format!("{}, {item}", index + 1))
        .collect::<Vec<_>>()
        .join(". ")
}
