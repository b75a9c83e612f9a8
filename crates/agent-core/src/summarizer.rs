//! Turns diffs and outcomes into short, bounded utterances.

use perceiver_structural::model::spoken_role;
use perceiver_structural::{
    AccessibilitySnapshot, ChangeEvent, DialogKind, Diff, NodeSummary, StateChange, StateFlag,
};
use serde::{Deserialize, Serialize};

/// Hard cap on action lines in one utterance.
pub const MAX_ACTIONS: usize = 3;

/// Structured speech output. Bounded: at most [`MAX_ACTIONS`] actions and one notification.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Utterance {
    /// Lead sentence: the answer, refusal, question or listing.
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub focus: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub actions: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notification: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

impl Utterance {
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            ..Self::default()
        }
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    /// Adds an action line unless the utterance is already full.
    pub fn push_action(&mut self, action: impl Into<String>, limit: usize) -> bool {
        if self.actions.len() >= limit.min(MAX_ACTIONS) {
            return false;
        }
        self.actions.push(action.into());
        true
    }

    /// Keeps the first notification only.
    pub fn set_notification(&mut self, notification: impl Into<String>) {
        if self.notification.is_none() {
            self.notification = Some(notification.into());
        }
    }

    pub fn is_empty(&self) -> bool {
        self.message.is_empty()
            && self.title.is_none()
            && self.focus.is_none()
            && self.actions.is_empty()
            && self.notification.is_none()
            && self.hint.is_none()
    }

    /// Plain text for a speech engine or a terminal.
    pub fn render(&self) -> String {
        let mut sentences = Vec::new();
        if !self.message.is_empty() {
            sentences.push(sentence(&self.message));
        }
        if let Some(title) = &self.title {
            sentences.push(sentence(&format!("Page: {title}")));
        }
        if let Some(notification) = &self.notification {
            sentences.push(sentence(notification));
        }
        sentences.extend(self.actions.iter().map(|action| sentence(action)));
        if let Some(focus) = &self.focus {
            sentences.push(sentence(&format!("Focus is on {focus}")));
        }
        if let Some(hint) = &self.hint {
            sentences.push(sentence(hint));
        }
        sentences.join(" ")
    }
}

fn sentence(text: &str) -> String {
    let trimmed = text.trim();
    if trimmed.ends_with(['.', '?', '!', ':']) {
        trimmed.to_string()
    } else {
        format!("{trimmed}.")
    }
}

/// Fills title, focus, notification and action lines from a diff.
///
/// Events arrive ordered by priority; page-level events set the title, the
/// first dialog or validation error becomes the notification, and the rest
/// fill action lines until `max_actions` is reached.
pub fn summarize_diff(
    utterance: &mut Utterance,
    diff: &Diff,
    snapshot: &AccessibilitySnapshot,
    max_actions: usize,
) {
    for event in &diff.events {
        match event {
            ChangeEvent::PageLoaded { .. }
            | ChangeEvent::UrlChanged { .. }
            | ChangeEvent::TitleChanged { .. } => {
                if !snapshot.title.trim().is_empty() {
                    utterance.title = Some(snapshot.title.trim().to_string());
                }
            }
            ChangeEvent::FocusChanged { to, .. } => {
                utterance.focus = to.as_ref().map(NodeSummary::to_string);
            }
            ChangeEvent::DialogAppeared { .. } | ChangeEvent::ValidationErrorAppeared { .. } => {
                if utterance.notification.is_some() {
                    utterance.push_action(phrase(event), max_actions);
                } else {
                    utterance.set_notification(phrase(event));
                }
            }
            _ => {
                utterance.push_action(phrase(event), max_actions);
            }
        }
    }
}

/// One spoken line per change event.
pub fn phrase(event: &ChangeEvent) -> String {
    match event {
        ChangeEvent::PageLoaded { title, .. } => format!("Loaded {}", non_empty(title, "a page")),
        ChangeEvent::UrlChanged { to, .. } => format!("Moved to {to}"),
        ChangeEvent::TitleChanged { to, .. } => format!("Title is now {to}"),
        ChangeEvent::FocusChanged { to: Some(to), .. } => format!("Focus moved to {to}"),
        ChangeEvent::FocusChanged { to: None, .. } => "Focus left the page content".to_string(),
        ChangeEvent::DialogAppeared { dialog, name } => match dialog {
            DialogKind::Dialog | DialogKind::AlertDialog if name.is_empty() => {
                "A dialog opened".to_string()
            }
            DialogKind::Dialog | DialogKind::AlertDialog => format!("Dialog opened: {name}"),
            DialogKind::Alert => format!("Alert: {}", non_empty(name, "no text")),
            DialogKind::Status => format!("Status: {}", non_empty(name, "updated")),
        },
        ChangeEvent::ValidationErrorAppeared {
            message,
            field: Some(field),
        } => format!("Error on {field}: {message}"),
        ChangeEvent::ValidationErrorAppeared {
            message,
            field: None,
        } => error_line(message),
        ChangeEvent::CountChanged {
            region,
            role,
            before,
            after,
        } => count_phrase(region, role, *before, *after),
        ChangeEvent::LandmarkAdded { landmark, name } => {
            format!("{} section appeared", non_empty(name, landmark.label()))
        }
        ChangeEvent::LandmarkRemoved { landmark, name } => {
            format!("{} section closed", non_empty(name, landmark.label()))
        }
        ChangeEvent::NodeAdded { node } => format!("New {node}"),
        ChangeEvent::NodeRemoved { node } => format!("{} is gone", capitalize(&node.to_string())),
        ChangeEvent::StateChanged { node, change } => state_phrase(node, change),
    }
}

/// "Error: ..." unless the message already says so.
pub(crate) fn error_line(message: &str) -> String {
    let message = message.trim();
    if message.to_lowercase().starts_with("error") {
        message.to_string()
    } else {
        format!("Error: {message}")
    }
}

fn count_phrase(region: &str, role: &str, before: usize, after: usize) -> String {
    let noun = plural(spoken_role(role), after);
    let delta = if after > before {
        format!(", {} more", after - before)
    } else {
        format!(", {} fewer", before - after)
    };
    format!("{} now has {after} {noun}{delta}", capitalize(region))
}

fn state_phrase(node: &NodeSummary, change: &StateChange) -> String {
    let on = change.after == Some(true);
    let node = capitalize(&node.to_string());
    match change.flag {
        StateFlag::Expanded if on => format!("{node} expanded"),
        StateFlag::Expanded => format!("{node} collapsed"),
        StateFlag::Checked if on => format!("{node} checked"),
        StateFlag::Checked => format!("{node} unchecked"),
        StateFlag::Selected if on => format!("{node} selected"),
        StateFlag::Selected => format!("{node} no longer selected"),
        StateFlag::Disabled if on => format!("{node} is now disabled"),
        StateFlag::Disabled => format!("{node} is now enabled"),
        StateFlag::Required if on => format!("{node} is now required"),
        StateFlag::Required => format!("{node} is no longer required"),
        StateFlag::Invalid if on => format!("{node} is marked invalid"),
        StateFlag::Invalid => format!("{node} is valid again"),
    }
}

fn plural(noun: &str, count: usize) -> String {
    if count == 1 || noun.ends_with('s') {
        noun.to_string()
    } else if let Some(stem) = noun.strip_suffix('y') {
        format!("{stem}ies")
    } else {
        format!("{noun}s")
    }
}

fn non_empty<'a>(value: &'a str, fallback: &'a str) -> &'a str {
    if value.trim().is_empty() {
        fallback
    } else {
        value.trim()
    }
}

pub(crate) fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use perceiver_structural::{diff, SnapshotBuilder};
    use pretty_assertions::assert_eq;

    fn cart_page(items: usize, alert: Option<&str>) -> AccessibilitySnapshot {
        let mut builder = SnapshotBuilder::new("https://shop.example.com/cart", "Cart");
        let root = builder.root();
        let main = builder.child(root, "main", "");
        let list = builder.child(main, "list", "Cart items");
        for index in 0..items {
            builder.child(list, "listitem", &format!("Item {index}"));
        }
        if let Some(text) = alert {
            builder.child(main, "alert", text);
        }
        builder.build()
    }

    #[test]
    fn utterance_caps_actions_and_notifications() {
        let mut utterance = Utterance::message("Done");
        for index in 0..5 {
            utterance.push_action(format!("line {index}"), 10);
        }
        utterance.set_notification("first");
        utterance.set_notification("second");
        assert_eq!(utterance.actions.len(), MAX_ACTIONS);
        assert_eq!(utterance.notification.as_deref(), Some("first"));
    }

    #[test]
    fn render_joins_sentences() {
        let mut utterance = Utterance::message("Pressed button Save");
        utterance.title = Some("Settings".into());
        utterance.push_action("Dialog opened: Saved", 3);
        utterance.focus = Some("button Close".into());
        let utterance = utterance.with_hint("Say help for commands.");
        assert_eq!(
            utterance.render(),
            "Pressed button Save. Page: Settings. Dialog opened: Saved. Focus is on button Close. Say help for commands."
        );
    }

    #[test]
    fn diff_summary_announces_counts_and_errors() {
        let before = cart_page(3, None);
        let after = cart_page(4, Some("Error: quantity unavailable"));
        let changes = diff(Some(&before), &after);

        let mut utterance = Utterance::message("Pressed button Add");
        summarize_diff(&mut utterance, &changes, &after, 3);

        assert_eq!(
            utterance.notification.as_deref(),
            Some("Error: quantity unavailable")
        );
        assert!(utterance
            .actions
            .iter()
            .any(|line| line == "Cart items now has 4 list items, 1 more"));
        assert!(utterance.title.is_none());
    }

    #[test]
    fn first_snapshot_sets_the_title() {
        let page = cart_page(1, None);
        let changes = diff(None, &page);
        let mut utterance = Utterance::default();
        summarize_diff(&mut utterance, &changes, &page, 3);
        assert_eq!(utterance.title.as_deref(), Some("Cart"));
        assert!(utterance.actions.is_empty());
    }

    #[test]
    fn plurals_follow_simple_rules() {
        assert_eq!(plural("item", 1), "item");
        assert_eq!(plural("list item", 2), "list items");
        assert_eq!(plural("entry", 2), "entries");
        assert_eq!(plural("news", 3), "news");
    }
}
