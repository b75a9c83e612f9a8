use std::collections::{HashMap, HashSet};
use std::fmt;

use chrono::{DateTime, Utc};
use lighthouse_core_types::SnapshotId;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::errors::PerceiverError;

/// Node identifier. Only meaningful inside the snapshot that produced it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub u32);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n{}", self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Bounds {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn is_zero_area(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StateFlags {
    pub focused: bool,
    pub disabled: bool,
    /// `aria-hidden` or not rendered. Hides the whole subtree.
    pub hidden: bool,
    pub expanded: Option<bool>,
    pub checked: Option<bool>,
    pub selected: bool,
    pub required: bool,
    pub invalid: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StateFlag {
    Disabled,
    Expanded,
    Checked,
    Selected,
    Required,
    Invalid,
}

impl StateFlag {
    pub fn name(&self) -> &'static str {
        match self {
            StateFlag::Disabled => "disabled",
            StateFlag::Expanded => "expanded",
            StateFlag::Checked => "checked",
            StateFlag::Selected => "selected",
            StateFlag::Required => "required",
            StateFlag::Invalid => "invalid",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateChange {
    pub flag: StateFlag,
    pub before: Option<bool>,
    pub after: Option<bool>,
}

impl StateFlags {
    /// Flag differences, focus excluded.
    pub fn changes_to(&self, other: &StateFlags) -> Vec<StateChange> {
        let pairs = [
            (StateFlag::Disabled, Some(self.disabled), Some(other.disabled)),
            (StateFlag::Expanded, self.expanded, other.expanded),
            (StateFlag::Checked, self.checked, other.checked),
            (StateFlag::Selected, Some(self.selected), Some(other.selected)),
            (StateFlag::Required, Some(self.required), Some(other.required)),
            (StateFlag::Invalid, Some(self.invalid), Some(other.invalid)),
        ];
        pairs
            .into_iter()
            .filter(|(_, before, after)| before != after)
            .map(|(flag, before, after)| StateChange {
                flag,
                before,
                after,
            })
            .collect()
    }

    fn fingerprint(&self) -> String {
        fn tri(value: Option<bool>) -> char {
            match value {
                Some(true) => 'T',
                Some(false) => 'F',
                None => '-',
            }
        }
        let bits = [
            self.focused,
            self.disabled,
            self.hidden,
            self.selected,
            self.required,
            self.invalid,
        ];
        let mut out: String = bits.iter().map(|b| if *b { '1' } else { '0' }).collect();
        out.push(tri(self.expanded));
        out.push(tri(self.checked));
        out
    }
}

/// Structural page regions used for page summaries.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Landmark {
    Banner,
    Navigation,
    Main,
    Complementary,
    ContentInfo,
    Search,
    Form,
    Region,
}

impl Landmark {
    pub fn from_role(role: &str) -> Option<Self> {
        match role.to_ascii_lowercase().as_str() {
            "banner" | "header" => Some(Landmark::Banner),
            "navigation" | "nav" => Some(Landmark::Navigation),
            "main" => Some(Landmark::Main),
            "complementary" | "aside" => Some(Landmark::Complementary),
            "contentinfo" | "footer" => Some(Landmark::ContentInfo),
            "search" => Some(Landmark::Search),
            "form" => Some(Landmark::Form),
            "region" => Some(Landmark::Region),
            _ => None,
        }
    }

    /// Word used when speaking about the region.
    pub fn label(&self) -> &'static str {
        match self {
            Landmark::Banner => "header",
            Landmark::Navigation => "navigation",
            Landmark::Main => "main content",
            Landmark::Complementary => "sidebar",
            Landmark::ContentInfo => "footer",
            Landmark::Search => "search",
            Landmark::Form => "form",
            Landmark::Region => "region",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AxNode {
    pub id: NodeId,
    pub role: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aria_label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Heading level, when the node is a heading.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<u32>,
    #[serde(default)]
    pub states: StateFlags,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bounds: Option<Bounds>,
    #[serde(default)]
    pub children: Vec<NodeId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub landmark: Option<Landmark>,
}

const INTERACTIVE_ROLES: &[&str] = &[
    "button",
    "link",
    "textbox",
    "searchbox",
    "checkbox",
    "radio",
    "combobox",
    "listbox",
    "slider",
    "spinbutton",
    "switch",
    "tab",
    "menuitem",
    "menuitemcheckbox",
    "menuitemradio",
    "option",
    "treeitem",
];

const EDITABLE_ROLES: &[&str] = &["textbox", "searchbox", "combobox", "spinbutton"];

impl AxNode {
    pub fn new(id: NodeId, role: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id,
            role: role.into(),
            name: name.into(),
            text: None,
            aria_label: None,
            description: None,
            level: None,
            states: StateFlags::default(),
            bounds: None,
            children: Vec::new(),
            landmark: None,
        }
    }

    pub fn role_is(&self, role: &str) -> bool {
        self.role.eq_ignore_ascii_case(role)
    }

    pub fn is_interactive(&self) -> bool {
        INTERACTIVE_ROLES.iter().any(|role| self.role_is(role))
    }

    pub fn is_editable(&self) -> bool {
        EDITABLE_ROLES.iter().any(|role| self.role_is(role))
    }

    pub fn is_heading(&self) -> bool {
        self.role_is("heading")
    }

    pub fn summary(&self) -> NodeSummary {
        NodeSummary {
            role: self.role.to_ascii_lowercase(),
            name: normalize_text(&self.name),
        }
    }

    /// Name, falling back to aria-label and inner text.
    pub fn display_name(&self) -> String {
        let candidates = [
            Some(self.name.as_str()),
            self.aria_label.as_deref(),
            self.text.as_deref(),
        ];
        candidates
            .into_iter()
            .flatten()
            .map(normalize_text)
            .find(|value| !value.is_empty())
            .unwrap_or_default()
    }
}

/// Role and name pair used in change events and spoken output.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeSummary {
    pub role: String,
    pub name: String,
}

impl fmt::Display for NodeSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let role = spoken_role(&self.role);
        if self.name.is_empty() {
            f.write_str(role)
        } else {
            write!(f, "{} {}", role, self.name)
        }
    }
}

/// Listener-friendly wording for ARIA roles.
pub fn spoken_role(role: &str) -> &str {
    match role {
        "textbox" => "text field",
        "searchbox" => "search field",
        "combobox" => "combo box",
        "listbox" => "list box",
        "spinbutton" => "number field",
        "menuitem" | "menuitemcheckbox" | "menuitemradio" => "menu item",
        "listitem" => "list item",
        "img" | "image" => "image",
        "alertdialog" => "alert dialog",
        "treeitem" => "tree item",
        "gridcell" => "cell",
        other => other,
    }
}

pub fn normalize_text(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
    #[serde(default)]
    pub scroll_y: f64,
}

/// One immutable capture of the accessibility tree.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(try_from = "SnapshotRecord", into = "SnapshotRecord")]
pub struct AccessibilitySnapshot {
    pub id: SnapshotId,
    pub root: NodeId,
    pub captured_at: DateTime<Utc>,
    pub title: String,
    pub url: String,
    pub viewport: Option<Viewport>,
    pub content_hash: String,
    nodes: Vec<AxNode>,
    index: HashMap<NodeId, usize>,
    parents: HashMap<NodeId, NodeId>,
    order: Vec<NodeId>,
    positions: HashMap<NodeId, usize>,
    hidden_subtree: HashSet<NodeId>,
}

/// Wire form of a snapshot; indices and the hash are rebuilt on load.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SnapshotRecord {
    #[serde(default)]
    pub id: Option<SnapshotId>,
    #[serde(default)]
    pub captured_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub title: String,
    pub url: String,
    pub root: NodeId,
    #[serde(default)]
    pub viewport: Option<Viewport>,
    pub nodes: Vec<AxNode>,
}

impl TryFrom<SnapshotRecord> for AccessibilitySnapshot {
    type Error = PerceiverError;

    fn try_from(record: SnapshotRecord) -> Result<Self, Self::Error> {
        validate(&record)?;
        Ok(AccessibilitySnapshot::assemble(record))
    }
}

impl From<AccessibilitySnapshot> for SnapshotRecord {
    fn from(snapshot: AccessibilitySnapshot) -> Self {
        SnapshotRecord {
            id: Some(snapshot.id),
            captured_at: Some(snapshot.captured_at),
            title: snapshot.title,
            url: snapshot.url,
            root: snapshot.root,
            viewport: snapshot.viewport,
            nodes: snapshot.nodes,
        }
    }
}

fn validate(record: &SnapshotRecord) -> Result<(), PerceiverError> {
    let mut seen = HashSet::with_capacity(record.nodes.len());
    for node in &record.nodes {
        if !seen.insert(node.id) {
            return Err(PerceiverError::InvalidSnapshot(format!(
                "duplicate node id {}",
                node.id
            )));
        }
    }
    if !seen.contains(&record.root) {
        return Err(PerceiverError::InvalidSnapshot(format!(
            "root {} is not in the node list",
            record.root
        )));
    }
    let mut parent_of: HashMap<NodeId, NodeId> = HashMap::new();
    for node in &record.nodes {
        for child in &node.children {
            if !seen.contains(child) {
                return Err(PerceiverError::InvalidSnapshot(format!(
                    "{} references missing child {}",
                    node.id, child
                )));
            }
            if *child == record.root {
                return Err(PerceiverError::InvalidSnapshot(format!(
                    "{} lists the root as a child",
                    node.id
                )));
            }
            if let Some(previous) = parent_of.insert(*child, node.id) {
                return Err(PerceiverError::InvalidSnapshot(format!(
                    "{} has two parents ({} and {})",
                    child, previous, node.id
                )));
            }
        }
    }
    Ok(())
}

impl AccessibilitySnapshot {
    /// Validates and indexes a tree.
    pub fn new(
        title: impl Into<String>,
        url: impl Into<String>,
        root: NodeId,
        nodes: Vec<AxNode>,
    ) -> Result<Self, PerceiverError> {
        Self::try_from(SnapshotRecord {
            id: None,
            captured_at: None,
            title: title.into(),
            url: url.into(),
            root,
            viewport: None,
            nodes,
        })
    }

    pub fn with_viewport(mut self, viewport: Viewport) -> Self {
        self.viewport = Some(viewport);
        self
    }

    fn assemble(record: SnapshotRecord) -> Self {
        let mut nodes = record.nodes;
        for node in nodes.iter_mut() {
            if node.landmark.is_none() {
                node.landmark = Landmark::from_role(&node.role);
            }
        }
        let index: HashMap<NodeId, usize> = nodes
            .iter()
            .enumerate()
            .map(|(idx, node)| (node.id, idx))
            .collect();

        let mut parents = HashMap::new();
        let mut order = Vec::with_capacity(nodes.len());
        let mut hidden_subtree = HashSet::new();
        let mut visited = HashSet::new();
        // (node, ancestor hidden)
        let mut stack = vec![(record.root, false)];
        while let Some((id, ancestor_hidden)) = stack.pop() {
            if !visited.insert(id) {
                continue;
            }
            let Some(node) = index.get(&id).map(|idx| &nodes[*idx]) else {
                continue;
            };
            order.push(id);
            let hidden = ancestor_hidden || node.states.hidden;
            if hidden {
                hidden_subtree.insert(id);
            }
            for child in node.children.iter().rev() {
                if index.contains_key(child) && !visited.contains(child) {
                    parents.insert(*child, id);
                    stack.push((*child, hidden));
                }
            }
        }
        let positions = order
            .iter()
            .enumerate()
            .map(|(pos, id)| (*id, pos))
            .collect();

        let mut snapshot = Self {
            id: record.id.unwrap_or_default(),
            root: record.root,
            captured_at: record.captured_at.unwrap_or_else(Utc::now),
            title: record.title,
            url: record.url,
            viewport: record.viewport,
            content_hash: String::new(),
            nodes,
            index,
            parents,
            order,
            positions,
            hidden_subtree,
        };
        snapshot.content_hash = snapshot.compute_hash();
        snapshot
    }

    fn compute_hash(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.title.as_bytes());
        hasher.update(b"\n");
        hasher.update(self.url.as_bytes());
        hasher.update(b"\n");
        for id in &self.order {
            let Some(node) = self.node(*id) else {
                continue;
            };
            let line = format!(
                "{}|{}|{}|{}|{}|{}|{}|{:?}|{}\n",
                self.depth(*id),
                node.role.to_ascii_lowercase(),
                normalize_text(&node.name),
                node.text.as_deref().map(normalize_text).unwrap_or_default(),
                node.aria_label.as_deref().unwrap_or_default(),
                node.level.unwrap_or(0),
                node.states.fingerprint(),
                node.landmark,
                u8::from(self.is_perceivable(*id)),
            );
            hasher.update(line.as_bytes());
        }
        hex::encode(hasher.finalize())
    }

    pub fn node(&self, id: NodeId) -> Option<&AxNode> {
        self.index.get(&id).map(|idx| &self.nodes[*idx])
    }

    pub fn root_node(&self) -> Option<&AxNode> {
        self.node(self.root)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.parents.get(&id).copied()
    }

    pub fn depth(&self, id: NodeId) -> usize {
        self.ancestors(id).count()
    }

    /// Ancestors, nearest first.
    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = &AxNode> + '_ {
        std::iter::successors(self.parent(id), move |current| self.parent(*current))
            .filter_map(move |ancestor| self.node(ancestor))
    }

    /// Reachable nodes in document (pre-order) order.
    pub fn document_order(&self) -> &[NodeId] {
        &self.order
    }

    pub fn iter(&self) -> impl Iterator<Item = &AxNode> + '_ {
        self.order.iter().filter_map(move |id| self.node(*id))
    }

    pub fn position(&self, id: NodeId) -> Option<usize> {
        self.positions.get(&id).copied()
    }

    /// True when the node or one of its ancestors is hidden.
    pub fn in_hidden_subtree(&self, id: NodeId) -> bool {
        self.hidden_subtree.contains(&id)
    }

    /// Reachable, not hidden, not under a hidden ancestor, and not zero-area.
    pub fn is_perceivable(&self, id: NodeId) -> bool {
        if !self.positions.contains_key(&id) || self.in_hidden_subtree(id) {
            return false;
        }
        match self.node(id).and_then(|node| node.bounds) {
            Some(bounds) => !bounds.is_zero_area(),
            None => true,
        }
    }

    pub fn perceivable(&self) -> impl Iterator<Item = &AxNode> + '_ {
        self.iter().filter(move |node| self.is_perceivable(node.id))
    }

    /// Children that are not inside a hidden subtree.
    pub fn visible_children(&self, id: NodeId) -> Vec<NodeId> {
        self.node(id)
            .map(|node| {
                node.children
                    .iter()
                    .copied()
                    .filter(|child| {
                        self.positions.contains_key(child) && !self.in_hidden_subtree(*child)
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    /// The focused node, if any perceivable node claims focus.
    pub fn focused(&self) -> Option<&AxNode> {
        self.perceivable().find(|node| node.states.focused)
    }

    /// Nearest ancestor (inclusive) that is a landmark.
    pub fn landmark_of(&self, id: NodeId) -> Option<&AxNode> {
        let own = self.node(id).filter(|node| node.landmark.is_some());
        own.or_else(|| self.ancestors(id).find(|node| node.landmark.is_some()))
    }

    /// Nearest heading before `id` in document order that does not contain it.
    pub fn preceding_heading(&self, id: NodeId) -> Option<&AxNode> {
        let position = self.position(id)?;
        self.order[..position]
            .iter()
            .rev()
            .filter_map(|candidate| self.node(*candidate))
            .find(|node| node.is_heading() && self.is_perceivable(node.id))
    }

    /// First level-one heading, falling back to the first heading.
    pub fn main_heading(&self) -> Option<&AxNode> {
        self.perceivable()
            .find(|node| node.is_heading() && node.level == Some(1))
            .or_else(|| self.perceivable().find(|node| node.is_heading()))
    }

    pub fn landmarks(&self) -> impl Iterator<Item = &AxNode> + '_ {
        self.perceivable().filter(|node| node.landmark.is_some())
    }

    /// Name of the node, or the joined text of its descendants, capped.
    pub fn text_content(&self, id: NodeId, max_chars: usize) -> String {
        let Some(node) = self.node(id) else {
            return String::new();
        };
        let own = node.display_name();
        if !own.is_empty() {
            return truncate(&own, max_chars);
        }
        let mut parts = Vec::new();
        let mut stack: Vec<NodeId> = node.children.iter().rev().copied().collect();
        while let Some(current) = stack.pop() {
            if self.in_hidden_subtree(current) {
                continue;
            }
            if let Some(child) = self.node(current) {
                let text = child.display_name();
                if !text.is_empty() {
                    parts.push(text);
                } else {
                    stack.extend(child.children.iter().rev().copied());
                }
            }
        }
        truncate(&parts.join(" "), max_chars)
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let mut out: String = text.chars().take(max_chars).collect();
    out.push('…');
    out
}

/// Incremental tree construction for drivers and fixtures.
#[derive(Clone, Debug)]
pub struct SnapshotBuilder {
    title: String,
    url: String,
    viewport: Option<Viewport>,
    nodes: Vec<AxNode>,
}

impl SnapshotBuilder {
    /// Starts a tree whose root is a `RootWebArea` named after the title.
    pub fn new(url: impl Into<String>, title: impl Into<String>) -> Self {
        let title = title.into();
        let root = AxNode::new(NodeId(0), "RootWebArea", title.clone());
        Self {
            title,
            url: url.into(),
            viewport: None,
            nodes: vec![root],
        }
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    pub fn viewport(mut self, viewport: Viewport) -> Self {
        self.viewport = Some(viewport);
        self
    }

    pub fn child(&mut self, parent: NodeId, role: &str, name: &str) -> NodeId {
        self.child_with(parent, |node| {
            node.role = role.to_string();
            node.name = name.to_string();
        })
    }

    /// Appends a child and lets the caller fill it in.
    pub fn child_with(&mut self, parent: NodeId, fill: impl FnOnce(&mut AxNode)) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        let mut node = AxNode::new(id, "generic", "");
        fill(&mut node);
        node.id = id;
        node.children.clear();
        if let Some(parent_node) = self.nodes.get_mut(parent.0 as usize) {
            parent_node.children.push(id);
        }
        self.nodes.push(node);
        id
    }

    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut AxNode> {
        self.nodes.get_mut(id.0 as usize)
    }

    pub fn build(self) -> AccessibilitySnapshot {
        AccessibilitySnapshot::assemble(SnapshotRecord {
            id: None,
            captured_at: None,
            title: self.title,
            url: self.url,
            root: NodeId(0),
            viewport: self.viewport,
            nodes: self.nodes,
        })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DialogKind {
    Dialog,
    AlertDialog,
    Alert,
    Status,
}

impl DialogKind {
    pub fn from_role(role: &str) -> Option<Self> {
        match role.to_ascii_lowercase().as_str() {
            "dialog" => Some(DialogKind::Dialog),
            "alertdialog" => Some(DialogKind::AlertDialog),
            "alert" => Some(DialogKind::Alert),
            "status" => Some(DialogKind::Status),
            _ => None,
        }
    }
}

/// Semantic change between two snapshots.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ChangeEvent {
    PageLoaded {
        title: String,
        url: String,
    },
    UrlChanged {
        from: String,
        to: String,
    },
    FocusChanged {
        from: Option<NodeSummary>,
        to: Option<NodeSummary>,
    },
    DialogAppeared {
        dialog: DialogKind,
        name: String,
    },
    ValidationErrorAppeared {
        message: String,
        field: Option<NodeSummary>,
    },
    TitleChanged {
        from: String,
        to: String,
    },
    CountChanged {
        region: String,
        role: String,
        before: usize,
        after: usize,
    },
    LandmarkAdded {
        landmark: Landmark,
        name: String,
    },
    LandmarkRemoved {
        landmark: Landmark,
        name: String,
    },
    NodeAdded {
        node: NodeSummary,
    },
    NodeRemoved {
        node: NodeSummary,
    },
    StateChanged {
        node: NodeSummary,
        change: StateChange,
    },
}

impl ChangeEvent {
    /// Announcement bucket; lower is spoken first.
    pub fn priority(&self) -> u8 {
        match self {
            ChangeEvent::PageLoaded { .. } => 0,
            ChangeEvent::UrlChanged { .. } => 1,
            ChangeEvent::FocusChanged { .. } => 2,
            ChangeEvent::DialogAppeared { .. } => 3,
            ChangeEvent::ValidationErrorAppeared { .. } => 4,
            ChangeEvent::TitleChanged { .. } => 5,
            ChangeEvent::CountChanged { .. } => 6,
            ChangeEvent::LandmarkAdded { .. } | ChangeEvent::LandmarkRemoved { .. } => 7,
            ChangeEvent::NodeAdded { .. }
            | ChangeEvent::NodeRemoved { .. }
            | ChangeEvent::StateChanged { .. } => 8,
        }
    }

    /// Notifications are the events a listener should hear even when busy.
    pub fn is_notification(&self) -> bool {
        matches!(
            self,
            ChangeEvent::DialogAppeared { .. } | ChangeEvent::ValidationErrorAppeared { .. }
        )
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Diff {
    pub base: Option<SnapshotId>,
    pub current: SnapshotId,
    pub generated_at: DateTime<Utc>,
    pub events: Vec<ChangeEvent>,
}

impl Diff {
    pub fn empty(base: Option<SnapshotId>, current: SnapshotId) -> Self {
        Self {
            base,
            current,
            generated_at: Utc::now(),
            events: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn notifications(&self) -> impl Iterator<Item = &ChangeEvent> + '_ {
        self.events.iter().filter(|event| event.is_notification())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> AccessibilitySnapshot {
        let mut builder = SnapshotBuilder::new("https://example.com/", "Example");
        let root = builder.root();
        let main = builder.child(root, "main", "");
        let heading = builder.child(main, "heading", "Products");
        builder.node_mut(heading).unwrap().level = Some(1);
        builder.child(main, "button", "Buy");
        let hidden = builder.child_with(main, |node| {
            node.role = "group".into();
            node.states.hidden = true;
        });
        builder.child(hidden, "button", "Secret");
        builder.child_with(main, |node| {
            node.role = "button".into();
            node.name = "Tiny".into();
            node.bounds = Some(Bounds::new(0.0, 0.0, 0.0, 10.0));
        });
        builder.build()
    }

    #[test]
    fn document_order_is_preorder() {
        let snapshot = sample();
        let roles: Vec<_> = snapshot.iter().map(|node| node.role.as_str()).collect();
        assert_eq!(
            roles,
            vec!["RootWebArea", "main", "heading", "button", "group", "button", "button"]
        );
    }

    #[test]
    fn hidden_ancestors_and_zero_area_are_not_perceivable() {
        let snapshot = sample();
        let names: Vec<_> = snapshot
            .perceivable()
            .filter(|node| node.role_is("button"))
            .map(|node| node.name.clone())
            .collect();
        assert_eq!(names, vec!["Buy".to_string()]);
    }

    #[test]
    fn landmark_is_derived_from_role() {
        let snapshot = sample();
        let buy = snapshot.iter().find(|node| node.name == "Buy").unwrap();
        let landmark = snapshot.landmark_of(buy.id).unwrap();
        assert_eq!(landmark.landmark, Some(Landmark::Main));
        assert_eq!(snapshot.main_heading().unwrap().name, "Products");
    }

    #[test]
    fn hash_ignores_ids_and_position() {
        let a = sample();
        let mut record = SnapshotRecord::from(a.clone());
        for node in record.nodes.iter_mut() {
            if node.name == "Buy" {
                node.bounds = Some(Bounds::new(5.0, 5.0, 40.0, 20.0));
            }
        }
        let b = AccessibilitySnapshot::try_from(record).unwrap();
        assert_eq!(a.content_hash, b.content_hash);
    }

    #[test]
    fn hash_tracks_nodes_collapsing_to_zero_area() {
        let a = sample();
        let mut record = SnapshotRecord::from(a.clone());
        for node in record.nodes.iter_mut() {
            if node.name == "Buy" {
                node.bounds = Some(Bounds::new(5.0, 5.0, 0.0, 0.0));
            }
        }
        let b = AccessibilitySnapshot::try_from(record).unwrap();
        assert_ne!(a.content_hash, b.content_hash);
    }

    #[test]
    fn hash_tracks_state_changes() {
        let a = sample();
        let mut record = SnapshotRecord::from(a.clone());
        record.nodes[3].states.disabled = true;
        let b = AccessibilitySnapshot::try_from(record).unwrap();
        assert_ne!(a.content_hash, b.content_hash);
    }

    #[test]
    fn rejects_missing_children_and_double_parents() {
        let mut root = AxNode::new(NodeId(0), "RootWebArea", "");
        root.children = vec![NodeId(7)];
        let err = AccessibilitySnapshot::new("", "about:blank", NodeId(0), vec![root]).unwrap_err();
        assert!(matches!(err, PerceiverError::InvalidSnapshot(_)));

        let mut root = AxNode::new(NodeId(0), "RootWebArea", "");
        let mut group = AxNode::new(NodeId(1), "group", "");
        let leaf = AxNode::new(NodeId(2), "button", "x");
        root.children = vec![NodeId(1), NodeId(2)];
        group.children = vec![NodeId(2)];
        let err = AccessibilitySnapshot::new("", "about:blank", NodeId(0), vec![root, group, leaf])
            .unwrap_err();
        assert!(err.to_string().contains("two parents"));
    }

    #[test]
    fn serde_round_trip_rebuilds_indices() {
        let snapshot = sample();
        let json = serde_json::to_string(&snapshot).unwrap();
        let restored: AccessibilitySnapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(restored.content_hash, snapshot.content_hash);
        assert_eq!(restored.document_order(), snapshot.document_order());
    }

    #[test]
    fn text_content_falls_back_to_descendants() {
        let mut builder = SnapshotBuilder::new("https://example.com/", "Example");
        let root = builder.root();
        let alert = builder.child(root, "alert", "");
        builder.child(alert, "StaticText", "Email is required");
        let snapshot = builder.build();
        assert_eq!(snapshot.text_content(alert, 80), "Email is required");
    }
}
