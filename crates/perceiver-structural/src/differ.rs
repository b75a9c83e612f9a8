use std::collections::{BTreeMap, HashSet};
use std::time::Instant;

use crate::events;
use crate::model::{
    normalize_text, AccessibilitySnapshot, AxNode, ChangeEvent, DialogKind, Diff, NodeId,
    StateFlag,
};
use crate::policy::DiffPolicy;

/// Roles whose appearance or removal is worth announcing on its own.
const STRUCTURAL_ROLES: &[&str] = &[
    "heading",
    "img",
    "image",
    "figure",
    "list",
    "table",
    "grid",
    "tree",
    "tablist",
    "menu",
    "form",
    "article",
];

/// Sibling groups whose members are announced as a count.
const REPEATED_ROLES: &[&str] = &[
    "listitem", "row", "option", "article", "treeitem", "menuitem", "tab", "gridcell",
];

const ERROR_KEYWORDS: &[&str] = &[
    "error",
    "invalid",
    "required",
    "failed",
    "incorrect",
    "must",
    "not valid",
    "try again",
];

const MESSAGE_CHARS: usize = 160;

pub fn diff(before: Option<&AccessibilitySnapshot>, after: &AccessibilitySnapshot) -> Diff {
    diff_with_policy(before, after, &DiffPolicy::default())
}

pub fn diff_with_policy(
    before: Option<&AccessibilitySnapshot>,
    after: &AccessibilitySnapshot,
    policy: &DiffPolicy,
) -> Diff {
    let started = Instant::now();
    let mut diff = Diff::empty(before.map(|snapshot| snapshot.id.clone()), after.id.clone());

    let Some(before) = before else {
        diff.events.push(ChangeEvent::PageLoaded {
            title: after.title.clone(),
            url: after.url.clone(),
        });
        events::emit_diff(diff.len(), false, started.elapsed());
        return diff;
    };

    if before.content_hash == after.content_hash {
        events::emit_diff(0, true, started.elapsed());
        return diff;
    }

    let mut walk = Walk::new(before, after, policy);
    walk.run();
    let mut changes = walk.events;
    // stable: keeps document order inside each bucket
    changes.sort_by_key(ChangeEvent::priority);
    if let Some(max) = policy.max_events {
        changes.truncate(max);
    }
    diff.events = changes;
    events::emit_diff(diff.len(), false, started.elapsed());
    diff
}

fn is_significant(node: &AxNode) -> bool {
    node.is_interactive()
        || node.landmark.is_some()
        || DialogKind::from_role(&node.role).is_some()
        || STRUCTURAL_ROLES.iter().any(|role| node.role_is(role))
}

fn is_repeated(node: &AxNode) -> bool {
    REPEATED_ROLES.iter().any(|role| node.role_is(role))
}

fn is_error_like(message: &str) -> bool {
    let lowered = message.to_lowercase();
    ERROR_KEYWORDS.iter().any(|keyword| lowered.contains(keyword))
}

fn match_key(node: &AxNode) -> (String, String) {
    (node.role.to_ascii_lowercase(), normalize_text(&node.name))
}

fn ignored_here(policy: &DiffPolicy, node: &AxNode) -> bool {
    policy.ignores_role(&node.role) || policy.ignores_name(&node.name)
}

fn ignored_anywhere(snapshot: &AccessibilitySnapshot, policy: &DiffPolicy, id: NodeId) -> bool {
    snapshot
        .node(id)
        .map(|node| ignored_here(policy, node))
        .unwrap_or(false)
        || snapshot
            .ancestors(id)
            .any(|ancestor| ignored_here(policy, ancestor))
}

/// Position of `id` among its parent's visible children sharing its role and name.
fn sibling_rank(snapshot: &AccessibilitySnapshot, id: NodeId) -> usize {
    let (Some(parent), Some(node)) = (snapshot.parent(id), snapshot.node(id)) else {
        return 0;
    };
    let key = match_key(node);
    snapshot
        .visible_children(parent)
        .into_iter()
        .take_while(|sibling| *sibling != id)
        .filter_map(|sibling| snapshot.node(sibling))
        .filter(|sibling| match_key(sibling) == key)
        .count()
}

/// Structural path from the root; stable across unrelated sibling churn.
fn path_key(snapshot: &AccessibilitySnapshot, id: NodeId) -> String {
    let mut chain: Vec<NodeId> = std::iter::successors(Some(id), |current| snapshot.parent(*current))
        .collect();
    chain.reverse();
    chain
        .into_iter()
        .filter_map(|step| {
            snapshot.node(step).map(|node| {
                let (role, name) = match_key(node);
                format!("{}:{}#{}", role, name, sibling_rank(snapshot, step))
            })
        })
        .collect::<Vec<_>>()
        .join("/")
}

fn group_key(snapshot: &AccessibilitySnapshot, id: NodeId) -> Option<String> {
    let node = snapshot.node(id)?;
    if !is_repeated(node) {
        return None;
    }
    let parent = snapshot.parent(id)?;
    Some(format!(
        "{}>{}",
        path_key(snapshot, parent),
        node.role.to_ascii_lowercase()
    ))
}

struct GroupCount {
    region: String,
    role: String,
    count: usize,
    first_position: usize,
}

fn region_label(snapshot: &AccessibilitySnapshot, parent: NodeId) -> String {
    if let Some(node) = snapshot.node(parent) {
        let name = node.display_name();
        if !name.is_empty() {
            return name;
        }
    }
    match snapshot.landmark_of(parent) {
        Some(landmark) if !landmark.display_name().is_empty() => landmark.display_name(),
        Some(landmark) => landmark
            .landmark
            .map(|kind| kind.label().to_string())
            .unwrap_or_else(|| "page".to_string()),
        None => "page".to_string(),
    }
}

fn count_groups(
    snapshot: &AccessibilitySnapshot,
    policy: &DiffPolicy,
) -> BTreeMap<String, GroupCount> {
    let mut groups: BTreeMap<String, GroupCount> = BTreeMap::new();
    for node in snapshot.perceivable() {
        if !is_repeated(node) || ignored_anywhere(snapshot, policy, node.id) {
            continue;
        }
        let (Some(key), Some(parent)) = (group_key(snapshot, node.id), snapshot.parent(node.id))
        else {
            continue;
        };
        let position = snapshot.position(node.id).unwrap_or(usize::MAX);
        groups
            .entry(key)
            .and_modify(|group| group.count += 1)
            .or_insert_with(|| GroupCount {
                region: region_label(snapshot, parent),
                role: node.role.to_ascii_lowercase(),
                count: 1,
                first_position: position,
            });
    }
    groups
}

struct Walk<'a> {
    before: &'a AccessibilitySnapshot,
    after: &'a AccessibilitySnapshot,
    policy: &'a DiffPolicy,
    folded: HashSet<String>,
    events: Vec<ChangeEvent>,
}

impl<'a> Walk<'a> {
    fn new(
        before: &'a AccessibilitySnapshot,
        after: &'a AccessibilitySnapshot,
        policy: &'a DiffPolicy,
    ) -> Self {
        Self {
            before,
            after,
            policy,
            folded: HashSet::new(),
            events: Vec::new(),
        }
    }

    fn run(&mut self) {
        if self.before.url != self.after.url {
            self.events.push(ChangeEvent::UrlChanged {
                from: self.before.url.clone(),
                to: self.after.url.clone(),
            });
        }
        if self.before.title != self.after.title {
            self.events.push(ChangeEvent::TitleChanged {
                from: self.before.title.clone(),
                to: self.after.title.clone(),
            });
        }
        let focus_before = self.before.focused().map(AxNode::summary);
        let focus_after = self.after.focused().map(AxNode::summary);
        if focus_before != focus_after {
            self.events.push(ChangeEvent::FocusChanged {
                from: focus_before,
                to: focus_after,
            });
        }

        self.collect_counts();

        let (before, after) = (self.before, self.after);
        if let (Some(before_root), Some(after_root)) = (before.root_node(), after.root_node()) {
            if match_key(before_root).0 == match_key(after_root).0 {
                self.visit_matched(before_root.id, after_root.id);
            } else {
                self.added(after_root.id, false);
                self.removed(before_root.id, false);
            }
        }
    }

    fn collect_counts(&mut self) {
        let before = count_groups(self.before, self.policy);
        let mut after = count_groups(self.after, self.policy);
        let mut changed: Vec<(usize, String, ChangeEvent)> = Vec::new();

        for (key, old) in before {
            let (new_count, position, region) = match after.remove(&key) {
                Some(group) => (group.count, group.first_position, group.region),
                None => (0, old.first_position, old.region.clone()),
            };
            if new_count != old.count && new_count.max(old.count) >= 2 {
                changed.push((
                    position,
                    key,
                    ChangeEvent::CountChanged {
                        region,
                        role: old.role,
                        before: old.count,
                        after: new_count,
                    },
                ));
            }
        }
        for (key, group) in after {
            if group.count >= 2 {
                changed.push((
                    group.first_position,
                    key,
                    ChangeEvent::CountChanged {
                        region: group.region,
                        role: group.role,
                        before: 0,
                        after: group.count,
                    },
                ));
            }
        }

        changed.sort_by_key(|(position, _, _)| *position);
        for (_, key, event) in changed {
            self.folded.insert(key);
            self.events.push(event);
        }
    }

    fn is_folded(&self, snapshot: &AccessibilitySnapshot, id: NodeId) -> bool {
        group_key(snapshot, id)
            .map(|key| self.folded.contains(&key))
            .unwrap_or(false)
    }

    fn visit_matched(&mut self, before_id: NodeId, after_id: NodeId) {
        let (before, after) = (self.before, self.after);
        let (Some(before_node), Some(after_node)) = (before.node(before_id), after.node(after_id))
        else {
            return;
        };
        if ignored_here(self.policy, after_node) {
            return;
        }
        // present in both trees but only now on screen
        if !before.is_perceivable(before_id) && after.is_perceivable(after_id) {
            if let Some(kind) = DialogKind::from_role(&after_node.role) {
                self.dialog_appeared(after_node, kind);
            }
        }
        self.compare_states(before_node, after_node);

        let before_children = before.visible_children(before_id);
        let after_children = after.visible_children(after_id);
        let before_keys: Vec<_> = before_children
            .iter()
            .filter_map(|id| before.node(*id).map(match_key))
            .collect();
        let mut used = vec![false; before_children.len()];
        let mut cursor = 0;

        for child in after_children {
            let Some(node) = after.node(child) else {
                continue;
            };
            let key = match_key(node);
            let found = (cursor..before_children.len())
                .find(|idx| !used[*idx] && before_keys.get(*idx) == Some(&key));
            match found {
                Some(idx) => {
                    used[idx] = true;
                    cursor = idx + 1;
                    self.visit_matched(before_children[idx], child);
                }
                None => self.added(child, false),
            }
        }

        for (idx, child) in before_children.into_iter().enumerate() {
            if !used[idx] {
                self.removed(child, false);
            }
        }
    }

    fn compare_states(&mut self, before: &AxNode, after: &AxNode) {
        if !self.after.is_perceivable(after.id) {
            return;
        }
        for change in before.states.changes_to(&after.states) {
            if change.flag == StateFlag::Invalid {
                if change.after == Some(true) {
                    self.events.push(ChangeEvent::ValidationErrorAppeared {
                        message: field_message(after),
                        field: Some(after.summary()),
                    });
                }
                continue;
            }
            if is_significant(after) {
                self.events.push(ChangeEvent::StateChanged {
                    node: after.summary(),
                    change,
                });
            }
        }
    }

    fn added(&mut self, id: NodeId, collapsed: bool) {
        let after = self.after;
        let Some(node) = after.node(id) else {
            return;
        };
        if ignored_here(self.policy, node) {
            return;
        }
        let mut collapse = collapsed;
        if self.after.is_perceivable(id) {
            if let Some(kind) = DialogKind::from_role(&node.role) {
                self.dialog_appeared(node, kind);
                collapse = true;
            } else {
                if node.states.invalid && node.is_interactive() {
                    self.events.push(ChangeEvent::ValidationErrorAppeared {
                        message: field_message(node),
                        field: Some(node.summary()),
                    });
                }
                if self.is_folded(self.after, id) {
                    collapse = true;
                } else if let Some(landmark) = node.landmark.filter(|_| !collapsed) {
                    self.events.push(ChangeEvent::LandmarkAdded {
                        landmark,
                        name: node.display_name(),
                    });
                    collapse = true;
                } else if !collapsed && is_significant(node) {
                    self.events.push(ChangeEvent::NodeAdded {
                        node: node.summary(),
                    });
                    collapse = true;
                }
            }
        }
        for child in self.after.visible_children(id) {
            self.added(child, collapse);
        }
    }

    fn dialog_appeared(&mut self, node: &AxNode, kind: DialogKind) {
        let text = self.after.text_content(node.id, MESSAGE_CHARS);
        let event = match kind {
            DialogKind::Alert | DialogKind::Status
                if node.states.invalid || is_error_like(&text) =>
            {
                ChangeEvent::ValidationErrorAppeared {
                    message: text,
                    field: None,
                }
            }
            _ => ChangeEvent::DialogAppeared {
                dialog: kind,
                name: text,
            },
        };
        self.events.push(event);
    }

    fn removed(&mut self, id: NodeId, collapsed: bool) {
        let before = self.before;
        let Some(node) = before.node(id) else {
            return;
        };
        if ignored_here(self.policy, node) {
            return;
        }
        let mut collapse = collapsed;
        if self.before.is_perceivable(id) {
            if self.is_folded(self.before, id) {
                collapse = true;
            } else if let Some(landmark) = node.landmark.filter(|_| !collapsed) {
                self.events.push(ChangeEvent::LandmarkRemoved {
                    landmark,
                    name: node.display_name(),
                });
                collapse = true;
            } else if !collapsed && is_significant(node) {
                self.events.push(ChangeEvent::NodeRemoved {
                    node: node.summary(),
                });
                collapse = true;
            }
        }
        for child in self.before.visible_children(id) {
            self.removed(child, collapse);
        }
    }
}

fn field_message(node: &AxNode) -> String {
    node.description
        .as_deref()
        .map(normalize_text)
        .filter(|text| !text.is_empty())
        .unwrap_or_else(|| "invalid value".to_string())
}
