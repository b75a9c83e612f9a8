//! Conversion from the DevTools `Accessibility.getFullAXTree` payload.

use std::collections::HashMap;
use std::time::Instant;

use serde_json::Value;

use crate::errors::PerceiverError;
use crate::events;
use crate::model::{AccessibilitySnapshot, AxNode, NodeId, SnapshotRecord};

/// Builds a snapshot from a `getFullAXTree` result (`{"nodes": [...]}` or the bare array).
///
/// Ignored nodes are kept as role `none` so their children stay attached.
/// `childIds` wins over `parentId` when both are present.
pub fn snapshot_from_cdp(
    title: &str,
    url: &str,
    raw: &Value,
) -> Result<AccessibilitySnapshot, PerceiverError> {
    let started = Instant::now();
    let entries = raw
        .get("nodes")
        .and_then(Value::as_array)
        .or_else(|| raw.as_array())
        .ok_or_else(|| PerceiverError::malformed("expected a nodes array"))?;
    if entries.is_empty() {
        return Err(PerceiverError::malformed("empty accessibility tree"));
    }

    let mut ids: HashMap<String, NodeId> = HashMap::with_capacity(entries.len());
    for (idx, entry) in entries.iter().enumerate() {
        let raw_id = cdp_id(entry.get("nodeId"))
            .ok_or_else(|| PerceiverError::malformed(format!("node {idx} has no nodeId")))?;
        if ids.insert(raw_id.clone(), NodeId(idx as u32)).is_some() {
            return Err(PerceiverError::malformed(format!("duplicate nodeId {raw_id}")));
        }
    }

    let mut nodes = Vec::with_capacity(entries.len());
    let mut explicit_children = vec![false; entries.len()];
    let mut root = None;
    for (idx, entry) in entries.iter().enumerate() {
        let id = NodeId(idx as u32);
        let mut node = convert_node(id, entry);
        if let Some(children) = entry.get("childIds").and_then(Value::as_array) {
            explicit_children[idx] = true;
            node.children = children
                .iter()
                .filter_map(|child| cdp_id(Some(child)))
                .filter_map(|child| ids.get(&child).copied())
                .collect();
        }
        if root.is_none() && cdp_id(entry.get("parentId")).is_none() {
            root = Some(id);
        }
        nodes.push(node);
    }

    // Trees that only carry parentId links.
    for (idx, entry) in entries.iter().enumerate() {
        let Some(parent) = cdp_id(entry.get("parentId")).and_then(|p| ids.get(&p).copied()) else {
            continue;
        };
        let parent_idx = parent.0 as usize;
        if !explicit_children[parent_idx] {
            nodes[parent_idx].children.push(NodeId(idx as u32));
        }
    }

    let root = root.unwrap_or(NodeId(0));
    let node_count = nodes.len();
    let snapshot = AccessibilitySnapshot::try_from(SnapshotRecord {
        id: None,
        captured_at: None,
        title: title.to_string(),
        url: url.to_string(),
        root,
        viewport: None,
        nodes,
    })?;
    events::emit_snapshot(url, node_count, "cdp", started.elapsed());
    Ok(snapshot)
}

fn cdp_id(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    }
}

/// `{"type": ..., "value": ...}` wrappers, or a bare value.
fn ax_value(value: Option<&Value>) -> Option<&Value> {
    let value = value?;
    match value.get("value") {
        Some(inner) => Some(inner),
        None => Some(value),
    }
}

fn ax_string(value: Option<&Value>) -> Option<String> {
    match ax_value(value)? {
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    }
}

fn ax_bool(value: &Value) -> Option<bool> {
    match ax_value(Some(value))? {
        Value::Bool(flag) => Some(*flag),
        Value::String(text) => match text.as_str() {
            "true" | "mixed" => Some(true),
            "false" => Some(false),
            // invalid uses "grammar"/"spelling" for true
            "grammar" | "spelling" => Some(true),
            _ => None,
        },
        _ => None,
    }
}

fn convert_node(id: NodeId, entry: &Value) -> AxNode {
    let ignored = entry.get("ignored").and_then(Value::as_bool).unwrap_or(false);
    let role = ax_string(entry.get("role"))
        .filter(|role| !role.is_empty() && !ignored)
        .unwrap_or_else(|| "none".to_string());
    let name = ax_string(entry.get("name")).unwrap_or_default();
    let mut node = AxNode::new(id, role, name);
    node.description = ax_string(entry.get("description")).filter(|text| !text.is_empty());
    node.text = ax_string(entry.get("value")).filter(|text| !text.is_empty());

    let properties = entry
        .get("properties")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default();
    for property in properties {
        let Some(key) = property.get("name").and_then(Value::as_str) else {
            continue;
        };
        let Some(value) = property.get("value") else {
            continue;
        };
        match key {
            "focused" => node.states.focused = ax_bool(value).unwrap_or(false),
            "disabled" => node.states.disabled = ax_bool(value).unwrap_or(false),
            "hidden" => node.states.hidden = ax_bool(value).unwrap_or(false),
            "expanded" => node.states.expanded = ax_bool(value),
            "checked" | "pressed" => node.states.checked = ax_bool(value),
            "selected" => node.states.selected = ax_bool(value).unwrap_or(false),
            "required" => node.states.required = ax_bool(value).unwrap_or(false),
            "invalid" => node.states.invalid = ax_bool(value).unwrap_or(false),
            "level" => {
                node.level = ax_value(Some(value))
                    .and_then(Value::as_u64)
                    .map(|level| level as u32)
            }
            _ => {}
        }
    }
    node
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn converts_full_ax_tree() {
        let raw = json!({
            "nodes": [
                {"nodeId": "1", "role": {"type": "role", "value": "RootWebArea"},
                 "name": {"type": "computedString", "value": "Inbox"}, "childIds": ["2", "3"]},
                {"nodeId": "2", "parentId": "1", "role": {"value": "heading"},
                 "name": {"value": "Messages"},
                 "properties": [{"name": "level", "value": {"type": "integer", "value": 1}}]},
                {"nodeId": "3", "parentId": "1", "ignored": true, "role": {"value": "generic"},
                 "childIds": ["4"]},
                {"nodeId": "4", "parentId": "3", "role": {"value": "textbox"},
                 "name": {"value": "Search mail"},
                 "properties": [
                    {"name": "focused", "value": {"type": "booleanOrUndefined", "value": true}},
                    {"name": "invalid", "value": {"type": "token", "value": "false"}}
                 ]}
            ]
        });
        let snapshot = snapshot_from_cdp("Inbox", "https://mail.example.com/", &raw).unwrap();
        assert_eq!(snapshot.len(), 4);
        assert_eq!(snapshot.main_heading().unwrap().name, "Messages");
        let focused = snapshot.focused().unwrap();
        assert_eq!(focused.role, "textbox");
        assert!(!focused.states.invalid);
        let wrapper = snapshot.parent(focused.id).and_then(|id| snapshot.node(id)).unwrap();
        assert_eq!(wrapper.role, "none");
    }

    #[test]
    fn parent_links_alone_build_the_tree() {
        let raw = json!([
            {"nodeId": 10, "role": {"value": "RootWebArea"}},
            {"nodeId": 11, "parentId": 10, "role": {"value": "button"}, "name": {"value": "Save"}},
        ]);
        let snapshot = snapshot_from_cdp("", "about:blank", &raw).unwrap();
        let save = snapshot.iter().find(|node| node.name == "Save").unwrap();
        assert_eq!(snapshot.parent(save.id), Some(snapshot.root));
    }

    #[test]
    fn rejects_payload_without_nodes() {
        let err = snapshot_from_cdp("", "about:blank", &json!({"foo": 1})).unwrap_err();
        assert!(matches!(err, PerceiverError::MalformedTree(_)));
    }
}
