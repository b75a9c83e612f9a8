use serde::{Deserialize, Serialize};

/// Churn filters applied by the differ.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiffPolicy {
    /// Subtrees under these roles never produce events.
    pub ignored_roles: Vec<String>,
    /// Case-insensitive substrings marking ad content by accessible name.
    pub ignored_name_markers: Vec<String>,
    pub max_events: Option<usize>,
}

impl Default for DiffPolicy {
    fn default() -> Self {
        Self {
            ignored_roles: vec!["timer".into(), "marquee".into()],
            ignored_name_markers: vec!["advertisement".into(), "sponsored".into()],
            max_events: None,
        }
    }
}

impl DiffPolicy {
    pub fn ignores_role(&self, role: &str) -> bool {
        self.ignored_roles
            .iter()
            .any(|ignored| ignored.eq_ignore_ascii_case(role))
    }

    pub fn ignores_name(&self, name: &str) -> bool {
        if name.is_empty() {
            return false;
        }
        let lowered = name.to_lowercase();
        self.ignored_name_markers
            .iter()
            .any(|marker| lowered.contains(&marker.to_lowercase()))
    }
}
