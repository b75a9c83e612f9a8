//! Spoken labels for candidate lists

use std::collections::HashMap;

use perceiver_structural::{AccessibilitySnapshot, AxNode};

use crate::types::CandidateMetadata;

/// Where the node sits: nearest heading above it and its landmark.
pub fn metadata_for(snapshot: &AccessibilitySnapshot, node: &AxNode) -> CandidateMetadata {
    CandidateMetadata {
        dom_index: snapshot.position(node.id).unwrap_or(usize::MAX),
        heading: snapshot
            .preceding_heading(node.id)
            .map(AxNode::display_name)
            .filter(|name| !name.is_empty()),
        landmark: snapshot
            .landmark_of(node.id)
            .and_then(|landmark| landmark.landmark)
            .map(|landmark| landmark.label().to_string()),
    }
}

/// "button Add to cart under Deals", or "... in the sidebar" when no heading precedes it.
pub fn base_label(node: &AxNode, metadata: &CandidateMetadata) -> String {
    let mut summary = node.summary();
    if summary.name.is_empty() {
        summary.name = node.display_name();
    }
    let mut label = summary.to_string();
    if let Some(heading) = &metadata.heading {
        label.push_str(" under ");
        label.push_str(heading);
    } else if let Some(landmark) = &metadata.landmark {
        label.push_str(" in the ");
        label.push_str(landmark);
    }
    label
}

/// Appends ", N of M" to labels that would otherwise be spoken identically.
pub fn disambiguate(labels: Vec<String>) -> Vec<String> {
    let mut totals: HashMap<String, usize> = HashMap::new();
    for label in &labels {
        *totals.entry(label.clone()).or_default() += 1;
    }
    let mut seen: HashMap<String, usize> = HashMap::new();
    labels
        .into_iter()
        .map(|label| {
            let total = totals.get(&label).copied().unwrap_or(1);
            if total < 2 {
                return label;
            }
            let index = seen.entry(label.clone()).or_default();
            *index += 1;
            format!("{label}, {index} of {total}")
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn only_repeated_labels_get_qualifiers() {
        let labels = disambiguate(vec![
            "button Buy under Deals".into(),
            "button Buy under Books".into(),
            "button Buy under Deals".into(),
        ]);
        assert_eq!(
            labels,
            vec![
                "button Buy under Deals, 1 of 2".to_string(),
                "button Buy under Books".to_string(),
                "button Buy under Deals, 2 of 2".to_string(),
            ]
        );
    }
}
