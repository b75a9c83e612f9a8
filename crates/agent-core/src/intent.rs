//! Classified voice intents and their slots.

use action_locator::TargetDescriptor;
use action_primitives::{ScrollDirection, TypedText};
use serde::{Deserialize, Serialize};

/// One user command, already classified. Consumed by a single `handle()` call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "intent", rename_all = "snake_case")]
pub enum Intent {
    Navigate {
        url: String,
    },
    Click {
        target: TargetDescriptor,
    },
    Type {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        target: Option<TargetDescriptor>,
        text: TypedText,
    },
    Submit {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        target: Option<TargetDescriptor>,
    },
    Describe,
    ListElements {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        role: Option<String>,
    },
    WhatChanged,
    Scroll {
        direction: ScrollDirection,
    },
    Back,
    Forward,
    /// 1-based choice from a numbered listing.
    SelectOrdinal {
        index: usize,
    },
    Confirm,
    Cancel,
    Help,
    Stop,
}

impl Intent {
    pub fn name(&self) -> &'static str {
        match self {
            Intent::Navigate { .. } => "navigate",
            Intent::Click { .. } => "click",
            Intent::Type { .. } => "type",
            Intent::Submit { .. } => "submit",
            Intent::Describe => "describe",
            Intent::ListElements { .. } => "list_elements",
            Intent::WhatChanged => "what_changed",
            Intent::Scroll { .. } => "scroll",
            Intent::Back => "back",
            Intent::Forward => "forward",
            Intent::SelectOrdinal { .. } => "select_ordinal",
            Intent::Confirm => "confirm",
            Intent::Cancel => "cancel",
            Intent::Help => "help",
            Intent::Stop => "stop",
        }
    }

    /// Intents that never touch the page.
    pub fn is_conversational(&self) -> bool {
        matches!(
            self,
            Intent::SelectOrdinal { .. }
                | Intent::Confirm
                | Intent::Cancel
                | Intent::Help
                | Intent::Stop
        )
    }

    pub fn is_cancel(&self) -> bool {
        matches!(self, Intent::Cancel | Intent::Stop)
    }
}

/// Classifier output: the intent plus how sure the classifier is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifiedIntent {
    pub intent: Intent,
    /// 0.0 to 1.0.
    pub confidence: f64,
}

impl ClassifiedIntent {
    pub fn new(intent: Intent, confidence: f64) -> Self {
        Self {
            intent,
            confidence: confidence.clamp(0.0, 1.0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intents_serialize_with_tag() {
        let intent = Intent::Click {
            target: TargetDescriptor::new().with_name("Add to cart"),
        };
        let value = serde_json::to_value(&intent).unwrap();
        assert_eq!(value["intent"], "click");
        assert_eq!(value["target"]["name"], "Add to cart");

        let parsed: Intent =
            serde_json::from_value(serde_json::json!({"intent": "select_ordinal", "index": 2}))
                .unwrap();
        assert_eq!(parsed, Intent::SelectOrdinal { index: 2 });
    }

    #[test]
    fn typed_text_stays_out_of_debug_output() {
        let intent = Intent::Type {
            target: None,
            text: TypedText::from("secret words"),
        };
        assert!(!format!("{intent:?}").contains("secret"));
    }

    #[test]
    fn confidence_is_clamped() {
        assert_eq!(ClassifiedIntent::new(Intent::Help, 1.7).confidence, 1.0);
        assert_eq!(ClassifiedIntent::new(Intent::Help, -0.2).confidence, 0.0);
    }
}
