//! Collaborator ports: speech-to-intent on the way in, speech on the way out.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::errors::AgentError;
use crate::intent::ClassifiedIntent;
use crate::summarizer::Utterance;

/// Turns a transcript into an intent.
#[async_trait]
pub trait IntentClassifier: Send + Sync {
    async fn classify(&self, transcript: &str) -> Result<ClassifiedIntent, AgentError>;
}

/// How a spoken result ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpeechSignal {
    Completed,
    /// Interrupted by the user, or cut off by the controller's timeout.
    Cancelled,
}

/// Speaks utterances. Implementations may block until playback ends.
#[async_trait]
pub trait SpeechSink: Send + Sync {
    async fn speak(&self, utterance: &Utterance) -> Result<SpeechSignal, AgentError>;
}
