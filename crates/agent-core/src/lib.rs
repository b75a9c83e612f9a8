//! Command execution and perception loop.
//!
//! Turns classified voice intents into gated, retried browser actions and
//! short spoken summaries of what changed on the page.

pub mod agent_loop;
pub mod describe;
pub mod errors;
pub mod intent;
pub mod plan;
pub mod ports;
pub mod session;
pub mod sessions;
pub mod summarizer;

pub use agent_loop::{LoopConfig, LoopController, LoopOutcome, SpokenResult};
pub use describe::{describe_page, list_elements, ActionableElement, PageDescription};
pub use errors::AgentError;
pub use intent::{ClassifiedIntent, Intent};
pub use plan::{ActionPlan, ActionSchema, RetrySpec, SafetySchema, TargetSchema};
pub use ports::{IntentClassifier, SpeechSignal, SpeechSink};
pub use session::{LoopState, PendingFollowUp, SessionState};
pub use sessions::{SessionHandle, SessionPool};
pub use summarizer::{summarize_diff, Utterance, MAX_ACTIONS};
