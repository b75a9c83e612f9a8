//! Transcript scripts run against a session, one line per utterance.

use agent_core::{LoopOutcome, SessionHandle, SpokenResult};
use lighthouse_core_types::SessionId;
use lighthouse_state_center::{HistoryEntry, SessionStats};
use serde::Serialize;
use tracing::info;

#[derive(Debug, Clone, Serialize)]
pub struct ReplayStep {
    pub transcript: String,
    pub result: SpokenResult,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReplayReport {
    pub session: SessionId,
    pub steps: Vec<ReplayStep>,
    pub stats: SessionStats,
    pub history: Vec<HistoryEntry>,
}

impl ReplayReport {
    pub fn outcomes(&self) -> Vec<LoopOutcome> {
        self.steps.iter().map(|step| step.result.status).collect()
    }
}

/// Non-empty lines that are not `#` comments.
pub fn parse_script(raw: &str) -> Vec<String> {
    raw.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect()
}

/// Feeds each transcript to the session in order.
pub async fn run_script(handle: &SessionHandle, transcripts: &[String]) -> ReplayReport {
    let mut steps = Vec::with_capacity(transcripts.len());
    for (index, transcript) in transcripts.iter().enumerate() {
        let result = handle.handle_transcript(transcript).await;
        info!(
            target: "loop",
            session = %handle.id(),
            step = index + 1,
            outcome = result.status.as_str(),
            "replay step finished"
        );
        steps.push(ReplayStep {
            transcript: transcript.clone(),
            result,
        });
    }
    let (stats, history) = handle
        .inspect(|controller| {
            let history = controller.history();
            (history.stats(), history.entries())
        })
        .await;
    ReplayReport {
        session: handle.id().clone(),
        steps,
        stats,
        history,
    }
}
