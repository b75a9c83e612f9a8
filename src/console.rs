//! Terminal stand-in for the speech engine.

use std::io::Write;

use agent_core::{AgentError, SpeechSignal, SpeechSink, Utterance};
use async_trait::async_trait;
use parking_lot::Mutex;

/// Prints each utterance as one line.
pub struct ConsoleSpeech<W: Write + Send> {
    out: Mutex<W>,
    prefix: String,
}

impl ConsoleSpeech<std::io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(std::io::stdout(), "lighthouse> ")
    }
}

impl<W: Write + Send> ConsoleSpeech<W> {
    pub fn new(out: W, prefix: impl Into<String>) -> Self {
        Self {
            out: Mutex::new(out),
            prefix: prefix.into(),
        }
    }

    pub fn into_inner(self) -> W {
        self.out.into_inner()
    }
}

#[async_trait]
impl<W: Write + Send> SpeechSink for ConsoleSpeech<W> {
    async fn speak(&self, utterance: &Utterance) -> Result<SpeechSignal, AgentError> {
        let mut out = self.out.lock();
        writeln!(out, "{}{}", self.prefix, utterance.render())
            .and_then(|_| out.flush())
            .map_err(|err| AgentError::speech(err.to_string()))?;
        Ok(SpeechSignal::Completed)
    }
}
