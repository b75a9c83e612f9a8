use action_gate::GateError;
use action_locator::LocatorError;
use action_primitives::DriverError;
use thiserror::Error;

/// Errors emitted by the agent-core crate.
#[derive(Debug, Error)]
pub enum AgentError {
    /// Policy values that cannot drive the loop.
    #[error("invalid loop configuration: {0}")]
    Config(String),

    /// Safety settings failed to parse into gate rules.
    #[error("safety configuration rejected: {0}")]
    Gate(#[from] GateError),

    /// The target description was unusable.
    #[error(transparent)]
    Locator(#[from] LocatorError),

    /// A browser call outside the executor failed.
    #[error("browser driver failed: {0}")]
    Driver(#[from] DriverError),

    /// The intent classifier could not produce an intent.
    #[error("intent classification failed: {0}")]
    Classifier(String),

    /// The speech sink reported a failure.
    #[error("speech output failed: {0}")]
    Speech(String),

    /// The session pool is at its limit.
    #[error("session limit reached ({0} sessions)")]
    SessionLimit(usize),

    /// No session exists under the given id.
    #[error("unknown session: {0}")]
    UnknownSession(String),
}

impl AgentError {
    /// Helper for configuration problems.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Helper for classifier failures.
    pub fn classifier(message: impl Into<String>) -> Self {
        Self::Classifier(message.into())
    }

    /// Helper for speech failures.
    pub fn speech(message: impl Into<String>) -> Self {
        Self::Speech(message.into())
    }

    /// Check if error is retryable
    pub fn is_retryable(&self) -> bool {
        match self {
            AgentError::Driver(err) => err.is_transient(),
            AgentError::Classifier(_) | AgentError::Speech(_) | AgentError::SessionLimit(_) => true,
            AgentError::Config(_)
            | AgentError::Gate(_)
            | AgentError::Locator(_)
            | AgentError::UnknownSession(_) => false,
        }
    }

    /// Get error severity (0=low, 1=medium, 2=high, 3=critical)
    pub fn severity(&self) -> u8 {
        match self {
            AgentError::Config(_) | AgentError::Gate(_) => 3,
            AgentError::Driver(err) => err.severity(),
            AgentError::SessionLimit(_) => 2,
            AgentError::Classifier(_) | AgentError::Speech(_) => 1,
            AgentError::Locator(_) | AgentError::UnknownSession(_) => 0,
        }
    }
}
