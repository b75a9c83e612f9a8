use thiserror::Error;

#[derive(Debug, Error)]
pub enum StateError {
    #[error("history export failed: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("history write failed: {0}")]
    Io(#[from] std::io::Error),
}

impl StateError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, StateError::Io(_))
    }

    /// Get error severity (0=low, 1=medium, 2=high, 3=critical)
    pub fn severity(&self) -> u8 {
        match self {
            StateError::Serialize(_) => 2,
            StateError::Io(_) => 1,
        }
    }
}
