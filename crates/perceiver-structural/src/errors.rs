use thiserror::Error;

#[derive(Debug, Error)]
pub enum PerceiverError {
    #[error("invalid snapshot: {0}")]
    InvalidSnapshot(String),
    #[error("malformed accessibility tree: {0}")]
    MalformedTree(String),
    #[error("internal error: {0}")]
    Internal(String),
}

impl PerceiverError {
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::MalformedTree(msg.into())
    }
}
