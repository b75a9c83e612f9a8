//! Error types for gate configuration

use thiserror::Error;

/// Gate error enumeration
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GateError {
    /// Action kind name not recognised
    #[error("Unknown action kind: {0}")]
    UnknownActionKind(String),

    /// Allowlist or domain rule entry cannot be used
    #[error("Invalid domain rule: {0}")]
    InvalidRule(String),
}

impl GateError {
    /// Gate errors come from configuration and never go away on retry
    pub fn is_retryable(&self) -> bool {
        false
    }

    /// Get error severity (0=low, 1=medium, 2=high, 3=critical)
    pub fn severity(&self) -> u8 {
        match self {
            GateError::UnknownActionKind(_) | GateError::InvalidRule(_) => 2,
        }
    }
}
