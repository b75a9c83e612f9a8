//! Error types for locator system

use thiserror::Error;

/// Locator error enumeration
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LocatorError {
    /// Descriptor carries nothing to match on, or an unusable ordinal
    #[error("Invalid target: {0}")]
    InvalidDescriptor(String),
}

impl LocatorError {
    /// Descriptor problems are the caller's; retrying will not help
    pub fn is_retryable(&self) -> bool {
        false
    }

    /// Get error severity (0=low, 1=medium, 2=high, 3=critical)
    pub fn severity(&self) -> u8 {
        match self {
            LocatorError::InvalidDescriptor(_) => 1,
        }
    }
}
