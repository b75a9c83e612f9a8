//! Error types for browser driver operations

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// What went wrong inside the browser binding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DriverErrorKind {
    /// Page or target not attached yet (or detached mid-call)
    NotAttached,

    /// Element went away between resolution and dispatch
    StaleElement,

    /// Another element received the click (overlay, animation)
    ClickIntercepted,

    /// Driver-side timeout on a single call
    Timeout,

    /// Browser or renderer crashed
    Crashed,

    /// Navigation was redirected somewhere the session may not go
    DisallowedRedirect,

    /// Host could not be reached
    Unreachable,

    /// Protocol violation or unexpected response
    Protocol,
}

impl DriverErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DriverErrorKind::NotAttached => "not_attached",
            DriverErrorKind::StaleElement => "stale_element",
            DriverErrorKind::ClickIntercepted => "click_intercepted",
            DriverErrorKind::Timeout => "timeout",
            DriverErrorKind::Crashed => "crashed",
            DriverErrorKind::DisallowedRedirect => "disallowed_redirect",
            DriverErrorKind::Unreachable => "unreachable",
            DriverErrorKind::Protocol => "protocol",
        }
    }
}

impl fmt::Display for DriverErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failure reported by a [`crate::BrowserDriver`] call
#[derive(Debug, Error, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[error("{kind}: {message}")]
pub struct DriverError {
    pub kind: DriverErrorKind,
    pub message: String,
}

impl DriverError {
    pub fn new(kind: DriverErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn stale_element(message: impl Into<String>) -> Self {
        Self::new(DriverErrorKind::StaleElement, message)
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(DriverErrorKind::Timeout, message)
    }

    pub fn protocol(message: impl Into<String>) -> Self {
        Self::new(DriverErrorKind::Protocol, message)
    }

    /// Transient failures are worth another attempt after a backoff
    pub fn is_transient(&self) -> bool {
        matches!(
            self.kind,
            DriverErrorKind::NotAttached
                | DriverErrorKind::StaleElement
                | DriverErrorKind::ClickIntercepted
                | DriverErrorKind::Timeout
        )
    }

    /// Get error severity level (0=low, 1=medium, 2=high, 3=critical)
    pub fn severity(&self) -> u8 {
        match self.kind {
            DriverErrorKind::Crashed => 3,
            DriverErrorKind::DisallowedRedirect
            | DriverErrorKind::Unreachable
            | DriverErrorKind::Protocol => 2,
            DriverErrorKind::Timeout | DriverErrorKind::NotAttached => 1,
            DriverErrorKind::StaleElement | DriverErrorKind::ClickIntercepted => 0,
        }
    }
}
