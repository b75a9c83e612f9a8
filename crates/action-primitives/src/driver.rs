//! Browser driver port
//!
//! The protocol binding lives outside this workspace; the loop only needs
//! these four calls.

use std::time::Duration;

use async_trait::async_trait;
use perceiver_structural::AccessibilitySnapshot;

use crate::errors::DriverError;
use crate::types::{IdleStatus, PrimitiveAction};

#[async_trait]
pub trait BrowserDriver: Send + Sync {
    /// Captures the accessibility tree of the current page.
    async fn get_snapshot(&self) -> Result<AccessibilitySnapshot, DriverError>;

    /// Performs one element-level or history step. Navigation goes through [`Self::navigate`].
    async fn dispatch(&self, action: &PrimitiveAction) -> Result<(), DriverError>;

    async fn navigate(&self, url: &str) -> Result<(), DriverError>;

    /// Waits for network and DOM quiet, at most `timeout`.
    async fn wait_idle(&self, timeout: Duration) -> Result<IdleStatus, DriverError>;
}
