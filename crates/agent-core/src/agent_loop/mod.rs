//! The command loop for one session.
//!
//! # Flow
//!
//! ```text
//! intent -> gate -> (deny | confirm? -> suspend)
//!        -> resolve -> (none | many -> suspend)
//!        -> execute (bounded retries) -> snapshot -> redirect check
//!        -> diff -> summarise -> spoken result
//! ```
//!
//! # Key Components
//!
//! - [`LoopConfig`]: policy-derived settings
//! - [`LoopController`]: state machine over Idle, AwaitingConfirmation and AwaitingDisambiguation
//! - [`SpokenResult`]: status, utterance and execution report

pub mod config;
pub mod controller;
pub mod types;

pub use config::LoopConfig;
pub use controller::LoopController;
pub use types::{LoopOutcome, SpokenResult};
