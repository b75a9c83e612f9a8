//! Browser driver port and the action executor
//!
//! This crate provides the execution half of the command loop:
//! - `BrowserDriver` port: snapshot, dispatch, navigate, wait-idle
//! - Primitive actions with redacted history targets
//! - Retrying executor with per-intent budgets and exponential backoff
//! - Cooperative cancellation through the session's token

pub mod driver;
pub mod errors;
pub mod executor;
pub mod retry;
pub mod types;

pub use driver::BrowserDriver;
pub use errors::*;
pub use executor::ActionExecutor;
pub use retry::RetryBudget;
pub use types::*;
