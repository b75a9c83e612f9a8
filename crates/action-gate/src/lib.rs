//! Pre-action safety gate
//!
//! Every action passes through [`decide`] before it reaches the browser:
//! - navigation targets are checked against the domain allowlist
//! - sensitive kinds (delete, purchase, payment, account change) need a spoken confirmation
//! - per-domain rules can block kinds or ask for confirmation on specific paths

pub mod classify;
pub mod errors;
pub mod gate;
pub mod rules;
pub mod types;

pub use errors::*;
pub use gate::{decide, host_of, parse_destination, Destination};
pub use rules::{normalize_host, AllowEntry, DomainRule, SafetyConfig};
pub use types::*;
