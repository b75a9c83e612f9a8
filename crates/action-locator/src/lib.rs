//! Element resolution and disambiguation over accessibility snapshots
//!
//! Turns a spoken target ("the second Add to cart button") into zero, one or
//! several candidates:
//! - Exact role and name match
//! - Role plus substring over name, text and aria-label
//! - Fuzzy token overlap as the last resort
//! - Hint narrowing of ties and ordinal selection
//! - Unique spoken labels for numbered listings

pub mod errors;
pub mod events;
pub mod labels;
pub mod resolver;
pub mod strategies;
pub mod types;

pub use errors::*;
pub use resolver::{resolve, resolve_with_options};
pub use strategies::{canonical_role, Strategy};
pub use types::*;
