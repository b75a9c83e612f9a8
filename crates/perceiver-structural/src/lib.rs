//! Accessibility snapshots and the semantic differ that turns two of them into
//! announceable change events.

pub mod cdp;
pub mod differ;
pub mod errors;
pub mod events;
pub mod model;
pub mod policy;

pub use cdp::snapshot_from_cdp;
pub use differ::{diff, diff_with_policy};
pub use errors::PerceiverError;
pub use model::{
    AccessibilitySnapshot, AxNode, Bounds, ChangeEvent, DialogKind, Diff, Landmark, NodeId,
    NodeSummary, SnapshotBuilder, SnapshotRecord, StateChange, StateFlag, StateFlags, Viewport,
};
pub use policy::DiffPolicy;
