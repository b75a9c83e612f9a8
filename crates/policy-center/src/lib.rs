pub mod api;
pub mod defaults;
pub mod errors;
pub mod loader;
pub mod model;
pub mod override_store;

pub use api::{InMemoryPolicyCenter, PolicyCenter};
pub use defaults::default_snapshot;
pub use errors::PolicyError;
pub use loader::{load_snapshot, load_snapshot_with_options, LoadOptions};
pub use model::{
    DomainRulePolicy, ExecutorPolicy, NluPolicy, PolicySnapshot, PolicySource, PolicyView,
    ResolverPolicy, RuntimeOverrideSpec, SafetyPolicy, SessionPolicy, SpeechPolicy,
    StructuralDiffPolicy,
};

#[cfg(test)]
mod tests;
