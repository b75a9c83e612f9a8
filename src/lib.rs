//! Lighthouse command-line front end
//!
//! Keyword intent classification, fixture-backed browsing and transcript
//! replay around the `agent-core` loop. Exposed as a library for integration
//! testing.

pub mod app;
pub mod classifier;
pub mod console;
pub mod fixture;
pub mod replay;

pub use app::App;
pub use classifier::{parse_target, KeywordClassifier};
pub use console::ConsoleSpeech;
pub use fixture::{FixtureDriver, FixtureError, FixtureFile};
pub use replay::{parse_script, run_script, ReplayReport, ReplayStep};
