use clap::Subcommand;

use super::check_url::CheckUrlArgs;
use super::policy::PolicyArgs;
use super::repl::ReplArgs;
use super::replay::ReplayArgs;

#[derive(Subcommand, Clone)]
pub enum Commands {
    /// Show the effective policy and where each value came from
    Policy(PolicyArgs),

    /// Ask the safety gate whether a navigation would be allowed
    CheckUrl(CheckUrlArgs),

    /// Run a transcript script against a page fixture
    Replay(ReplayArgs),

    /// Type commands against a page fixture, one per line
    Repl(ReplArgs),
}
