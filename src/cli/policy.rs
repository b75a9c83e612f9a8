use anyhow::Result;
use clap::{Args, Subcommand};
use lighthouse_policy_center::{PolicySnapshot, PolicySource};
use serde_json::json;

use super::output::OutputFormat;

#[derive(Args, Clone, Debug)]
pub struct PolicyArgs {
    #[command(subcommand)]
    pub command: PolicyCommand,
}

#[derive(Subcommand, Clone, Debug)]
pub enum PolicyCommand {
    Show(PolicyShowArgs),
}

#[derive(Args, Clone, Debug)]
pub struct PolicyShowArgs {
    /// Output JSON instead of human summary
    #[arg(long)]
    pub json: bool,

    /// List the source of every value
    #[arg(long)]
    pub provenance: bool,
}

pub fn cmd_policy(args: PolicyArgs, snapshot: &PolicySnapshot, output: OutputFormat) -> Result<()> {
    match args.command {
        PolicyCommand::Show(show_args) => {
            let output = if show_args.json {
                OutputFormat::Json
            } else {
                output
            };
            if output.emit(&json!({ "policy": snapshot }))? {
                return Ok(());
            }
            print_summary(snapshot);
            if show_args.provenance {
                print_provenance(snapshot);
            }
        }
    }
    Ok(())
}

fn print_summary(snapshot: &PolicySnapshot) {
    let safety = &snapshot.safety;
    println!("Policy Revision: {}", snapshot.rev);
    println!();
    println!("Safety → allowed_domains=[{}]", safety.allowed_domains.join(", "));
    println!(
        "Safety → restricted_actions=[{}]",
        safety.restricted_actions.join(", ")
    );
    for rule in &safety.domain_rules {
        println!(
            "Domain Rule {} → subdomains=[{}], blocked=[{}], confirm=[{}], restricted_paths=[{}]",
            rule.domain,
            rule.allowed_subdomains.join(", "),
            rule.blocked_actions.join(", "),
            rule.confirm_actions.join(", "),
            rule.restricted_paths.join(", ")
        );
    }
    println!(
        "Executor → idle_timeout_ms={}, max_retries={}, backoff_ms={}",
        snapshot.executor.idle_timeout_ms,
        snapshot.executor.max_retries,
        snapshot.executor.backoff_ms
    );
    println!(
        "NLU → confidence_threshold={}",
        snapshot.nlu.confidence_threshold
    );
    println!(
        "Session → history_capacity={}, idle_timeout_secs={}, max_sessions={}, cleanup_interval_secs={}",
        snapshot.session.history_capacity,
        snapshot.session.idle_timeout_secs,
        snapshot.session.max_sessions,
        snapshot.session.cleanup_interval_secs
    );
    println!(
        "Resolver → max_candidates={}",
        snapshot.resolver.max_candidates
    );
    println!(
        "Speech → timeout_ms={}, max_actions={}",
        snapshot.speech.timeout_ms, snapshot.speech.max_actions
    );
}

fn print_provenance(snapshot: &PolicySnapshot) {
    let mut entries: Vec<_> = snapshot.provenance.values().collect();
    entries.sort_by(|a, b| a.path.cmp(&b.path));
    println!();
    println!("Provenance:");
    for entry in entries {
        println!("  {:<40} {}", entry.path, source_label(entry.source));
    }
}

fn source_label(source: PolicySource) -> &'static str {
    match source {
        PolicySource::Builtin => "builtin",
        PolicySource::File => "file",
        PolicySource::Env => "env",
        PolicySource::Cli => "cli",
        PolicySource::RuntimeOverride => "runtime override",
    }
}
