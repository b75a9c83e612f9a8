use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::Args;
use lighthouse_cli::{parse_script, run_script, App, FixtureDriver, ReplayReport};
use lighthouse_core_types::SessionId;
use tokio::fs;
use tracing::info;

use super::output::OutputFormat;

#[derive(Args, Clone, Debug)]
pub struct ReplayArgs {
    /// Transcript script, one utterance per line (`#` starts a comment)
    pub script: PathBuf,

    /// Page fixture (YAML or JSON)
    #[arg(short, long)]
    pub fixture: PathBuf,

    /// Session id to use instead of a random one
    #[arg(long)]
    pub session: Option<String>,

    /// Write the action history as JSON once the script finishes
    #[arg(long, value_name = "FILE")]
    pub export_history: Option<PathBuf>,
}

pub async fn cmd_replay(args: ReplayArgs, app: &App, output: OutputFormat) -> Result<()> {
    let raw = fs::read_to_string(&args.script)
        .await
        .with_context(|| format!("Failed to read script {}", args.script.display()))?;
    let transcripts = parse_script(&raw);
    if transcripts.is_empty() {
        bail!("script {} has no commands", args.script.display());
    }

    let driver = FixtureDriver::load(&args.fixture)
        .with_context(|| format!("Failed to load fixture {}", args.fixture.display()))?;
    let session = args.session.as_deref().map(SessionId::from).unwrap_or_default();
    let handle = app.open_session(session, Arc::new(driver), None)?;
    info!(
        session = %handle.id(),
        steps = transcripts.len(),
        "Replaying script"
    );

    let report = run_script(&handle, &transcripts).await;

    if let Some(path) = &args.export_history {
        let history = handle.inspect(|controller| controller.history()).await;
        history
            .write_json(path)
            .with_context(|| format!("Failed to write history to {}", path.display()))?;
        info!("History exported to: {}", path.display());
    }
    app.sessions().remove(handle.id());

    if !output.emit(&report)? {
        print_report(&report);
    }
    Ok(())
}

fn print_report(report: &ReplayReport) {
    for (index, step) in report.steps.iter().enumerate() {
        println!("{:>2}. \"{}\"", index + 1, step.transcript);
        println!(
            "    [{}] {}",
            step.result.status.as_str(),
            step.result.utterance.render()
        );
    }
    let stats = &report.stats;
    println!();
    println!(
        "Attempts → total={}, successful={}, failed={}, aborted={}, success_rate={:.0}%",
        stats.total_attempts,
        stats.successful,
        stats.failed,
        stats.aborted,
        stats.success_rate() * 100.0
    );
    println!("Pages visited → {}", stats.pages_visited);
}
