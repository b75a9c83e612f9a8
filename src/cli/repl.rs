use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use agent_core::SpeechSink;
use anyhow::{Context, Result};
use clap::Args;
use lighthouse_cli::{App, ConsoleSpeech, FixtureDriver};
use lighthouse_core_types::SessionId;
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::info;

use super::output::OutputFormat;

const REPL_HELP: &str = "Commands are spoken phrases, e.g. \"click the search button\". \
Meta commands: :url, :stats, :history, :set <path>=<value> [ttl_secs], :quit. \
Ctrl-C stops the running action.";

#[derive(Args, Clone, Debug)]
pub struct ReplArgs {
    /// Page fixture (YAML or JSON)
    #[arg(short, long)]
    pub fixture: PathBuf,

    /// Session id to use instead of a random one
    #[arg(long)]
    pub session: Option<String>,
}

pub async fn cmd_repl(args: ReplArgs, app: &App, output: OutputFormat) -> Result<()> {
    let driver = Arc::new(
        FixtureDriver::load(&args.fixture)
            .with_context(|| format!("Failed to load fixture {}", args.fixture.display()))?,
    );
    let speech: Option<Arc<dyn SpeechSink>> = match output {
        OutputFormat::Human => Some(Arc::new(ConsoleSpeech::stdout())),
        _ => None,
    };
    let session = args.session.as_deref().map(SessionId::from).unwrap_or_default();
    let handle = app.open_session(session, driver.clone(), speech)?;
    info!(session = %handle.id(), url = %driver.current_url(), "REPL session opened");
    let shutdown = CancellationToken::new();
    let sweeper = app.spawn_sweeper(shutdown.clone());
    println!("{REPL_HELP}");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("you> ");
        std::io::stdout().flush()?;

        let line = tokio::select! {
            line = lines.next_line() => line.context("Failed to read stdin")?,
            _ = signal::ctrl_c() => None,
        };
        let Some(line) = line else { break };
        let line = line.trim().to_string();
        match line.as_str() {
            "" => continue,
            ":quit" | ":q" => break,
            ":help" => {
                println!("{REPL_HELP}");
                continue;
            }
            ":url" => {
                println!("{}", driver.current_url());
                continue;
            }
            ":stats" => {
                let stats = handle
                    .inspect(|controller| controller.history().stats())
                    .await;
                if !output.emit(&stats)? {
                    println!(
                        "{} attempts, {} succeeded, {} failed, {} pages visited",
                        stats.total_attempts, stats.successful, stats.failed, stats.pages_visited
                    );
                }
                continue;
            }
            ":history" => {
                let json = handle
                    .inspect(|controller| controller.history().export_json())
                    .await?;
                println!("{json}");
                continue;
            }
            _ => {}
        }
        if let Some(assignment) = line.strip_prefix(":set") {
            match parse_assignment(assignment) {
                Some((path, value, ttl)) => match app.apply_override(path, value, ttl).await {
                    Ok(()) => {
                        handle.reconfigure(app.config()).await;
                        println!("{path} updated");
                    }
                    Err(err) => println!("{path} not changed: {err}"),
                },
                None => println!("usage: :set <path>=<value> [ttl_secs]"),
            }
            continue;
        }
        // picks up expired overrides
        if app.refresh() {
            handle.reconfigure(app.config()).await;
        }

        let session = Arc::clone(&handle);
        let mut task = tokio::spawn(async move { session.handle_transcript(&line).await });
        let result = tokio::select! {
            result = &mut task => result?,
            _ = signal::ctrl_c() => {
                handle.cancel();
                task.await?
            }
        };
        if output.emit(&result)? {
            continue;
        }
        if result.speech.is_none() {
            // the sink failed; print what it would have said
            println!("lighthouse> {}", result.utterance.render());
        }
    }

    shutdown.cancel();
    sweeper.await?;
    app.sessions().remove(handle.id());
    info!("REPL session closed");
    Ok(())
}

/// `path=value [ttl_secs]`; the value is read as JSON, falling back to a plain string.
fn parse_assignment(raw: &str) -> Option<(&str, Value, u64)> {
    let raw = raw.trim();
    let (assignment, ttl) = match raw.rsplit_once(' ') {
        Some((head, tail)) if head.contains('=') => match tail.parse::<u64>() {
            Ok(ttl) => (head.trim(), ttl),
            Err(_) => (raw, 0),
        },
        _ => (raw, 0),
    };
    let (path, value) = assignment.split_once('=')?;
    let (path, value) = (path.trim(), value.trim());
    if path.is_empty() {
        return None;
    }
    let value = serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.to_string()));
    Some((path, value, ttl))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn assignments_parse_json_values_and_an_optional_ttl() {
        assert_eq!(
            parse_assignment(" executor.max_retries=4"),
            Some(("executor.max_retries", json!(4), 0))
        );
        assert_eq!(
            parse_assignment(" safety.allowed_domains=[\"a.test\",\"b.test\"] 60"),
            Some(("safety.allowed_domains", json!(["a.test", "b.test"]), 60))
        );
        assert_eq!(
            parse_assignment(" safety.allowed_domains = a.test, b.test"),
            Some(("safety.allowed_domains", json!("a.test, b.test"), 0))
        );
        assert_eq!(parse_assignment(" executor.max_retries"), None);
        assert_eq!(parse_assignment(" =4"), None);
    }
}
