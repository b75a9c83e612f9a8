use anyhow::{bail, Result};
use clap::Args;
use lighthouse_cli::App;
use serde_json::json;

use super::output::OutputFormat;

#[derive(Args, Clone, Debug)]
pub struct CheckUrlArgs {
    /// Address to check, with or without a scheme
    pub url: String,

    /// Fail unless the navigation is allowed outright
    #[arg(long)]
    pub strict: bool,
}

pub fn cmd_check_url(args: CheckUrlArgs, app: &App, output: OutputFormat) -> Result<()> {
    let verdict = app.check_url(&args.url);
    let printed = output.emit(&json!({
        "url": &args.url,
        "verdict": &verdict,
    }))?;
    if !printed {
        match verdict.reason() {
            Some(reason) => println!("{}: {} ({})", args.url, verdict.label(), reason),
            None => println!("{}: {}", args.url, verdict.label()),
        }
    }
    if args.strict && !verdict.is_allow() {
        bail!("navigation to {} is not allowed outright", args.url);
    }
    Ok(())
}
