use anyhow::Result;
use lighthouse_cli::App;

use super::check_url::cmd_check_url;
use super::env::CliArgs;
use super::policy::cmd_policy;
use super::repl::cmd_repl;
use super::replay::cmd_replay;
use crate::cli::commands::Commands;

pub async fn dispatch(cli: &CliArgs, app: &App) -> Result<()> {
    match cli.command.clone() {
        Commands::Policy(args) => cmd_policy(args, &app.policy(), cli.output),
        Commands::CheckUrl(args) => cmd_check_url(args, app, cli.output),
        Commands::Replay(args) => cmd_replay(args, app, cli.output).await,
        Commands::Repl(args) => cmd_repl(args, app, cli.output).await,
    }
}
