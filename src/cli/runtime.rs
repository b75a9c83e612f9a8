use std::path::PathBuf;

use anyhow::{Context, Result};
use lighthouse_policy_center::{load_snapshot_with_options, LoadOptions, PolicySnapshot};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

pub fn init_logging(level: &str, debug: bool, json: bool) -> Result<()> {
    let level = if debug {
        tracing::Level::DEBUG
    } else {
        level.parse().context("Invalid log level")?
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level.to_string()));
    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }

    Ok(())
}

/// Policy file to load when `--config` is not given, if one exists.
fn default_policy_path() -> Option<PathBuf> {
    // Priority: ./config/policy.yaml > ~/.config/lighthouse/policy.yaml
    let local = PathBuf::from("config/policy.yaml");
    if local.exists() {
        return Some(local);
    }
    let mut path = dirs::config_dir()?;
    path.push("lighthouse");
    path.push("policy.yaml");
    path.exists().then_some(path)
}

pub fn load_policy(config_path: Option<&PathBuf>, overrides: &[String]) -> Result<PolicySnapshot> {
    let mut options = LoadOptions {
        include_env: true,
        include_cli_env: true,
        cli_overrides: overrides.to_vec(),
        ..LoadOptions::default()
    };
    match config_path.cloned().or_else(default_policy_path) {
        Some(path) => {
            info!("Loading policy from: {}", path.display());
            options.paths.push(path);
        }
        None => warn!("No policy file found, using built-in defaults"),
    }

    load_snapshot_with_options(&options).context("Failed to load policy")
}
