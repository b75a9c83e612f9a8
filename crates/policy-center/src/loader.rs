use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::api::apply_override_to_snapshot;
use crate::defaults::default_snapshot;
use crate::errors::PolicyError;
use crate::model::{PolicySnapshot, PolicySource};

const ENV_PREFIX: &str = "LIGHTHOUSE_POLICY__";
const ENV_JSON: &str = "LIGHTHOUSE_POLICY_OVERRIDE_JSON";
const ENV_CLI_OVERRIDES: &str = "LIGHTHOUSE_POLICY_CLI_OVERRIDES";

#[derive(Debug, Default)]
pub struct LoadOptions {
    pub paths: Vec<PathBuf>,
    pub include_env: bool,
    pub include_cli_env: bool,
    /// `path=value` pairs given on the command line; applied last.
    pub cli_overrides: Vec<String>,
}

impl LoadOptions {
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self {
            paths: vec![path.into()],
            include_env: true,
            include_cli_env: true,
            cli_overrides: Vec::new(),
        }
    }
}

pub fn load_snapshot(path: Option<&Path>) -> Result<PolicySnapshot, PolicyError> {
    let mut options = LoadOptions::default();
    if let Some(p) = path {
        options.paths.push(p.to_path_buf());
    }
    options.include_env = true;
    options.include_cli_env = true;
    load_snapshot_with_options(&options)
}

pub fn load_snapshot_with_options(options: &LoadOptions) -> Result<PolicySnapshot, PolicyError> {
    let mut snapshot = default_snapshot();
    bootstrap_builtin_provenance(&mut snapshot)?;

    for path in &options.paths {
        if !path.exists() {
            return Err(PolicyError::Io(format!(
                "config file {} does not exist",
                path.display()
            )));
        }
        let overlay = overlays_from_file(path)?;
        debug!(path = %path.display(), entries = overlay.len(), "policy file loaded");
        apply_overlays(&mut snapshot, overlay)?;
    }

    if options.include_env {
        let env_overlays = overlays_from_env()?;
        apply_overlays(&mut snapshot, env_overlays)?;
    }

    if options.include_cli_env {
        if let Ok(raw) = env::var(ENV_CLI_OVERRIDES) {
            apply_overlays(&mut snapshot, parse_cli_overrides(raw.split(',')))?;
        }
    }
    apply_overlays(
        &mut snapshot,
        parse_cli_overrides(options.cli_overrides.iter().map(String::as_str)),
    )?;

    Ok(snapshot)
}

struct PolicyOverlay {
    path: String,
    value: Value,
    source: PolicySource,
}

fn apply_overlays(
    snapshot: &mut PolicySnapshot,
    overlays: Vec<PolicyOverlay>,
) -> Result<(), PolicyError> {
    for overlay in overlays {
        apply_override_to_snapshot(snapshot, &overlay.path, &overlay.value, overlay.source)?;
    }
    Ok(())
}

fn overlays_from_file(path: &Path) -> Result<Vec<PolicyOverlay>, PolicyError> {
    let content = fs::read_to_string(path).map_err(|err| PolicyError::Io(format!("{}", err)))?;
    let yaml_value: serde_yaml::Value =
        serde_yaml::from_str(&content).map_err(|err| PolicyError::Invalid(format!("{}", err)))?;
    let json_value =
        serde_json::to_value(yaml_value).map_err(|err| PolicyError::Invalid(format!("{}", err)))?;
    Ok(flatten_value(json_value, None, PolicySource::File))
}

fn overlays_from_env() -> Result<Vec<PolicyOverlay>, PolicyError> {
    let mut overlays = Vec::new();
    for (key, raw) in env::vars() {
        if let Some(stripped) = key.strip_prefix(ENV_PREFIX) {
            let path = stripped
                .split("__")
                .filter(|segment| !segment.is_empty())
                .map(|segment| segment.to_ascii_lowercase())
                .collect::<Vec<_>>()
                .join(".");
            if path.is_empty() {
                continue;
            }
            overlays.push(PolicyOverlay {
                path,
                value: parse_env_value(&raw),
                source: PolicySource::Env,
            });
        }
    }

    if let Ok(raw_json) = env::var(ENV_JSON) {
        if !raw_json.trim().is_empty() {
            let json_value: Value = serde_json::from_str(&raw_json)
                .map_err(|err| PolicyError::Invalid(format!("{}", err)))?;
            overlays.extend(flatten_value(json_value, None, PolicySource::Env));
        }
    }

    Ok(overlays)
}

fn parse_cli_overrides<'a>(tokens: impl Iterator<Item = &'a str>) -> Vec<PolicyOverlay> {
    let mut overlays = Vec::new();
    for token in tokens {
        let trimmed = token.trim();
        if trimmed.is_empty() {
            continue;
        }
        let (path, value_raw) = trimmed.split_once('=').unwrap_or((trimmed, ""));
        let path = path.trim();
        if path.is_empty() {
            continue;
        }
        overlays.push(PolicyOverlay {
            path: path.to_string(),
            value: parse_env_value(value_raw.trim()),
            source: PolicySource::Cli,
        });
    }
    overlays
}

fn parse_env_value(raw: &str) -> Value {
    if raw.is_empty() {
        return Value::Null;
    }
    if let Ok(parsed) = serde_json::from_str::<Value>(raw) {
        return parsed;
    }
    if let Ok(boolean) = raw.parse::<bool>() {
        return Value::Bool(boolean);
    }
    if let Ok(int_val) = raw.parse::<i64>() {
        return Value::Number(int_val.into());
    }
    Value::String(raw.to_string())
}

fn flatten_value(value: Value, prefix: Option<String>, source: PolicySource) -> Vec<PolicyOverlay> {
    match value {
        Value::Object(map) => {
            let mut result = Vec::new();
            for (key, value) in map {
                let key_segment = key.trim().to_ascii_lowercase();
                let next_prefix = match &prefix {
                    Some(prefix) if !prefix.is_empty() => format!("{}.{}", prefix, key_segment),
                    _ => key_segment,
                };
                result.extend(flatten_value(value, Some(next_prefix), source));
            }
            result
        }
        other => match prefix {
            Some(prefix) => vec![PolicyOverlay {
                path: prefix,
                value: other,
                source,
            }],
            None => Vec::new(),
        },
    }
}

fn section_overlays<T: Serialize>(
    section: &T,
    name: &str,
) -> Result<Vec<PolicyOverlay>, PolicyError> {
    let value =
        serde_json::to_value(section).map_err(|err| PolicyError::Invalid(format!("{}", err)))?;
    Ok(flatten_value(value, Some(name.into()), PolicySource::Builtin))
}

fn bootstrap_builtin_provenance(snapshot: &mut PolicySnapshot) -> Result<(), PolicyError> {
    let mut overlays = Vec::new();
    overlays.extend(section_overlays(&snapshot.safety, "safety")?);
    overlays.extend(section_overlays(&snapshot.executor, "executor")?);
    overlays.extend(section_overlays(&snapshot.nlu, "nlu")?);
    overlays.extend(section_overlays(&snapshot.session, "session")?);
    overlays.extend(section_overlays(&snapshot.resolver, "resolver")?);
    overlays.extend(section_overlays(&snapshot.diff, "diff")?);
    overlays.extend(section_overlays(&snapshot.speech, "speech")?);

    for overlay in overlays {
        snapshot.set_provenance(&overlay.path, overlay.source);
    }
    Ok(())
}
