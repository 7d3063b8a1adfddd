//! Configuration loading and validation
//!
//! The YAML document is deserialized into raw serde structs, then validated
//! into the typed [`Config`] the daemon runs on. Validation is strict where
//! a mistake would misfire at runtime (unknown builtin, shell template
//! referencing a placeholder no phrase can bind) and forgiving where a
//! default is safe (missing wake words, out-of-range thresholds).
//! Everything here happens before the state machine starts; a validation
//! failure is fatal.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::command::{ActionDescriptor, BuiltinAction, CommandSpec};
use crate::executor::DEFAULT_MODULE;
use crate::matching::{placeholder_names, similarity::normalize};
use crate::{Error, Result};

/// Wake word used when the configuration provides none
pub const DEFAULT_WAKE_WORD: &str = "hey assistant";

const DEFAULT_MATCH_THRESHOLD: f32 = 0.75;
const DEFAULT_CONFIDENCE_THRESHOLD: f32 = 0.5;
const DEFAULT_EXECUTION_TIMEOUT_SECS: u64 = 30;
const DEFAULT_DWELL_SECS: u64 = 10;

/// Validated gateway configuration, read-only after load
#[derive(Debug, Clone)]
pub struct Config {
    /// Normalized wake phrases, never empty
    pub wake_words: Vec<String>,

    /// Minimum fuzzy similarity for wake and phrase matches, in `[0, 1]`
    pub match_threshold: f32,

    /// Minimum transcript confidence to consider an event, in `[0, 1]`
    pub confidence_threshold: f32,

    /// Deadline for one command execution
    pub execution_timeout: Duration,

    /// How long to stay in command mode before re-arming the wake gate
    pub command_dwell: Duration,

    /// Configured commands, in configuration order
    pub commands: Vec<CommandSpec>,
}

#[derive(Debug, Deserialize)]
struct RawConfig {
    #[serde(default)]
    wake_words: Vec<String>,
    match_threshold: Option<f32>,
    confidence_threshold: Option<f32>,
    execution_timeout: Option<u64>,
    command_dwell_secs: Option<u64>,
    #[serde(default)]
    commands: Vec<RawCommand>,
}

#[derive(Debug, Deserialize)]
struct RawCommand {
    #[serde(default)]
    phrases: Vec<String>,
    action: Option<RawAction>,
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum RawAction {
    Shell {
        command: Option<String>,
        #[serde(default)]
        commands: Vec<String>,
    },
    // `python` is the legacy tag for function actions
    #[serde(alias = "python")]
    Function {
        module: Option<String>,
        function: String,
    },
    Builtin {
        command: String,
    },
}

impl Config {
    /// Load and validate a configuration file
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read, parsed, or validated.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("failed to read {}: {e}", path.display())))?;
        let config = Self::from_yaml(&text)?;
        tracing::info!(
            path = %path.display(),
            commands = config.commands.len(),
            "configuration loaded"
        );
        Ok(config)
    }

    /// Parse and validate configuration from a YAML string
    ///
    /// # Errors
    ///
    /// Returns error if the document cannot be parsed or validated.
    pub fn from_yaml(text: &str) -> Result<Self> {
        let raw: RawConfig = serde_yaml::from_str(text)?;
        Self::validate(raw)
    }

    /// Default configuration file location
    ///
    /// The per-user config directory, falling back to the working directory.
    #[must_use]
    pub fn default_path() -> PathBuf {
        directories::ProjectDirs::from("dev", "omni", "hark").map_or_else(
            || PathBuf::from("hark.yaml"),
            |dirs| dirs.config_dir().join("config.yaml"),
        )
    }

    fn validate(raw: RawConfig) -> Result<Self> {
        let mut wake_words: Vec<String> = raw
            .wake_words
            .iter()
            .map(|w| normalize(w))
            .filter(|w| !w.is_empty())
            .collect();
        if wake_words.is_empty() {
            tracing::warn!(default = DEFAULT_WAKE_WORD, "no wake words configured, using default");
            wake_words = vec![DEFAULT_WAKE_WORD.to_string()];
        }

        let match_threshold =
            checked_threshold("match_threshold", raw.match_threshold, DEFAULT_MATCH_THRESHOLD);
        let confidence_threshold = checked_threshold(
            "confidence_threshold",
            raw.confidence_threshold,
            DEFAULT_CONFIDENCE_THRESHOLD,
        );

        let timeout_secs = raw.execution_timeout.unwrap_or(DEFAULT_EXECUTION_TIMEOUT_SECS);
        if timeout_secs == 0 {
            return Err(Error::Config(
                "execution_timeout must be greater than zero".to_string(),
            ));
        }

        let dwell_secs = raw.command_dwell_secs.unwrap_or(DEFAULT_DWELL_SECS);
        if dwell_secs == 0 {
            return Err(Error::Config(
                "command_dwell_secs must be greater than zero".to_string(),
            ));
        }

        let commands = raw
            .commands
            .into_iter()
            .enumerate()
            .map(|(index, cmd)| validate_command(index, cmd))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            wake_words,
            match_threshold,
            confidence_threshold,
            execution_timeout: Duration::from_secs(timeout_secs),
            command_dwell: Duration::from_secs(dwell_secs),
            commands,
        })
    }
}

/// Range-check a threshold, falling back to the default with a warning
fn checked_threshold(name: &str, value: Option<f32>, default: f32) -> f32 {
    match value {
        None => default,
        Some(v) if (0.0..=1.0).contains(&v) => v,
        Some(v) => {
            tracing::warn!(name, value = v, default, "threshold out of range, using default");
            default
        }
    }
}

fn validate_command(index: usize, raw: RawCommand) -> Result<CommandSpec> {
    let description = raw
        .description
        .unwrap_or_else(|| format!("command {index}"));

    if raw.phrases.is_empty() {
        return Err(Error::Config(format!(
            "command {index} ({description}) has an empty phrases list"
        )));
    }

    let phrases: Vec<String> = raw.phrases.iter().map(|p| normalize(p)).collect();
    if phrases.iter().any(String::is_empty) {
        return Err(Error::Config(format!(
            "command {index} ({description}) has a blank phrase"
        )));
    }

    let action = raw.action.ok_or_else(|| {
        Error::Config(format!("command {index} ({description}) is missing an action"))
    })?;

    let action = match action {
        RawAction::Shell { command, commands } => {
            let templates = match (command, commands) {
                (Some(single), rest) if rest.is_empty() => vec![single],
                (None, rest) if !rest.is_empty() => rest,
                (Some(_), _) => {
                    return Err(Error::Config(format!(
                        "command {index} ({description}) sets both 'command' and 'commands'"
                    )));
                }
                (None, _) => {
                    return Err(Error::Config(format!(
                        "command {index} ({description}) has a shell action with no command"
                    )));
                }
            };

            check_placeholder_references(index, &description, &phrases, &templates)?;
            ActionDescriptor::Shell(templates)
        }
        RawAction::Function { module, function } => ActionDescriptor::Function {
            module: module.unwrap_or_else(|| DEFAULT_MODULE.to_string()),
            function,
        },
        RawAction::Builtin { command } => BuiltinAction::from_name(&command)
            .map(ActionDescriptor::Builtin)
            .ok_or_else(|| {
                Error::Config(format!(
                    "command {index} ({description}) uses unknown builtin '{command}'"
                ))
            })?,
    };

    Ok(CommandSpec {
        phrases,
        action,
        description,
    })
}

/// A shell template may only reference placeholders some phrase can bind
fn check_placeholder_references(
    index: usize,
    description: &str,
    phrases: &[String],
    templates: &[String],
) -> Result<()> {
    let bindable: BTreeSet<String> = phrases.iter().flat_map(|p| placeholder_names(p)).collect();

    for template in templates {
        for name in placeholder_names(template) {
            if !bindable.contains(&name) {
                return Err(Error::Config(format!(
                    "command {index} ({description}) references '{{{name}}}' \
                     which no phrase provides"
                )));
            }
        }
    }

    Ok(())
}
