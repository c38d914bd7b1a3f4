use config::{Config, Environment, File};
use microdantic::DEFAULT_FRAME_LIMIT;
use microdantic_logger::LogSettings;
use serde::Deserialize;
use std::borrow::Cow;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

const DEFAULT_CONFIG_FILE: &str = "mdantic";
const ENV_PREFIX: &str = "MDANTIC";

#[microdantic_derive::model_error]
pub enum ConfigError {
    #[error("Config error{}: {source}", format_context(.context))]
    Config { source: config::ConfigError, context: Option<Cow<'static, str>> },
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    /// Schema document used when a command names none.
    pub schema: Option<PathBuf>,
    pub frame_limit: usize,
    pub log: LogSettings,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self { schema: None, frame_limit: DEFAULT_FRAME_LIMIT, log: LogSettings::default() }
    }
}

/// Loads the configuration file overlaid with `MDANTIC__*` environment variables
/// (`MDANTIC__LOG__LEVEL` maps to `log.level`).
///
/// An explicit `path` must exist; without one `mdantic.toml` is read if present.
pub fn load_config(path: Option<&Path>) -> Result<CliConfig, ConfigError> {
    load_config_with(path, None)
}

pub(crate) fn load_config_with(
    path: Option<&Path>,
    env: Option<HashMap<String, String>>,
) -> Result<CliConfig, ConfigError> {
    let file = match path {
        Some(path) => File::from(path).required(true),
        None => File::with_name(DEFAULT_CONFIG_FILE).required(false),
    };

    Config::builder()
        .add_source(file)
        .add_source(Environment::with_prefix(ENV_PREFIX).separator("__").try_parsing(true).source(env))
        .build()
        .context("Failed to build config")?
        .try_deserialize::<CliConfig>()
        .context("Failed to deserialize config")
}
