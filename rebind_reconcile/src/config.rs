//! Recognized configuration surface, loaded from a TOML table. Every key is
//! optional; missing keys take the defaults below and unknown keys are
//! ignored so hosts can share one settings file.

use std::fmt::{Display, Formatter};
use std::fs;
use std::path::Path;

use toml::Value;

#[derive(Debug, Clone, PartialEq)]
pub struct ReconcileConfig {
    /// Master switch: when false the engine never leaves Idle.
    pub persistence_enabled: bool,
    /// Delay before the first indexing pass; the graph may still be populating.
    pub settle_delay_secs: f32,
    /// Maximum reconciliation passes before giving up with partial results.
    pub max_retries: u32,
    /// Base inter-retry backoff; scaled linearly by the attempt number.
    pub retry_backoff_secs: f32,
    /// Subtrees whose root name starts with this prefix are never baked.
    pub bake_ignore_prefix: String,
    /// Scenes to bake identities for.
    pub bake_scenes: Vec<String>,
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            persistence_enabled: true,
            settle_delay_secs: 1.0,
            max_retries: 3,
            retry_backoff_secs: 0.5,
            bake_ignore_prefix: String::new(),
            bake_scenes: Vec::new(),
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    ParseToml(toml::de::Error),
    InvalidField(&'static str, String),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(err) => write!(f, "{err}"),
            Self::ParseToml(err) => write!(f, "{err}"),
            Self::InvalidField(field, reason) => write!(f, "invalid field `{field}`: {reason}"),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<std::io::Error> for ConfigError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<toml::de::Error> for ConfigError {
    fn from(value: toml::de::Error) -> Self {
        Self::ParseToml(value)
    }
}

impl ReconcileConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    pub fn parse(contents: &str) -> Result<Self, ConfigError> {
        let value: Value = contents.parse::<Value>()?;
        // Keys may live at the top level or under a [persistence] table.
        let table = value.get("persistence").unwrap_or(&value);

        let mut config = Self::default();

        if let Some(v) = table.get("persistence_enabled") {
            config.persistence_enabled = v
                .as_bool()
                .ok_or_else(|| invalid("persistence_enabled", v))?;
        }
        if let Some(v) = table.get("settle_delay_secs") {
            config.settle_delay_secs = as_seconds("settle_delay_secs", v)?;
        }
        if let Some(v) = table.get("max_retries") {
            let n = v
                .as_integer()
                .filter(|n| *n >= 1)
                .ok_or_else(|| invalid("max_retries", v))?;
            config.max_retries = n as u32;
        }
        if let Some(v) = table.get("retry_backoff_secs") {
            config.retry_backoff_secs = as_seconds("retry_backoff_secs", v)?;
        }
        if let Some(v) = table.get("bake_ignore_prefix") {
            config.bake_ignore_prefix = v
                .as_str()
                .ok_or_else(|| invalid("bake_ignore_prefix", v))?
                .to_string();
        }
        if let Some(v) = table.get("bake_scenes") {
            let list = v.as_array().ok_or_else(|| invalid("bake_scenes", v))?;
            config.bake_scenes = list
                .iter()
                .map(|entry| {
                    entry
                        .as_str()
                        .map(str::to_string)
                        .ok_or_else(|| invalid("bake_scenes", entry))
                })
                .collect::<Result<_, _>>()?;
        }

        Ok(config)
    }
}

fn as_seconds(field: &'static str, v: &Value) -> Result<f32, ConfigError> {
    let secs = v
        .as_float()
        .or_else(|| v.as_integer().map(|n| n as f64))
        .ok_or_else(|| invalid(field, v))?;
    if !(0.0..=3600.0).contains(&secs) {
        return Err(ConfigError::InvalidField(
            field,
            format!("{secs} is out of range"),
        ));
    }
    Ok(secs as f32)
}

fn invalid(field: &'static str, v: &Value) -> ConfigError {
    ConfigError::InvalidField(field, format!("unexpected value `{v}`"))
}
