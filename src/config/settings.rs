//! TOML-based configuration for promsense.
//!
//! Supports a config file (promsense.toml) with environment variable
//! expansion in the server address.
//!
//! Example configuration:
//! ```toml
//! [editor]
//! validation_delay_ms = 300
//! projection_delay_ms = 150
//! max_proposals = 200
//!
//! [grammar]
//! extra_metrics = ["checkout_orders_total"]
//!
//! [grammar.labels]
//! checkout_orders_total = ["region", "status"]
//!
//! [server]
//! websocket_addr = "${PROMSENSE_BIND:-127.0.0.1:9257}"
//!
//! [logging]
//! filter = "promsense=debug"
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use crate::grammar::GrammarModel;

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV: &str = "PROMSENSE_CONFIG";

/// File name searched for in the working and user config directories.
pub const CONFIG_FILE: &str = "promsense.toml";

/// Error type for settings.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("Config file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Root configuration structure.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Settings {
    pub editor: EditorSettings,
    pub grammar: GrammarSettings,
    pub server: ServerSettings,
    pub logging: LoggingSettings,
}

/// Editor timing and limits.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct EditorSettings {
    /// Debounce before validating after an edit.
    pub validation_delay_ms: u64,

    /// Delay between a validation pass and pushing its markers.
    pub projection_delay_ms: u64,

    /// Upper bound on proposals per completion request.
    pub max_proposals: usize,
}

impl Default for EditorSettings {
    fn default() -> Self {
        Self {
            validation_delay_ms: 300,
            projection_delay_ms: 150,
            max_proposals: 200,
        }
    }
}

/// Vocabulary added on top of the builtin grammar.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct GrammarSettings {
    /// Additional metric names.
    pub extra_metrics: Vec<String>,

    /// Labels per metric. Applies to builtin and extra metrics alike.
    pub labels: BTreeMap<String, Vec<String>>,
}

/// Language server settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerSettings {
    /// Bind address for the WebSocket transport (supports ${ENV_VAR}).
    pub websocket_addr: String,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            websocket_addr: "127.0.0.1:9257".to_string(),
        }
    }
}

impl ServerSettings {
    /// The WebSocket address with environment variables expanded.
    pub fn resolved_websocket_addr(&self) -> Result<SocketAddr, SettingsError> {
        let expanded = expand_env_vars(&self.websocket_addr)?;
        expanded.parse().map_err(|_| {
            SettingsError::InvalidConfig(format!(
                "server.websocket_addr is not a socket address: {}",
                expanded
            ))
        })
    }
}

/// Log filter used when `PROMSENSE_LOG` is unset.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// `tracing_subscriber::EnvFilter` directive string.
    pub filter: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            filter: "warn".to_string(),
        }
    }
}

impl Settings {
    /// Load settings from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, SettingsError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(SettingsError::FileNotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse and validate settings from TOML text.
    pub fn from_toml(content: &str) -> Result<Self, SettingsError> {
        let settings: Settings = toml::from_str(content)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Load settings, preferring an explicit path.
    ///
    /// Searches in order:
    /// 1. `explicit` (the `--config` flag)
    /// 2. Environment variable `PROMSENSE_CONFIG`
    /// 3. `./promsense.toml`
    /// 4. `<config dir>/promsense/promsense.toml`
    ///
    /// Falls back to defaults when nothing is found.
    pub fn load(explicit: Option<&Path>) -> Result<Self, SettingsError> {
        if let Some(path) = explicit {
            return Self::from_file(path);
        }

        if let Ok(path) = env::var(CONFIG_ENV) {
            return Self::from_file(&path);
        }

        match Self::discover() {
            Some(path) => Self::from_file(&path),
            None => Ok(Settings::default()),
        }
    }

    /// First config file found in the working or user config directory.
    pub fn discover() -> Option<PathBuf> {
        let local_config = PathBuf::from(CONFIG_FILE);
        if local_config.exists() {
            return Some(local_config);
        }

        let user_config = dirs::config_dir()?.join("promsense").join(CONFIG_FILE);
        user_config.exists().then_some(user_config)
    }

    /// Reject values the engine cannot work with.
    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.editor.max_proposals == 0 {
            return Err(SettingsError::InvalidConfig(
                "editor.max_proposals must be at least 1".to_string(),
            ));
        }

        for metric in self.grammar.extra_metrics.iter().chain(self.grammar.labels.keys()) {
            if !is_metric_name(metric) {
                return Err(SettingsError::InvalidConfig(format!(
                    "invalid metric name: {:?}",
                    metric
                )));
            }
        }

        for (metric, labels) in &self.grammar.labels {
            if let Some(label) = labels.iter().find(|l| !is_label_name(l)) {
                return Err(SettingsError::InvalidConfig(format!(
                    "invalid label name {:?} for metric {}",
                    label, metric
                )));
            }
        }

        if self.logging.filter.trim().is_empty() {
            return Err(SettingsError::InvalidConfig(
                "logging.filter must not be empty".to_string(),
            ));
        }

        Ok(())
    }

    /// Build the grammar: builtin vocabulary plus the configured extensions.
    pub fn grammar(&self) -> GrammarModel {
        let mut builder = GrammarModel::builder();

        for metric in &self.grammar.extra_metrics {
            builder = match self.grammar.labels.get(metric) {
                Some(labels) => builder.metric(metric.as_str(), labels.iter().map(String::as_str)),
                None => builder.unconstrained_metric(metric.as_str()),
            };
        }

        // Labels for metrics not listed in extra_metrics (usually builtins).
        for (metric, labels) in &self.grammar.labels {
            if !self.grammar.extra_metrics.contains(metric) {
                builder = builder.metric(metric.as_str(), labels.iter().map(String::as_str));
            }
        }

        builder.build()
    }
}

fn is_metric_name(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c == '_' || c == ':' || c.is_ascii_alphabetic())
        && chars.all(|c| c == '_' || c == ':' || c.is_ascii_alphanumeric())
}

fn is_label_name(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c == '_' || c.is_ascii_alphabetic())
        && chars.all(|c| c == '_' || c.is_ascii_alphanumeric())
}

/// Expand environment variables in a string.
///
/// Supports `${VAR}`, `${VAR:-default}` and `$VAR` syntax.
pub fn expand_env_vars(s: &str) -> Result<String, SettingsError> {
    let mut result = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '$' {
            result.push(c);
            continue;
        }

        if chars.peek() == Some(&'{') {
            chars.next();
            let mut body = String::new();
            for ch in chars.by_ref() {
                if ch == '}' {
                    break;
                }
                body.push(ch);
            }
            let (name, default) = match body.split_once(":-") {
                Some((name, default)) => (name, Some(default)),
                None => (body.as_str(), None),
            };
            match (env::var(name), default) {
                (Ok(value), _) => result.push_str(&value),
                (Err(_), Some(default)) => result.push_str(default),
                (Err(_), None) => return Err(SettingsError::MissingEnvVar(name.to_string())),
            }
        } else {
            let mut name = String::new();
            while let Some(&ch) = chars.peek() {
                if ch.is_alphanumeric() || ch == '_' {
                    name.push(ch);
                    chars.next();
                } else {
                    break;
                }
            }
            if name.is_empty() {
                // A lone $, keep it
                result.push('$');
            } else {
                let value = env::var(&name).map_err(|_| SettingsError::MissingEnvVar(name.clone()))?;
                result.push_str(&value);
            }
        }
    }

    Ok(result)
}
