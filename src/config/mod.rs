//! Configuration module for promsense.
//!
//! Handles the TOML settings file, its discovery and environment variables.

mod settings;

pub use settings::{
    expand_env_vars, EditorSettings, GrammarSettings, LoggingSettings, ServerSettings, Settings,
    SettingsError, CONFIG_ENV, CONFIG_FILE,
};
