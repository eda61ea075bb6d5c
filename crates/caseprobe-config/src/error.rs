//! Errors raised while reading settings and portal state files.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Malformed settings or state file: {0}")]
    InvalidFormat(String),

    /// Credentials are missing one of the listed fields.
    #[error("Incomplete portal data: {0}")]
    MissingField(String),

    #[error("Environment variable not set: {0}")]
    EnvVarNotSet(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Settings parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("State file parse error: {0}")]
    Json(#[from] serde_json::Error),
}
