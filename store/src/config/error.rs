use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    /// Merging or deserializing the layered sources failed.
    #[error("cannot read configuration: {0}")]
    Load(String),

    #[error("config file {0} not found")]
    NotFound(PathBuf),

    #[error("cannot encode default configuration: {0}")]
    Defaults(String),

    #[error("invalid configuration: {0}")]
    Invalid(String),

    /// A configured path references `~` or a variable that cannot be
    /// resolved.
    #[error("cannot expand path: {0}")]
    Expand(String),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

impl From<config::ConfigError> for ConfigError {
    fn from(err: config::ConfigError) -> Self {
        Self::Load(err.to_string())
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(err: serde_json::Error) -> Self {
        Self::Defaults(err.to_string())
    }
}
