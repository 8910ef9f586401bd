//! Error types for the configuration client.

use std::path::PathBuf;

use thiserror::Error;

use crate::format::ConfigType;
use crate::options::validation::ValidationError;

/// Errors surfaced by the configuration client.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Construction options failed validation. The client is never created.
    #[error("invalid client options: {}", join_errors(.0))]
    InvalidOptions(Vec<ValidationError>),

    /// The config name is not served by this client instance.
    #[error("config {0:?} is not added to this client")]
    ConfigNotAdded(String),

    /// The dotted key did not resolve inside the config.
    #[error("key {key:?} not found in config {config:?}")]
    KeyNotFound { config: String, key: String },

    /// A value was found but cannot be coerced to the requested type.
    #[error("value at {key:?} is a {found}, cannot convert to {expected}")]
    TypeConversion {
        key: String,
        expected: &'static str,
        found: &'static str,
    },

    /// Structured decoding of a value failed.
    #[error("failed to decode value at {key:?}: {source}")]
    Decode {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    /// Reading a configuration document failed.
    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A document could not be parsed with the configured format.
    #[error("failed to parse {format} document: {source}")]
    Parse {
        format: ConfigType,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Registering a filesystem watch failed.
    #[error("file watch error: {0}")]
    Watch(#[from] notify::Error),

    /// The remote service could not be reached, or did not answer in time.
    #[error("transport error: {0}")]
    Transport(String),

    /// The remote service answered with an error.
    #[error("remote service error: {0}")]
    Service(String),
}

/// Result type for configuration client operations.
pub type Result<T> = std::result::Result<T, ConfigError>;

impl ConfigError {
    pub(crate) fn parse<E>(format: ConfigType, err: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        ConfigError::Parse {
            format,
            source: err.into(),
        }
    }
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}
