//! Configuration errors. Any of these aborts startup.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    /// The configuration is complete but unusable.
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// An environment variable could not be parsed.
    #[error("{key} has an invalid value: '{value}'")]
    InvalidEnv { key: String, value: String },

    #[error("Invalid DATABASE_URL: {0}")]
    DatabaseUrl(String),

    #[error("Cannot read config file {path}: {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Cannot parse config file {path}: {source}")]
    ParseFile {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Result type alias using CoreError.
pub type CoreResult<T> = Result<T, CoreError>;
