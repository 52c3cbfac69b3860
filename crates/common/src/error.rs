//! Common error types for tsaudit.

use thiserror::Error;

/// Common error type for tsaudit operations.
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("unsupported platform: package={package} os={family} version={version}")]
    UnsupportedPlatform {
        package: String,
        family: String,
        version: String,
    },

    #[error("command execution failed: {cmd} - {reason}")]
    CommandExecution { cmd: String, reason: String },

    #[error("command timed out: {cmd}")]
    CommandTimeout { cmd: String },

    #[error("inspection failed: {0}")]
    Inspection(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("{0}")]
    Other(String),
}

/// Result type alias using common Error.
pub type Result<T> = std::result::Result<T, Error>;

impl From<anyhow::Error> for Error {
    fn from(e: anyhow::Error) -> Self {
        Error::Other(e.to_string())
    }
}

impl Error {
    /// True when this error aborts the whole run instead of being
    /// recorded as a failed assertion.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Error::UnsupportedPlatform { .. })
    }
}
