//! Configuration loading errors.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while loading a configuration document.
///
/// At startup any of these is fatal. After startup they are logged by the
/// refresh loop and the previous snapshot stays current.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The backing file could not be read.
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The document is not valid YAML for the expected shape.
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_yaml::Error),

    /// A recognized field holds an unacceptable value.
    #[error("invalid value for {field}: {reason}")]
    Validation { field: &'static str, reason: String },
}

impl ConfigError {
    pub(crate) fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        ConfigError::Validation {
            field,
            reason: reason.into(),
        }
    }
}
