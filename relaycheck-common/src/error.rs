//! Error types for the relaycheck-common crate.

use std::{io, path::PathBuf};

use thiserror::Error;

/// Errors raised while loading, validating or storing a [`Configuration`].
///
/// [`Configuration`]: crate::Configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read or written.
    #[error("Unable to access configuration file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The configuration file is not valid RON.
    #[error("Unable to parse configuration file {path}: {message}")]
    Parse { path: PathBuf, message: String },

    /// The configuration could not be rendered back to RON.
    #[error("Unable to serialize configuration: {0}")]
    Serialize(String),

    /// One or more fields failed validation.
    #[error("{}", .0.join("; "))]
    Invalid(Vec<String>),

    /// The provider has no backing store to write to.
    #[error("Configuration is read-only")]
    ReadOnly,
}

impl ConfigError {
    /// The individual validation messages, empty for non-validation errors.
    #[must_use]
    pub fn messages(&self) -> &[String] {
        match self {
            Self::Invalid(messages) => messages,
            _ => &[],
        }
    }
}
