//! Sources of [`Configuration`] snapshots.

use std::{
    fs,
    path::{Path, PathBuf},
};

use parking_lot::RwLock;

use super::Configuration;
use crate::ConfigError;

/// Supplies the configuration for a single run.
///
/// Each call returns an owned snapshot, so a run never observes an edit made
/// while it is in flight.
pub trait ConfigProvider: Send + Sync {
    fn current(&self) -> Configuration;

    /// Validates `config` and makes it the current snapshot.
    ///
    /// An absent or empty password keeps the stored one, so an editor never
    /// has to echo the secret back.
    ///
    /// # Errors
    ///
    /// Fails if validation fails or the provider cannot persist the change.
    /// Providers without a backing store return [`ConfigError::ReadOnly`].
    fn store(&self, _config: Configuration) -> Result<(), ConfigError> {
        Err(ConfigError::ReadOnly)
    }
}

/// A provider that always returns the same configuration.
#[derive(Debug, Clone, Default)]
pub struct StaticConfigProvider(Configuration);

impl StaticConfigProvider {
    #[must_use]
    pub const fn new(config: Configuration) -> Self {
        Self(config)
    }
}

impl ConfigProvider for StaticConfigProvider {
    fn current(&self) -> Configuration {
        self.0.clone()
    }
}

/// A provider backed by a RON file on disk.
#[derive(Debug)]
pub struct FileConfigProvider {
    path: PathBuf,
    config: RwLock<Configuration>,
}

impl FileConfigProvider {
    /// Loads and validates the configuration at `path`.
    ///
    /// # Errors
    ///
    /// Fails if the file cannot be read, is not valid RON, or fails
    /// [`Configuration::validate`].
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        let config = read(&path)?;

        tracing::debug!(path = %path.display(), host = %config.host, "Loaded configuration");

        Ok(Self {
            path,
            config: RwLock::new(config),
        })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Re-reads the file, keeping the previous snapshot if it is invalid.
    ///
    /// # Errors
    ///
    /// Same as [`FileConfigProvider::load`].
    pub fn reload(&self) -> Result<(), ConfigError> {
        let config = read(&self.path)?;
        *self.config.write() = config;

        tracing::info!(path = %self.path.display(), "Reloaded configuration");
        Ok(())
    }
}

impl ConfigProvider for FileConfigProvider {
    fn current(&self) -> Configuration {
        self.config.read().clone()
    }

    /// Writes `config` back to the file, then swaps the snapshot.
    fn store(&self, mut config: Configuration) -> Result<(), ConfigError> {
        let mut current = self.config.write();

        if config.password.as_deref().is_none_or(str::is_empty) {
            config.password.clone_from(&current.password);
        }

        config.validate()?;

        let rendered = ron::ser::to_string_pretty(&config, ron::ser::PrettyConfig::default())
            .map_err(|e| ConfigError::Serialize(e.to_string()))?;

        fs::write(&self.path, rendered).map_err(|source| ConfigError::Io {
            path: self.path.clone(),
            source,
        })?;

        *current = config;

        tracing::info!(path = %self.path.display(), "Stored configuration");
        Ok(())
    }
}

fn read(path: &Path) -> Result<Configuration, ConfigError> {
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let config: Configuration = ron::from_str(&content).map_err(|e| ConfigError::Parse {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;

    config.validate()?;

    if config.tls.accept_invalid_certs {
        tracing::warn!(
            host = %config.host,
            "SECURITY WARNING: certificate validation is disabled for this relay"
        );
    }

    Ok(config)
}
