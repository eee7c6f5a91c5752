//! Profile persistence.
//!
//! Stores the profile collection as YAML, by default in `~/.portfwd.yaml`.

use std::path::{Path, PathBuf};

use tokio::fs;

use crate::domain::ProfileCollection;
use crate::error::{Error, Result};
use crate::ports::ProfileStore;

/// Default file name inside the home directory.
pub const DEFAULT_CONFIG_FILE: &str = ".portfwd.yaml";

/// YAML file store for the profile collection.
pub struct YamlProfileStore {
    config_path: PathBuf,
}

impl YamlProfileStore {
    /// Creates a new store with the default path (~/.portfwd.yaml).
    pub fn new() -> Result<Self> {
        let home = dirs::home_dir()
            .ok_or_else(|| Error::Config("Could not find home directory".to_string()))?;

        Ok(Self {
            config_path: home.join(DEFAULT_CONFIG_FILE),
        })
    }

    /// Creates a new store with a custom path.
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self {
            config_path: path.into(),
        }
    }

    /// Returns the config file path.
    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    fn read_error(&self, reason: impl ToString) -> Error {
        Error::Read {
            path: self.config_path.clone(),
            reason: reason.to_string(),
        }
    }

    fn write_error(&self, reason: impl ToString) -> Error {
        Error::Write {
            path: self.config_path.clone(),
            reason: reason.to_string(),
        }
    }
}

impl ProfileStore for YamlProfileStore {
    fn exists(&self) -> bool {
        self.config_path.exists()
    }

    fn location(&self) -> String {
        self.config_path.display().to_string()
    }

    async fn load(&self) -> Result<ProfileCollection> {
        if !self.config_path.exists() {
            return Err(Error::NotFound(self.config_path.clone()));
        }

        let content = fs::read_to_string(&self.config_path)
            .await
            .map_err(|e| self.read_error(e))?;

        // An empty document is an empty collection.
        if content.trim().is_empty() {
            return Ok(ProfileCollection::default());
        }

        let profiles: ProfileCollection =
            serde_yaml::from_str(&content).map_err(|e| self.read_error(e))?;
        tracing::debug!(
            path = %self.config_path.display(),
            profiles = profiles.profiles.len(),
            "loaded profiles"
        );
        Ok(profiles)
    }

    async fn save(&self, profiles: &ProfileCollection) -> Result<()> {
        // Ensure the directory exists
        if let Some(parent) = self.config_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .await
                    .map_err(|e| self.write_error(e))?;
            }
        }

        // Write to a temp file first, then rename (atomic write)
        let temp_path = self.config_path.with_extension("yaml.tmp");
        let content = serde_yaml::to_string(profiles).map_err(|e| self.write_error(e))?;

        fs::write(&temp_path, content)
            .await
            .map_err(|e| self.write_error(e))?;

        fs::rename(&temp_path, &self.config_path)
            .await
            .map_err(|e| self.write_error(e))?;

        tracing::debug!(path = %self.config_path.display(), "saved profiles");
        Ok(())
    }
}
