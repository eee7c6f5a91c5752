//! Command implementations.

pub mod cluster;
pub mod discover;
pub mod profiles;
pub mod run;

use std::path::PathBuf;

use anyhow::Result;
use portfwd_core::{ProfileManager, ProfileStore, YamlProfileStore};

/// Options shared by every command.
pub struct Globals {
    pub context: String,
    pub namespace: String,
    pub config_path: PathBuf,
    pub json: bool,
}

impl Globals {
    pub fn new(
        context: String,
        namespace: String,
        config: Option<PathBuf>,
        json: bool,
    ) -> Result<Self> {
        let config_path = match config {
            Some(path) => path,
            None => YamlProfileStore::new()?.config_path().to_path_buf(),
        };

        Ok(Self {
            context,
            namespace,
            config_path,
            json,
        })
    }

    pub fn profiles(&self) -> ProfileManager<YamlProfileStore> {
        ProfileManager::new(YamlProfileStore::with_path(&self.config_path))
    }

    /// Context and namespace to discover: the command line, else the
    /// profile file's global defaults.
    pub async fn target<S: ProfileStore>(&self, manager: &ProfileManager<S>) -> (String, String) {
        let mut context = self.context.clone();
        let mut namespace = self.namespace.clone();
        if !context.is_empty() && !namespace.is_empty() {
            return (context, namespace);
        }

        match manager.load_or_default().await {
            Ok(profiles) => {
                if context.is_empty() {
                    context = profiles.context;
                }
                if namespace.is_empty() {
                    namespace = profiles.namespace;
                }
            }
            Err(e) => tracing::warn!(
                store = %manager.store().location(),
                error = %e,
                "ignoring profile file defaults"
            ),
        }

        (context, namespace)
    }
}

/// Shows an empty coordinate as the kubectl default.
pub fn or_current(value: &str) -> &str {
    if value.is_empty() {
        "(current)"
    } else {
        value
    }
}
