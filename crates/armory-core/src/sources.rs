//! Armory source list (`armories.json`) with the built-in armory merged in.

use std::path::{Path, PathBuf};

use armory_schema::{ArmoryConfig, DEFAULT_ARMORY_NAME};
use tracing::{debug, warn};

use crate::error::SourcesError;

/// Configured armories plus the built-in default.
///
/// The built-in armory is injected on load unless the file already carries
/// an entry named `Default` (whose settings then win, so it can be disabled
/// or given credentials). Removing it persists such an entry, disabled.
#[derive(Debug, Clone)]
pub struct ArmorySources {
    path: PathBuf,
    configured: Vec<ArmoryConfig>,
}

impl ArmorySources {
    /// Read `path`. A missing or unreadable file yields only the built-in armory.
    pub fn load(path: &Path) -> Self {
        let configured = match std::fs::read(path) {
            Ok(bytes) => match serde_json::from_slice::<Vec<ArmoryConfig>>(&bytes) {
                Ok(list) => list,
                Err(e) => {
                    warn!("Ignoring malformed {}: {e}", path.display());
                    Vec::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(e) => {
                warn!("Cannot read {}: {e}", path.display());
                Vec::new()
            }
        };
        debug!("Loaded {} configured armories", configured.len());
        Self::from_configured(path, configured)
    }

    /// Build from an in-memory list, persisted to `path` on [`Self::save`].
    pub fn from_configured(path: &Path, configured: Vec<ArmoryConfig>) -> Self {
        Self {
            path: path.to_path_buf(),
            configured,
        }
    }

    /// Every known armory, built-in first.
    pub fn all(&self) -> Vec<ArmoryConfig> {
        let mut all = Vec::with_capacity(self.configured.len() + 1);
        if !self.configured.iter().any(ArmoryConfig::is_builtin) {
            all.push(ArmoryConfig::builtin());
        }
        all.extend(self.configured.iter().cloned());
        all
    }

    /// Armories that take part in refreshes and lookups.
    pub fn enabled(&self) -> Vec<ArmoryConfig> {
        self.all().into_iter().filter(|a| a.enabled).collect()
    }

    /// Armory named `name`, enabled or not.
    pub fn find(&self, name: &str) -> Option<ArmoryConfig> {
        self.all().into_iter().find(|a| a.name == name)
    }

    /// Add a new armory.
    ///
    /// # Errors
    ///
    /// Rejects the reserved name, duplicate names or keys, and URLs that are
    /// not `http`/`https`.
    pub fn add(&mut self, armory: ArmoryConfig) -> Result<(), SourcesError> {
        if armory.name == DEFAULT_ARMORY_NAME {
            return Err(SourcesError::Reserved(armory.name));
        }
        if armory.name.trim().is_empty() {
            return Err(SourcesError::Invalid("name is empty".into()));
        }
        if armory.public_key.trim().is_empty() {
            return Err(SourcesError::Invalid("public key is empty".into()));
        }
        crate::http::validate_url(&armory.repo_url)
            .map_err(|e| SourcesError::Invalid(e.to_string()))?;
        let all = self.all();
        if all.iter().any(|a| a.name == armory.name) {
            return Err(SourcesError::DuplicateName(armory.name));
        }
        if let Some(existing) = all.iter().find(|a| a.public_key == armory.public_key) {
            return Err(SourcesError::DuplicateKey {
                existing: existing.name.clone(),
            });
        }
        self.configured.push(armory);
        Ok(())
    }

    /// Remove an armory by name and return it.
    ///
    /// The built-in armory is injected on every load, so removing it leaves
    /// a disabled override behind instead.
    ///
    /// # Errors
    ///
    /// Returns [`SourcesError::Unknown`] if no armory has that name.
    pub fn remove(&mut self, name: &str) -> Result<ArmoryConfig, SourcesError> {
        let removed = self
            .find(name)
            .ok_or_else(|| SourcesError::Unknown(name.to_string()))?;
        if removed.is_builtin() {
            self.set_enabled(name, false)?;
        } else {
            self.configured.retain(|a| a.name != name);
        }
        Ok(removed)
    }

    /// Enable or disable an armory. Disabling the built-in one persists an override.
    ///
    /// # Errors
    ///
    /// Returns [`SourcesError::Unknown`] if no armory has that name.
    pub fn set_enabled(&mut self, name: &str, enabled: bool) -> Result<(), SourcesError> {
        if let Some(entry) = self.configured.iter_mut().find(|a| a.name == name) {
            entry.enabled = enabled;
            return Ok(());
        }
        match self.find(name) {
            Some(mut builtin) if builtin.is_builtin() => {
                builtin.enabled = enabled;
                self.configured.insert(0, builtin);
                Ok(())
            }
            _ => Err(SourcesError::Unknown(name.to_string())),
        }
    }

    /// Persist the configured entries (the injected default is not written).
    ///
    /// # Errors
    ///
    /// Returns an error if serialization, file writing, or the atomic rename
    /// fails.
    pub fn save(&self) -> Result<(), SourcesError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(&self.configured)?;

        // write to temp file, then rename
        let temp_path = self.path.with_extension("json.tmp");
        std::fs::write(&temp_path, content)?;
        std::fs::rename(&temp_path, &self.path)?;
        Ok(())
    }

    /// File the sources are saved to.
    pub fn path(&self) -> &Path {
        &self.path
    }
}
