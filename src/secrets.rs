//! Secret store for API keys.
//!
//! Secrets live in a small JSON object (`name -> value`) so the completion
//! API key does not have to be exported in every shell. The environment
//! always wins over the store; see [`crate::config::Settings`].

use crate::error::{ResearchError, Result};
use std::collections::BTreeMap;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;
use tracing::{debug, info, warn};

/// Default secret file path: `~/.rustresearcher_secrets.json`
fn default_secret_path() -> Result<PathBuf> {
    dirs::home_dir()
        .map(|p| p.join(".rustresearcher_secrets.json"))
        .ok_or_else(|| ResearchError::Config("Cannot determine home directory".to_string()))
}

/// File-backed secret store
pub struct SecretStore {
    path: PathBuf,
}

impl SecretStore {
    /// Create a new SecretStore with default path
    pub fn new() -> Result<Self> {
        Ok(Self {
            path: default_secret_path()?,
        })
    }

    /// Create a new SecretStore with custom path
    pub fn with_path(path: PathBuf) -> Self {
        Self { path }
    }

    /// Get the secret file path
    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    /// Load all secrets.
    ///
    /// Returns an empty map if the file doesn't exist or is invalid
    pub fn load(&self) -> BTreeMap<String, String> {
        if !self.path.exists() {
            debug!("Secret file not found: {:?}", self.path);
            return BTreeMap::new();
        }

        match std::fs::read_to_string(&self.path) {
            Ok(content) => match serde_json::from_str::<BTreeMap<String, String>>(&content) {
                Ok(secrets) => {
                    debug!("Loaded {} secrets from {:?}", secrets.len(), self.path);
                    secrets
                }
                Err(e) => {
                    warn!("Failed to parse secret file: {}", e);
                    BTreeMap::new()
                }
            },
            Err(e) => {
                warn!("Failed to read secret file: {}", e);
                BTreeMap::new()
            }
        }
    }

    /// Look up a single secret, ignoring blank values
    pub fn get(&self, name: &str) -> Option<String> {
        self.load()
            .remove(name)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    /// Store or replace a secret
    pub fn set(&self, name: &str, value: &str) -> Result<()> {
        let mut secrets = self.load();
        secrets.insert(name.to_string(), value.trim().to_string());
        self.save(&secrets)?;
        info!(name = name, "Stored secret in {:?}", self.path);
        Ok(())
    }

    /// Remove a single secret. Returns whether it was present.
    pub fn remove(&self, name: &str) -> Result<bool> {
        let mut secrets = self.load();
        let removed = secrets.remove(name).is_some();
        if removed {
            self.save(&secrets)?;
        }
        Ok(removed)
    }

    /// Delete the secret file
    pub fn clear(&self) -> Result<()> {
        if self.path.exists() {
            std::fs::remove_file(&self.path)?;
            info!("Cleared secrets at {:?}", self.path);
        }
        Ok(())
    }

    /// Write the file owner-only (0600 on unix)
    fn save(&self, secrets: &BTreeMap<String, String>) -> Result<()> {
        let content = serde_json::to_string_pretty(secrets)?;

        let mut options = OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }

        let mut file = options.open(&self.path)?;
        // mode() only applies on creation
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            file.set_permissions(std::fs::Permissions::from_mode(0o600))?;
        }
        file.write_all(content.as_bytes())?;
        Ok(())
    }
}

impl Default for SecretStore {
    fn default() -> Self {
        Self::new().unwrap_or_else(|_| Self {
            path: PathBuf::from(".rustresearcher_secrets.json"),
        })
    }
}
