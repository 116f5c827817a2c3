//! Configuration service implementation.
//!
//! Loads the root configuration from the configuration file
//! (`~/.config/mockview/config.toml`) and caches it to avoid repeated
//! file IO. A missing or empty file yields the default configuration.

use crate::paths::MockviewPaths;
use mockview_core::config::RootConfig;
use mockview_core::error::Result;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

/// Configuration service that loads and caches the root configuration.
#[derive(Debug, Clone)]
pub struct ConfigService {
    /// Explicit config file path; falls back to the default location.
    path: Option<PathBuf>,
    /// Cached configuration loaded from file.
    /// Uses RwLock for thread-safe lazy loading.
    config: Arc<RwLock<Option<RootConfig>>>,
}

impl ConfigService {
    /// Creates a service reading from the default location.
    ///
    /// The configuration is loaded lazily on first access.
    pub fn new() -> Self {
        Self {
            path: None,
            config: Arc::new(RwLock::new(None)),
        }
    }

    /// Creates a service reading from an explicit path.
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
            config: Arc::new(RwLock::new(None)),
        }
    }

    /// Gets the root configuration, loading from file if not cached.
    ///
    /// Load failures are logged and replaced by defaults so a corrupt config
    /// file never prevents startup.
    pub fn get_config(&self) -> RootConfig {
        {
            let read_lock = self.config.read().unwrap();
            if let Some(ref cached) = *read_lock {
                return cached.clone();
            }
        }

        let loaded = self.load_config().unwrap_or_else(|e| {
            tracing::warn!(target: "config", "Falling back to defaults: {}", e);
            RootConfig::default()
        });

        {
            let mut write_lock = self.config.write().unwrap();
            *write_lock = Some(loaded.clone());
        }

        loaded
    }

    /// Invalidates the cache, forcing a reload on next access.
    pub fn invalidate_cache(&self) {
        let mut write_lock = self.config.write().unwrap();
        *write_lock = None;
    }

    fn load_config(&self) -> Result<RootConfig> {
        let path = match &self.path {
            Some(path) => path.clone(),
            None => MockviewPaths::config_file()?,
        };
        Self::read_file(&path)
    }

    fn read_file(path: &Path) -> Result<RootConfig> {
        if !path.exists() {
            return Ok(RootConfig::default());
        }
        let content = std::fs::read_to_string(path)?;
        if content.trim().is_empty() {
            return Ok(RootConfig::default());
        }
        Ok(toml::from_str(&content)?)
    }
}

impl Default for ConfigService {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockview_core::config::GenerationProvider;
    use std::io::Write;

    #[test]
    fn test_missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let service = ConfigService::with_path(dir.path().join("config.toml"));
        assert_eq!(service.get_config(), RootConfig::default());
    }

    #[test]
    fn test_loads_and_caches_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "[generation]\nprovider = \"scripted\"").unwrap();

        let service = ConfigService::with_path(&path);
        assert_eq!(
            service.get_config().generation.provider,
            GenerationProvider::Scripted
        );

        // Rewrite the file; the cached value must survive until invalidated.
        std::fs::write(&path, "").unwrap();
        assert_eq!(
            service.get_config().generation.provider,
            GenerationProvider::Scripted
        );
        service.invalidate_cache();
        assert_eq!(
            service.get_config().generation.provider,
            GenerationProvider::Claude
        );
    }
}
