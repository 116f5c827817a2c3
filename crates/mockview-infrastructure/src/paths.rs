//! Well-known filesystem locations for Mockview.

use mockview_core::error::{MockviewError, Result};
use std::path::PathBuf;

/// Resolves Mockview's configuration and data directories.
pub struct MockviewPaths;

impl MockviewPaths {
    /// The configuration directory, `~/.config/mockview` on Linux.
    pub fn config_dir() -> Result<PathBuf> {
        dirs::config_dir()
            .map(|dir| dir.join("mockview"))
            .ok_or_else(|| MockviewError::config("Could not determine config directory"))
    }

    /// The configuration file path, `~/.config/mockview/config.toml`.
    pub fn config_file() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    /// The data directory where interviews and runs are stored.
    pub fn data_dir() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("data"))
    }
}
