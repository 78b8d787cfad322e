//! ConfigLoader facade delegating to the merge service.

use super::merge::MergeService;
use super::{xdg, AgentsConfig};
use crate::error::ApiError;
use std::path::{Path, PathBuf};
use tracing::info;

/// Configuration loader facade.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from the global file and environment.
    pub fn load() -> Result<AgentsConfig, ApiError> {
        Ok(MergeService::load()?)
    }

    /// Load configuration from a specific file with environment overlay.
    pub fn load_from_file(path: &Path) -> Result<AgentsConfig, ApiError> {
        Ok(MergeService::load_from_file(path)?)
    }

    pub fn default_path() -> Result<PathBuf, ApiError> {
        xdg::config_file_path()
    }

    /// Write the default configuration as TOML. Refuses to overwrite unless `force`.
    pub fn write_default(path: &Path, force: bool) -> Result<(), ApiError> {
        if path.exists() && !force {
            return Err(ApiError::ConfigError(format!(
                "Config file already exists: {}",
                path.display()
            )));
        }
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                ApiError::ConfigError(format!(
                    "Failed to create config directory {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        }
        let body = toml::to_string_pretty(&AgentsConfig::default())
            .map_err(|e| ApiError::ConfigError(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, body).map_err(|e| {
            ApiError::ConfigError(format!("Failed to write {}: {}", path.display(), e))
        })?;
        info!(path = %path.display(), "wrote default config");
        Ok(())
    }
}
