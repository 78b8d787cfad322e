//! XDG Base Directory helpers.

use crate::error::ApiError;
use std::path::{Path, PathBuf};

pub fn home_dir() -> Result<PathBuf, ApiError> {
    directories::BaseDirs::new()
        .map(|dirs| dirs.home_dir().to_path_buf())
        .ok_or_else(|| {
            ApiError::ConfigError("Could not determine home directory (HOME not set)".to_string())
        })
}

/// Get XDG config home directory
///
/// Returns `$XDG_CONFIG_HOME` if set, otherwise defaults to `$HOME/.config`
pub fn config_home() -> Result<PathBuf, ApiError> {
    if let Ok(xdg_config_home) = std::env::var("XDG_CONFIG_HOME") {
        if !xdg_config_home.is_empty() {
            return Ok(PathBuf::from(xdg_config_home));
        }
    }
    Ok(home_dir()?.join(".config"))
}

/// `$XDG_CONFIG_HOME/agents/config.toml`
pub fn config_file_path() -> Result<PathBuf, ApiError> {
    Ok(config_home()?.join("agents").join("config.toml"))
}

/// Expand a leading `~` to the home directory.
pub fn expand_tilde(path: &Path) -> Result<PathBuf, ApiError> {
    match path.strip_prefix("~") {
        Ok(rest) => Ok(home_dir()?.join(rest)),
        Err(_) => Ok(path.to_path_buf()),
    }
}
