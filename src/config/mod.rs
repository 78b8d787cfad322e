//! Configuration
//!
//! `AgentsConfig` is assembled from built-in defaults, the global TOML file under
//! `$XDG_CONFIG_HOME/agents/`, and `AGENTS__SECTION__KEY` environment variables, in
//! that order of increasing precedence.

mod facade;
mod merge;
mod sources;
pub mod xdg;

pub use facade::ConfigLoader;

use crate::error::ApiError;
use crate::logging::LoggingConfig;
use crate::types::Target;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_REGISTRY_URL: &str =
    "https://raw.githubusercontent.com/chameleon-nexus/agents-registry/main";

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AgentsConfig {
    #[serde(default)]
    pub registry: RegistryConfig,

    #[serde(default)]
    pub install: InstallConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

fn default_registry_url() -> String {
    DEFAULT_REGISTRY_URL.to_string()
}

fn default_cache_ttl_secs() -> u64 {
    300
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_sweep_interval_secs() -> u64 {
    300
}

/// Remote catalog location and client caching behaviour.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// Base URL; `registry.json` and `agents/` live directly beneath it
    #[serde(default = "default_registry_url")]
    pub url: String,

    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,

    /// Per-request network timeout
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Interval of the background cache sweep
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,

    /// Fetch `{name}_v{version}.md` instead of `agent.md` when a version is pinned
    #[serde(default)]
    pub versioned_content: bool,
}

impl RegistryConfig {
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs.max(1))
    }
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            url: default_registry_url(),
            cache_ttl_secs: default_cache_ttl_secs(),
            timeout_secs: default_timeout_secs(),
            sweep_interval_secs: default_sweep_interval_secs(),
            versioned_content: false,
        }
    }
}

fn default_concurrency() -> usize {
    4
}

/// Where and how agents are installed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstallConfig {
    #[serde(default)]
    pub target: Target,

    /// Install directory; `~` is expanded. Unset means the target's default directory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub directory: Option<PathBuf>,

    /// Maximum ids processed at once by batch operations
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
}

impl InstallConfig {
    /// Install directory for `target`, honouring an explicit `directory` override.
    pub fn resolve_directory(&self, target: Target) -> Result<PathBuf, ApiError> {
        match &self.directory {
            Some(dir) => xdg::expand_tilde(dir),
            None => Ok(xdg::home_dir()?.join(target.home_relative_dir())),
        }
    }
}

impl Default for InstallConfig {
    fn default() -> Self {
        Self {
            target: Target::default(),
            directory: None,
            concurrency: default_concurrency(),
        }
    }
}
