//! MergeService: layers sources over defaults and deserializes to AgentsConfig.

use crate::config::sources;
use crate::config::AgentsConfig;
use config::builder::DefaultState;
use config::{Config, ConfigBuilder, ConfigError};
use std::path::Path;

/// Builder seeded with the serialized defaults, so partial sources merge key by key.
fn builder_with_defaults() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    let defaults = toml::to_string(&AgentsConfig::default())
        .map_err(|e| ConfigError::Message(format!("Failed to serialize defaults: {}", e)))?;
    Ok(Config::builder().add_source(config::File::from_str(
        &defaults,
        config::FileFormat::Toml,
    )))
}

pub struct MergeService;

impl MergeService {
    /// Precedence: defaults (lowest) -> global file -> environment (highest).
    pub fn load() -> Result<AgentsConfig, ConfigError> {
        let builder = builder_with_defaults()?;
        let builder = sources::add_global_file(builder)?;
        let builder = sources::add_environment(builder)?;
        builder.build()?.try_deserialize()
    }

    /// Like [`MergeService::load`] with `path` in place of the global file.
    pub fn load_from_file(path: &Path) -> Result<AgentsConfig, ConfigError> {
        let builder = builder_with_defaults()?;
        let builder = sources::add_file(builder, path)?;
        let builder = sources::add_environment(builder)?;
        builder.build()?.try_deserialize()
    }
}
