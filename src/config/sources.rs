//! Config sources: global file and `AGENTS__` environment overlay.

use crate::config::xdg;
use config::builder::DefaultState;
use config::{ConfigBuilder, ConfigError, Environment, File, FileFormat};
use std::path::Path;

/// Add the global config file if it exists.
pub fn add_global_file(
    builder: ConfigBuilder<DefaultState>,
) -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    match xdg::config_file_path() {
        Ok(path) if path.exists() => add_file(builder, &path),
        _ => Ok(builder),
    }
}

/// Add a required TOML file.
pub fn add_file(
    builder: ConfigBuilder<DefaultState>,
    path: &Path,
) -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    Ok(builder.add_source(File::from(path).format(FileFormat::Toml).required(true)))
}

/// Add environment variable overlay.
/// Uses AGENTS prefix and __ as separator for nested keys, e.g. `AGENTS__REGISTRY__URL`.
pub fn add_environment(
    builder: ConfigBuilder<DefaultState>,
) -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    Ok(builder.add_source(
        Environment::with_prefix("AGENTS")
            .prefix_separator("__")
            .separator("__")
            .try_parsing(true),
    ))
}
