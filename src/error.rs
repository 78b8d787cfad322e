//! Error types shared by the registry client, ledger, and orchestrator.

use std::path::PathBuf;
use thiserror::Error;

/// Errors surfaced by catalog, ledger, and install operations.
///
/// Cache lookups never produce one of these: a miss is just `None`.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Network failure, timeout, or non-2xx status.
    #[error("Transport error: {0}")]
    Transport(String),

    /// Catalog or metadata body could not be decoded.
    #[error("Parse error: {0}")]
    Parse(String),

    /// Unknown id in the ledger or the catalog.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Item does not declare support for the requested target.
    #[error("Agent {id} is not compatible with target {target}")]
    Compatibility { id: String, target: String },

    #[error("Filesystem error: {0}")]
    Filesystem(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Ledger file exists but cannot be parsed. Never silently reset.
    #[error("Installation ledger {path} is corrupt: {reason}")]
    LedgerCorrupt { path: PathBuf, reason: String },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// A batch finished with at least one failed id. Carries the rendered summary.
    #[error("{0}")]
    PartialFailure(String),
}

impl From<config::ConfigError> for ApiError {
    fn from(err: config::ConfigError) -> Self {
        ApiError::ConfigError(err.to_string())
    }
}

impl ApiError {
    /// Short machine-readable kind, used in JSON output and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            ApiError::Transport(_) => "transport",
            ApiError::Parse(_) => "parse",
            ApiError::NotFound(_) => "not_found",
            ApiError::Compatibility { .. } => "compatibility",
            ApiError::Filesystem(_) | ApiError::Io(_) => "filesystem",
            ApiError::LedgerCorrupt { .. } => "ledger_corrupt",
            ApiError::InvalidInput(_) => "invalid_input",
            ApiError::ConfigError(_) => "config",
            ApiError::PartialFailure(_) => "partial_failure",
        }
    }
}
