//! Core identifier types: item ids, install specs, and install targets.

use crate::error::ApiError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Author assumed when an id carries no `author/` prefix.
pub const DEFAULT_AUTHOR: &str = "community";

/// Stable catalog identifier of the form `author/name` or a bare `name`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ItemId(String);

impl ItemId {
    /// Validate and wrap an id.
    ///
    /// Ids end up as relative file paths under the install directory, so anything that
    /// could escape it (absolute paths, `..`, backslashes, empty segments) is rejected.
    pub fn parse(raw: &str) -> Result<Self, ApiError> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(ApiError::InvalidInput("agent id is empty".to_string()));
        }
        if raw.starts_with('/') || raw.contains('\\') {
            return Err(ApiError::InvalidInput(format!(
                "agent id '{}' must be a relative author/name identifier",
                raw
            )));
        }
        for segment in raw.split('/') {
            if segment.is_empty() || segment == "." || segment == ".." {
                return Err(ApiError::InvalidInput(format!(
                    "agent id '{}' has an invalid path segment",
                    raw
                )));
            }
        }
        Ok(Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Split into `(author, name)`; bare ids belong to [`DEFAULT_AUTHOR`].
    pub fn split(&self) -> (&str, &str) {
        match self.0.split_once('/') {
            Some((author, name)) => (author, name),
            None => (DEFAULT_AUTHOR, self.0.as_str()),
        }
    }

    pub fn author(&self) -> &str {
        self.split().0
    }

    pub fn name(&self) -> &str {
        self.split().1
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for ItemId {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for ItemId {
    type Error = ApiError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<ItemId> for String {
    fn from(id: ItemId) -> Self {
        id.0
    }
}

/// One requested install: an id and an optional pinned version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallSpec {
    pub id: ItemId,
    pub version: Option<String>,
}

impl InstallSpec {
    pub fn new(id: ItemId, version: Option<String>) -> Self {
        Self { id, version }
    }

    /// Parse `id` or `id@version`. The last `@` separates the version.
    pub fn parse(raw: &str) -> Result<Self, ApiError> {
        let raw = raw.trim();
        match raw.rsplit_once('@') {
            Some((id, version)) if !id.is_empty() => {
                let version = version.trim();
                Ok(Self {
                    id: ItemId::parse(id)?,
                    version: (!version.is_empty()).then(|| version.to_string()),
                })
            }
            _ => Ok(Self {
                id: ItemId::parse(raw)?,
                version: None,
            }),
        }
    }

    /// Parse a newline-separated spec list, skipping blank lines and `#` comments.
    pub fn parse_list(content: &str) -> Result<Vec<Self>, ApiError> {
        content
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .map(Self::parse)
            .collect()
    }
}

impl fmt::Display for InstallSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.version {
            Some(v) => write!(f, "{}@{}", self.id, v),
            None => write!(f, "{}", self.id),
        }
    }
}

/// Host tool an agent is installed for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum Target {
    #[default]
    ClaudeCode,
    Codex,
    Copilot,
}

impl Target {
    pub const ALL: [Target; 3] = [Target::ClaudeCode, Target::Codex, Target::Copilot];

    pub fn as_str(&self) -> &'static str {
        match self {
            Target::ClaudeCode => "claude-code",
            Target::Codex => "codex",
            Target::Copilot => "copilot",
        }
    }

    /// Directory under `$HOME` where the host tool looks for agents.
    pub fn home_relative_dir(&self) -> &'static str {
        match self {
            Target::ClaudeCode => ".claude/agents",
            Target::Codex => ".codex/agents",
            Target::Copilot => ".copilot/agents",
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Target {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "claude-code" | "claudecode" | "claude" => Ok(Target::ClaudeCode),
            "codex" => Ok(Target::Codex),
            "copilot" => Ok(Target::Copilot),
            other => Err(ApiError::InvalidInput(format!(
                "unknown target '{}' (expected claude-code, codex, or copilot)",
                other
            ))),
        }
    }
}
