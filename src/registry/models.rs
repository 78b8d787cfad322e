//! Wire models for the remote catalog (`registry.json`) and per-agent metadata.

use crate::error::ApiError;
use crate::types::Target;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

/// Read an explicit `null` as the field's default, same as an absent field.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Option::unwrap_or_default)
}

/// Text carried in several languages. Only English is guaranteed to be present.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocalizedText {
    #[serde(deserialize_with = "null_as_default")]
    pub en: String,
    #[serde(deserialize_with = "null_as_default")]
    pub zh: String,
    #[serde(deserialize_with = "null_as_default")]
    pub ja: String,
}

impl LocalizedText {
    pub fn english(text: impl Into<String>) -> Self {
        Self {
            en: text.into(),
            ..Self::default()
        }
    }

    /// All non-empty translations, in a fixed language order.
    pub fn variants(&self) -> impl Iterator<Item = &str> {
        [self.en.as_str(), self.zh.as_str(), self.ja.as_str()]
            .into_iter()
            .filter(|s| !s.is_empty())
    }
}

/// Per-target support block.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CompatibilityInfo {
    #[serde(deserialize_with = "null_as_default")]
    pub min_version: String,
    #[serde(deserialize_with = "null_as_default")]
    pub tested: Vec<String>,
}

/// Which host tools an agent declares support for. A missing block means unsupported.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Compatibility {
    #[serde(
        rename = "claudeCode",
        alias = "claude-code",
        skip_serializing_if = "Option::is_none"
    )]
    pub claude_code: Option<CompatibilityInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub codex: Option<CompatibilityInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub copilot: Option<CompatibilityInfo>,
}

impl Compatibility {
    pub fn for_target(&self, target: Target) -> Option<&CompatibilityInfo> {
        match target {
            Target::ClaudeCode => self.claude_code.as_ref(),
            Target::Codex => self.codex.as_ref(),
            Target::Copilot => self.copilot.as_ref(),
        }
    }

    pub fn supports(&self, target: Target) -> bool {
        self.for_target(target).is_some()
    }

    pub fn supported_targets(&self) -> Vec<Target> {
        Target::ALL
            .into_iter()
            .filter(|target| self.supports(*target))
            .collect()
    }
}

/// Summary row for one agent in the catalog. Carries no content.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CatalogEntry {
    #[serde(deserialize_with = "null_as_default")]
    pub id: String,
    #[serde(deserialize_with = "null_as_default")]
    pub name: LocalizedText,
    #[serde(deserialize_with = "null_as_default")]
    pub description: LocalizedText,
    #[serde(deserialize_with = "null_as_default")]
    pub author: String,
    #[serde(deserialize_with = "null_as_default")]
    pub category: String,
    #[serde(deserialize_with = "null_as_default")]
    pub tags: Vec<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub latest: String,
    #[serde(deserialize_with = "null_as_default")]
    pub versions: Vec<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub downloads: u64,
    #[serde(deserialize_with = "null_as_default")]
    pub rating: f64,
    #[serde(deserialize_with = "null_as_default")]
    pub rating_count: u64,
    #[serde(deserialize_with = "null_as_default")]
    pub license: String,
    #[serde(deserialize_with = "null_as_default")]
    pub compatibility: Compatibility,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Category {
    #[serde(deserialize_with = "null_as_default")]
    pub name: LocalizedText,
    #[serde(deserialize_with = "null_as_default")]
    pub description: LocalizedText,
    #[serde(deserialize_with = "null_as_default")]
    pub icon: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CatalogStats {
    #[serde(deserialize_with = "null_as_default")]
    pub total_downloads: u64,
    #[serde(deserialize_with = "null_as_default")]
    pub active_users: u64,
    #[serde(deserialize_with = "null_as_default")]
    pub top_agents: Vec<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub recent_updates: Vec<String>,
}

/// The whole remote catalog. Replaced wholesale on every fetch, never patched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CatalogIndex {
    /// Schema version of the catalog document
    #[serde(deserialize_with = "null_as_default")]
    pub version: String,
    pub last_updated: Option<DateTime<Utc>>,
    #[serde(deserialize_with = "null_as_default")]
    pub total_agents: u64,
    /// Entries keyed by stable agent id
    #[serde(deserialize_with = "null_as_default")]
    pub agents: BTreeMap<String, CatalogEntry>,
    #[serde(deserialize_with = "null_as_default")]
    pub categories: BTreeMap<String, Category>,
    #[serde(deserialize_with = "null_as_default")]
    pub stats: CatalogStats,
}

impl CatalogIndex {
    pub fn from_json(body: &str) -> Result<Self, ApiError> {
        serde_json::from_str(body)
            .map_err(|e| ApiError::Parse(format!("Failed to parse catalog: {}", e)))
    }

    /// Entries in map order. An entry without an `id` inherits its map key.
    pub fn entries(&self) -> Vec<CatalogEntry> {
        self.agents
            .iter()
            .map(|(key, entry)| {
                let mut entry = entry.clone();
                if entry.id.is_empty() {
                    entry.id = key.clone();
                }
                entry
            })
            .collect()
    }

    pub fn get(&self, id: &str) -> Option<&CatalogEntry> {
        self.agents.get(id)
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }
}

/// One published version of an agent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct VersionInfo {
    /// Not ordered consistently with version strings; never infer recency from it.
    pub release_date: Option<DateTime<Utc>>,
    #[serde(deserialize_with = "null_as_default")]
    pub changes: String,
    /// Relative file path to content reference
    #[serde(deserialize_with = "null_as_default")]
    pub files: BTreeMap<String, String>,
}

/// Detailed record for one agent, fetched lazily per id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ItemMetadata {
    #[serde(deserialize_with = "null_as_default")]
    pub id: String,
    #[serde(deserialize_with = "null_as_default")]
    pub name: LocalizedText,
    #[serde(deserialize_with = "null_as_default")]
    pub description: LocalizedText,
    #[serde(deserialize_with = "null_as_default")]
    pub long_description: LocalizedText,
    #[serde(deserialize_with = "null_as_default")]
    pub author: String,
    #[serde(deserialize_with = "null_as_default")]
    pub license: String,
    #[serde(deserialize_with = "null_as_default")]
    pub homepage: String,
    #[serde(deserialize_with = "null_as_default")]
    pub category: String,
    #[serde(deserialize_with = "null_as_default")]
    pub tags: Vec<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub compatibility: Compatibility,
    #[serde(deserialize_with = "null_as_default")]
    pub versions: BTreeMap<String, VersionInfo>,
    #[serde(deserialize_with = "null_as_default")]
    pub latest: String,
    #[serde(deserialize_with = "null_as_default")]
    pub downloads: u64,
    #[serde(deserialize_with = "null_as_default")]
    pub rating: f64,
    #[serde(deserialize_with = "null_as_default")]
    pub rating_count: u64,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl ItemMetadata {
    pub fn from_json(body: &str) -> Result<Self, ApiError> {
        serde_json::from_str(body)
            .map_err(|e| ApiError::Parse(format!("Failed to parse agent metadata: {}", e)))
    }

    pub fn version(&self, version: &str) -> Option<&VersionInfo> {
        self.versions.get(version)
    }
}
