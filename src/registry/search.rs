//! Query, filter and sort over catalog entries.

use crate::registry::models::CatalogEntry;
use crate::types::Target;
use std::cmp::Ordering;
use std::fmt;

/// Sort order for search results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortKey {
    #[default]
    Downloads,
    Rating,
    Name,
    Updated,
}

impl SortKey {
    /// Unknown or empty names fall back to [`SortKey::Downloads`].
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "rating" => SortKey::Rating,
            "name" => SortKey::Name,
            "updated" => SortKey::Updated,
            _ => SortKey::Downloads,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SortKey::Downloads => "downloads",
            SortKey::Rating => "rating",
            SortKey::Name => "name",
            SortKey::Updated => "updated",
        }
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Search parameters. Empty strings count as "no filter".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchQuery {
    pub text: String,
    pub category: Option<String>,
    pub tag: Option<String>,
    pub author: Option<String>,
    pub compatible_with: Option<Target>,
    pub sort: SortKey,
    /// Maximum results; zero or negative means unlimited
    pub limit: i64,
}

impl SearchQuery {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    pub fn author(mut self, author: impl Into<String>) -> Self {
        self.author = Some(author.into());
        self
    }

    pub fn compatible_with(mut self, target: Target) -> Self {
        self.compatible_with = Some(target);
        self
    }

    pub fn sort(mut self, sort: SortKey) -> Self {
        self.sort = sort;
        self
    }

    pub fn limit(mut self, limit: i64) -> Self {
        self.limit = limit;
        self
    }
}

fn active(filter: &Option<String>) -> Option<&str> {
    filter.as_deref().filter(|value| !value.is_empty())
}

/// Lowercased haystack for free-text search: names, descriptions, then tags.
fn search_text(entry: &CatalogEntry) -> String {
    entry
        .name
        .variants()
        .chain(entry.description.variants())
        .chain(entry.tags.iter().map(String::as_str))
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Whether `entry` passes every active filter of `query`.
pub fn matches(entry: &CatalogEntry, query: &SearchQuery) -> bool {
    if let Some(category) = active(&query.category) {
        if entry.category != category {
            return false;
        }
    }

    if let Some(tag) = active(&query.tag) {
        if !entry.tags.iter().any(|t| t == tag) {
            return false;
        }
    }

    if let Some(author) = active(&query.author) {
        if entry.author != author {
            return false;
        }
    }

    if !query.text.is_empty() && !search_text(entry).contains(&query.text.to_lowercase()) {
        return false;
    }

    if let Some(target) = query.compatible_with {
        if !entry.compatibility.supports(target) {
            return false;
        }
    }

    true
}

fn compare(a: &CatalogEntry, b: &CatalogEntry, key: SortKey) -> Ordering {
    match key {
        SortKey::Downloads => b.downloads.cmp(&a.downloads),
        SortKey::Rating => b.rating.total_cmp(&a.rating),
        SortKey::Name => a.name.en.cmp(&b.name.en),
        SortKey::Updated => match (a.updated_at, b.updated_at) {
            (Some(a), Some(b)) => b.cmp(&a),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        },
    }
}

/// Stable sort; ties keep their incoming order.
pub fn sort_entries(entries: &mut [CatalogEntry], key: SortKey) {
    entries.sort_by(|a, b| compare(a, b, key));
}

/// Filter, sort and truncate.
pub fn apply(entries: Vec<CatalogEntry>, query: &SearchQuery) -> Vec<CatalogEntry> {
    let mut results: Vec<CatalogEntry> = entries
        .into_iter()
        .filter(|entry| matches(entry, query))
        .collect();

    sort_entries(&mut results, query.sort);

    if query.limit > 0 {
        results.truncate(usize::try_from(query.limit).unwrap_or(usize::MAX));
    }
    results
}
