//! Registry client: catalog, metadata and content fetches behind a TTL cache.

use crate::cache::{CacheSweeper, Clock, SystemClock, TtlCache};
use crate::config::RegistryConfig;
use crate::error::ApiError;
use crate::registry::models::{CatalogEntry, CatalogIndex, Category, ItemMetadata};
use crate::registry::search::{self, SearchQuery};
use crate::registry::transport::{HttpTransport, Transport};
use crate::types::ItemId;
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Fixed cache key for the catalog document.
pub const CATALOG_CACHE_KEY: &str = "registry";

fn metadata_cache_key(id: &ItemId) -> String {
    format!("metadata:{}", id)
}

/// Client for the remote agent catalog.
///
/// Owns two independent caches, one per payload type. Content bodies are never cached.
pub struct RegistryClient {
    base_url: String,
    cache_ttl: Duration,
    sweep_interval: Duration,
    versioned_content: bool,
    transport: Arc<dyn Transport>,
    catalog_cache: Arc<TtlCache<Arc<CatalogIndex>>>,
    metadata_cache: Arc<TtlCache<Arc<ItemMetadata>>>,
    sweepers: Mutex<Vec<CacheSweeper>>,
}

impl RegistryClient {
    pub fn new(config: &RegistryConfig, transport: Arc<dyn Transport>) -> Self {
        Self::with_clock(config, transport, Arc::new(SystemClock))
    }

    /// Build a client whose caches read time from `clock`.
    pub fn with_clock(
        config: &RegistryConfig,
        transport: Arc<dyn Transport>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            base_url: config.url.trim_end_matches('/').to_string(),
            cache_ttl: config.cache_ttl(),
            sweep_interval: config.sweep_interval(),
            versioned_content: config.versioned_content,
            transport,
            catalog_cache: Arc::new(TtlCache::with_clock(clock.clone())),
            metadata_cache: Arc::new(TtlCache::with_clock(clock)),
            sweepers: Mutex::new(Vec::new()),
        }
    }

    /// Client talking HTTP to the configured registry.
    pub fn from_config(config: &RegistryConfig) -> Result<Self, ApiError> {
        let transport = HttpTransport::new(config.timeout())?;
        Ok(Self::new(config, Arc::new(transport)))
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn catalog_url(&self) -> String {
        format!("{}/registry.json", self.base_url)
    }

    pub fn metadata_url(&self, id: &ItemId) -> String {
        let (author, name) = id.split();
        format!("{}/agents/{}/{}/metadata.json", self.base_url, author, name)
    }

    /// Location of an item's content.
    ///
    /// The version only changes the path when versioned content is enabled.
    pub fn content_url(&self, id: &ItemId, version: Option<&str>) -> String {
        let (author, name) = id.split();
        match version {
            Some(version) if self.versioned_content && !version.is_empty() => format!(
                "{}/agents/{}/{}/{}_v{}.md",
                self.base_url, author, name, name, version
            ),
            _ => format!("{}/agents/{}/{}/agent.md", self.base_url, author, name),
        }
    }

    /// Return the catalog, fetching it only on a cache miss.
    pub async fn fetch_catalog(&self) -> Result<Arc<CatalogIndex>, ApiError> {
        if let Some(catalog) = self.catalog_cache.get(CATALOG_CACHE_KEY) {
            debug!("catalog cache hit");
            return Ok(catalog);
        }
        debug!("catalog cache miss");

        let url = self.catalog_url();
        info!(url = %url, "fetching catalog");
        let body = self.transport.get_text(&url).await?;
        let catalog = Arc::new(CatalogIndex::from_json(&body).map_err(|e| {
            warn!(url = %url, error = %e, "catalog body did not parse");
            e
        })?);

        self.catalog_cache
            .set(CATALOG_CACHE_KEY, catalog.clone(), self.cache_ttl);
        Ok(catalog)
    }

    pub async fn list_all_items(&self) -> Result<Vec<CatalogEntry>, ApiError> {
        Ok(self.fetch_catalog().await?.entries())
    }

    pub async fn search(&self, query: &SearchQuery) -> Result<Vec<CatalogEntry>, ApiError> {
        let entries = self.list_all_items().await?;
        Ok(search::apply(entries, query))
    }

    pub async fn categories(&self) -> Result<BTreeMap<String, Category>, ApiError> {
        Ok(self.fetch_catalog().await?.categories.clone())
    }

    pub async fn fetch_item_metadata(&self, id: &ItemId) -> Result<Arc<ItemMetadata>, ApiError> {
        let key = metadata_cache_key(id);
        if let Some(metadata) = self.metadata_cache.get(&key) {
            debug!(id = %id, "metadata cache hit");
            return Ok(metadata);
        }
        debug!(id = %id, "metadata cache miss");

        let url = self.metadata_url(id);
        info!(url = %url, "fetching agent metadata");
        let body = self.transport.get_text(&url).await?;
        let metadata = Arc::new(ItemMetadata::from_json(&body).map_err(|e| {
            warn!(url = %url, error = %e, "metadata body did not parse");
            e
        })?);

        self.metadata_cache.set(key, metadata.clone(), self.cache_ttl);
        Ok(metadata)
    }

    /// Fetch raw markdown for an item. Never cached.
    pub async fn fetch_item_content(
        &self,
        id: &ItemId,
        version: Option<&str>,
    ) -> Result<String, ApiError> {
        let url = self.content_url(id, version);
        info!(url = %url, "fetching agent content");
        self.transport.get_text(&url).await
    }

    pub fn clear_cache(&self) {
        self.catalog_cache.clear();
        self.metadata_cache.clear();
    }

    /// Start periodic eviction on both caches. Must be called within a tokio runtime.
    /// Calling it again while sweepers run is a no-op.
    pub fn start_background_eviction(&self) {
        let mut sweepers = self.sweepers.lock();
        if !sweepers.is_empty() {
            return;
        }
        sweepers.push(self.catalog_cache.start_sweeper(self.sweep_interval));
        sweepers.push(self.metadata_cache.start_sweeper(self.sweep_interval));
        debug!(interval_secs = self.sweep_interval.as_secs(), "cache sweepers started");
    }

    pub fn is_evicting(&self) -> bool {
        self.sweepers.lock().iter().any(CacheSweeper::is_running)
    }

    /// Stop the sweepers and wait for them to exit.
    pub async fn shutdown(&self) {
        let sweepers: Vec<CacheSweeper> = std::mem::take(&mut *self.sweepers.lock());
        for sweeper in sweepers {
            sweeper.stop().await;
        }
        debug!("cache sweepers stopped");
    }
}
