//! Remote catalog access: wire models, search, transport and the caching client.

pub mod client;
pub mod models;
pub mod search;
pub mod transport;

pub use client::RegistryClient;
pub use models::{
    CatalogEntry, CatalogIndex, CatalogStats, Category, Compatibility, CompatibilityInfo,
    ItemMetadata, LocalizedText, VersionInfo,
};
pub use search::{SearchQuery, SortKey};
pub use transport::{HttpTransport, Transport};
