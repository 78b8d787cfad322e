//! Agent Catalog: client for a remote catalog of installable agents
//!
//! Fetches and searches the catalog through a TTL cache, installs agent content to a
//! local directory, and keeps an installation ledger so updates and drift can be
//! reported.

pub mod cache;
pub mod concurrency;
pub mod config;
pub mod error;
pub mod install;
pub mod ledger;
pub mod logging;
pub mod registry;
pub mod tooling;
pub mod types;

pub use error::ApiError;
pub use install::{BatchReport, Orchestrator, OrchestratorConfig, UpdateStatus};
pub use ledger::{InstalledRecord, Ledger};
pub use registry::{RegistryClient, SearchQuery, SortKey};
pub use types::{InstallSpec, ItemId, Target};
