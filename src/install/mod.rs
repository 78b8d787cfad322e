//! Batch install, update, and uninstall
//!
//! Each id runs metadata -> compatibility -> content -> write -> ledger upsert as one
//! sequence under that id's lock. Different ids run concurrently up to the configured
//! limit, and one id failing never stops the others.

use crate::concurrency::ItemLocks;
use crate::config::InstallConfig;
use crate::error::ApiError;
use crate::ledger::{InstalledRecord, Ledger, PLACEHOLDER_VERSION};
use crate::registry::RegistryClient;
use crate::types::{InstallSpec, ItemId, Target};
use futures::stream::{self, StreamExt};
use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Orchestrator settings
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Target used by update operations
    pub target: Target,
    /// Maximum ids in flight at once
    pub concurrency: usize,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            target: Target::default(),
            concurrency: 4,
        }
    }
}

impl From<&InstallConfig> for OrchestratorConfig {
    fn from(install: &InstallConfig) -> Self {
        Self {
            target: install.target,
            concurrency: install.concurrency,
        }
    }
}

/// An id that was installed, planned (dry run), or left alone.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchItem {
    pub id: ItemId,
    pub version: String,
    pub path: PathBuf,
}

#[derive(Debug)]
pub struct BatchFailure {
    /// Raw id as requested; may not be a valid [`ItemId`]
    pub id: String,
    pub error: ApiError,
}

impl Serialize for BatchFailure {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("BatchFailure", 3)?;
        state.serialize_field("id", &self.id)?;
        state.serialize_field("kind", self.error.kind())?;
        state.serialize_field("error", &self.error.to_string())?;
        state.end()
    }
}

/// Per-id outcome of a batch, in request order.
#[derive(Debug, Default, Serialize)]
pub struct BatchReport {
    pub dry_run: bool,
    pub succeeded: Vec<BatchItem>,
    pub failed: Vec<BatchFailure>,
    /// Already current, so nothing was done
    pub skipped: Vec<BatchItem>,
}

impl BatchReport {
    pub fn success_count(&self) -> usize {
        self.succeeded.len()
    }

    pub fn failure_count(&self) -> usize {
        self.failed.len()
    }

    pub fn failed_ids(&self) -> Vec<&str> {
        self.failed.iter().map(|f| f.id.as_str()).collect()
    }

    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }

    fn push(&mut self, id: String, outcome: Result<Outcome, ApiError>) {
        match outcome {
            Ok(Outcome::Applied(item)) => self.succeeded.push(item),
            Ok(Outcome::Skipped(item)) => self.skipped.push(item),
            Err(error) => {
                warn!(id = %id, error = %error, "batch item failed");
                self.failed.push(BatchFailure { id, error });
            }
        }
    }
}

enum Outcome {
    Applied(BatchItem),
    Skipped(BatchItem),
}

/// Installed version compared against the catalog's latest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UpdateStatus {
    pub id: ItemId,
    pub installed_version: String,
    pub latest_version: String,
}

impl UpdateStatus {
    /// Versions are opaque strings, so only equality counts.
    pub fn is_current(&self) -> bool {
        self.installed_version == self.latest_version
    }
}

/// Drives batch operations across the registry client and the ledger.
pub struct Orchestrator {
    registry: Arc<RegistryClient>,
    ledger: Arc<Ledger>,
    locks: ItemLocks,
    config: OrchestratorConfig,
}

impl Orchestrator {
    pub fn new(registry: Arc<RegistryClient>, ledger: Arc<Ledger>, config: OrchestratorConfig) -> Self {
        Self {
            registry,
            ledger,
            locks: ItemLocks::new(),
            config,
        }
    }

    pub fn registry(&self) -> &Arc<RegistryClient> {
        &self.registry
    }

    pub fn ledger(&self) -> &Arc<Ledger> {
        &self.ledger
    }

    fn concurrency(&self) -> usize {
        self.config.concurrency.max(1)
    }

    /// Install every spec for `target`. With `dry_run`, metadata and compatibility are
    /// still resolved but nothing is written.
    pub async fn install_batch(&self, specs: &[InstallSpec], target: Target, dry_run: bool) -> BatchReport {
        info!(count = specs.len(), target = %target, dry_run, "installing batch");

        let outcomes: Vec<(String, Result<Outcome, ApiError>)> = stream::iter(specs)
            .map(|spec| async move {
                let _guard = self.locks.acquire(&spec.id).await;
                let outcome = self
                    .install_locked(&spec.id, spec.version.as_deref(), target, dry_run)
                    .await
                    .map(Outcome::Applied);
                (spec.id.to_string(), outcome)
            })
            .buffered(self.concurrency())
            .collect()
            .await;

        let mut report = BatchReport {
            dry_run,
            ..BatchReport::default()
        };
        for (id, outcome) in outcomes {
            report.push(id, outcome);
        }
        info!(
            succeeded = report.success_count(),
            failed = report.failure_count(),
            "batch install finished"
        );
        report
    }

    /// Install every agent in the catalog.
    pub async fn install_all(&self, target: Target, dry_run: bool) -> Result<BatchReport, ApiError> {
        let entries = self.registry.list_all_items().await?;

        let mut specs = Vec::with_capacity(entries.len());
        let mut invalid = Vec::new();
        for entry in entries {
            match ItemId::parse(&entry.id) {
                Ok(id) => specs.push(InstallSpec::new(id, None)),
                Err(error) => invalid.push(BatchFailure { id: entry.id, error }),
            }
        }

        let mut report = self.install_batch(&specs, target, dry_run).await;
        report.failed.extend(invalid);
        Ok(report)
    }

    /// Caller must hold the lock for `id`.
    async fn install_locked(
        &self,
        id: &ItemId,
        version: Option<&str>,
        target: Target,
        dry_run: bool,
    ) -> Result<BatchItem, ApiError> {
        let metadata = self.registry.fetch_item_metadata(id).await?;

        let version = match version.filter(|v| !v.is_empty()) {
            Some(v) => v.to_string(),
            None if !metadata.latest.is_empty() => metadata.latest.clone(),
            None => PLACEHOLDER_VERSION.to_string(),
        };

        if !metadata.compatibility.supports(target) {
            return Err(ApiError::Compatibility {
                id: id.to_string(),
                target: target.to_string(),
            });
        }

        let path = self.ledger.resolve_path(id);
        let item = BatchItem {
            id: id.clone(),
            version,
            path,
        };
        if dry_run {
            debug!(id = %id, path = %item.path.display(), "dry run, skipping write");
            return Ok(item);
        }

        let content = self
            .registry
            .fetch_item_content(id, Some(&item.version))
            .await?;
        let ledger = self.ledger.clone();
        let (task_id, version, path) = (id.clone(), item.version.clone(), item.path.clone());
        run_blocking(move || {
            write_content(&path, &content)?;
            ledger.record_install_version(&task_id, &version, &path)?;
            Ok(())
        })
        .await?;

        info!(id = %id, version = %item.version, "installed agent");
        Ok(item)
    }

    /// Compare every ledger row with the catalog. Ids whose metadata cannot be fetched,
    /// or that publish no latest version, are left out.
    pub async fn check_updates(&self) -> Result<Vec<UpdateStatus>, ApiError> {
        let installed = self.list_installed().await?;

        let statuses: Vec<Option<UpdateStatus>> = stream::iter(installed)
            .map(|record| async move {
                match self.registry.fetch_item_metadata(&record.id).await {
                    Ok(metadata) if metadata.latest.is_empty() => {
                        debug!(id = %record.id, "catalog publishes no latest version");
                        None
                    }
                    Ok(metadata) => Some(UpdateStatus {
                        id: record.id,
                        installed_version: record.version,
                        latest_version: metadata.latest.clone(),
                    }),
                    Err(e) => {
                        warn!(id = %record.id, error = %e, "skipping update check");
                        None
                    }
                }
            })
            .buffered(self.concurrency())
            .collect()
            .await;

        Ok(statuses.into_iter().flatten().collect())
    }

    /// Reinstall drifted agents at their latest version. An empty `ids` means every
    /// installed agent.
    pub async fn update_batch(&self, ids: &[ItemId]) -> Result<BatchReport, ApiError> {
        let installed = self.list_installed().await?;

        let requested: Vec<(String, Option<InstalledRecord>)> = if ids.is_empty() {
            installed
                .into_iter()
                .map(|record| (record.id.to_string(), Some(record)))
                .collect()
        } else {
            ids.iter()
                .map(|id| {
                    let record = installed.iter().find(|r| &r.id == id).cloned();
                    (id.to_string(), record)
                })
                .collect()
        };

        let target = self.config.target;
        let outcomes: Vec<(String, Result<Outcome, ApiError>)> = stream::iter(requested)
            .map(|(raw, record)| async move {
                let outcome = match record {
                    Some(record) => self.update_one(record, target).await,
                    None => Err(ApiError::NotFound(format!("Agent is not installed: {}", raw))),
                };
                (raw, outcome)
            })
            .buffered(self.concurrency())
            .collect()
            .await;

        let mut report = BatchReport::default();
        for (id, outcome) in outcomes {
            report.push(id, outcome);
        }
        info!(
            updated = report.success_count(),
            current = report.skipped.len(),
            failed = report.failure_count(),
            "batch update finished"
        );
        Ok(report)
    }

    async fn update_one(&self, record: InstalledRecord, target: Target) -> Result<Outcome, ApiError> {
        let _guard = self.locks.acquire(&record.id).await;
        let metadata = self.registry.fetch_item_metadata(&record.id).await?;

        // No published latest means there is nothing to move to.
        if metadata.latest.is_empty() || record.version == metadata.latest {
            debug!(id = %record.id, version = %record.version, "already current");
            return Ok(Outcome::Skipped(BatchItem {
                id: record.id,
                version: record.version,
                path: record.path,
            }));
        }

        let item = self
            .install_locked(&record.id, Some(&metadata.latest), target, false)
            .await?;
        Ok(Outcome::Applied(item))
    }

    /// Remove an installed agent's ledger row, then its file.
    ///
    /// If the file cannot be removed the row is already gone, so the agent no longer
    /// counts as installed and the error names the leftover path.
    pub async fn uninstall(&self, id: &ItemId) -> Result<InstalledRecord, ApiError> {
        let _guard = self.locks.acquire(id).await;

        let ledger = self.ledger.clone();
        let task_id = id.clone();
        let record = run_blocking(move || {
            let record = ledger.get_installed(&task_id)?;
            ledger.record_uninstall(&task_id)?;
            remove_content(&record.path)?;
            Ok(record)
        })
        .await?;

        info!(id = %id, "uninstalled agent");
        Ok(record)
    }

    async fn list_installed(&self) -> Result<Vec<InstalledRecord>, ApiError> {
        let ledger = self.ledger.clone();
        run_blocking(move || ledger.list_installed()).await
    }
}

/// Run file and ledger I/O on tokio's blocking pool.
async fn run_blocking<T, F>(task: F) -> Result<T, ApiError>
where
    F: FnOnce() -> Result<T, ApiError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(task)
        .await
        .map_err(|e| ApiError::Filesystem(format!("Blocking task failed: {}", e)))?
}

fn remove_content(path: &Path) -> Result<(), ApiError> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "content file already gone");
            Ok(())
        }
        Err(e) => Err(ApiError::Filesystem(format!(
            "Failed to remove {}: {}",
            path.display(),
            e
        ))),
    }
}

fn write_content(path: &Path, content: &str) -> Result<(), ApiError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| {
            ApiError::Filesystem(format!("Failed to create directory {}: {}", parent.display(), e))
        })?;
    }
    std::fs::write(path, content)
        .map_err(|e| ApiError::Filesystem(format!("Failed to write {}: {}", path.display(), e)))
}
