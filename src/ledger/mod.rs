//! Installation ledger (`<install_dir>/.registry.json`)
//!
//! The ledger file is the only source of truth for what is installed. Every mutation
//! reads the whole file, applies one change, and atomically replaces the file, all
//! under a single process-wide lock.

use crate::error::ApiError;
use crate::types::ItemId;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, info};

/// Ledger file name inside the install directory
pub const LEDGER_FILE: &str = ".registry.json";

/// Version recorded by [`Ledger::record_install`] for rows it creates.
pub const PLACEHOLDER_VERSION: &str = "latest";

/// One installed agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstalledRecord {
    pub id: ItemId,
    pub version: String,
    pub installed_at: DateTime<Utc>,
    pub path: PathBuf,
}

/// Durable record of installed agents.
pub struct Ledger {
    install_dir: PathBuf,
    ledger_path: PathBuf,
    /// Serializes every read and read-modify-write of the ledger file
    lock: Mutex<()>,
}

impl Ledger {
    pub fn new(install_dir: impl Into<PathBuf>) -> Self {
        let install_dir = install_dir.into();
        let ledger_path = install_dir.join(LEDGER_FILE);
        Self {
            install_dir,
            ledger_path,
            lock: Mutex::new(()),
        }
    }

    pub fn install_dir(&self) -> &Path {
        &self.install_dir
    }

    pub fn ledger_path(&self) -> &Path {
        &self.ledger_path
    }

    /// Where the content file for `id` lives. Touches neither the ledger nor the disk.
    pub fn resolve_path(&self, id: &ItemId) -> PathBuf {
        self.install_dir.join(format!("{}.md", id.as_str()))
    }

    /// All rows, in file order. A missing ledger file is an empty ledger.
    pub fn list_installed(&self) -> Result<Vec<InstalledRecord>, ApiError> {
        let _guard = self.lock.lock();
        self.read()
    }

    pub fn get_installed(&self, id: &ItemId) -> Result<InstalledRecord, ApiError> {
        let _guard = self.lock.lock();
        self.read()?
            .into_iter()
            .find(|record| &record.id == id)
            .ok_or_else(|| ApiError::NotFound(format!("Agent is not installed: {}", id)))
    }

    pub fn is_installed(&self, id: &ItemId) -> Result<bool, ApiError> {
        match self.get_installed(id) {
            Ok(_) => Ok(true),
            Err(ApiError::NotFound(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Upsert by id. An existing row keeps its version and gets a fresh timestamp and
    /// path; a new row is appended with [`PLACEHOLDER_VERSION`].
    pub fn record_install(&self, id: &ItemId, path: &Path) -> Result<InstalledRecord, ApiError> {
        self.upsert(id, None, path)
    }

    /// Upsert by id, also setting the installed version.
    pub fn record_install_version(
        &self,
        id: &ItemId,
        version: &str,
        path: &Path,
    ) -> Result<InstalledRecord, ApiError> {
        self.upsert(id, Some(version), path)
    }

    fn upsert(
        &self,
        id: &ItemId,
        version: Option<&str>,
        path: &Path,
    ) -> Result<InstalledRecord, ApiError> {
        let _guard = self.lock.lock();
        let mut records = self.read()?;
        let now = Utc::now();

        let record = match records.iter_mut().find(|record| &record.id == id) {
            Some(existing) => {
                existing.installed_at = now;
                existing.path = path.to_path_buf();
                if let Some(version) = version {
                    existing.version = version.to_string();
                }
                existing.clone()
            }
            None => {
                let record = InstalledRecord {
                    id: id.clone(),
                    version: version.unwrap_or(PLACEHOLDER_VERSION).to_string(),
                    installed_at: now,
                    path: path.to_path_buf(),
                };
                records.push(record.clone());
                record
            }
        };

        self.write(&records)?;
        info!(id = %id, version = %record.version, "recorded install");
        Ok(record)
    }

    /// Remove the row for `id`. Returns whether a row existed; an absent id leaves the
    /// file untouched.
    pub fn record_uninstall(&self, id: &ItemId) -> Result<bool, ApiError> {
        let _guard = self.lock.lock();
        let mut records = self.read()?;
        let before = records.len();
        records.retain(|record| &record.id != id);

        if records.len() == before {
            debug!(id = %id, "uninstall of unrecorded agent is a no-op");
            return Ok(false);
        }

        self.write(&records)?;
        info!(id = %id, "recorded uninstall");
        Ok(true)
    }

    fn read(&self) -> Result<Vec<InstalledRecord>, ApiError> {
        let content = match std::fs::read_to_string(&self.ledger_path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(ApiError::Filesystem(format!(
                    "Failed to read ledger {}: {}",
                    self.ledger_path.display(),
                    e
                )))
            }
        };

        if content.trim().is_empty() {
            return Ok(Vec::new());
        }

        serde_json::from_str(&content).map_err(|e| ApiError::LedgerCorrupt {
            path: self.ledger_path.clone(),
            reason: e.to_string(),
        })
    }

    /// Replace the ledger file via a temp file in the same directory.
    fn write(&self, records: &[InstalledRecord]) -> Result<(), ApiError> {
        std::fs::create_dir_all(&self.install_dir).map_err(|e| {
            ApiError::Filesystem(format!(
                "Failed to create install directory {}: {}",
                self.install_dir.display(),
                e
            ))
        })?;

        let body = serde_json::to_string_pretty(records)
            .map_err(|e| ApiError::Filesystem(format!("Failed to serialize ledger: {}", e)))?;

        let mut temp = NamedTempFile::new_in(&self.install_dir)?;
        temp.write_all(body.as_bytes())?;
        temp.as_file().sync_all()?;
        temp.persist(&self.ledger_path).map_err(|e| {
            ApiError::Filesystem(format!(
                "Failed to replace ledger {}: {}",
                self.ledger_path.display(),
                e.error
            ))
        })?;
        Ok(())
    }
}
