//! CLI Tooling
//!
//! Command-line front end for catalog queries and install bookkeeping. All rendering
//! happens here; the library layers only return values or typed errors.

use crate::config::{AgentsConfig, ConfigLoader};
use crate::error::ApiError;
use crate::install::{BatchReport, Orchestrator, OrchestratorConfig};
use crate::ledger::Ledger;
use crate::logging::LoggingConfig;
use crate::registry::{RegistryClient, SearchQuery, SortKey};
use crate::tooling::format::{
    format_batch_report, format_categories, format_entries_table, format_installed_table,
    format_metadata_text, format_update_table, to_json,
};
use crate::types::{InstallSpec, ItemId, Target};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::runtime::Runtime;
use tracing::{debug, info};

/// Agents CLI - browse and install agents from a remote catalog
#[derive(Parser)]
#[command(name = "agents")]
#[command(version, about = "Browse, install, and update agents from a remote catalog")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Configuration file path (overrides default config loading)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Install directory (overrides config and the target's default directory)
    #[arg(long, global = true)]
    pub install_dir: Option<PathBuf>,

    /// Enable verbose logging to stderr
    #[arg(long, short, global = true)]
    pub verbose: bool,

    /// Log level (trace, debug, info, warn, error, off)
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Log format (json, text)
    #[arg(long, global = true)]
    pub log_format: Option<String>,

    /// Log output (stdout, stderr, file, file+stderr, both)
    #[arg(long, global = true)]
    pub log_output: Option<String>,

    /// Log file path (if output includes "file")
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,
}

impl Cli {
    /// Fold the logging flags over the configured logging section.
    pub fn logging_config(&self, base: &LoggingConfig) -> LoggingConfig {
        let mut config = base.clone();
        if self.verbose {
            config.enabled = true;
            config.level = "debug".to_string();
            config.output = "stderr".to_string();
        }
        if let Some(level) = &self.log_level {
            config.level = level.clone();
        }
        if let Some(format) = &self.log_format {
            config.format = format.clone();
        }
        if let Some(output) = &self.log_output {
            config.output = output.clone();
        }
        if let Some(file) = &self.log_file {
            config.file = Some(file.clone());
        }
        config
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Search the catalog
    Search {
        /// Free text matched against names, descriptions, and tags
        query: Option<String>,
        #[arg(long)]
        category: Option<String>,
        #[arg(long)]
        tag: Option<String>,
        #[arg(long)]
        author: Option<String>,
        /// Sort key (downloads, rating, name, updated)
        #[arg(long, default_value = "downloads")]
        sort: String,
        /// Maximum results (0 for unlimited)
        #[arg(long, default_value = "0", allow_negative_numbers = true)]
        limit: i64,
        /// Only agents compatible with this target
        #[arg(long)]
        target: Option<String>,
        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
    },
    /// List catalog agents, installed agents, or available updates
    List {
        #[arg(long, conflicts_with = "updates")]
        installed: bool,
        #[arg(long)]
        updates: bool,
        #[arg(long)]
        category: Option<String>,
        /// Target whose install directory is inspected
        #[arg(long)]
        target: Option<String>,
        #[arg(long, default_value = "text")]
        format: String,
    },
    /// List catalog categories
    Categories {
        #[arg(long, default_value = "text")]
        format: String,
    },
    /// Show details for one agent
    Info {
        id: String,
        #[arg(long)]
        target: Option<String>,
        #[arg(long, default_value = "text")]
        format: String,
    },
    /// Install agents (`id` or `id@version`)
    Install {
        specs: Vec<String>,
        #[arg(long)]
        target: Option<String>,
        /// Resolve everything but write nothing
        #[arg(long)]
        dry_run: bool,
        /// Read specs from a file, one per line; `#` starts a comment
        #[arg(long)]
        from_file: Option<PathBuf>,
        /// Install every agent in the catalog
        #[arg(long, conflicts_with_all = ["specs", "from_file"])]
        all: bool,
        #[arg(long, default_value = "text")]
        format: String,
    },
    /// Update installed agents (all when no ids are given)
    Update {
        ids: Vec<String>,
        /// Only report which agents have updates
        #[arg(long)]
        check: bool,
        #[arg(long)]
        target: Option<String>,
        #[arg(long, default_value = "text")]
        format: String,
    },
    /// Remove an installed agent
    Uninstall {
        id: String,
        /// Skip the confirmation prompt
        #[arg(long)]
        force: bool,
        #[arg(long)]
        target: Option<String>,
    },
    /// Configuration commands
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Print the effective configuration
    Show {
        /// Output format (toml or json)
        #[arg(long, default_value = "toml")]
        format: String,
    },
    /// Write a default config file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
    /// Print the config file path
    Path,
}

/// CLI context: owns the runtime, configuration, and registry client.
pub struct CliContext {
    runtime: Runtime,
    config: AgentsConfig,
    config_path: Option<PathBuf>,
    install_dir: Option<PathBuf>,
    registry: Arc<RegistryClient>,
}

impl CliContext {
    /// Load configuration from `config_path`, or from the standard sources.
    pub fn load_config(config_path: Option<&Path>) -> Result<AgentsConfig, ApiError> {
        match config_path {
            Some(path) => ConfigLoader::load_from_file(path),
            None => ConfigLoader::load(),
        }
    }

    /// Create a CLI context talking HTTP to the configured registry.
    pub fn new(
        config: AgentsConfig,
        config_path: Option<PathBuf>,
        install_dir: Option<PathBuf>,
    ) -> Result<Self, ApiError> {
        let registry = Arc::new(RegistryClient::from_config(&config.registry)?);
        Self::with_registry(config, config_path, install_dir, registry)
    }

    /// Create a CLI context around an existing registry client.
    pub fn with_registry(
        config: AgentsConfig,
        config_path: Option<PathBuf>,
        install_dir: Option<PathBuf>,
        registry: Arc<RegistryClient>,
    ) -> Result<Self, ApiError> {
        let runtime = Runtime::new()
            .map_err(|e| ApiError::ConfigError(format!("Failed to create runtime: {}", e)))?;

        // Sweepers spawn onto the runtime, so it must be entered.
        {
            let _guard = runtime.enter();
            registry.start_background_eviction();
        }

        Ok(Self {
            runtime,
            config,
            config_path,
            install_dir,
            registry,
        })
    }

    pub fn config(&self) -> &AgentsConfig {
        &self.config
    }

    pub fn registry(&self) -> &Arc<RegistryClient> {
        &self.registry
    }

    fn target(&self, raw: Option<&str>) -> Result<Target, ApiError> {
        match raw {
            Some(raw) => raw.parse(),
            None => Ok(self.config.install.target),
        }
    }

    /// Install directory for `target`: `--install-dir`, then config, then the target default.
    pub fn install_dir(&self, target: Target) -> Result<PathBuf, ApiError> {
        match &self.install_dir {
            Some(dir) => Ok(dir.clone()),
            None => self.config.install.resolve_directory(target),
        }
    }

    pub fn ledger(&self, target: Target) -> Result<Arc<Ledger>, ApiError> {
        Ok(Arc::new(Ledger::new(self.install_dir(target)?)))
    }

    fn orchestrator(&self, target: Target) -> Result<Orchestrator, ApiError> {
        let mut config = OrchestratorConfig::from(&self.config.install);
        config.target = target;
        Ok(Orchestrator::new(
            Arc::clone(&self.registry),
            self.ledger(target)?,
            config,
        ))
    }

    /// Execute a CLI command
    pub fn execute(&self, command: &Commands) -> Result<String, ApiError> {
        match command {
            Commands::Search {
                query,
                category,
                tag,
                author,
                sort,
                limit,
                target,
                format,
            } => {
                let search = SearchQuery {
                    text: query.clone().unwrap_or_default(),
                    category: category.clone(),
                    tag: tag.clone(),
                    author: author.clone(),
                    compatible_with: target.as_deref().map(str::parse::<Target>).transpose()?,
                    sort: SortKey::from_name(sort),
                    limit: *limit,
                };
                let results = self.runtime.block_on(self.registry.search(&search))?;
                if format == "json" {
                    return to_json(&results);
                }
                Ok(format_entries_table(&results))
            }
            Commands::List {
                installed,
                updates,
                category,
                target,
                format,
            } => self.handle_list(*installed, *updates, category.as_deref(), target.as_deref(), format),
            Commands::Categories { format } => {
                let categories = self.runtime.block_on(self.registry.categories())?;
                if format == "json" {
                    return to_json(&categories);
                }
                Ok(format_categories(&categories))
            }
            Commands::Info { id, target, format } => {
                let id = ItemId::parse(id)?;
                let metadata = self.runtime.block_on(self.registry.fetch_item_metadata(&id))?;
                let ledger = self.ledger(self.target(target.as_deref())?)?;
                let installed = match ledger.get_installed(&id) {
                    Ok(record) => Some(record),
                    Err(ApiError::NotFound(_)) => None,
                    Err(e) => return Err(e),
                };
                if format == "json" {
                    return to_json(&serde_json::json!({
                        "metadata": &*metadata,
                        "installed": installed,
                    }));
                }
                Ok(format_metadata_text(&metadata, installed.as_ref()))
            }
            Commands::Install {
                specs,
                target,
                dry_run,
                from_file,
                all,
                format,
            } => self.handle_install(specs, target.as_deref(), *dry_run, from_file.as_deref(), *all, format),
            Commands::Update {
                ids,
                check,
                target,
                format,
            } => self.handle_update(ids, *check, target.as_deref(), format),
            Commands::Uninstall { id, force, target } => {
                self.handle_uninstall(id, *force, target.as_deref())
            }
            Commands::Config { command } => self.handle_config(command),
        }
    }

    fn handle_list(
        &self,
        installed: bool,
        updates: bool,
        category: Option<&str>,
        target: Option<&str>,
        format: &str,
    ) -> Result<String, ApiError> {
        let target = self.target(target)?;

        if installed {
            let records = self.ledger(target)?.list_installed()?;
            if format == "json" {
                return to_json(&records);
            }
            return Ok(format_installed_table(&records));
        }

        if updates {
            let orchestrator = self.orchestrator(target)?;
            let statuses: Vec<_> = self
                .runtime
                .block_on(orchestrator.check_updates())?
                .into_iter()
                .filter(|status| !status.is_current())
                .collect();
            if format == "json" {
                return to_json(&statuses);
            }
            return Ok(format_update_table(&statuses));
        }

        let mut query = SearchQuery::default().sort(SortKey::Name);
        if let Some(category) = category {
            query = query.category(category);
        }
        let entries = self.runtime.block_on(self.registry.search(&query))?;
        if format == "json" {
            return to_json(&entries);
        }
        Ok(format_entries_table(&entries))
    }

    fn handle_install(
        &self,
        raw_specs: &[String],
        target: Option<&str>,
        dry_run: bool,
        from_file: Option<&Path>,
        all: bool,
        format: &str,
    ) -> Result<String, ApiError> {
        let target = self.target(target)?;
        let orchestrator = self.orchestrator(target)?;

        let report = if all {
            self.runtime.block_on(orchestrator.install_all(target, dry_run))?
        } else {
            let mut specs = raw_specs
                .iter()
                .map(|raw| InstallSpec::parse(raw))
                .collect::<Result<Vec<_>, _>>()?;
            if let Some(path) = from_file {
                let content = std::fs::read_to_string(path).map_err(|e| {
                    ApiError::InvalidInput(format!("Failed to read {}: {}", path.display(), e))
                })?;
                specs.extend(InstallSpec::parse_list(&content)?);
            }
            if specs.is_empty() {
                return Err(ApiError::InvalidInput(
                    "No agents specified. Pass ids, --from-file, or --all".to_string(),
                ));
            }
            debug!(count = specs.len(), "parsed install specs");
            self.runtime
                .block_on(orchestrator.install_batch(&specs, target, dry_run))
        };

        render_report(&report, "install", format)
    }

    fn handle_update(
        &self,
        raw_ids: &[String],
        check: bool,
        target: Option<&str>,
        format: &str,
    ) -> Result<String, ApiError> {
        let orchestrator = self.orchestrator(self.target(target)?)?;

        if check {
            let statuses = self.runtime.block_on(orchestrator.check_updates())?;
            if format == "json" {
                return to_json(&statuses);
            }
            return Ok(format_update_table(&statuses));
        }

        let ids = raw_ids
            .iter()
            .map(|raw| ItemId::parse(raw))
            .collect::<Result<Vec<_>, _>>()?;
        let report = self.runtime.block_on(orchestrator.update_batch(&ids))?;
        render_report(&report, "update", format)
    }

    fn handle_uninstall(&self, raw_id: &str, force: bool, target: Option<&str>) -> Result<String, ApiError> {
        let id = ItemId::parse(raw_id)?;
        let orchestrator = self.orchestrator(self.target(target)?)?;

        if !force {
            use dialoguer::Confirm;
            let confirmed = Confirm::new()
                .with_prompt(format!("Uninstall agent '{}'?", id))
                .interact()
                .map_err(|e| ApiError::InvalidInput(format!("Failed to get user input: {}", e)))?;

            if !confirmed {
                return Ok("Uninstall cancelled".to_string());
            }
        }

        let record = self.runtime.block_on(orchestrator.uninstall(&id))?;
        Ok(format!(
            "Uninstalled {}@{}\nRemoved: {}",
            record.id,
            record.version,
            record.path.display()
        ))
    }

    fn handle_config(&self, command: &ConfigCommands) -> Result<String, ApiError> {
        match command {
            ConfigCommands::Show { format } => {
                if format == "json" {
                    return to_json(&self.config);
                }
                toml::to_string_pretty(&self.config)
                    .map_err(|e| ApiError::ConfigError(format!("Failed to render config: {}", e)))
            }
            ConfigCommands::Init { force } => {
                let path = self.config_file_path()?;
                ConfigLoader::write_default(&path, *force)?;
                Ok(format!("Wrote default configuration to {}", path.display()))
            }
            ConfigCommands::Path => Ok(self.config_file_path()?.display().to_string()),
        }
    }

    fn config_file_path(&self) -> Result<PathBuf, ApiError> {
        match &self.config_path {
            Some(path) => Ok(path.clone()),
            None => ConfigLoader::default_path(),
        }
    }

    /// Stop background work. Call before the process exits.
    pub fn shutdown(self) {
        self.runtime.block_on(self.registry.shutdown());
        info!("shutdown complete");
    }
}

/// Render a report; a report with failures becomes [`ApiError::PartialFailure`].
fn render_report(report: &BatchReport, verb: &str, format: &str) -> Result<String, ApiError> {
    let rendered = if format == "json" {
        to_json(report)?
    } else {
        format_batch_report(report, verb)
    };
    if report.is_success() {
        Ok(rendered)
    } else {
        Err(ApiError::PartialFailure(rendered))
    }
}
