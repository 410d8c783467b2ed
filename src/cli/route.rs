//! CLI route: single route table and run context. Dispatches to pipeline services and presentation.

use crate::catalog::{seed, Curriculum};
use crate::checkpoint::{CheckpointStore, FileCheckpointStore};
use crate::config::{AppConfig, ConfigLoader, StorageConfig};
use crate::emission::export_group;
use crate::error::{PipelineError, ProviderError};
use crate::generator::ContentGenerator;
use crate::orchestrator::{BatchOrchestrator, BundleSpool, RunOptions};
use crate::provider::ProviderFactory;
use crate::retry::RetryPolicy;
use crate::store::{ContentStore, SqliteContentStore};
use crate::validator::Validator;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

use super::parse::Commands;
use super::presentation::{
    format_batch_report_text, format_progress_state_text, format_seed_summary,
    format_validation_text, to_json,
};

/// What a command printed and whether it met its goal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutcome {
    pub output: String,
    /// False when unresolved failures remain; the binary exits non-zero.
    pub success: bool,
}

impl CommandOutcome {
    fn ok(output: String) -> Self {
        Self {
            output,
            success: true,
        }
    }
}

/// Runtime context for CLI execution: workspace, validated config, resolved storage paths.
pub struct RunContext {
    workspace_root: PathBuf,
    config: AppConfig,
    storage: StorageConfig,
}

impl RunContext {
    /// Load config from `config_path` if given, otherwise through the layered loader.
    pub fn new(workspace_root: PathBuf, config_path: Option<PathBuf>) -> Result<Self, PipelineError> {
        let config = match config_path {
            Some(ref path) => ConfigLoader::load_from_file(path)?,
            None => ConfigLoader::load(&workspace_root)?,
        };
        Self::with_config(workspace_root, config)
    }

    pub fn with_config(workspace_root: PathBuf, config: AppConfig) -> Result<Self, PipelineError> {
        config.validate().map_err(|errors| {
            let messages: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
            PipelineError::ConfigError(format!(
                "Configuration validation failed:\n{}",
                messages.join("\n")
            ))
        })?;
        let storage = config.storage.resolve(&workspace_root);
        Ok(Self {
            workspace_root,
            config,
            storage,
        })
    }

    pub fn workspace_root(&self) -> &Path {
        &self.workspace_root
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Execute a CLI command on a fresh tokio runtime.
    pub fn execute(&self, command: &Commands) -> Result<CommandOutcome, PipelineError> {
        let runtime = tokio::runtime::Runtime::new()
            .map_err(|e| PipelineError::ConfigError(format!("Failed to create runtime: {}", e)))?;
        runtime.block_on(self.execute_async(command))
    }

    pub async fn execute_async(&self, command: &Commands) -> Result<CommandOutcome, PipelineError> {
        match command {
            Commands::Run {
                groups,
                all,
                resume,
                force,
                validate_only,
                import_only,
                export,
                format,
            } => {
                let options = RunOptions {
                    resume: *resume,
                    force: *force,
                    validate_only: *validate_only,
                    import_only: *import_only,
                    export_dir: export.clone(),
                };
                self.handle_run(groups, *all, &options, format).await
            }
            Commands::Validate { groups, format } => self.handle_validate(groups, format).await,
            Commands::Seed { curriculum } => {
                let curriculum = Curriculum::load(curriculum)?;
                let store = self.open_store().await?;
                let summary = seed(&store, &curriculum).await?;
                Ok(CommandOutcome::ok(format_seed_summary(&summary)))
            }
            Commands::Export { group, out } => {
                let store = self.open_store().await?;
                let writer = export_group(&store, group).await?;
                let dir = out.clone().unwrap_or_else(|| self.storage.export_dir.clone());
                let path = writer.write_to(&dir)?;
                Ok(CommandOutcome::ok(format!(
                    "Exported {} statements to {}",
                    writer.statement_count(),
                    path.display()
                )))
            }
            Commands::Status { format } => {
                let state = FileCheckpointStore::new(&self.storage.checkpoint_path).load()?;
                let output = if format == "json" {
                    to_json(&state)?
                } else {
                    format_progress_state_text(state.as_ref())
                };
                Ok(CommandOutcome::ok(output))
            }
        }
    }

    async fn handle_run(
        &self,
        groups: &[String],
        all: bool,
        options: &RunOptions,
        format: &str,
    ) -> Result<CommandOutcome, PipelineError> {
        let store = Arc::new(self.open_store().await?);
        let groups = if all {
            store
                .list_groups()
                .await?
                .into_iter()
                .map(|g| g.slug)
                .collect()
        } else {
            groups.to_vec()
        };

        let mut orchestrator = BatchOrchestrator::new(
            store,
            Box::new(FileCheckpointStore::new(&self.storage.checkpoint_path)),
            BundleSpool::new(&self.storage.spool_dir),
            Validator::new(self.config.thresholds.clone()),
        )
        .with_group_delay(self.config.pacing.group_delay());

        if !options.validate_only && !options.import_only {
            orchestrator = orchestrator.with_generator(self.build_generator()?);
        }

        info!(groups = groups.len(), "starting run");
        let report = orchestrator.run(&groups, options).await?;
        let output = if format == "json" {
            to_json(&report)?
        } else {
            format_batch_report_text(&report)
        };
        Ok(CommandOutcome {
            output,
            success: !report.has_unresolved_failures(),
        })
    }

    async fn handle_validate(
        &self,
        groups: &[String],
        format: &str,
    ) -> Result<CommandOutcome, PipelineError> {
        let store = self.open_store().await?;
        let validator = Validator::new(self.config.thresholds.clone());
        let reports = if groups.is_empty() {
            validator.validate_catalog(&store).await?
        } else {
            let mut reports = Vec::with_capacity(groups.len());
            for group in groups {
                reports.push(validator.validate_group(&store, group).await?);
            }
            reports
        };
        let output = if format == "json" {
            to_json(&reports)?
        } else {
            format_validation_text(&reports)
        };
        Ok(CommandOutcome {
            output,
            success: reports.iter().all(|r| r.is_valid()),
        })
    }

    fn build_generator(&self) -> Result<ContentGenerator, PipelineError> {
        let provider = &self.config.provider;
        let client = ProviderFactory::create_client(provider).map_err(|e| match e {
            ProviderError::NotConfigured(msg) => PipelineError::ConfigError(msg),
            other => PipelineError::Provider(other),
        })?;
        Ok(
            ContentGenerator::new(client, self.config.thresholds.clone())
                .with_retry(RetryPolicy::from_config(&self.config.retry))
                .with_call_delay(self.config.pacing.call_delay())
                .with_output_limits(provider.max_output_tokens, provider.temperature),
        )
    }

    async fn open_store(&self) -> Result<SqliteContentStore, PipelineError> {
        Ok(SqliteContentStore::open(&self.storage.database_path).await?)
    }
}
