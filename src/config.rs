//! Configuration System
//!
//! Layered configuration: built-in defaults, the global file, workspace files and
//! `COURSEGEN__SECTION__KEY` environment overrides, or a single explicit file.

use crate::content::QualityThresholds;
use crate::logging::LoggingConfig;
use crate::retry::RetryConfig;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub use crate::provider::{ProviderConfig, ProviderType};

mod facade;
mod merge;
mod sources;

pub use facade::ConfigLoader;
pub use sources::global_file::global_config_path;

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub provider: ProviderConfig,

    #[serde(default)]
    pub retry: RetryConfig,

    #[serde(default)]
    pub pacing: PacingConfig,

    #[serde(default)]
    pub thresholds: QualityThresholds,

    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Fixed sleeps that keep the run under provider rate limits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PacingConfig {
    /// After every successful generation call
    #[serde(default = "default_call_delay_ms")]
    pub call_delay_ms: u64,

    /// Between processed groups
    #[serde(default = "default_group_delay_ms")]
    pub group_delay_ms: u64,
}

fn default_call_delay_ms() -> u64 {
    1_000
}

fn default_group_delay_ms() -> u64 {
    5_000
}

impl Default for PacingConfig {
    fn default() -> Self {
        Self {
            call_delay_ms: default_call_delay_ms(),
            group_delay_ms: default_group_delay_ms(),
        }
    }
}

impl PacingConfig {
    pub fn call_delay(&self) -> Duration {
        Duration::from_millis(self.call_delay_ms)
    }

    pub fn group_delay(&self) -> Duration {
        Duration::from_millis(self.group_delay_ms)
    }
}

/// Storage paths; relative paths are resolved against the workspace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,

    #[serde(default = "default_checkpoint_path")]
    pub checkpoint_path: PathBuf,

    #[serde(default = "default_spool_dir")]
    pub spool_dir: PathBuf,

    #[serde(default = "default_export_dir")]
    pub export_dir: PathBuf,
}

fn default_database_path() -> PathBuf {
    PathBuf::from(".coursegen/content.db")
}

fn default_checkpoint_path() -> PathBuf {
    PathBuf::from(".coursegen/progress.json")
}

fn default_spool_dir() -> PathBuf {
    PathBuf::from(".coursegen/spool")
}

fn default_export_dir() -> PathBuf {
    PathBuf::from(".coursegen/export")
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            checkpoint_path: default_checkpoint_path(),
            spool_dir: default_spool_dir(),
            export_dir: default_export_dir(),
        }
    }
}

impl StorageConfig {
    pub fn resolve(&self, workspace: &Path) -> StorageConfig {
        let join = |p: &PathBuf| {
            if p.is_absolute() {
                p.clone()
            } else {
                workspace.join(p)
            }
        };
        StorageConfig {
            database_path: join(&self.database_path),
            checkpoint_path: join(&self.checkpoint_path),
            spool_dir: join(&self.spool_dir),
            export_dir: join(&self.export_dir),
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        for (name, path) in [
            ("database_path", &self.database_path),
            ("checkpoint_path", &self.checkpoint_path),
            ("spool_dir", &self.spool_dir),
            ("export_dir", &self.export_dir),
        ] {
            if path.as_os_str().is_empty() {
                return Err(format!("storage.{} cannot be empty", name));
            }
        }
        Ok(())
    }
}

/// Configuration validation errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    Provider(String),
    Retry(String),
    Thresholds(String),
    Storage(String),
    Logging(String),
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::Provider(msg) => write!(f, "Provider: {}", msg),
            ValidationError::Retry(msg) => write!(f, "Retry: {}", msg),
            ValidationError::Thresholds(msg) => write!(f, "Thresholds: {}", msg),
            ValidationError::Storage(msg) => write!(f, "Storage: {}", msg),
            ValidationError::Logging(msg) => write!(f, "Logging: {}", msg),
        }
    }
}

impl std::error::Error for ValidationError {}

impl AppConfig {
    /// Every problem at once, not just the first.
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        if let Err(e) = self.provider.validate() {
            errors.push(ValidationError::Provider(e));
        }
        if let Err(e) = self.retry.validate() {
            errors.push(ValidationError::Retry(e));
        }
        if let Err(e) = self.thresholds.validate() {
            errors.push(ValidationError::Thresholds(e));
        }
        if let Err(e) = self.storage.validate() {
            errors.push(ValidationError::Storage(e));
        }
        if let Err(e) = self.logging.validate() {
            errors.push(ValidationError::Logging(e));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use tempfile::TempDir;

    // Loader tests read process-wide environment variables.
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    fn isolated_home() -> TempDir {
        let home = TempDir::new().unwrap();
        std::env::set_var("XDG_CONFIG_HOME", home.path());
        home
    }

    #[test]
    fn defaults_are_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.pacing.call_delay(), Duration::from_secs(1));
        assert_eq!(config.pacing.group_delay(), Duration::from_secs(5));
        assert_eq!(config.retry.max_attempts, 5);
    }

    #[test]
    fn validation_collects_every_error() {
        let mut config = AppConfig::default();
        config.provider.model = String::new();
        config.retry.max_attempts = 0;
        config.logging.format = "yaml".into();

        let errors = config.validate().unwrap_err();
        assert_eq!(errors.len(), 3);
        assert!(matches!(errors[0], ValidationError::Provider(_)));
        assert!(errors[2].to_string().starts_with("Logging:"));
    }

    #[test]
    fn relative_storage_paths_resolve_against_workspace() {
        let storage = StorageConfig {
            export_dir: PathBuf::from("/srv/export"),
            ..StorageConfig::default()
        }
        .resolve(Path::new("/work"));
        assert_eq!(storage.database_path, PathBuf::from("/work/.coursegen/content.db"));
        assert_eq!(storage.export_dir, PathBuf::from("/srv/export"));
    }

    #[test]
    fn workspace_file_overrides_defaults() {
        let _guard = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
        let _home = isolated_home();
        let workspace = TempDir::new().unwrap();
        std::fs::create_dir_all(workspace.path().join("config")).unwrap();
        std::fs::write(
            workspace.path().join("config/config.toml"),
            r#"
[provider]
type = "openai"
model = "gpt-4o"

[pacing]
call_delay_ms = 0

[thresholds]
recall_count = 2
"#,
        )
        .unwrap();

        let config = ConfigLoader::load(workspace.path()).unwrap();
        assert_eq!(config.provider.provider_type, ProviderType::OpenAI);
        assert_eq!(config.provider.model, "gpt-4o");
        assert_eq!(config.pacing.call_delay_ms, 0);
        assert_eq!(config.pacing.group_delay_ms, 5_000);
        assert_eq!(config.thresholds.recall_count, 2);
        assert_eq!(config.thresholds.practice_count, 3);
    }

    #[test]
    fn environment_overrides_files() {
        let _guard = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
        let _home = isolated_home();
        let workspace = TempDir::new().unwrap();
        std::env::set_var("COURSEGEN__RETRY__MAX_ATTEMPTS", "2");
        let loaded = ConfigLoader::load(workspace.path());
        std::env::remove_var("COURSEGEN__RETRY__MAX_ATTEMPTS");

        assert_eq!(loaded.unwrap().retry.max_attempts, 2);
    }

    #[test]
    fn explicit_file_must_exist() {
        let _guard = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
        let dir = TempDir::new().unwrap();
        assert!(ConfigLoader::load_from_file(&dir.path().join("nope.toml")).is_err());

        let path = dir.path().join("run.toml");
        std::fs::write(&path, "[storage]\nspool_dir = \"/var/spool/coursegen\"\n").unwrap();
        let config = ConfigLoader::load_from_file(&path).unwrap();
        assert_eq!(config.storage.spool_dir, PathBuf::from("/var/spool/coursegen"));
        assert_eq!(config.storage.checkpoint_path, default_checkpoint_path());
    }
}
