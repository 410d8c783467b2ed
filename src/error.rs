//! Error types for the content generation pipeline.
//!
//! Errors are layered the way the pipeline contains them: a provider or recovery
//! failure is local to one artifact kind, a `Terminal` error ends the current subject,
//! and only configuration errors abort a whole batch.

use crate::content::ArtifactKind;
use crate::retry::Transience;
use thiserror::Error;

/// Generation service errors
#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("Provider rate limit exceeded: {0}")]
    RateLimited(String),

    #[error("Provider overloaded: {0}")]
    Overloaded(String),

    #[error("Provider authentication failed: {0}")]
    AuthFailed(String),

    #[error("Provider model not found: {0}")]
    ModelNotFound(String),

    #[error("Provider request failed: {0}")]
    RequestFailed(String),

    #[error("Provider returned an invalid response: {0}")]
    InvalidResponse(String),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),
}

impl Transience for ProviderError {
    fn is_transient(&self) -> bool {
        matches!(
            self,
            ProviderError::RateLimited(_) | ProviderError::Overloaded(_)
        )
    }
}

/// Structured-output recovery errors
#[derive(Debug, Clone, Error)]
pub enum RecoveryError {
    #[error("Malformed output: no strategy produced a structured value (starts with {preview:?})")]
    MalformedOutput { preview: String },

    #[error("Recovered value does not fit the expected shape: {0}")]
    Mismatch(String),
}

/// Recovered output did not match the artifact shape
#[derive(Debug, Clone, Error)]
#[error("{kind} output does not match its schema: {message}")]
pub struct SchemaError {
    pub kind: ArtifactKind,
    pub message: String,
}

impl SchemaError {
    pub fn new(kind: ArtifactKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// Storage-related errors (datastore, checkpoint file, bundle spool)
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Storage I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Group not found: {0}")]
    GroupNotFound(String),

    #[error("Unit not found: {0}")]
    UnitNotFound(String),

    #[error("Invalid stored value: {0}")]
    InvalidData(String),

    #[error("Unsupported document version {found} in {document} (expected {expected})")]
    UnsupportedVersion {
        document: String,
        found: u32,
        expected: u32,
    },
}

/// Pipeline-level errors
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("{operation} gave up after {attempts} attempts: {source}")]
    Terminal {
        operation: String,
        attempts: u32,
        #[source]
        source: ProviderError,
    },

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error(transparent)]
    Recovery(#[from] RecoveryError),

    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error("Storage error: {0}")]
    StorageError(#[from] StorageError),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Bundle spool error: {0}")]
    Spool(String),

    #[error("Invalid checkpoint transition: {0}")]
    InvalidTransition(String),
}

impl PipelineError {
    /// Terminal errors end the current group; everything else is contained lower down.
    pub fn is_terminal(&self) -> bool {
        matches!(self, PipelineError::Terminal { .. })
    }
}

impl From<config::ConfigError> for PipelineError {
    fn from(err: config::ConfigError) -> Self {
        PipelineError::ConfigError(err.to_string())
    }
}
