//! CLI output: error mapping from pipeline errors to a stable CLI surface.

use crate::error::PipelineError;

/// `error[<category>]: <message>`, one line per error.
pub fn map_error(e: &PipelineError) -> String {
    let category = match e {
        PipelineError::ConfigError(_) => "config",
        PipelineError::StorageError(_) => "storage",
        PipelineError::Spool(_) => "spool",
        PipelineError::Terminal { .. } | PipelineError::Provider(_) => "provider",
        PipelineError::Recovery(_) | PipelineError::Schema(_) => "content",
        PipelineError::InvalidTransition(_) => "checkpoint",
    };
    format!("error[{}]: {}", category, e)
}
