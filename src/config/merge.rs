//! Merge rules: built-in defaults at the bottom of the layer stack.

use config::builder::DefaultState;
use config::{Config, ConfigBuilder, ConfigError};

/// A builder with every default the pipeline relies on already set.
pub fn builder_with_defaults() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    Config::builder()
        .set_default("provider.type", "anthropic")?
        .set_default("provider.model", "claude-sonnet-4-5")?
        .set_default("provider.max_output_tokens", 8192)?
        .set_default("retry.max_attempts", 5)?
        .set_default("retry.initial_delay_ms", 2_000)?
        .set_default("retry.max_delay_ms", 60_000)?
        .set_default("pacing.call_delay_ms", 1_000)?
        .set_default("pacing.group_delay_ms", 5_000)?
        .set_default("storage.database_path", ".coursegen/content.db")?
        .set_default("storage.checkpoint_path", ".coursegen/progress.json")?
        .set_default("storage.spool_dir", ".coursegen/spool")?
        .set_default("storage.export_dir", ".coursegen/export")
}
