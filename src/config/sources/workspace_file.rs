//! Workspace config files: config/config.toml, then config/{COURSEGEN_ENV}.toml

use config::builder::DefaultState;
use config::{ConfigBuilder, ConfigError, File};
use std::path::Path;

pub fn add_to_builder(
    mut builder: ConfigBuilder<DefaultState>,
    workspace_root: &Path,
) -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    let config_dir = workspace_root.join("config");
    let env_name = std::env::var("COURSEGEN_ENV").unwrap_or_else(|_| "development".to_string());

    let base = config_dir.join("config.toml");
    if base.exists() {
        builder = builder.add_source(File::from(base).required(false));
    }

    let env_specific = config_dir.join(format!("{}.toml", env_name));
    if env_specific.exists() {
        builder = builder.add_source(File::from(env_specific).required(false));
    }

    Ok(builder)
}
