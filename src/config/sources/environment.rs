//! Environment overrides: COURSEGEN__SECTION__KEY, e.g. COURSEGEN__RETRY__MAX_ATTEMPTS=3

use config::builder::DefaultState;
use config::{ConfigBuilder, Environment};

pub fn add_to_builder(builder: ConfigBuilder<DefaultState>) -> ConfigBuilder<DefaultState> {
    builder.add_source(
        Environment::with_prefix("COURSEGEN")
            .prefix_separator("__")
            .separator("__")
            .try_parsing(true),
    )
}
