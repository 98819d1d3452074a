//! MergeService: orchestrates sources and deserializes to TreeSyncConfig.

use crate::config::sources::{config_file, environment};
use crate::config::TreeSyncConfig;
use config::builder::DefaultState;
use config::{Config, ConfigBuilder, ConfigError};
use std::path::Path;

/// Merge service for config composition.
pub struct MergeService;

impl MergeService {
    /// Precedence: defaults (lowest) -> global file -> explicit file -> environment (highest).
    pub fn load(explicit: Option<&Path>) -> Result<TreeSyncConfig, ConfigError> {
        let builder = builder_with_defaults()?;
        let builder = config_file::add_global(builder);
        let builder = match explicit {
            Some(path) => config_file::add_explicit(builder, path)?,
            None => builder,
        };
        let builder = environment::add_to_builder(builder);

        builder.build()?.try_deserialize()
    }
}

/// Builder seeded with every default value.
pub fn builder_with_defaults() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    let defaults = Config::try_from(&TreeSyncConfig::default())?;
    Ok(Config::builder().add_source(defaults))
}
