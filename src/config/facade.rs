//! ConfigLoader facade delegating to the merge service.

use super::merge::service::MergeService;
use super::TreeSyncConfig;
use crate::error::TreeError;
use std::path::Path;

/// Configuration loader facade.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load from the global config file and environment.
    pub fn load() -> Result<TreeSyncConfig, TreeError> {
        let config = MergeService::load(None)?;
        config.validate()?;
        Ok(config)
    }

    /// Load with `path` layered over the global config file.
    pub fn load_from_file(path: &Path) -> Result<TreeSyncConfig, TreeError> {
        let config = MergeService::load(Some(path))?;
        config.validate()?;
        Ok(config)
    }

    pub fn default() -> TreeSyncConfig {
        TreeSyncConfig::default()
    }
}
