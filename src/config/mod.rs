//! Configuration
//!
//! Layered settings: built-in defaults, then the global config file, then an optional
//! explicit file, then `TREESYNC__*` environment variables.

pub mod facade;
pub mod merge {
    pub mod service;
}
pub mod paths {
    pub mod xdg_root;
}
pub mod sources {
    pub mod config_file;
    pub mod environment;
}

pub use facade::ConfigLoader;

use crate::browser::BrowserOptions;
use crate::error::TreeError;
use crate::logging::LoggingConfig;
use crate::state::save_interval;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TreeSyncConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub browser: BrowserPreferences,
    #[serde(default)]
    pub state: StateStoreConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Node type registry file; the built-in PostgreSQL hierarchy when unset
    #[serde(default)]
    pub registry: Option<PathBuf>,
}

impl TreeSyncConfig {
    pub fn validate(&self) -> Result<(), TreeError> {
        if self.server.base_url.is_empty() {
            return Err(TreeError::ConfigError("server.base_url must not be empty".to_string()));
        }
        if !self.server.url_prefix.starts_with('/') || !self.server.url_prefix.ends_with('/') {
            return Err(TreeError::ConfigError(format!(
                "server.url_prefix must start and end with '/': {}",
                self.server.url_prefix
            )));
        }
        if self.browser.cache_ttl_ms < 0 {
            return Err(TreeError::ConfigError(
                "browser.cache_ttl_ms must not be negative".to_string(),
            ));
        }
        if self.browser.state_parent_type.is_empty() || self.browser.state_origin_type.is_empty() {
            return Err(TreeError::ConfigError(
                "browser.state_parent_type and browser.state_origin_type must be set".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_url_prefix")]
    pub url_prefix: String,
}

fn default_base_url() -> String {
    "http://127.0.0.1:5050".to_string()
}

fn default_url_prefix() -> String {
    "/browser/".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            base_url: default_base_url(),
            url_prefix: default_url_prefix(),
        }
    }
}

/// Browser preferences.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrowserPreferences {
    /// Seconds between tree state saves; zero or negative disables saving and clears the
    /// stored state
    #[serde(default = "default_save_interval")]
    pub browser_tree_state_save_interval: Option<i64>,
    #[serde(default)]
    pub auto_expand_sole_children: bool,
    #[serde(default = "default_search_threshold")]
    pub insertion_search_threshold: usize,
    #[serde(default = "default_cache_ttl_ms")]
    pub cache_ttl_ms: i64,
    /// Type whose items bucket the tree state
    #[serde(default = "default_state_parent_type")]
    pub state_parent_type: String,
    /// Top-level type of the tree
    #[serde(default = "default_state_origin_type")]
    pub state_origin_type: String,
}

fn default_save_interval() -> Option<i64> {
    Some(30)
}

fn default_search_threshold() -> usize {
    crate::tree::sort::DEFAULT_SEARCH_THRESHOLD
}

fn default_cache_ttl_ms() -> i64 {
    crate::cache::STALE_AFTER_MS
}

fn default_state_parent_type() -> String {
    "server".to_string()
}

fn default_state_origin_type() -> String {
    "server_group".to_string()
}

impl Default for BrowserPreferences {
    fn default() -> Self {
        BrowserPreferences {
            browser_tree_state_save_interval: default_save_interval(),
            auto_expand_sole_children: false,
            insertion_search_threshold: default_search_threshold(),
            cache_ttl_ms: default_cache_ttl_ms(),
            state_parent_type: default_state_parent_type(),
            state_origin_type: default_state_origin_type(),
        }
    }
}

impl BrowserPreferences {
    pub fn save_interval(&self) -> Option<Duration> {
        save_interval(self.browser_tree_state_save_interval)
    }

    pub fn browser_options(&self) -> BrowserOptions {
        BrowserOptions {
            auto_expand_sole_child: self.auto_expand_sole_children,
            insertion_search_threshold: self.insertion_search_threshold,
            cache_ttl_ms: self.cache_ttl_ms,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StateBackend {
    /// The console's settings endpoints
    #[default]
    Http,
    Sled,
    Memory,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StateStoreConfig {
    #[serde(default)]
    pub backend: StateBackend,
    /// Database directory for the sled backend; defaults under the XDG data home
    #[serde(default)]
    pub sled_path: Option<PathBuf>,
}

impl StateStoreConfig {
    pub fn resolved_sled_path(&self) -> Result<PathBuf, TreeError> {
        match &self.sled_path {
            Some(path) => Ok(path.clone()),
            None => paths::xdg_root::state_db_dir(),
        }
    }
}
