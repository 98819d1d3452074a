//! XDG Base Directory locations.

use crate::error::TreeError;
use std::path::PathBuf;

/// `$XDG_DATA_HOME`, else `$HOME/.local/share`.
pub fn data_home() -> Option<PathBuf> {
    if let Ok(xdg_data_home) = std::env::var("XDG_DATA_HOME") {
        return Some(PathBuf::from(xdg_data_home));
    }

    std::env::var("HOME")
        .ok()
        .map(|home| PathBuf::from(home).join(".local").join("share"))
}

/// `$XDG_CONFIG_HOME`, else `$HOME/.config`.
pub fn config_home() -> Result<PathBuf, TreeError> {
    if let Ok(xdg_config_home) = std::env::var("XDG_CONFIG_HOME") {
        return Ok(PathBuf::from(xdg_config_home));
    }

    let home = std::env::var("HOME").map_err(|_| {
        TreeError::ConfigError(
            "Could not determine XDG config home directory (HOME not set)".to_string(),
        )
    })?;

    Ok(PathBuf::from(home).join(".config"))
}

/// `$XDG_CONFIG_HOME/treesync/config.toml`
pub fn config_file() -> Result<PathBuf, TreeError> {
    Ok(config_home()?.join("treesync").join("config.toml"))
}

/// `$XDG_DATA_HOME/treesync/tree_state/`, the sled backend's default database.
pub fn state_db_dir() -> Result<PathBuf, TreeError> {
    let data_home = data_home().ok_or_else(|| {
        TreeError::ConfigError(
            "Could not determine XDG data home directory (HOME not set)".to_string(),
        )
    })?;
    Ok(data_home.join("treesync").join("tree_state"))
}
