//! Integration tests for treesync

mod browser_add;
mod browser_refresh;
mod browser_remove;
mod browser_update;
mod cli_contracts;
mod properties;
mod state_persistence;
mod support;
