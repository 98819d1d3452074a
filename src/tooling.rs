//! Tooling
//!
//! The `treesync` command line and the replay script format it drives.

pub mod cli;
pub mod script;

pub use cli::{Cli, CliContext, Commands, StateCommands};
pub use script::{apply_step, parse_script, ScriptStep};
