//! CLI Tooling
//!
//! Command-line interface: replay mutation scripts against a fixture tree, inspect or reset
//! the stored tree state, and resolve API URLs.

use super::script::{apply_step, parse_script};
use crate::browser::{Browser, Notice};
use crate::config::{ConfigLoader, StateBackend, TreeSyncConfig};
use crate::error::TreeError;
use crate::hierarchy::{HierarchyEntry, TreeHierarchy};
use crate::logging::LoggingConfig;
use crate::registry::{NodeTypeRegistry, UrlAction};
use crate::service::MemoryNodeService;
use crate::state::{
    HttpStateStore, MemoryStateStore, SledStateStore, StateMap, StateStore, TreeStatePersistence,
    TreeStateTracker,
};
use crate::tree::render_label;
use crate::types::ObjectId;
use clap::{Parser, Subcommand};
use parking_lot::Mutex;
use serde_json::json;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

/// treesync - incremental object-tree sync and persisted tree state
#[derive(Parser)]
#[command(name = "treesync")]
#[command(about = "Replay tree mutations and manage persisted tree state")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Configuration file path (layered over the global config)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Log to stderr at debug level
    #[arg(long, default_value = "false")]
    pub verbose: bool,

    /// Log level (trace, debug, info, warn, error, off)
    #[arg(long)]
    pub log_level: Option<String>,

    /// Log format (json, text)
    #[arg(long)]
    pub log_format: Option<String>,

    /// Log output (stdout, stderr, file, file+stderr, both)
    #[arg(long)]
    pub log_output: Option<String>,

    /// Log file path (if output includes "file")
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

impl Cli {
    /// Apply the logging flags on top of the configured logging section.
    pub fn logging_config(&self, base: &LoggingConfig) -> LoggingConfig {
        let mut config = base.clone();
        if self.verbose {
            config.level = "debug".to_string();
            config.output = "stderr".to_string();
        }
        if let Some(level) = &self.log_level {
            config.level = level.clone();
        }
        if let Some(format) = &self.log_format {
            config.format = format.clone();
        }
        if let Some(output) = &self.log_output {
            config.output = output.clone();
        }
        if let Some(file) = &self.log_file {
            config.file = Some(file.clone());
        }
        config
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Apply a JSON mutation script to a fixture-backed tree
    Replay {
        /// Fixture mapping parent tree ids to child lists
        fixture: PathBuf,
        /// Script of open/close/select/add/update/remove/refresh steps
        script: PathBuf,
        /// Restore expanded branches from the configured state store first
        #[arg(long)]
        restore: bool,
        /// Save the resulting tree state to the configured state store
        #[arg(long)]
        save: bool,
        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
    },
    /// Inspect or clear the stored tree state
    State {
        #[command(subcommand)]
        command: StateCommands,
    },
    /// Print the API URL for a node type and action
    Url {
        /// Node type
        #[arg(long = "type")]
        node_type: String,
        /// children, nodes, properties, create, edit, drop, statistics or a custom segment
        #[arg(long, default_value = "properties")]
        action: String,
        /// Object id appended to the URL
        #[arg(long)]
        id: Option<String>,
        /// Ancestors as type=id pairs, e.g. server_group=1,server=3
        #[arg(long, value_delimiter = ',')]
        hierarchy: Vec<String>,
    },
}

#[derive(Subcommand)]
pub enum StateCommands {
    /// Show the stored tree state
    Show {
        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
    },
    /// Delete every stored tree state
    Reset {
        /// Skip confirmation
        #[arg(long)]
        yes: bool,
    },
}

/// CLI context for executing commands
pub struct CliContext {
    config: TreeSyncConfig,
    registry: Arc<NodeTypeRegistry>,
    store: Mutex<Option<Arc<dyn StateStore>>>,
}

impl CliContext {
    pub fn new(config_path: Option<PathBuf>) -> Result<Self, TreeError> {
        let config = match &config_path {
            Some(path) => ConfigLoader::load_from_file(path)?,
            None => ConfigLoader::load()?,
        };
        Self::from_config(config)
    }

    pub fn from_config(config: TreeSyncConfig) -> Result<Self, TreeError> {
        let registry = match &config.registry {
            Some(path) => NodeTypeRegistry::load_from_file(path)?,
            None => NodeTypeRegistry::postgres().with_url_prefix(config.server.url_prefix.clone()),
        };
        Ok(CliContext {
            config,
            registry: Arc::new(registry),
            store: Mutex::new(None),
        })
    }

    pub fn config(&self) -> &TreeSyncConfig {
        &self.config
    }

    /// State store selected by the `state.backend` setting, opened once per context.
    pub fn open_store(&self) -> Result<Arc<dyn StateStore>, TreeError> {
        let mut slot = self.store.lock();
        if let Some(store) = slot.as_ref() {
            return Ok(Arc::clone(store));
        }
        let store: Arc<dyn StateStore> = match self.config.state.backend {
            StateBackend::Http => Arc::new(HttpStateStore::new(self.config.server.base_url.clone())),
            StateBackend::Sled => {
                let path = self.config.state.resolved_sled_path()?;
                std::fs::create_dir_all(&path).map_err(crate::error::StorageError::from)?;
                Arc::new(SledStateStore::open(&path)?)
            }
            StateBackend::Memory => Arc::new(MemoryStateStore::new()),
        };
        *slot = Some(Arc::clone(&store));
        Ok(store)
    }

    pub async fn execute(&self, command: &Commands) -> Result<String, TreeError> {
        match command {
            Commands::Replay {
                fixture,
                script,
                restore,
                save,
                format,
            } => {
                self.handle_replay(fixture, script, *restore, *save, format)
                    .await
            }
            Commands::State { command } => match command {
                StateCommands::Show { format } => self.handle_state_show(format).await,
                StateCommands::Reset { yes } => self.handle_state_reset(*yes).await,
            },
            Commands::Url {
                node_type,
                action,
                id,
                hierarchy,
            } => self.handle_url(node_type, action, id.as_deref(), hierarchy),
        }
    }

    async fn handle_replay(
        &self,
        fixture: &Path,
        script: &Path,
        restore: bool,
        save: bool,
        format: &str,
    ) -> Result<String, TreeError> {
        let fixture = read_file(fixture)?;
        let steps = parse_script(&read_file(script)?)?;
        let service = Arc::new(MemoryNodeService::from_json(&fixture)?);

        let prefs = &self.config.browser;
        let tracker = Arc::new(Mutex::new(TreeStateTracker::new(
            prefs.state_parent_type.clone(),
            prefs.state_origin_type.clone(),
        )));
        let store: Arc<dyn StateStore> = if restore || save {
            self.open_store()?
        } else {
            Arc::new(MemoryStateStore::new())
        };
        let persistence = TreeStatePersistence::new(tracker.clone(), store, prefs.save_interval());
        if restore {
            persistence.fetch_state().await?;
        }

        let mut browser = Browser::new(
            self.registry.clone(),
            service,
            tracker.clone(),
            prefs.browser_options(),
        );
        browser.load_root().await?;

        let mut outcomes = Vec::with_capacity(steps.len());
        for step in steps {
            let name = step.name();
            match apply_step(&mut browser, step).await {
                Ok(outcome) => outcomes.push(json!({
                    "op": name,
                    "outcome": outcome.map(|o| format!("{:?}", o)),
                })),
                Err(e) => outcomes.push(json!({ "op": name, "error": e.to_string() })),
            }
        }
        let notices = browser.take_notices();
        let cleared = notices
            .iter()
            .filter(|n| matches!(n, Notice::CacheCleared(_)))
            .count();

        if save {
            let sent = persistence.save_state().await?;
            info!(sent, "Replay tree state saved");
        }

        let state = tracker.lock().current().clone();
        if format == "json" {
            let output = json!({
                "steps": outcomes,
                "tree": tree_json(&browser),
                "state": state,
                "caches_cleared": cleared,
            });
            return Ok(serde_json::to_string_pretty(&output)?);
        }

        let mut output = String::new();
        for outcome in &outcomes {
            output.push_str(&format!("{}\n", outcome));
        }
        output.push('\n');
        output.push_str(&format_tree(&browser));
        output.push('\n');
        output.push_str(&format_state_table(&state));
        Ok(output)
    }

    async fn handle_state_show(&self, format: &str) -> Result<String, TreeError> {
        let state = self.open_store()?.fetch().await?;
        if format == "json" {
            return Ok(serde_json::to_string_pretty(&state)?);
        }
        if state.is_empty() {
            return Ok("No stored tree state".to_string());
        }
        Ok(format_state_table(&state))
    }

    async fn handle_state_reset(&self, yes: bool) -> Result<String, TreeError> {
        if !yes {
            use dialoguer::Confirm;
            let confirmed = Confirm::new()
                .with_prompt("Delete every stored tree state?")
                .interact()
                .map_err(|e| TreeError::ConfigError(format!("Failed to get user input: {}", e)))?;

            if !confirmed {
                return Ok("Reset cancelled".to_string());
            }
        }
        self.open_store()?.reset().await?;
        Ok("Stored tree state cleared".to_string())
    }

    fn handle_url(
        &self,
        node_type: &str,
        action: &str,
        id: Option<&str>,
        hierarchy: &[String],
    ) -> Result<String, TreeError> {
        let hierarchy = parse_hierarchy(&self.registry, hierarchy)?;
        let id = id.map(ObjectId::from);
        self.registry
            .generate_url(&hierarchy, node_type, &UrlAction::parse(action), id.as_ref())
    }
}

fn read_file(path: &Path) -> Result<String, TreeError> {
    std::fs::read_to_string(path)
        .map_err(|e| TreeError::ConfigError(format!("Failed to read {}: {}", path.display(), e)))
}

/// `type=id` pairs into a hierarchy.
fn parse_hierarchy(registry: &NodeTypeRegistry, pairs: &[String]) -> Result<TreeHierarchy, TreeError> {
    let mut hierarchy = TreeHierarchy::new();
    for pair in pairs.iter().filter(|p| !p.trim().is_empty()) {
        let (node_type, id) = pair.split_once('=').ok_or_else(|| {
            TreeError::ConfigError(format!("Hierarchy entry must be type=id: {}", pair))
        })?;
        let node_type = node_type.trim();
        registry.require(node_type)?;
        hierarchy.insert(HierarchyEntry::new(registry, node_type, ObjectId::from(id.trim())));
    }
    Ok(hierarchy)
}

/// Indented outline of the tree: `+` open, `>` closed inode, `*` marks the selection.
fn format_tree(browser: &Browser) -> String {
    let tree = browser.tree();
    let selected = tree.selected();
    let mut output = String::new();
    for (depth, item) in tree.walk() {
        let Some(data) = tree.data(item) else {
            continue;
        };
        let marker = if tree.is_open(item) {
            '+'
        } else if data.inode {
            '>'
        } else {
            ' '
        };
        let current = if selected == Some(item) { " *" } else { "" };
        output.push_str(&format!(
            "{}{} {}{}\n",
            "  ".repeat(depth),
            marker,
            render_label(data),
            current
        ));
    }
    output
}

fn tree_json(browser: &Browser) -> serde_json::Value {
    let tree = browser.tree();
    let rows: Vec<_> = tree
        .walk()
        .into_iter()
        .filter_map(|(depth, item)| {
            tree.data(item).map(|data| {
                json!({
                    "depth": depth,
                    "id": data.tree_id(),
                    "label": render_label(data),
                    "open": tree.is_open(item),
                    "selected": tree.selected() == Some(item),
                })
            })
        })
        .collect();
    serde_json::Value::Array(rows)
}

fn format_state_table(state: &StateMap) -> String {
    use comfy_table::Table;
    let mut table = Table::new();
    table.load_preset(comfy_table::presets::UTF8_FULL);
    table.set_header(vec!["Server", "Open paths", "Selected", "Databases"]);
    for (server, tree_state) in state {
        let selected: Vec<String> = tree_state
            .selected
            .iter()
            .map(|(scope, item)| format!("{} -> {}", scope, item))
            .collect();
        let databases: Vec<String> = tree_state
            .conn_status
            .iter()
            .map(|(db, connected)| {
                let opened = tree_state.is_opened.get(db).copied().unwrap_or(0);
                format!("{} connected={} opened={}", db, connected, opened)
            })
            .collect();
        table.add_row(vec![
            server.clone(),
            tree_state.paths.join("\n"),
            selected.join("\n"),
            databases.join("\n"),
        ]);
    }
    table.to_string()
}
