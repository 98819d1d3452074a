//! Replay scripts
//!
//! A replay script is a JSON array of steps applied to a fixture-backed tree. Items are
//! addressed by their chain of tree ids from the top level, hierarchies by a list of
//! `{_type, _id}` pairs:
//!
//! ```json
//! [
//!   {"op": "open", "path": ["server_group_1", "server_3"]},
//!   {"op": "add", "data": {"_id": 7, "_type": "table", "label": "orders", "_pid": 2200},
//!    "hierarchy": [{"_type": "server", "_id": 3}, {"_type": "schema", "_id": 2200}]}
//! ]
//! ```

use crate::browser::{Browser, BrowserEvent, EventOptions};
use crate::error::TreeError;
use crate::hierarchy::{HierarchyEntry, TreeHierarchy};
use crate::mutator::MutationOutcome;
use crate::registry::NodeTypeRegistry;
use crate::tree::NodeData;
use crate::types::{ItemId, ObjectId};
use serde::Deserialize;
use tracing::debug;

#[derive(Debug, Clone, Deserialize)]
pub struct HierarchyStep {
    #[serde(rename = "_type")]
    pub node_type: String,
    #[serde(rename = "_id")]
    pub id: ObjectId,
}

pub fn build_hierarchy(registry: &NodeTypeRegistry, steps: &[HierarchyStep]) -> TreeHierarchy {
    steps
        .iter()
        .map(|s| HierarchyEntry::new(registry, &s.node_type, s.id.clone()))
        .collect()
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum ScriptStep {
    Open { path: Vec<String> },
    Close { path: Vec<String> },
    Select { path: Vec<String> },
    Refresh { path: Vec<String> },
    Add {
        data: NodeData,
        hierarchy: Vec<HierarchyStep>,
    },
    Update {
        old: NodeData,
        new: NodeData,
        hierarchy: Vec<HierarchyStep>,
    },
    Remove {
        data: NodeData,
        hierarchy: Vec<HierarchyStep>,
    },
}

impl ScriptStep {
    pub fn name(&self) -> &'static str {
        match self {
            ScriptStep::Open { .. } => "open",
            ScriptStep::Close { .. } => "close",
            ScriptStep::Select { .. } => "select",
            ScriptStep::Refresh { .. } => "refresh",
            ScriptStep::Add { .. } => "add",
            ScriptStep::Update { .. } => "update",
            ScriptStep::Remove { .. } => "remove",
        }
    }
}

pub fn parse_script(content: &str) -> Result<Vec<ScriptStep>, TreeError> {
    Ok(serde_json::from_str(content)?)
}

/// Follow a chain of tree ids from the top level, opening every item on the way.
pub async fn open_path(browser: &mut Browser, path: &[String]) -> Result<ItemId, TreeError> {
    let mut parent: Option<ItemId> = None;
    for (depth, tree_id) in path.iter().enumerate() {
        if let Some(item) = parent {
            browser.open(item).await?;
        }
        let found = browser
            .tree()
            .find_child(parent, |d| d.tree_id() == *tree_id)
            .ok_or_else(|| {
                TreeError::ConfigError(format!(
                    "No item '{}' at depth {} of the replay path",
                    tree_id, depth
                ))
            })?;
        parent = Some(found);
    }
    parent.ok_or_else(|| TreeError::ConfigError("Empty replay path".to_string()))
}

/// Apply one step; returns what the step did, if it was a mutation.
pub async fn apply_step(
    browser: &mut Browser,
    step: ScriptStep,
) -> Result<Option<MutationOutcome>, TreeError> {
    debug!(op = step.name(), "Replaying step");
    let registry = browser.registry().clone();
    match step {
        ScriptStep::Open { path } => {
            let item = open_path(browser, &path).await?;
            browser.open(item).await?;
            Ok(None)
        }
        ScriptStep::Close { path } => {
            let item = open_path(browser, &path).await?;
            browser.close(item).await?;
            Ok(None)
        }
        ScriptStep::Select { path } => {
            let item = open_path(browser, &path).await?;
            browser.select(item).await?;
            Ok(None)
        }
        ScriptStep::Refresh { path } => {
            let item = open_path(browser, &path).await?;
            let outcome = browser
                .handle(BrowserEvent::Refresh {
                    item,
                    options: EventOptions::default(),
                })
                .await?;
            Ok(Some(outcome))
        }
        ScriptStep::Add { data, hierarchy } => {
            let outcome = browser
                .handle(BrowserEvent::Add {
                    data,
                    hierarchy: build_hierarchy(&registry, &hierarchy),
                    options: EventOptions::default(),
                })
                .await?;
            Ok(Some(outcome))
        }
        ScriptStep::Update {
            old,
            new,
            hierarchy,
        } => {
            let outcome = browser
                .handle(BrowserEvent::Update {
                    old,
                    new,
                    hierarchy: build_hierarchy(&registry, &hierarchy),
                    options: EventOptions::default(),
                })
                .await?;
            Ok(Some(outcome))
        }
        ScriptStep::Remove { data, hierarchy } => {
            let outcome = browser
                .remove_node(&data, &build_hierarchy(&registry, &hierarchy))
                .await?;
            Ok(Some(outcome))
        }
    }
}
