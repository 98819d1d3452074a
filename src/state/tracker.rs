//! In-memory tree state tracking.
//!
//! The tracker keeps two documents: `current`, rebuilt from tree events as the user works,
//! and `stored`, the last state confirmed by the store. Restoration only ever reads
//! `stored`.

use super::{join_chain, split_chain, StateMap, TreeState};
use crate::hierarchy::{resolve, HierarchyEntry, TreeHierarchy};
use crate::registry::NodeTypeRegistry;
use crate::tree::{NodeData, Tree};
use crate::types::ItemId;
use tracing::{debug, trace};

const DATABASE_TYPE: &str = "database";

/// What the tracker needs to know about one tree item.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackedItem {
    pub tree_id: String,
    pub node_type: String,
    /// Tree ids of every ancestor, top level first
    pub ancestor_ids: Vec<String>,
    pub hierarchy: TreeHierarchy,
    pub is_open: bool,
    pub has_parent: bool,
    /// Tree id of the currently selected item
    pub selected_id: Option<String>,
}

impl TrackedItem {
    pub fn capture(tree: &Tree, registry: &NodeTypeRegistry, item: ItemId) -> Option<Self> {
        let data = tree.data(item)?;
        let mut path = tree.path(item);
        path.pop();
        Some(TrackedItem {
            tree_id: data.tree_id(),
            node_type: data.node_type.clone(),
            ancestor_ids: path
                .iter()
                .filter_map(|i| tree.data(*i))
                .map(|d| d.tree_id())
                .collect(),
            hierarchy: resolve(tree, registry, item),
            is_open: tree.is_open(item),
            has_parent: tree.parent(item).is_some(),
            selected_id: tree
                .selected()
                .and_then(|s| tree.data(s))
                .map(|d| d.tree_id()),
        })
    }

    /// Describe an item that has already been detached from `parent`.
    pub fn detached(
        tree: &Tree,
        registry: &NodeTypeRegistry,
        parent: Option<ItemId>,
        data: &NodeData,
    ) -> Self {
        let mut hierarchy = parent
            .map(|p| resolve(tree, registry, p))
            .unwrap_or_default();
        if registry
            .get(&data.node_type)
            .map(|t| t.has_id && !t.collection)
            .unwrap_or(false)
        {
            hierarchy.set(HierarchyEntry::from_node(registry, data));
        }
        TrackedItem {
            tree_id: data.tree_id(),
            node_type: data.node_type.clone(),
            ancestor_ids: parent
                .map(|p| {
                    tree.path(p)
                        .iter()
                        .filter_map(|i| tree.data(*i))
                        .map(|d| d.tree_id())
                        .collect()
                })
                .unwrap_or_default(),
            hierarchy,
            is_open: false,
            has_parent: parent.is_some(),
            selected_id: None,
        }
    }
}

/// Actions restoration asks the tree to perform on an item.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RestorePlan {
    pub open: bool,
    pub select: bool,
}

impl RestorePlan {
    pub fn is_empty(&self) -> bool {
        !self.open && !self.select
    }
}

fn entry_tree_id(entry: &HierarchyEntry) -> String {
    entry
        .tree_id
        .clone()
        .unwrap_or_else(|| format!("{}_{}", entry.node_type, entry.id))
}

fn chain_starts_with(chain: &str, prefix: &[String]) -> bool {
    let ids = split_chain(chain);
    ids.len() >= prefix.len() && ids.iter().zip(prefix).all(|(a, b)| *a == b.as_str())
}

/// Tracks open paths, selection and database status per top-level ancestor.
#[derive(Debug, Clone)]
pub struct TreeStateTracker {
    parent_type: String,
    origin_type: String,
    current: StateMap,
    stored: StateMap,
}

impl Default for TreeStateTracker {
    fn default() -> Self {
        Self::new("server", "server_group")
    }
}

impl TreeStateTracker {
    /// `parent_type` buckets the state; `origin_type` is the tree's own top level.
    pub fn new(parent_type: impl Into<String>, origin_type: impl Into<String>) -> Self {
        TreeStateTracker {
            parent_type: parent_type.into(),
            origin_type: origin_type.into(),
            current: StateMap::new(),
            stored: StateMap::new(),
        }
    }

    pub fn parent_type(&self) -> &str {
        &self.parent_type
    }

    pub fn current(&self) -> &StateMap {
        &self.current
    }

    pub fn stored(&self) -> &StateMap {
        &self.stored
    }

    /// Replace the stored mirror with the store's canonical document.
    pub fn set_stored(&mut self, stored: StateMap) {
        self.stored = stored;
    }

    fn top_parent(&self, item: &TrackedItem) -> Option<String> {
        if !item.has_parent {
            return None;
        }
        item.hierarchy
            .get(&self.parent_type)
            .map(|e| e.id.to_string())
    }

    fn database_id(item: &TrackedItem) -> Option<String> {
        item.hierarchy.get(DATABASE_TYPE).map(entry_tree_id)
    }

    /// Record the item's open path, database status and the current selection.
    pub fn update_cache(&mut self, item: &TrackedItem) {
        let Some(top) = self.top_parent(item) else {
            return;
        };

        if item.is_open {
            let old_path = join_chain(&item.ancestor_ids);
            let mut ids = item.ancestor_ids.clone();
            ids.push(item.tree_id.clone());
            let path = join_chain(&ids);

            let state = self.current.entry(top.clone()).or_default();
            if !state.paths.iter().any(|p| chain_starts_with(p, &ids)) {
                match state.paths.iter().position(|p| *p == old_path) {
                    Some(index) => state.paths[index] = path,
                    None => state.paths.push(path),
                }
                trace!(top = %top, item = %item.tree_id, "Tracked open path");
            }
        }

        self.update_database_status(item, &top);
        self.update_selected(item, &top);
    }

    fn update_database_status(&mut self, item: &TrackedItem, top: &str) {
        let Some(database) = item.hierarchy.get(DATABASE_TYPE) else {
            return;
        };
        let Some(state) = self.current.get_mut(top) else {
            return;
        };
        let database_id = entry_tree_id(database);
        let connected = database.connected.unwrap_or(false);
        state
            .conn_status
            .insert(database_id.clone(), u8::from(connected));
        if item.node_type == DATABASE_TYPE {
            state.is_opened.insert(database_id, u8::from(item.is_open));
        }
    }

    fn update_selected(&mut self, item: &TrackedItem, top: &str) {
        let Some(selected) = &item.selected_id else {
            return;
        };
        let Some(state) = self.current.get_mut(top) else {
            return;
        };
        if let Some(server) = item.hierarchy.get(&self.parent_type) {
            state
                .selected
                .insert(entry_tree_id(server), selected.clone());
        }
        if let Some(database) = item.hierarchy.get(DATABASE_TYPE) {
            state
                .selected
                .insert(entry_tree_id(database), selected.clone());
        }
    }

    /// Handle a collapse.
    ///
    /// A collapsed server or database copies the current paths into the stored mirror and
    /// returns `true`; any other closed item is stripped from the current paths.
    pub fn remove_from_cache(&mut self, item: &TrackedItem) -> bool {
        let Some(top) = self.top_parent(item) else {
            return false;
        };

        self.update_database_status(item, &top);

        if item.node_type == self.parent_type || item.node_type == DATABASE_TYPE {
            let paths = self.current.get(&top).map(|s| s.paths.clone());
            if let (Some(stored), Some(paths)) = (self.stored.get_mut(&top), paths) {
                stored.paths = paths;
                return true;
            }
            return false;
        }

        if !item.is_open {
            self.strip(&top, item);
        }
        false
    }

    /// Handle a deletion: the item's id leaves every tracked chain.
    pub fn forget_item(&mut self, item: &TrackedItem) {
        if let Some(top) = self.top_parent(item) {
            self.strip(&top, item);
        }
    }

    fn strip(&mut self, top: &str, item: &TrackedItem) {
        let origin = item.hierarchy.get(&self.origin_type).map(entry_tree_id);
        let database_id = Self::database_id(item);
        let Some(state) = self.current.get_mut(top) else {
            return;
        };

        let mut paths: Vec<String> = Vec::with_capacity(state.paths.len());
        for chain in state.paths.drain(..) {
            let ids = split_chain(&chain);
            let in_scope = database_id
                .as_deref()
                .map(|db| ids.contains(&db))
                .unwrap_or(true);
            let rewritten = match ids.iter().position(|id| *id == item.tree_id) {
                Some(index) if in_scope => {
                    let truncated = join_chain(&ids[..index]);
                    if truncated.is_empty() || Some(&truncated) == origin.as_ref() {
                        None
                    } else {
                        Some(truncated)
                    }
                }
                _ => Some(chain.clone()),
            };
            if let Some(rewritten) = rewritten {
                if !paths.contains(&rewritten) {
                    paths.push(rewritten);
                }
            }
        }
        debug!(top = %top, item = %item.tree_id, remaining = paths.len(), "Stripped item from tracked paths");
        state.paths = paths;
    }

    /// Decide whether a freshly shown item should be reopened and reselected.
    ///
    /// Chains in which the item is the leaf are consumed from the stored mirror.
    pub fn expand_from_previous_state(&mut self, item: &TrackedItem) -> RestorePlan {
        let Some(top) = self.top_parent(item) else {
            return RestorePlan::default();
        };
        if item.node_type == self.parent_type && !item.is_open {
            return RestorePlan::default();
        }
        let database_id = Self::database_id(item);
        let server_id = item.hierarchy.get(&self.parent_type).map(entry_tree_id);
        let Some(stored) = self.stored.get_mut(&top) else {
            return RestorePlan::default();
        };

        if item.node_type == DATABASE_TYPE && !database_was_open(stored, &item.tree_id) {
            return RestorePlan::default();
        }

        let mut open = false;
        stored.paths.retain(|chain| {
            let ids = split_chain(chain);
            let Some(index) = ids.iter().position(|id| *id == item.tree_id) else {
                return true;
            };
            let in_scope = database_id
                .as_deref()
                .map(|db| ids.contains(&db))
                .unwrap_or(true);
            if !in_scope {
                return true;
            }
            open = true;
            index + 1 != ids.len()
        });

        let scope = database_id.or(server_id);
        let select = scope
            .and_then(|key| stored.selected.get(&key))
            .map(|selected| *selected == item.tree_id)
            .unwrap_or(false);

        if open || select {
            debug!(top = %top, item = %item.tree_id, open, select, "Restoring previous tree state");
        }
        RestorePlan { open, select }
    }
}

fn database_was_open(stored: &TreeState, database_id: &str) -> bool {
    stored.conn_status.get(database_id) != Some(&0)
        && stored.is_opened.get(database_id) == Some(&1)
}
