//! In-memory node service backed by a fixture of child lists.
//!
//! Fixture JSON maps a parent tree id to its children; the empty key holds the top level:
//!
//! ```json
//! { "": [{"_id": 1, "_type": "server_group", "label": "Servers", "inode": true}],
//!   "server_group_1": [...] }
//! ```

use super::{ChildrenRequest, NodeRequest, NodeService};
use crate::error::TreeError;
use crate::tree::NodeData;
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};

/// Fixture key of the top level.
pub const ROOT_KEY: &str = "";

#[derive(Default)]
pub struct MemoryNodeService {
    children: RwLock<HashMap<String, Vec<NodeData>>>,
    gone: RwLock<HashSet<String>>,
    failing: RwLock<HashSet<String>>,
    calls: AtomicUsize,
}

fn key(parent: Option<&str>) -> String {
    parent.unwrap_or(ROOT_KEY).to_string()
}

impl MemoryNodeService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json(content: &str) -> Result<Self, TreeError> {
        let children: HashMap<String, Vec<NodeData>> = serde_json::from_str(content)?;
        Ok(MemoryNodeService {
            children: RwLock::new(children),
            ..Self::default()
        })
    }

    pub fn set_children(&self, parent: Option<&str>, children: Vec<NodeData>) {
        self.children.write().insert(key(parent), children);
    }

    pub fn push_child(&self, parent: Option<&str>, child: NodeData) {
        self.children.write().entry(key(parent)).or_default().push(child);
    }

    /// Remove the node with `tree_id` wherever it is listed.
    pub fn remove_node(&self, tree_id: &str) -> Option<NodeData> {
        let mut children = self.children.write();
        for list in children.values_mut() {
            if let Some(index) = list.iter().position(|c| c.tree_id() == tree_id) {
                return Some(list.remove(index));
            }
        }
        None
    }

    /// Replace the listed representation of a node, matched by `tree_id`.
    pub fn replace_node(&self, tree_id: &str, node: NodeData) -> bool {
        let mut children = self.children.write();
        for list in children.values_mut() {
            if let Some(existing) = list.iter_mut().find(|c| c.tree_id() == tree_id) {
                *existing = node;
                return true;
            }
        }
        false
    }

    /// Make every request about `tree_id` answer 410 Gone.
    pub fn mark_gone(&self, tree_id: &str) {
        self.remove_node(tree_id);
        self.gone.write().insert(tree_id.to_string());
    }

    /// Make child listings of `parent` fail with a server error.
    pub fn fail_children(&self, parent: Option<&str>) {
        self.failing.write().insert(key(parent));
    }

    /// Number of requests served.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl NodeService for MemoryNodeService {
    async fn list_children(&self, request: &ChildrenRequest) -> Result<Vec<NodeData>, TreeError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let parent = key(request.parent.as_deref());
        if self.gone.read().contains(&parent) {
            return Err(TreeError::Gone(format!("{} no longer exists", parent)));
        }
        if self.failing.read().contains(&parent) {
            return Err(TreeError::Server {
                status: 500,
                message: format!("Failed to list children of '{}'", parent),
            });
        }
        Ok(self
            .children
            .read()
            .get(&parent)
            .cloned()
            .unwrap_or_default())
    }

    async fn fetch_node(&self, request: &NodeRequest) -> Result<NodeData, TreeError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.gone.read().contains(&request.tree_id) {
            return Err(TreeError::Gone(format!("{} no longer exists", request.tree_id)));
        }
        self.children
            .read()
            .values()
            .flatten()
            .find(|c| c.tree_id() == request.tree_id)
            .cloned()
            .ok_or_else(|| TreeError::Gone(format!("{} no longer exists", request.tree_id)))
    }
}
