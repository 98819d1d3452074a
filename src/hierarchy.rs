//! Hierarchy Resolver
//!
//! The hierarchy of a tree item maps each real object type above (and including) the item
//! to that ancestor's identity. Collection wrappers are skipped. URL generation, cache keys
//! and mutation path walks all consume it.

use crate::registry::NodeTypeRegistry;
use crate::tree::{NodeData, Tree};
use crate::types::{ItemId, ObjectId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One ancestor in a hierarchy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HierarchyEntry {
    #[serde(rename = "_type")]
    pub node_type: String,

    #[serde(rename = "_id")]
    pub id: ObjectId,

    /// Static nesting depth of the type
    pub priority: i32,

    /// Widget-level identifier of the ancestor, when known
    #[serde(rename = "id", default, skip_serializing_if = "Option::is_none")]
    pub tree_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connected: Option<bool>,
}

impl HierarchyEntry {
    pub fn new(registry: &NodeTypeRegistry, node_type: &str, id: ObjectId) -> Self {
        HierarchyEntry {
            node_type: node_type.to_string(),
            id,
            priority: registry.get(node_type).map(|t| t.priority).unwrap_or(0),
            tree_id: None,
            label: None,
            connected: None,
        }
    }

    pub fn from_node(registry: &NodeTypeRegistry, data: &NodeData) -> Self {
        HierarchyEntry {
            tree_id: Some(data.tree_id()),
            label: Some(data.label.clone()),
            connected: data.connected,
            ..Self::new(registry, &data.node_type, data.id.clone())
        }
    }
}

/// Mapping from object type to ancestor entry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TreeHierarchy(BTreeMap<String, HierarchyEntry>);

impl TreeHierarchy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an entry unless its type is already present.
    pub fn insert(&mut self, entry: HierarchyEntry) -> bool {
        if self.0.contains_key(&entry.node_type) {
            return false;
        }
        self.0.insert(entry.node_type.clone(), entry);
        true
    }

    /// Add or replace the entry for its type.
    pub fn set(&mut self, entry: HierarchyEntry) {
        self.0.insert(entry.node_type.clone(), entry);
    }

    pub fn get(&self, node_type: &str) -> Option<&HierarchyEntry> {
        self.0.get(node_type)
    }

    pub fn get_mut(&mut self, node_type: &str) -> Option<&mut HierarchyEntry> {
        self.0.get_mut(node_type)
    }

    pub fn contains(&self, node_type: &str) -> bool {
        self.0.contains_key(node_type)
    }

    pub fn remove(&mut self, node_type: &str) -> Option<HierarchyEntry> {
        self.0.remove(node_type)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Entries ordered from the root down (ascending priority).
    pub fn ordered(&self) -> Vec<&HierarchyEntry> {
        let mut entries: Vec<&HierarchyEntry> = self.0.values().collect();
        entries.sort_by(|a, b| {
            a.priority
                .cmp(&b.priority)
                .then_with(|| a.node_type.cmp(&b.node_type))
        });
        entries
    }

    /// Deepest entry.
    pub fn leaf(&self) -> Option<&HierarchyEntry> {
        self.ordered().last().copied()
    }
}

impl FromIterator<HierarchyEntry> for TreeHierarchy {
    fn from_iter<I: IntoIterator<Item = HierarchyEntry>>(iter: I) -> Self {
        let mut hierarchy = TreeHierarchy::new();
        for entry in iter {
            hierarchy.insert(entry);
        }
        hierarchy
    }
}

/// Resolve the hierarchy of `item`.
///
/// Walks from the item to the top level. Types unknown to the registry and collection
/// wrappers are skipped; the nearest ancestor of a type wins. A detached item yields the
/// entries collected before the break.
pub fn resolve(tree: &Tree, registry: &NodeTypeRegistry, item: ItemId) -> TreeHierarchy {
    let mut hierarchy = TreeHierarchy::new();
    let mut current = Some(item);

    while let Some(i) = current {
        let Some(data) = tree.data(i) else {
            break;
        };
        match registry.get(&data.node_type) {
            Some(node_type) if node_type.has_id && !node_type.collection => {
                hierarchy.insert(HierarchyEntry::from_node(registry, data));
            }
            _ => {}
        }
        current = tree.parent(i);
    }

    hierarchy
}
