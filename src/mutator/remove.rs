//! Removing nodes and the tree lookups shared by the mutations.

use super::traverse::{parent_steps, Transition, Traversal};
use super::MutationOutcome;
use crate::browser::Browser;
use crate::error::TreeError;
use crate::hierarchy::TreeHierarchy;
use crate::tree::NodeData;
use crate::types::{ItemId, ObjectId};
use tracing::{debug, info};

impl Browser {
    /// Child of `parent` that is the collection grouping `node_type`.
    pub fn find_child_collection_tree_node(
        &self,
        parent: Option<ItemId>,
        node_type: &str,
    ) -> Option<ItemId> {
        self.tree
            .find_child(parent, |d| self.registry.is_collection_of(&d.node_type, node_type))
    }

    /// Closest ancestor of `item` (inclusive) of `node_type`.
    pub fn find_parent_tree_node_by_type(&self, item: ItemId, node_type: &str) -> Option<ItemId> {
        let mut current = Some(item);
        while let Some(i) = current {
            if self.tree.data(i)?.node_type == node_type {
                return Some(i);
            }
            current = self.tree.parent(i);
        }
        None
    }

    /// Sibling of `item` denoting `node_type`/`id`.
    pub fn find_sibling_tree_node(
        &self,
        item: ItemId,
        node_type: &str,
        id: &ObjectId,
    ) -> Option<ItemId> {
        self.tree
            .siblings(item)
            .into_iter()
            .find(|s| self.tree.data(*s).map(|d| d.is(node_type, id)).unwrap_or(false))
    }

    /// Find an already shown node without loading anything.
    pub fn find_loaded_node(&self, data: &NodeData, hierarchy: &TreeHierarchy) -> Option<ItemId> {
        let mut traversal = Traversal::new(parent_steps(hierarchy, data));
        loop {
            match traversal.advance(&self.tree, &self.registry) {
                Transition::Advanced(_) | Transition::EnteredCollection(_) => {}
                Transition::Finished => break,
                Transition::NeedsLoad(_) | Transition::NotFound(_) => return None,
            }
        }

        let parent = traversal.position();
        let holder = self
            .find_child_collection_tree_node(parent, &data.node_type)
            .or(parent);
        self.tree
            .find_child(holder, |d| d.is(&data.node_type, &data.id))
    }

    /// Detach `item`. With `select_next`, selection moves to the next sibling, else the
    /// previous one, else the parent.
    pub fn remove_tree_node(&mut self, item: ItemId, select_next: bool) -> Result<NodeData, TreeError> {
        let successor = if select_next {
            self.tree
                .next(item)
                .or_else(|| self.tree.prev(item))
                .or_else(|| self.tree.parent(item))
        } else {
            None
        };

        let data = self.tree.remove(item)?;
        if let Some(successor) = successor {
            self.tree.select(successor)?;
        }
        info!(item = %item, node_type = %data.node_type, id = %data.id, "Node removed");
        Ok(data)
    }

    /// Remove every child of `parent` of `node_type` whose id is in `ids`.
    pub fn remove_child_tree_nodes_by_id(
        &mut self,
        parent: Option<ItemId>,
        node_type: &str,
        ids: &[ObjectId],
    ) -> Result<usize, TreeError> {
        let doomed: Vec<ItemId> = self
            .tree
            .children(parent)
            .iter()
            .copied()
            .filter(|c| {
                self.tree
                    .data(*c)
                    .map(|d| d.node_type == node_type && ids.contains(&d.id))
                    .unwrap_or(false)
            })
            .collect();
        for item in &doomed {
            self.tree.remove(*item)?;
        }
        Ok(doomed.len())
    }

    /// Remove a node dropped elsewhere, if it is shown.
    pub async fn remove_node(
        &mut self,
        data: &NodeData,
        hierarchy: &TreeHierarchy,
    ) -> Result<MutationOutcome, TreeError> {
        let Some(item) = self.find_loaded_node(data, hierarchy) else {
            debug!(node_type = %data.node_type, id = %data.id, "Removed node is not shown");
            self.clear_cache(&data.node_type);
            return Ok(MutationOutcome::Deferred);
        };
        self.remove_tree_node(item, true)?;
        self.flush_events().await?;
        Ok(MutationOutcome::Removed(item))
    }
}
