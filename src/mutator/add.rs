//! Adding a node created elsewhere.

use super::traverse::{parent_steps, Transition, Traversal};
use super::{MutationOutcome, ParentLookup};
use crate::browser::Browser;
use crate::error::TreeError;
use crate::hierarchy::TreeHierarchy;
use crate::tree::sort::{insertion_index, sibling_cmp};
use crate::tree::NodeData;
use crate::types::ItemId;
use std::cmp::Ordering;
use tracing::{debug, info};

impl Browser {
    /// Walk to the item that holds (or would hold) `data`.
    ///
    /// Levels above the parent are loaded on the way down. The parent itself, and the
    /// collection under it that groups `data`'s type, are never loaded here.
    pub(crate) async fn locate_parent(
        &mut self,
        data: &NodeData,
        hierarchy: &TreeHierarchy,
    ) -> Result<ParentLookup, TreeError> {
        let mut traversal = Traversal::new(parent_steps(hierarchy, data));

        loop {
            match traversal.advance(&self.tree, &self.registry) {
                Transition::Advanced(item) | Transition::EnteredCollection(item) => {
                    self.reached = Some(item);
                }
                Transition::NeedsLoad(position) => {
                    if !self.ensure_loaded(position).await? {
                        return Ok(ParentLookup::NotLoaded(position));
                    }
                }
                Transition::NotFound(step) => {
                    debug!(node_type = %step.node_type, "Path to node not found in tree");
                    let id = step.id.unwrap_or_default();
                    return Err(TreeError::node_not_found(step.node_type, &id));
                }
                Transition::Finished => break,
            }
        }

        let parent = traversal.position();
        if !self.tree.was_loaded(parent) {
            return Ok(ParentLookup::NotLoaded(parent));
        }
        match self.find_child_collection_tree_node(parent, &data.node_type) {
            Some(collection) if self.tree.was_loaded(Some(collection)) => {
                Ok(ParentLookup::Loaded(Some(collection)))
            }
            Some(collection) => Ok(ParentLookup::NotLoaded(Some(collection))),
            None => Ok(ParentLookup::Loaded(parent)),
        }
    }

    /// Insert `data` among the loaded children of `parent`, keeping them ordered.
    pub(crate) fn insert_sorted(
        &mut self,
        parent: Option<ItemId>,
        data: NodeData,
    ) -> Result<ItemId, TreeError> {
        let by_id = self
            .registry
            .get(&data.node_type)
            .map(|t| t.sort_by_id)
            .unwrap_or(false);
        let children = self.tree.children(parent);
        let index = insertion_index(
            children.len(),
            self.options.insertion_search_threshold,
            |i| {
                self.tree
                    .data(children[i])
                    .map(|sibling| sibling_cmp(sibling, &data, by_id) == Ordering::Greater)
                    .unwrap_or(false)
            },
        );
        self.tree.insert(parent, index, data)
    }

    /// Show a newly created node in its sorted position and select it.
    pub async fn add_node(
        &mut self,
        data: NodeData,
        hierarchy: &TreeHierarchy,
    ) -> Result<MutationOutcome, TreeError> {
        let outcome = self.add_node_inner(data, hierarchy).await;
        self.flush_events().await?;
        outcome
    }

    pub(super) async fn add_node_inner(
        &mut self,
        data: NodeData,
        hierarchy: &TreeHierarchy,
    ) -> Result<MutationOutcome, TreeError> {
        self.registry.require(&data.node_type)?;

        let parent = match self.locate_parent(&data, hierarchy).await? {
            ParentLookup::NotLoaded(parent) => {
                debug!(node_type = %data.node_type, id = %data.id, parent = ?parent, "Parent not loaded, node shows on next expand");
                self.clear_cache(&data.node_type);
                if let Some(holder) = parent.and_then(|p| self.tree.data(p)) {
                    let holder_type = holder.node_type.clone();
                    self.clear_cache(&holder_type);
                }
                return Ok(MutationOutcome::Deferred);
            }
            ParentLookup::Loaded(parent) => parent,
        };

        if let Some(existing) = self
            .tree
            .find_child(parent, |d| d.is(&data.node_type, &data.id))
        {
            self.tree.open_path(existing)?;
            self.tree.select(existing)?;
            return Ok(MutationOutcome::Selected(existing));
        }

        if let Some(parent_item) = parent {
            if self.tree.children(Some(parent_item)).is_empty() {
                return self.reload_and_select(parent_item, &data).await;
            }
        }

        self.clear_cache(&data.node_type);
        if let Some(holder) = parent.and_then(|p| self.tree.data(p)) {
            let holder_type = holder.node_type.clone();
            self.clear_cache(&holder_type);
        }
        let item = self.insert_sorted(parent, data)?;
        self.tree.open_path(item)?;
        self.tree.select(item)?;
        if let Some(node) = self.tree.data(item) {
            info!(item = %item, node_type = %node.node_type, id = %node.id, "Node added");
        }
        Ok(MutationOutcome::Inserted(item))
    }

    /// Refetch a parent that was loaded empty, then select `data` if the server lists it.
    async fn reload_and_select(
        &mut self,
        parent: ItemId,
        data: &NodeData,
    ) -> Result<MutationOutcome, TreeError> {
        let parent_type = self.tree.require(parent)?.node_type.clone();
        self.clear_cache(&parent_type);
        self.clear_cache(&data.node_type);
        self.tree.unload(parent)?;
        self.open_item(parent).await?;
        self.tree.open_path(parent)?;

        let found = self
            .tree
            .find_child(Some(parent), |d| d.is(&data.node_type, &data.id));
        if let Some(item) = found {
            self.tree.select(item)?;
        }
        Ok(MutationOutcome::Reloaded(found))
    }
}
