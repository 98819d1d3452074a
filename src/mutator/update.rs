//! Updating a node edited elsewhere.

use super::{MutationOutcome, ParentLookup};
use crate::browser::Browser;
use crate::error::TreeError;
use crate::hierarchy::TreeHierarchy;
use crate::tree::NodeData;
use crate::types::ItemId;
use tracing::{debug, info, warn};

/// Whether the edit changes the node's place among its siblings or its parent.
///
/// A new parent id, label or object id means the node has to be removed and inserted again.
/// A server whose icon changed (connected or disconnected) is rebuilt as well.
pub fn needs_recreate(old: &NodeData, new: &NodeData) -> bool {
    let moved = new.pid.is_some() && old.pid != new.pid;
    let server_icon = old.node_type == "server" && new.node_type == "server" && old.icon != new.icon;
    moved || server_icon || old.label != new.label || old.id != new.id
}

/// The hierarchy without the entry of `old` itself, leaving only its ancestors.
fn ancestors_of(hierarchy: &TreeHierarchy, old: &NodeData) -> TreeHierarchy {
    let mut target = hierarchy.clone();
    if target
        .get(&old.node_type)
        .map(|e| e.id == old.id)
        .unwrap_or(false)
    {
        target.remove(&old.node_type);
    }
    target
}

impl Browser {
    /// Locate a shown node, loading the levels above its parent if needed.
    async fn locate_existing(
        &mut self,
        data: &NodeData,
        hierarchy: &TreeHierarchy,
    ) -> Result<Option<ItemId>, TreeError> {
        match self.locate_parent(data, hierarchy).await {
            Ok(ParentLookup::Loaded(holder)) => Ok(self
                .tree
                .find_child(holder, |d| d.is(&data.node_type, &data.id))),
            Ok(ParentLookup::NotLoaded(_)) => Ok(None),
            Err(TreeError::NodeNotFound { .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Reflect an edit of `old` into `new`.
    pub async fn update_node(
        &mut self,
        old: &NodeData,
        new: NodeData,
        hierarchy: &TreeHierarchy,
    ) -> Result<MutationOutcome, TreeError> {
        let outcome = self.update_node_inner(old, new, hierarchy).await;
        self.flush_events().await?;
        outcome
    }

    async fn update_node_inner(
        &mut self,
        old: &NodeData,
        new: NodeData,
        hierarchy: &TreeHierarchy,
    ) -> Result<MutationOutcome, TreeError> {
        self.registry.require(&new.node_type)?;

        let Some(item) = self.locate_existing(old, hierarchy).await? else {
            warn!(
                node_type = %old.node_type,
                id = %old.id,
                "Updated node not found at its old position, adding it instead"
            );
            return self.add_node_inner(new, &ancestors_of(hierarchy, old)).await;
        };

        self.clear_cache(&old.node_type);
        if let Some(holder) = self.tree.parent(item).and_then(|p| self.tree.data(p)) {
            let holder_type = holder.node_type.clone();
            self.clear_cache(&holder_type);
        }

        if !needs_recreate(old, &new) {
            if let Some(data) = self.tree.data_mut(item) {
                data.apply(&new);
            }
            self.tree.open_path(item)?;
            self.tree.select(item)?;
            debug!(item = %item, node_type = %new.node_type, id = %new.id, "Node updated in place");
            return Ok(MutationOutcome::Updated(item));
        }

        let mut replacement = new;
        if let Some(data) = self.tree.data(item) {
            replacement.collection_count = data.collection_count;
        }
        self.remove_tree_node(item, false)?;

        let outcome = self
            .add_node_inner(replacement, &ancestors_of(hierarchy, old))
            .await?;
        info!(old = %item, new = ?outcome.item(), "Node recreated");
        Ok(MutationOutcome::Recreated(outcome.item()))
    }
}
