//! Refreshing a node in place.
//!
//! The open structure beneath the node is captured, the node is torn down and refetched, and
//! the captured branches are reopened one level at a time as their children arrive.

use super::MutationOutcome;
use crate::browser::{Browser, Notice};
use crate::error::TreeError;
use crate::registry::{Capability, UrlAction};
use crate::service::NodeRequest;
use crate::tree::BranchSnapshot;
use crate::types::ItemId;
use futures::future::{BoxFuture, FutureExt};
use tracing::{debug, info, warn};

impl Browser {
    /// Refresh `item` and settle the resulting tree events.
    pub async fn refresh(&mut self, item: ItemId) -> Result<MutationOutcome, TreeError> {
        let outcome = self.refresh_node(item).await;
        self.flush_events().await?;
        outcome
    }

    /// Nearest ancestor of `item` (inclusive) that is a real object rather than a
    /// collection wrapper.
    fn refresh_target(&self, item: ItemId) -> Option<ItemId> {
        let mut current = Some(item);
        while let Some(i) = current {
            let data = self.tree.data(i)?;
            if !self.registry.is_collection(&data.node_type) {
                return Some(i);
            }
            current = self.tree.parent(i);
        }
        None
    }

    pub(crate) fn refresh_node(&mut self, item: ItemId) -> BoxFuture<'_, Result<MutationOutcome, TreeError>> {
        async move {
            let node_type = self.tree.require(item)?.node_type.clone();
            self.reached = Some(item);
            if !self.registry.require(&node_type)?.supports(Capability::Refresh) {
                return Err(TreeError::Unsupported {
                    operation: "refresh".to_string(),
                    node_type,
                });
            }
            self.notify(Notice::Refreshing {
                item,
                node_type: node_type.clone(),
            });

            let Some(target) = self.refresh_target(item) else {
                // A top-level collection has nothing above it to refetch
                let snapshot = self.tree.serialize_branch(item);
                self.clear_cache(&node_type);
                self.tree.unload(item)?;
                if let Some(snapshot) = snapshot {
                    self.replay_branch(item, &snapshot).await?;
                }
                return Ok(MutationOutcome::Refreshed(item));
            };
            if target != item {
                debug!(item = %item, target = %target, "Refreshing collection through its parent");
            }

            let snapshot = self.tree.serialize_branch(target);
            let data = self.tree.require(target)?.clone();
            let hierarchy = self.hierarchy(target);
            let url = self.registry.generate_url(
                &hierarchy,
                &data.node_type,
                &UrlAction::Nodes,
                Some(&data.id),
            )?;
            self.clear_cache(&data.node_type);

            let request = NodeRequest {
                url,
                tree_id: data.tree_id(),
                node_type: data.node_type.clone(),
                id: data.id.clone(),
            };
            let fresh = match self.service.fetch_node(&request).await {
                Ok(fresh) => fresh,
                Err(e) if e.is_gone() => {
                    warn!(item = %target, url = %request.url, "Node no longer exists, removing it");
                    let parent = self.tree.parent(target);
                    self.remove_tree_node(target, false)?;
                    self.reached = parent;
                    if let Some(parent) = parent {
                        match self.refresh_node(parent).await {
                            Ok(outcome) => self.reached = outcome.item(),
                            Err(parent_err) => {
                                warn!(item = %parent, error = %parent_err, "Failed to refresh parent of removed node");
                            }
                        }
                    }
                    return Err(e);
                }
                Err(e) => {
                    warn!(item = %target, url = %request.url, error = %e, "Error retrieving details for the node");
                    if self.tree.was_loaded(Some(target)) {
                        self.tree.unload(target)?;
                    }
                    return Err(e);
                }
            };

            self.tree.unload(target)?;
            if let Some(current) = self.tree.data_mut(target) {
                current.apply(&fresh);
            }

            let expandable = {
                let current = self.tree.require(target)?;
                self.registry.require(&current.node_type)?.can_expand(current)
            };
            if expandable {
                if let Some(snapshot) = snapshot {
                    self.replay_branch(target, &snapshot).await?;
                }
            } else {
                debug!(item = %target, "Refreshed node cannot be expanded");
            }

            info!(item = %target, node_type = %data.node_type, id = %data.id, "Node refreshed");
            Ok(MutationOutcome::Refreshed(target))
        }
        .boxed()
    }

    /// Reopen `item` if it was open, then every captured child branch beneath it.
    fn replay_branch<'a>(
        &'a mut self,
        item: ItemId,
        snapshot: &'a BranchSnapshot,
    ) -> BoxFuture<'a, Result<(), TreeError>> {
        async move {
            if !snapshot.open {
                return Ok(());
            }
            // Rebuilt levels are always refetched
            self.clear_cache(&snapshot.node_type);
            if !self.open_item(item).await? {
                return Ok(());
            }

            for branch in &snapshot.branch {
                let with_id = self
                    .registry
                    .get(&branch.node_type)
                    .map(|t| t.has_id && !t.collection)
                    .unwrap_or(true);
                let child = self.tree.find_child(Some(item), |d| {
                    d.node_type == branch.node_type && (!with_id || d.id == branch.id)
                });
                match child {
                    Some(child) => self.replay_branch(child, branch).await?,
                    None => debug!(
                        parent = %item,
                        node_type = %branch.node_type,
                        id = %branch.id,
                        "Previously open branch is gone"
                    ),
                }
            }
            Ok(())
        }
        .boxed()
    }
}
