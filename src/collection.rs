//! Collection Counters
//!
//! A collection wrapper tracks how many children it holds since it was last loaded. The
//! count lives on the wrapper's `NodeData` and feeds its rendered label.

use crate::registry::NodeTypeRegistry;
use crate::tree::{render_label, Tree};
use crate::types::ItemId;
use tracing::trace;

fn collection_item(tree: &Tree, registry: &NodeTypeRegistry, item: Option<ItemId>) -> Option<ItemId> {
    let item = item?;
    let data = tree.data(item)?;
    registry.is_collection(&data.node_type).then_some(item)
}

/// A child was attached under `parent`.
pub fn child_added(tree: &mut Tree, registry: &NodeTypeRegistry, parent: Option<ItemId>) -> Option<u32> {
    let coll = collection_item(tree, registry, parent)?;
    let data = tree.data_mut(coll)?;
    let count = data.collection_count.unwrap_or(0) + 1;
    data.collection_count = Some(count);
    trace!(item = %coll, count, label = %render_label(data), "Collection count incremented");
    Some(count)
}

/// A child was removed from `parent`.
pub fn child_removed(tree: &mut Tree, registry: &NodeTypeRegistry, parent: Option<ItemId>) -> Option<u32> {
    let coll = collection_item(tree, registry, parent)?;
    let data = tree.data_mut(coll)?;
    let count = data.collection_count.unwrap_or(0).saturating_sub(1);
    data.collection_count = Some(count);
    trace!(item = %coll, count, label = %render_label(data), "Collection count decremented");
    Some(count)
}

/// The collection's children were dropped; its count goes with them.
pub fn unloaded(tree: &mut Tree, registry: &NodeTypeRegistry, item: ItemId) {
    if collection_item(tree, registry, Some(item)).is_some() {
        if let Some(data) = tree.data_mut(item) {
            data.collection_count = None;
        }
    }
}
