//! Incremental tree mutation
//!
//! Applies add, update, remove and refresh events to the loaded tree without reloading it.
//! Every operation locates its target by walking the node's hierarchy with a
//! [`traverse::Traversal`]; intermediate levels are lazily loaded, the final level never is.

mod add;
mod refresh;
mod remove;
pub mod traverse;
mod update;

pub use traverse::{parent_steps, PathStep, Transition, Traversal};

use crate::types::ItemId;

/// What a mutation did to the tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationOutcome {
    /// Inserted in sorted position and selected
    Inserted(ItemId),
    /// The node was already present and got selected
    Selected(ItemId),
    /// An empty parent was reloaded from the server; holds the node if it showed up
    Reloaded(Option<ItemId>),
    /// The parent is not loaded; the node appears on next expand
    Deferred,
    /// Patched in place
    Updated(ItemId),
    /// Moved under another parent; holds the new item when it is shown
    Recreated(Option<ItemId>),
    Removed(ItemId),
    Refreshed(ItemId),
    /// A tree state event was handled
    Tracked,
}

impl MutationOutcome {
    pub fn item(&self) -> Option<ItemId> {
        match self {
            MutationOutcome::Inserted(i)
            | MutationOutcome::Selected(i)
            | MutationOutcome::Updated(i)
            | MutationOutcome::Removed(i)
            | MutationOutcome::Refreshed(i) => Some(*i),
            MutationOutcome::Reloaded(i) | MutationOutcome::Recreated(i) => *i,
            MutationOutcome::Deferred | MutationOutcome::Tracked => None,
        }
    }
}

/// Where a walk towards a node's parent ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ParentLookup {
    /// The parent (or top level) is loaded and can be searched
    Loaded(Option<ItemId>),
    /// The parent exists but its children were never fetched
    NotLoaded(Option<ItemId>),
}
