//! Path traversal state machine.
//!
//! A traversal walks a list of `{type, id}` steps down the tree, one transition at a time.
//! Each transition is a plain value; the caller decides whether a `NeedsLoad` should fetch
//! children or end the walk. Collection wrappers that group the next step's type are
//! entered without consuming a step.

use crate::hierarchy::TreeHierarchy;
use crate::registry::NodeTypeRegistry;
use crate::tree::{NodeData, Tree};
use crate::types::{ItemId, ObjectId};
use std::collections::VecDeque;

/// One level of a path to walk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathStep {
    pub node_type: String,
    /// `None` matches any item of the type
    pub id: Option<ObjectId>,
}

impl PathStep {
    pub fn new(node_type: impl Into<String>, id: Option<ObjectId>) -> Self {
        PathStep {
            node_type: node_type.into(),
            id,
        }
    }

    pub fn of(data: &NodeData) -> Self {
        Self::new(data.node_type.clone(), Some(data.id.clone()))
    }

    fn matches(&self, data: &NodeData) -> bool {
        data.node_type == self.node_type && self.id.as_ref().map_or(true, |id| *id == data.id)
    }
}

/// Steps leading to the parent of `data`, shallowest first.
///
/// The node's own hierarchy entry is skipped. When `data` names its parent id, the deepest
/// step is retargeted to it.
pub fn parent_steps(hierarchy: &TreeHierarchy, data: &NodeData) -> Vec<PathStep> {
    let mut steps: Vec<PathStep> = hierarchy
        .ordered()
        .into_iter()
        .filter(|e| !(e.node_type == data.node_type && e.id == data.id))
        .map(|e| PathStep::new(e.node_type.clone(), Some(e.id.clone())))
        .collect();
    if let (Some(last), Some(pid)) = (steps.last_mut(), data.pid.as_ref()) {
        last.id = Some(pid.clone());
    }
    steps
}

/// Result of matching one step against the children of a position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChildMatch {
    Found(ItemId),
    Collection(ItemId),
    Missing,
}

/// Search the loaded children of `parent` for `step`, in sibling order.
pub fn match_child(
    tree: &Tree,
    registry: &NodeTypeRegistry,
    parent: Option<ItemId>,
    step: &PathStep,
) -> ChildMatch {
    for child in tree.children(parent) {
        let Some(data) = tree.data(*child) else {
            continue;
        };
        if step.matches(data) {
            return ChildMatch::Found(*child);
        }
        if registry.is_collection_of(&data.node_type, &step.node_type) {
            return ChildMatch::Collection(*child);
        }
    }
    ChildMatch::Missing
}

/// A visited item on the walked path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PathItem {
    pub item: ItemId,
    pub collection: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Transition {
    /// A step matched and was consumed
    Advanced(ItemId),
    /// A collection wrapper was entered; the step is still pending
    EnteredCollection(ItemId),
    /// The position's children were never loaded
    NeedsLoad(Option<ItemId>),
    /// No step remains
    Finished,
    /// The position is loaded but holds nothing matching the step
    NotFound(PathStep),
}

/// Walk in progress.
#[derive(Debug, Clone)]
pub struct Traversal {
    steps: VecDeque<PathStep>,
    position: Option<ItemId>,
    path: Vec<PathItem>,
}

impl Traversal {
    pub fn new(steps: Vec<PathStep>) -> Self {
        Traversal {
            steps: steps.into(),
            position: None,
            path: Vec::new(),
        }
    }

    /// Item the walk currently stands on; `None` is the top level.
    pub fn position(&self) -> Option<ItemId> {
        self.position
    }

    pub fn remaining(&self) -> usize {
        self.steps.len()
    }

    pub fn pending_step(&self) -> Option<&PathStep> {
        self.steps.front()
    }

    pub fn path(&self) -> &[PathItem] {
        &self.path
    }

    /// Queue one more step after the existing ones.
    pub fn push_step(&mut self, step: PathStep) {
        self.steps.push_back(step);
    }

    pub fn advance(&mut self, tree: &Tree, registry: &NodeTypeRegistry) -> Transition {
        let Some(step) = self.steps.front() else {
            return Transition::Finished;
        };
        if !tree.was_loaded(self.position) {
            return Transition::NeedsLoad(self.position);
        }

        match match_child(tree, registry, self.position, step) {
            ChildMatch::Found(item) => {
                self.steps.pop_front();
                self.position = Some(item);
                self.path.push(PathItem {
                    item,
                    collection: false,
                });
                Transition::Advanced(item)
            }
            ChildMatch::Collection(item) => {
                self.position = Some(item);
                self.path.push(PathItem {
                    item,
                    collection: true,
                });
                Transition::EnteredCollection(item)
            }
            ChildMatch::Missing => Transition::NotFound(step.clone()),
        }
    }
}
