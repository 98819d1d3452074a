//! Tree widget model
//!
//! An arena of tree items with per-item lazy-load and open flags. Structural changes are
//! recorded as [`TreeEvent`]s which the browser drains after every operation, so listeners
//! (collection counters, tree state tracking) observe the same sequence a rendered tree
//! would emit.

use crate::error::TreeError;
use crate::tree::node::NodeData;
use crate::types::ItemId;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Structural change notification.
#[derive(Debug, Clone, PartialEq)]
pub enum TreeEvent {
    Added {
        item: ItemId,
        parent: Option<ItemId>,
    },
    /// The item is already detached; `data` is its last payload
    Removed {
        item: ItemId,
        parent: Option<ItemId>,
        data: NodeData,
    },
    Opened(ItemId),
    Closed(ItemId),
    Selected(ItemId),
    Unloaded(ItemId),
}

/// Open structure beneath an item, captured before the item is rebuilt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BranchSnapshot {
    #[serde(rename = "_id")]
    pub id: crate::types::ObjectId,
    #[serde(rename = "_type")]
    pub node_type: String,
    pub open: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub branch: Vec<BranchSnapshot>,
}

#[derive(Debug)]
struct Slot {
    data: NodeData,
    parent: Option<ItemId>,
    children: Vec<ItemId>,
    loaded: bool,
    open: bool,
}

/// Tree: owns every item; item handles stay valid until the item is removed or unloaded.
#[derive(Debug, Default)]
pub struct Tree {
    slots: Vec<Option<Slot>>,
    roots: Vec<ItemId>,
    roots_loaded: bool,
    selected: Option<ItemId>,
    events: VecDeque<TreeEvent>,
}

impl Tree {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self, item: ItemId) -> Option<&Slot> {
        self.slots.get(item.0).and_then(|s| s.as_ref())
    }

    fn slot_mut(&mut self, item: ItemId) -> Result<&mut Slot, TreeError> {
        self.slots
            .get_mut(item.0)
            .and_then(|s| s.as_mut())
            .ok_or(TreeError::ItemNotFound(item))
    }

    pub fn contains(&self, item: ItemId) -> bool {
        self.slot(item).is_some()
    }

    /// Number of live items.
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    pub fn data(&self, item: ItemId) -> Option<&NodeData> {
        self.slot(item).map(|s| &s.data)
    }

    pub fn data_mut(&mut self, item: ItemId) -> Option<&mut NodeData> {
        self.slots
            .get_mut(item.0)
            .and_then(|s| s.as_mut())
            .map(|s| &mut s.data)
    }

    pub fn require(&self, item: ItemId) -> Result<&NodeData, TreeError> {
        self.data(item).ok_or(TreeError::ItemNotFound(item))
    }

    pub fn parent(&self, item: ItemId) -> Option<ItemId> {
        self.slot(item).and_then(|s| s.parent)
    }

    /// Children of `parent`, or the top level when `parent` is `None`.
    pub fn children(&self, parent: Option<ItemId>) -> &[ItemId] {
        match parent {
            None => &self.roots,
            Some(item) => self.slot(item).map(|s| s.children.as_slice()).unwrap_or(&[]),
        }
    }

    pub fn first(&self, parent: Option<ItemId>) -> Option<ItemId> {
        self.children(parent).first().copied()
    }

    pub fn position(&self, item: ItemId) -> Option<usize> {
        let parent = self.parent(item);
        self.children(parent).iter().position(|c| *c == item)
    }

    /// Every other child of the item's parent.
    pub fn siblings(&self, item: ItemId) -> Vec<ItemId> {
        self.children(self.parent(item))
            .iter()
            .copied()
            .filter(|c| *c != item)
            .collect()
    }

    pub fn next(&self, item: ItemId) -> Option<ItemId> {
        let index = self.position(item)?;
        self.children(self.parent(item)).get(index + 1).copied()
    }

    pub fn prev(&self, item: ItemId) -> Option<ItemId> {
        let index = self.position(item)?;
        index
            .checked_sub(1)
            .and_then(|i| self.children(self.parent(item)).get(i).copied())
    }

    pub fn find_child<P>(&self, parent: Option<ItemId>, mut predicate: P) -> Option<ItemId>
    where
        P: FnMut(&NodeData) -> bool,
    {
        self.children(parent)
            .iter()
            .copied()
            .find(|c| self.data(*c).map(&mut predicate).unwrap_or(false))
    }

    pub fn was_loaded(&self, parent: Option<ItemId>) -> bool {
        match parent {
            None => self.roots_loaded,
            Some(item) => self.slot(item).map(|s| s.loaded).unwrap_or(false),
        }
    }

    pub fn is_open(&self, item: ItemId) -> bool {
        self.slot(item).map(|s| s.open).unwrap_or(false)
    }

    pub fn is_inode(&self, item: ItemId) -> bool {
        self.slot(item).map(|s| s.data.inode).unwrap_or(false)
    }

    pub fn set_inode(&mut self, item: ItemId, inode: bool) -> Result<(), TreeError> {
        self.slot_mut(item)?.data.inode = inode;
        Ok(())
    }

    pub fn selected(&self) -> Option<ItemId> {
        self.selected.filter(|s| self.contains(*s))
    }

    /// Insert `data` under `parent` at `index` (append when `None`).
    ///
    /// A parent gaining a child becomes an inode.
    pub fn insert(
        &mut self,
        parent: Option<ItemId>,
        index: Option<usize>,
        data: NodeData,
    ) -> Result<ItemId, TreeError> {
        if let Some(p) = parent {
            self.slot_mut(p)?.data.inode = true;
        }

        let item = ItemId(self.slots.len());
        self.slots.push(Some(Slot {
            data,
            parent,
            children: Vec::new(),
            loaded: false,
            open: false,
        }));

        let siblings = match parent {
            None => &mut self.roots,
            Some(p) => &mut self.slot_mut(p)?.children,
        };
        match index {
            Some(i) if i <= siblings.len() => siblings.insert(i, item),
            _ => siblings.push(item),
        }

        self.events.push_back(TreeEvent::Added { item, parent });
        Ok(item)
    }

    pub fn append(&mut self, parent: Option<ItemId>, data: NodeData) -> Result<ItemId, TreeError> {
        self.insert(parent, None, data)
    }

    /// Attach a freshly loaded child list and mark `parent` loaded.
    pub fn load_children(
        &mut self,
        parent: Option<ItemId>,
        children: Vec<NodeData>,
    ) -> Result<Vec<ItemId>, TreeError> {
        let mut items = Vec::with_capacity(children.len());
        for child in children {
            items.push(self.append(parent, child)?);
        }
        self.mark_loaded(parent)?;
        Ok(items)
    }

    pub fn mark_loaded(&mut self, parent: Option<ItemId>) -> Result<(), TreeError> {
        match parent {
            None => self.roots_loaded = true,
            Some(item) => self.slot_mut(item)?.loaded = true,
        }
        Ok(())
    }

    fn release_subtree(&mut self, item: ItemId) {
        let children = match self.slots.get_mut(item.0).and_then(|s| s.take()) {
            Some(slot) => slot.children,
            None => return,
        };
        if self.selected == Some(item) {
            self.selected = None;
        }
        for child in children {
            self.release_subtree(child);
        }
    }

    /// Detach `item` and its whole subtree.
    pub fn remove(&mut self, item: ItemId) -> Result<NodeData, TreeError> {
        let parent = self.parent(item);
        if !self.contains(item) {
            return Err(TreeError::ItemNotFound(item));
        }

        match parent {
            None => self.roots.retain(|c| *c != item),
            Some(p) => self.slot_mut(p)?.children.retain(|c| *c != item),
        }

        let children = std::mem::take(&mut self.slot_mut(item)?.children);
        for child in children {
            self.release_subtree(child);
        }
        let data = self
            .slots
            .get_mut(item.0)
            .and_then(|s| s.take())
            .map(|s| s.data)
            .ok_or(TreeError::ItemNotFound(item))?;
        if self.selected == Some(item) {
            self.selected = None;
        }

        self.events.push_back(TreeEvent::Removed {
            item,
            parent,
            data: data.clone(),
        });
        Ok(data)
    }

    /// Drop the children of `item` so the next open fetches them again.
    pub fn unload(&mut self, item: ItemId) -> Result<(), TreeError> {
        let slot = self.slot_mut(item)?;
        let children = std::mem::take(&mut slot.children);
        slot.loaded = false;
        slot.open = false;
        for child in children {
            self.release_subtree(child);
        }
        self.events.push_back(TreeEvent::Unloaded(item));
        Ok(())
    }

    /// Mark `item` open. Opening an open item is a no-op.
    pub fn open(&mut self, item: ItemId) -> Result<bool, TreeError> {
        let slot = self.slot_mut(item)?;
        if slot.open {
            return Ok(false);
        }
        slot.open = true;
        self.events.push_back(TreeEvent::Opened(item));
        Ok(true)
    }

    pub fn close(&mut self, item: ItemId) -> Result<bool, TreeError> {
        let slot = self.slot_mut(item)?;
        if !slot.open {
            return Ok(false);
        }
        slot.open = false;
        self.events.push_back(TreeEvent::Closed(item));
        Ok(true)
    }

    /// Open every ancestor of `item` so it becomes visible.
    pub fn open_path(&mut self, item: ItemId) -> Result<(), TreeError> {
        let mut ancestors = self.path(item);
        ancestors.pop();
        for ancestor in ancestors {
            self.open(ancestor)?;
        }
        Ok(())
    }

    pub fn select(&mut self, item: ItemId) -> Result<(), TreeError> {
        if !self.contains(item) {
            return Err(TreeError::ItemNotFound(item));
        }
        self.selected = Some(item);
        self.events.push_back(TreeEvent::Selected(item));
        Ok(())
    }

    /// Items from the top level down to `item`, inclusive.
    pub fn path(&self, item: ItemId) -> Vec<ItemId> {
        let mut path = Vec::new();
        let mut current = Some(item);
        while let Some(i) = current {
            if !self.contains(i) {
                break;
            }
            path.push(i);
            current = self.parent(i);
        }
        path.reverse();
        path
    }

    /// Capture `item` and every open inode beneath it.
    pub fn serialize_branch(&self, item: ItemId) -> Option<BranchSnapshot> {
        let slot = self.slot(item)?;
        let branch = slot
            .children
            .iter()
            .filter(|c| self.is_inode(**c) && self.is_open(**c))
            .filter_map(|c| self.serialize_branch(*c))
            .collect();
        Some(BranchSnapshot {
            id: slot.data.id.clone(),
            node_type: slot.data.node_type.clone(),
            open: slot.open,
            branch,
        })
    }

    /// Depth-first listing of every item with its depth.
    pub fn walk(&self) -> Vec<(usize, ItemId)> {
        fn visit(tree: &Tree, items: &[ItemId], depth: usize, out: &mut Vec<(usize, ItemId)>) {
            for item in items {
                out.push((depth, *item));
                visit(tree, tree.children(Some(*item)), depth + 1, out);
            }
        }
        let mut out = Vec::new();
        visit(self, &self.roots, 0, &mut out);
        out
    }

    pub fn pop_event(&mut self) -> Option<TreeEvent> {
        self.events.pop_front()
    }

    pub fn take_events(&mut self) -> Vec<TreeEvent> {
        self.events.drain(..).collect()
    }
}
