//! Browser
//!
//! Owns the object tree and wires it to the node service, the per-type result caches and
//! the tree state tracker. Inbound mutation events enter through [`Browser::handle`]; every
//! structural change the tree records is then dispatched to the collection counters and the
//! tracker by [`Browser::flush_events`].

use crate::cache::{CacheCleared, Clock, NodeCaches, SystemClock, STALE_AFTER_MS};
use crate::collection;
use crate::error::TreeError;
use crate::hierarchy::{resolve, TreeHierarchy};
use crate::mutator::MutationOutcome;
use crate::registry::{NodeTypeRegistry, UrlAction};
use crate::service::{ChildrenRequest, NodeService};
use crate::state::{TrackedItem, TreeStateTracker};
use crate::tree::sort::{sort_children, DEFAULT_SEARCH_THRESHOLD};
use crate::tree::{NodeData, Tree, TreeEvent};
use crate::types::ItemId;
use parking_lot::Mutex;
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

/// Callback invoked with the affected item (when there is one) and the event's node data.
pub type Callback = Box<dyn FnOnce(Option<ItemId>, &NodeData) + Send>;

/// Optional completion callbacks of an inbound event.
#[derive(Default)]
pub struct EventOptions {
    pub success: Option<Callback>,
    pub fail: Option<Callback>,
}

impl EventOptions {
    pub fn on_success(mut self, callback: impl FnOnce(Option<ItemId>, &NodeData) + Send + 'static) -> Self {
        self.success = Some(Box::new(callback));
        self
    }

    pub fn on_fail(mut self, callback: impl FnOnce(Option<ItemId>, &NodeData) + Send + 'static) -> Self {
        self.fail = Some(Box::new(callback));
        self
    }

    /// `reached` is the deepest item the event got to, handed to `fail`.
    fn finish(
        self,
        result: &Result<MutationOutcome, TreeError>,
        data: &NodeData,
        reached: Option<ItemId>,
    ) {
        match result {
            Ok(outcome) => {
                if let Some(success) = self.success {
                    success(outcome.item(), data);
                }
            }
            Err(_) => {
                if let Some(fail) = self.fail {
                    fail(reached, data);
                }
            }
        }
    }
}

impl fmt::Debug for EventOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventOptions")
            .field("success", &self.success.is_some())
            .field("fail", &self.fail.is_some())
            .finish()
    }
}

/// Inbound events from the editing layer.
#[derive(Debug)]
pub enum BrowserEvent {
    Add {
        data: NodeData,
        hierarchy: TreeHierarchy,
        options: EventOptions,
    },
    Update {
        old: NodeData,
        new: NodeData,
        hierarchy: TreeHierarchy,
        options: EventOptions,
    },
    Refresh {
        item: ItemId,
        options: EventOptions,
    },
    ExpandFromPreviousState(ItemId),
    RemoveFromTreeState(ItemId),
    UpdateTreeState(ItemId),
}

/// Notifications for the surrounding UI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    CacheCleared(CacheCleared),
    Refreshing { item: ItemId, node_type: String },
}

#[derive(Debug, Clone)]
pub struct BrowserOptions {
    /// Open an item's only child when the item is opened
    pub auto_expand_sole_child: bool,
    /// Sibling count above which insertion narrows by binary search
    pub insertion_search_threshold: usize,
    pub cache_ttl_ms: i64,
}

impl Default for BrowserOptions {
    fn default() -> Self {
        BrowserOptions {
            auto_expand_sole_child: false,
            insertion_search_threshold: DEFAULT_SEARCH_THRESHOLD,
            cache_ttl_ms: STALE_AFTER_MS,
        }
    }
}

pub struct Browser {
    pub(crate) tree: Tree,
    pub(crate) registry: Arc<NodeTypeRegistry>,
    pub(crate) service: Arc<dyn NodeService>,
    pub(crate) caches: NodeCaches,
    pub(crate) tracker: Arc<Mutex<TreeStateTracker>>,
    pub(crate) options: BrowserOptions,
    notices: Vec<Notice>,
    pending_cache_clears: BTreeSet<String>,
    /// Last item a traversal or refresh stood on
    pub(crate) reached: Option<ItemId>,
}

impl Browser {
    pub fn new(
        registry: Arc<NodeTypeRegistry>,
        service: Arc<dyn NodeService>,
        tracker: Arc<Mutex<TreeStateTracker>>,
        options: BrowserOptions,
    ) -> Self {
        Self::with_clock(registry, service, tracker, options, Arc::new(SystemClock))
    }

    pub fn with_clock(
        registry: Arc<NodeTypeRegistry>,
        service: Arc<dyn NodeService>,
        tracker: Arc<Mutex<TreeStateTracker>>,
        options: BrowserOptions,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Browser {
            tree: Tree::new(),
            caches: NodeCaches::new(options.cache_ttl_ms, clock),
            registry,
            service,
            tracker,
            options,
            notices: Vec::new(),
            pending_cache_clears: BTreeSet::new(),
            reached: None,
        }
    }

    pub fn tree(&self) -> &Tree {
        &self.tree
    }

    pub fn registry(&self) -> &Arc<NodeTypeRegistry> {
        &self.registry
    }

    pub fn tracker(&self) -> &Arc<Mutex<TreeStateTracker>> {
        &self.tracker
    }

    pub fn caches(&self) -> &NodeCaches {
        &self.caches
    }

    pub fn hierarchy(&self, item: ItemId) -> TreeHierarchy {
        resolve(&self.tree, &self.registry, item)
    }

    pub fn take_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }

    pub(crate) fn notify(&mut self, notice: Notice) {
        self.notices.push(notice);
    }

    /// Dispatch one inbound event and settle the resulting tree events.
    pub async fn handle(&mut self, event: BrowserEvent) -> Result<MutationOutcome, TreeError> {
        self.reached = None;
        match event {
            BrowserEvent::Add {
                data,
                hierarchy,
                options,
            } => {
                let result = self.add_node(data.clone(), &hierarchy).await;
                options.finish(&result, &data, self.reached);
                result
            }
            BrowserEvent::Update {
                old,
                new,
                hierarchy,
                options,
            } => {
                let result = self.update_node(&old, new.clone(), &hierarchy).await;
                options.finish(&result, &new, self.reached);
                result
            }
            BrowserEvent::Refresh { item, options } => {
                let data = self.tree.require(item)?.clone();
                let result = self.refresh_node(item).await;
                let settled = self.flush_events().await;
                options.finish(&result, &data, self.reached);
                settled?;
                result
            }
            BrowserEvent::ExpandFromPreviousState(item) => {
                self.restore_item(item).await;
                self.flush_events().await?;
                Ok(MutationOutcome::Tracked)
            }
            BrowserEvent::RemoveFromTreeState(item) => {
                if let Some(tracked) = TrackedItem::capture(&self.tree, &self.registry, item) {
                    self.tracker.lock().remove_from_cache(&tracked);
                }
                Ok(MutationOutcome::Tracked)
            }
            BrowserEvent::UpdateTreeState(item) => {
                if let Some(tracked) = TrackedItem::capture(&self.tree, &self.registry, item) {
                    self.tracker.lock().update_cache(&tracked);
                }
                Ok(MutationOutcome::Tracked)
            }
        }
    }

    /// Load the top level of the tree.
    pub async fn load_root(&mut self) -> Result<(), TreeError> {
        self.ensure_loaded(None).await?;
        self.flush_events().await
    }

    /// Expand an item, loading its children first when needed.
    pub async fn open(&mut self, item: ItemId) -> Result<(), TreeError> {
        self.open_item(item).await?;
        self.flush_events().await
    }

    pub async fn close(&mut self, item: ItemId) -> Result<(), TreeError> {
        self.tree.close(item)?;
        self.flush_events().await
    }

    pub async fn select(&mut self, item: ItemId) -> Result<(), TreeError> {
        self.tree.select(item)?;
        self.flush_events().await
    }

    /// Fetch the children of `parent` unless already loaded.
    ///
    /// Returns `false` when the parent cannot be expanded (it needs a connection).
    pub(crate) async fn ensure_loaded(&mut self, parent: Option<ItemId>) -> Result<bool, TreeError> {
        if self.tree.was_loaded(parent) {
            return Ok(true);
        }

        let (request, hierarchy, level) = match parent {
            None => (
                ChildrenRequest {
                    url: self.registry.root_url(),
                    parent: None,
                },
                TreeHierarchy::new(),
                String::new(),
            ),
            Some(item) => {
                let data = self.tree.require(item)?;
                let node_type = self.registry.require(&data.node_type)?;
                if !node_type.can_expand(data) {
                    debug!(item = %item, node_type = %data.node_type, "Item cannot be expanded");
                    return Ok(false);
                }
                let hierarchy = self.hierarchy(item);
                let url = self.registry.generate_url(
                    &hierarchy,
                    &data.node_type,
                    &UrlAction::Children,
                    Some(&data.id),
                )?;
                let level = hierarchy
                    .leaf()
                    .map(|e| e.node_type.clone())
                    .unwrap_or_default();
                (
                    ChildrenRequest {
                        url,
                        parent: Some(data.tree_id()),
                    },
                    hierarchy,
                    level,
                )
            }
        };

        let cache_type = parent
            .and_then(|p| self.tree.data(p))
            .map(|d| d.node_type.clone())
            .unwrap_or_default();
        let cached = self
            .caches
            .get(&cache_type)
            .and_then(|c| c.get(&request.url, &hierarchy, &level))
            .cloned();

        let mut children = match cached {
            Some(children) => {
                debug!(url = %request.url, "Children served from cache");
                children
            }
            None => match self.service.list_children(&request).await {
                Ok(children) => {
                    self.caches
                        .for_type(&cache_type)
                        .put(&request.url, &hierarchy, &level, children.clone());
                    children
                }
                Err(e) => {
                    warn!(url = %request.url, error = %e, "Failed to load children");
                    if let Some(item) = parent {
                        self.tree.unload(item)?;
                    }
                    return Err(e);
                }
            },
        };

        let registry = Arc::clone(&self.registry);
        sort_children(&mut children, |t| {
            registry.get(t).map(|n| n.sort_by_id).unwrap_or(false)
        });
        debug!(url = %request.url, count = children.len(), "Loaded children");
        self.tree.load_children(parent, children)?;
        Ok(true)
    }

    /// Load if needed, then mark the item open. Does not settle events.
    pub(crate) async fn open_item(&mut self, item: ItemId) -> Result<bool, TreeError> {
        if !self.ensure_loaded(Some(item)).await? {
            return Ok(false);
        }
        self.tree.open(item)?;
        Ok(true)
    }

    /// Drop a type's cached results and announce it.
    pub(crate) fn clear_cache(&mut self, node_type: &str) {
        let cleared = self.caches.clear(node_type);
        self.notify(Notice::CacheCleared(cleared));
    }

    /// Ask the tracker whether `item` should come back open or selected, and apply it.
    pub(crate) async fn restore_item(&mut self, item: ItemId) {
        let Some(tracked) = TrackedItem::capture(&self.tree, &self.registry, item) else {
            return;
        };
        let plan = self.tracker.lock().expand_from_previous_state(&tracked);
        if plan.open {
            if let Err(e) = self.open_item(item).await {
                warn!(item = %item, error = %e, "Failed to restore open item");
            }
        }
        if plan.select && self.tree.contains(item) {
            if let Err(e) = self.tree.select(item) {
                warn!(item = %item, error = %e, "Failed to restore selection");
            }
        }
    }

    fn track(&self, item: ItemId) -> Option<TrackedItem> {
        TrackedItem::capture(&self.tree, &self.registry, item)
    }

    /// Dispatch queued tree events until the queue is empty.
    pub async fn flush_events(&mut self) -> Result<(), TreeError> {
        while let Some(event) = self.tree.pop_event() {
            match event {
                TreeEvent::Added { item, parent } => {
                    collection::child_added(&mut self.tree, &self.registry, parent);
                    self.restore_item(item).await;
                }
                TreeEvent::Removed { parent, data, .. } => {
                    collection::child_removed(&mut self.tree, &self.registry, parent);
                    let tracked = TrackedItem::detached(&self.tree, &self.registry, parent, &data);
                    self.tracker.lock().forget_item(&tracked);
                    if let Some(holder) = parent.and_then(|p| self.tree.data(p)) {
                        self.pending_cache_clears.insert(holder.node_type.clone());
                    }
                    self.pending_cache_clears.insert(data.node_type);
                }
                TreeEvent::Opened(item) => {
                    if let Some(tracked) = self.track(item) {
                        let is_top_level_bucket =
                            tracked.node_type == self.tracker.lock().parent_type();
                        self.tracker.lock().update_cache(&tracked);
                        if is_top_level_bucket {
                            self.restore_item(item).await;
                        }
                    }
                    if self.options.auto_expand_sole_child {
                        let sole = match self.tree.children(Some(item)) {
                            [only] if self.tree.is_inode(*only) => Some(*only),
                            _ => None,
                        };
                        if let Some(only) = sole {
                            if let Err(e) = self.open_item(only).await {
                                warn!(item = %only, error = %e, "Failed to expand sole child");
                            }
                        }
                    }
                }
                TreeEvent::Closed(item) => {
                    if let Some(tracked) = self.track(item) {
                        self.tracker.lock().remove_from_cache(&tracked);
                    }
                }
                TreeEvent::Selected(item) => {
                    if let Some(tracked) = self.track(item) {
                        self.tracker.lock().update_cache(&tracked);
                    }
                }
                TreeEvent::Unloaded(item) => {
                    collection::unloaded(&mut self.tree, &self.registry, item);
                }
            }
        }

        let pending: Vec<String> = std::mem::take(&mut self.pending_cache_clears)
            .into_iter()
            .collect();
        for node_type in pending {
            self.clear_cache(&node_type);
        }
        Ok(())
    }
}
