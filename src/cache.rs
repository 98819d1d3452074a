//! Node Result Cache
//!
//! Per node-type cache of fetched results, keyed by request URL plus the ids of the
//! hierarchy entries at or above the requested scope. Entries go stale after a fixed window;
//! staleness is checked on read and stale entries are left in place.

use crate::hierarchy::TreeHierarchy;
use crate::tree::NodeData;
use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use tracing::debug;

/// Milliseconds after which a cached result is treated as absent.
pub const STALE_AFTER_MS: i64 = 300_000;

/// Millisecond wall clock.
pub trait Clock: Send + Sync {
    fn now_ms(&self) -> i64;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> i64 {
        chrono::Utc::now().timestamp_millis()
    }
}

/// Clock that only moves when told to.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicI64,
}

impl ManualClock {
    pub fn new(start_ms: i64) -> Self {
        ManualClock {
            now: AtomicI64::new(start_ms),
        }
    }

    pub fn advance(&self, ms: i64) {
        self.now.fetch_add(ms, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> i64 {
        self.now.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone)]
pub struct CacheEntry<T> {
    pub data: T,
    /// Write time in milliseconds
    pub at: i64,
    /// Type tag of the scope the entry was stored under
    pub level: String,
}

/// Emitted when a node type's cache is dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheCleared {
    pub node_type: String,
}

/// Build the cache key for `url` scoped at `level`.
///
/// Appends `/id` for every hierarchy entry whose priority is at most the priority of the
/// `level` entry, shallowest first. An unknown level scopes to the URL alone.
pub fn cache_key(url: &str, hierarchy: &TreeHierarchy, level: &str) -> String {
    let mut key = url.to_string();
    let Some(max_priority) = hierarchy.get(level).map(|e| e.priority) else {
        return key;
    };
    for entry in hierarchy.ordered() {
        if entry.priority <= max_priority {
            key.push('/');
            key.push_str(&urlencoding::encode(entry.id.as_str()));
        }
    }
    key
}

/// Cache for one node type.
pub struct NodeResultCache<T = Vec<NodeData>> {
    node_type: String,
    entries: HashMap<String, CacheEntry<T>>,
    ttl_ms: i64,
    clock: Arc<dyn Clock>,
}

impl<T: Clone> NodeResultCache<T> {
    pub fn new(node_type: impl Into<String>, ttl_ms: i64, clock: Arc<dyn Clock>) -> Self {
        NodeResultCache {
            node_type: node_type.into(),
            entries: HashMap::new(),
            ttl_ms,
            clock,
        }
    }

    pub fn node_type(&self) -> &str {
        &self.node_type
    }

    /// Fresh data for the key, or `None` when absent or stale.
    pub fn get(&self, url: &str, hierarchy: &TreeHierarchy, level: &str) -> Option<&T> {
        let key = cache_key(url, hierarchy, level);
        let entry = self.entries.get(&key)?;
        let age = self.clock.now_ms() - entry.at;
        if age > self.ttl_ms {
            debug!(node_type = %self.node_type, key = %key, age_ms = age, "Stale cache entry");
            return None;
        }
        Some(&entry.data)
    }

    /// Store `data`, replacing any previous entry and its timestamp.
    pub fn put(&mut self, url: &str, hierarchy: &TreeHierarchy, level: &str, data: T) -> &CacheEntry<T> {
        let key = cache_key(url, hierarchy, level);
        let entry = CacheEntry {
            data,
            at: self.clock.now_ms(),
            level: level.to_string(),
        };
        self.entries.insert(key.clone(), entry);
        &self.entries[&key]
    }

    /// Drop every entry of this node type.
    pub fn clear(&mut self) -> CacheCleared {
        self.entries.clear();
        debug!(node_type = %self.node_type, "Node cache cleared");
        CacheCleared {
            node_type: self.node_type.clone(),
        }
    }

    /// Number of stored entries, stale ones included.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// The set of per-type caches owned by a browser.
pub struct NodeCaches {
    caches: HashMap<String, NodeResultCache>,
    ttl_ms: i64,
    clock: Arc<dyn Clock>,
}

impl NodeCaches {
    pub fn new(ttl_ms: i64, clock: Arc<dyn Clock>) -> Self {
        NodeCaches {
            caches: HashMap::new(),
            ttl_ms,
            clock,
        }
    }

    pub fn get(&self, node_type: &str) -> Option<&NodeResultCache> {
        self.caches.get(node_type)
    }

    pub fn for_type(&mut self, node_type: &str) -> &mut NodeResultCache {
        let ttl_ms = self.ttl_ms;
        let clock = self.clock.clone();
        self.caches
            .entry(node_type.to_string())
            .or_insert_with(|| NodeResultCache::new(node_type, ttl_ms, clock))
    }

    /// Clear one type's cache. A type that never cached anything still reports the clear.
    pub fn clear(&mut self, node_type: &str) -> CacheCleared {
        self.for_type(node_type).clear()
    }
}

impl Default for NodeCaches {
    fn default() -> Self {
        Self::new(STALE_AFTER_MS, Arc::new(SystemClock))
    }
}
