//! Tree State Persistence
//!
//! Which branches are expanded and which items are selected, bucketed per top-level
//! ancestor (a server), tracked from tree events and periodically saved to a store.

pub mod persistence;
pub mod sled_store;
pub mod store;
pub mod tracker;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub use persistence::{save_interval, TreeStatePersistence};
pub use sled_store::SledStateStore;
pub use store::{HttpStateStore, MemoryStateStore, StateStore};
pub use tracker::{RestorePlan, TrackedItem, TreeStateTracker};

/// Separator between tree ids in a path chain.
pub const PATH_SEPARATOR: char = ',';

/// Saved state of one top-level ancestor.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeState {
    /// Open chains of tree ids, comma joined, one per distinct open branch
    #[serde(default)]
    pub paths: Vec<String>,

    /// Selected tree id keyed by the server's or database's tree id
    #[serde(default)]
    pub selected: BTreeMap<String, String>,

    /// Database tree id to 1 (connected) or 0
    #[serde(default)]
    pub conn_status: BTreeMap<String, u8>,

    /// Database tree id to 1 (expanded) or 0
    #[serde(default)]
    pub is_opened: BTreeMap<String, u8>,
}

/// State document keyed by top-level ancestor id.
pub type StateMap = BTreeMap<String, TreeState>;

pub(crate) fn split_chain(chain: &str) -> Vec<&str> {
    chain.split(PATH_SEPARATOR).filter(|s| !s.is_empty()).collect()
}

pub(crate) fn join_chain<S: AsRef<str>>(ids: &[S]) -> String {
    ids.iter()
        .map(|s| s.as_ref())
        .collect::<Vec<_>>()
        .join(&PATH_SEPARATOR.to_string())
}
