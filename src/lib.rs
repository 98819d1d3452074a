//! treesync: incremental object-tree synchronization
//!
//! Keeps a lazily loaded, ordered tree of database objects consistent with server-side
//! changes without reloading it, and persists which branches were expanded and selected
//! across sessions.

pub mod browser;
pub mod cache;
pub mod collection;
pub mod config;
pub mod error;
pub mod hierarchy;
pub mod logging;
pub mod mutator;
pub mod registry;
pub mod service;
pub mod state;
pub mod tooling;
pub mod tree;
pub mod types;

pub use browser::{Browser, BrowserEvent, BrowserOptions, EventOptions, Notice};
pub use error::{StorageError, TreeError};
pub use hierarchy::{HierarchyEntry, TreeHierarchy};
pub use mutator::MutationOutcome;
pub use registry::{NodeType, NodeTypeRegistry, UrlAction};
pub use tree::{NodeData, Tree, TreeEvent};
pub use types::{ItemId, ObjectId};
