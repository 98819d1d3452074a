//! Node services
//!
//! The remote side of the tree: listing an item's children and fetching an item's own
//! representation. The browser only talks to the trait; the HTTP client targets a live
//! console backend, the memory service serves fixtures.

pub mod http;
pub mod memory;

use crate::error::TreeError;
use crate::tree::NodeData;
use crate::types::ObjectId;
use async_trait::async_trait;

pub use http::HttpNodeService;
pub use memory::MemoryNodeService;

/// Request for the children of an item (or of the top level).
#[derive(Debug, Clone, PartialEq)]
pub struct ChildrenRequest {
    pub url: String,
    /// Tree id of the parent; `None` for the top level
    pub parent: Option<String>,
}

/// Request for one item's own tree representation.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeRequest {
    pub url: String,
    pub tree_id: String,
    pub node_type: String,
    pub id: ObjectId,
}

#[async_trait]
pub trait NodeService: Send + Sync {
    async fn list_children(&self, request: &ChildrenRequest) -> Result<Vec<NodeData>, TreeError>;

    /// A node that no longer exists fails with [`TreeError::Gone`].
    async fn fetch_node(&self, request: &NodeRequest) -> Result<NodeData, TreeError>;
}
