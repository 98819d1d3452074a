//! Error types for tree synchronization and tree-state storage.

use crate::types::{ItemId, ObjectId};
use thiserror::Error;

/// Errors raised by state-store backends.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Sled error: {0}")]
    Sled(#[from] sled::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid stored state: {0}")]
    InvalidState(String),
}

/// Errors surfaced by the tree mutator, services and persistence.
#[derive(Debug, Error)]
pub enum TreeError {
    #[error("Unknown node type: {0}")]
    UnknownNodeType(String),

    #[error("Tree item not found: {0}")]
    ItemNotFound(ItemId),

    #[error("Node {node_type}/{id} not found in tree")]
    NodeNotFound { node_type: String, id: ObjectId },

    #[error("Object no longer exists on the server: {0}")]
    Gone(String),

    #[error("Server returned {status}: {message}")]
    Server { status: u16, message: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Operation '{operation}' is not supported by node type {node_type}")]
    Unsupported { operation: String, node_type: String },
}

impl TreeError {
    pub fn node_not_found(node_type: impl Into<String>, id: &ObjectId) -> Self {
        TreeError::NodeNotFound {
            node_type: node_type.into(),
            id: id.clone(),
        }
    }

    /// True when the server reported the object as gone (HTTP 410).
    pub fn is_gone(&self) -> bool {
        matches!(self, TreeError::Gone(_))
    }
}

impl From<config::ConfigError> for TreeError {
    fn from(err: config::ConfigError) -> Self {
        TreeError::ConfigError(err.to_string())
    }
}
