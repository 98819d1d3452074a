//! Node payload attached to every tree item, and the label it renders to.

use crate::types::ObjectId;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// NodeData: the server's description of one object in the tree.
///
/// `label` holds the unescaped source text (`_label`). The displayed text is never stored;
/// it is derived on demand with [`render_label`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawNodeData")]
pub struct NodeData {
    #[serde(rename = "_id")]
    pub id: ObjectId,

    #[serde(rename = "_type")]
    pub node_type: String,

    #[serde(rename = "_label")]
    pub label: String,

    #[serde(rename = "_pid", skip_serializing_if = "Option::is_none")]
    pub pid: Option<ObjectId>,

    /// Widget-level identifier (e.g. `table_16390`), when the server provides one
    #[serde(rename = "id", skip_serializing_if = "Option::is_none")]
    pub tree_id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,

    /// Whether the item may have children
    pub inode: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub connected: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub collection_count: Option<u32>,

    /// Type specific attributes the engine does not interpret
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Wire shape: the server sends `label`, a re-serialized node carries `_label`.
#[derive(Deserialize)]
struct RawNodeData {
    #[serde(rename = "_id")]
    id: ObjectId,
    #[serde(rename = "_type")]
    node_type: String,
    #[serde(rename = "_label", default)]
    source_label: Option<String>,
    #[serde(default)]
    label: Option<String>,
    #[serde(rename = "_pid", default)]
    pid: Option<ObjectId>,
    #[serde(rename = "id", default)]
    tree_id: Option<String>,
    #[serde(default)]
    icon: Option<String>,
    #[serde(default)]
    inode: bool,
    #[serde(default)]
    connected: Option<bool>,
    #[serde(default)]
    collection_count: Option<u32>,
    #[serde(flatten)]
    extra: Map<String, Value>,
}

impl From<RawNodeData> for NodeData {
    fn from(raw: RawNodeData) -> Self {
        NodeData {
            id: raw.id,
            node_type: raw.node_type,
            label: raw.source_label.or(raw.label).unwrap_or_default(),
            pid: raw.pid,
            tree_id: raw.tree_id,
            icon: raw.icon,
            inode: raw.inode,
            connected: raw.connected,
            collection_count: raw.collection_count,
            extra: raw.extra,
        }
    }
}

impl NodeData {
    pub fn new(node_type: impl Into<String>, id: impl Into<ObjectId>, label: impl Into<String>) -> Self {
        NodeData {
            id: id.into(),
            node_type: node_type.into(),
            label: label.into(),
            pid: None,
            tree_id: None,
            icon: None,
            inode: false,
            connected: None,
            collection_count: None,
            extra: Map::new(),
        }
    }

    pub fn with_parent(mut self, pid: impl Into<ObjectId>) -> Self {
        self.pid = Some(pid.into());
        self
    }

    pub fn with_inode(mut self, inode: bool) -> Self {
        self.inode = inode;
        self
    }

    pub fn with_connected(mut self, connected: bool) -> Self {
        self.connected = Some(connected);
        self
    }

    pub fn with_icon(mut self, icon: impl Into<String>) -> Self {
        self.icon = Some(icon.into());
        self
    }

    /// Identifier used in persisted path chains.
    pub fn tree_id(&self) -> String {
        match &self.tree_id {
            Some(id) if !id.is_empty() => id.clone(),
            _ => format!("{}_{}", self.node_type, self.id),
        }
    }

    /// Whether this node denotes the same server object as `node_type`/`id`.
    pub fn is(&self, node_type: &str, id: &ObjectId) -> bool {
        self.node_type == node_type && &self.id == id
    }

    /// Copy the server-provided fields of `newer` onto this node.
    ///
    /// The collection count is tree-local state and survives the patch.
    pub fn apply(&mut self, newer: &NodeData) {
        self.id = newer.id.clone();
        self.label = newer.label.clone();
        if newer.pid.is_some() {
            self.pid = newer.pid.clone();
        }
        if newer.tree_id.is_some() {
            self.tree_id = newer.tree_id.clone();
        }
        if newer.icon.is_some() {
            self.icon = newer.icon.clone();
        }
        if newer.inode {
            self.inode = true;
        }
        if newer.connected.is_some() {
            self.connected = newer.connected;
        }
        for (key, value) in &newer.extra {
            self.extra.insert(key.clone(), value.clone());
        }
    }
}

/// Displayed label: the HTML-escaped source label, followed by ` (count)` for a counted
/// collection. The count is appended after escaping.
pub fn render_label(data: &NodeData) -> String {
    let escaped = html_escape::encode_quoted_attribute(&data.label);
    match data.collection_count {
        Some(count) => format!("{} ({})", escaped, count),
        None => escaped.into_owned(),
    }
}
