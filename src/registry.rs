//! Node Type Registry
//!
//! Static metadata for every node type the tree can show: where it sits in the object
//! hierarchy, whether it is a synthetic collection, how its API URLs are built and what
//! it is allowed to do. The registry is constructed once and handed to the resolver and
//! mutator by reference.

use crate::error::TreeError;
use crate::hierarchy::TreeHierarchy;
use crate::tree::node::NodeData;
use crate::types::ObjectId;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// Operation a node type supports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Capability {
    Create,
    Edit,
    Drop,
    Refresh,
}

fn default_capabilities() -> Vec<Capability> {
    vec![
        Capability::Create,
        Capability::Edit,
        Capability::Drop,
        Capability::Refresh,
    ]
}

fn default_true() -> bool {
    true
}

/// Metadata for one node type tag.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeType {
    /// Type tag, e.g. `table` or `coll-table`
    pub name: String,

    /// Human readable name
    #[serde(default)]
    pub label: String,

    /// Static nesting depth; larger is further from the root
    #[serde(default)]
    pub priority: i32,

    /// Types this node can be a child of
    #[serde(default)]
    pub parent_types: Vec<String>,

    /// Synthetic grouping node without its own server identity
    #[serde(default)]
    pub collection: bool,

    /// For collections: the object types grouped underneath
    #[serde(default)]
    pub child_types: Vec<String>,

    /// Siblings of this type are ordered by numeric `_id` instead of label
    #[serde(default)]
    pub sort_by_id: bool,

    /// Children can only be listed while the object reports `connected`
    #[serde(default)]
    pub requires_connection: bool,

    #[serde(default = "default_capabilities")]
    pub capabilities: Vec<Capability>,

    /// Whether the type participates in the hierarchy (collections never do)
    #[serde(default = "default_true")]
    pub has_id: bool,
}

impl NodeType {
    pub fn object(name: &str, label: &str, priority: i32, parents: &[&str]) -> Self {
        NodeType {
            name: name.to_string(),
            label: label.to_string(),
            priority,
            parent_types: parents.iter().map(|p| p.to_string()).collect(),
            collection: false,
            child_types: Vec::new(),
            sort_by_id: false,
            requires_connection: false,
            capabilities: default_capabilities(),
            has_id: true,
        }
    }

    pub fn collection_of(child: &NodeType, label: &str) -> Self {
        NodeType {
            name: format!("coll-{}", child.name),
            label: label.to_string(),
            priority: child.priority,
            parent_types: child.parent_types.clone(),
            collection: true,
            child_types: vec![child.name.clone()],
            sort_by_id: false,
            requires_connection: false,
            capabilities: vec![Capability::Create, Capability::Refresh],
            has_id: false,
        }
    }

    pub fn sorted_by_id(mut self) -> Self {
        self.sort_by_id = true;
        self
    }

    pub fn needing_connection(mut self) -> Self {
        self.requires_connection = true;
        self
    }

    pub fn supports(&self, capability: Capability) -> bool {
        self.capabilities.contains(&capability)
    }

    /// Whether this collection groups nodes of `node_type`.
    pub fn groups(&self, node_type: &str) -> bool {
        self.collection && self.child_types.iter().any(|t| t == node_type)
    }

    /// Whether an item of this type may be expanded given its current data.
    pub fn can_expand(&self, data: &NodeData) -> bool {
        !self.requires_connection || data.connected.unwrap_or(false)
    }
}

/// API action a URL is generated for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UrlAction {
    /// List the children of an item
    Children,
    /// Fetch an item's own tree representation
    Nodes,
    Properties,
    Create,
    Edit,
    Drop,
    Statistics,
    Other(String),
}

impl UrlAction {
    /// Parse an action name; unknown names address a custom endpoint segment.
    pub fn parse(name: &str) -> Self {
        match name {
            "children" => UrlAction::Children,
            "nodes" => UrlAction::Nodes,
            "properties" | "obj" => UrlAction::Properties,
            "create" => UrlAction::Create,
            "edit" => UrlAction::Edit,
            "drop" | "delete" => UrlAction::Drop,
            "statistics" | "stats" => UrlAction::Statistics,
            other => UrlAction::Other(other.to_string()),
        }
    }

    fn segment(&self) -> &str {
        match self {
            UrlAction::Children => "children",
            UrlAction::Nodes => "nodes",
            UrlAction::Properties | UrlAction::Create | UrlAction::Edit | UrlAction::Drop => "obj",
            UrlAction::Statistics => "stats",
            UrlAction::Other(name) => name,
        }
    }
}

#[derive(Debug, Deserialize)]
struct RegistryFile {
    #[serde(default)]
    url_prefix: Option<String>,
    #[serde(rename = "node_type", default)]
    node_types: Vec<NodeType>,
}

/// Registry of node types, keyed by type tag.
#[derive(Debug, Clone)]
pub struct NodeTypeRegistry {
    types: HashMap<String, NodeType>,
    url_prefix: String,
}

impl Default for NodeTypeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl NodeTypeRegistry {
    /// Create an empty registry using the `/browser/` URL prefix
    pub fn new() -> Self {
        NodeTypeRegistry {
            types: HashMap::new(),
            url_prefix: "/browser/".to_string(),
        }
    }

    pub fn with_url_prefix(mut self, prefix: impl Into<String>) -> Self {
        let mut prefix = prefix.into();
        if !prefix.ends_with('/') {
            prefix.push('/');
        }
        self.url_prefix = prefix;
        self
    }

    pub fn url_prefix(&self) -> &str {
        &self.url_prefix
    }

    /// Built-in hierarchy of a PostgreSQL server tree.
    pub fn postgres() -> Self {
        let mut registry = Self::new();

        let server_group = NodeType::object("server_group", "Server Group", 1, &[]);
        let server = NodeType::object("server", "Server", 2, &["server_group"]);
        let database =
            NodeType::object("database", "Database", 3, &["server"]).needing_connection();
        let role = NodeType::object("role", "Login/Group Role", 3, &["server"]);
        let tablespace = NodeType::object("tablespace", "Tablespace", 3, &["server"]);
        let schema = NodeType::object("schema", "Schema", 4, &["database"]);
        let extension = NodeType::object("extension", "Extension", 4, &["database"]);
        let table = NodeType::object("table", "Table", 5, &["schema"]);
        let view = NodeType::object("view", "View", 5, &["schema"]);
        let sequence = NodeType::object("sequence", "Sequence", 5, &["schema"]);
        let function = NodeType::object("function", "Function", 5, &["schema"]);
        let column = NodeType::object("column", "Column", 6, &["table", "view"]).sorted_by_id();
        let index = NodeType::object("index", "Index", 6, &["table"]);
        let trigger = NodeType::object("trigger", "Trigger", 6, &["table"]);

        for (node, coll_label) in [
            (&database, "Databases"),
            (&role, "Login/Group Roles"),
            (&tablespace, "Tablespaces"),
            (&schema, "Schemas"),
            (&extension, "Extensions"),
            (&table, "Tables"),
            (&view, "Views"),
            (&sequence, "Sequences"),
            (&function, "Functions"),
            (&column, "Columns"),
            (&index, "Indexes"),
            (&trigger, "Triggers"),
        ] {
            registry.register(NodeType::collection_of(node, coll_label));
        }

        for node in [
            server_group,
            server,
            database,
            role,
            tablespace,
            schema,
            extension,
            table,
            view,
            sequence,
            function,
            column,
            index,
            trigger,
        ] {
            registry.register(node);
        }

        registry
    }

    /// Parse a registry from TOML (`[[node_type]]` tables).
    pub fn from_toml_str(content: &str) -> Result<Self, TreeError> {
        let file: RegistryFile = toml::from_str(content)
            .map_err(|e| TreeError::ConfigError(format!("Invalid node type registry: {}", e)))?;

        let mut registry = Self::new();
        if let Some(prefix) = file.url_prefix {
            registry = registry.with_url_prefix(prefix);
        }
        for node_type in file.node_types {
            if node_type.name.trim().is_empty() {
                return Err(TreeError::ConfigError(
                    "Node type name cannot be empty".to_string(),
                ));
            }
            registry.register(node_type);
        }
        registry.validate()?;
        Ok(registry)
    }

    pub fn load_from_file(path: &Path) -> Result<Self, TreeError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            TreeError::ConfigError(format!(
                "Failed to read node type registry {}: {}",
                path.display(),
                e
            ))
        })?;
        Self::from_toml_str(&content)
    }

    /// Check that every referenced parent and child type is registered.
    pub fn validate(&self) -> Result<(), TreeError> {
        for node_type in self.types.values() {
            for referenced in node_type.parent_types.iter().chain(&node_type.child_types) {
                if !self.types.contains_key(referenced) {
                    return Err(TreeError::ConfigError(format!(
                        "Node type '{}' references unknown type '{}'",
                        node_type.name, referenced
                    )));
                }
            }
        }
        Ok(())
    }

    pub fn register(&mut self, node_type: NodeType) {
        self.types.insert(node_type.name.clone(), node_type);
    }

    pub fn get(&self, name: &str) -> Option<&NodeType> {
        self.types.get(name)
    }

    pub fn require(&self, name: &str) -> Result<&NodeType, TreeError> {
        self.get(name)
            .ok_or_else(|| TreeError::UnknownNodeType(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.types.contains_key(name)
    }

    pub fn is_collection(&self, name: &str) -> bool {
        self.get(name).map(|t| t.collection).unwrap_or(false)
    }

    /// Whether `collection` is a registered collection grouping `node_type`.
    pub fn is_collection_of(&self, collection: &str, node_type: &str) -> bool {
        self.get(collection)
            .map(|t| t.groups(node_type))
            .unwrap_or(false)
    }

    /// URL listing the top level of the tree
    pub fn root_url(&self) -> String {
        format!("{}nodes/", self.url_prefix)
    }

    /// Build the API URL for `action` on a node of `node_type`.
    ///
    /// Object types pick every hierarchy entry at or above their nearest declared parent and
    /// append `item_id` when given. Collections address their grouped child type and pick
    /// the whole hierarchy.
    pub fn generate_url(
        &self,
        hierarchy: &TreeHierarchy,
        node_type: &str,
        action: &UrlAction,
        item_id: Option<&ObjectId>,
    ) -> Result<String, TreeError> {
        let node = self.require(node_type)?;

        if node.collection {
            let target = node.child_types.first().ok_or_else(|| {
                TreeError::ConfigError(format!("Collection '{}' declares no child type", node.name))
            })?;
            let segment = match action {
                UrlAction::Children => "nodes",
                UrlAction::Properties => "obj",
                other => other.segment(),
            };
            let mut reference = String::new();
            for entry in hierarchy.ordered() {
                reference.push('/');
                reference.push_str(&urlencoding::encode(entry.id.as_str()));
            }
            reference.push('/');
            return Ok(format!("{}{}/{}{}", self.url_prefix, target, segment, reference));
        }

        let parent_priority = node
            .parent_types
            .iter()
            .filter_map(|p| hierarchy.get(p).map(|entry| entry.priority))
            .max();

        let mut reference = String::new();
        if let Some(max_priority) = parent_priority {
            for entry in hierarchy.ordered() {
                if entry.priority <= max_priority {
                    reference.push('/');
                    reference.push_str(&urlencoding::encode(entry.id.as_str()));
                }
            }
        }
        match item_id {
            Some(id) => {
                reference.push('/');
                reference.push_str(&urlencoding::encode(id.as_str()));
            }
            None => reference.push('/'),
        }

        Ok(format!(
            "{}{}/{}{}",
            self.url_prefix,
            node.name,
            action.segment(),
            reference
        ))
    }
}
