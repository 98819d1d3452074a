//! Shared fixtures: a small PostgreSQL tree served from memory.

use parking_lot::Mutex;
use std::sync::Arc;
use treesync::hierarchy::{HierarchyEntry, TreeHierarchy};
use treesync::service::MemoryNodeService;
use treesync::state::TreeStateTracker;
use treesync::tooling::script::open_path;
use treesync::{Browser, BrowserOptions, ItemId, NodeData, NodeTypeRegistry, ObjectId};

pub const SCHEMAS_PATH: [&str; 5] = [
    "server_group_1",
    "server_3",
    "coll-database_3",
    "database_16384",
    "coll-schema_16384",
];

pub fn table(id: i64, label: &str, schema: i64) -> NodeData {
    NodeData::new("table", id, label).with_parent(schema)
}

/// Servers > local > Databases > shop > Schemas > {public (10), sales (20)} > Tables
pub fn fixture() -> Arc<MemoryNodeService> {
    let service = MemoryNodeService::new();
    service.set_children(
        None,
        vec![NodeData::new("server_group", 1, "Servers").with_inode(true)],
    );
    service.set_children(
        Some("server_group_1"),
        vec![NodeData::new("server", 3, "local")
            .with_parent(1)
            .with_inode(true)
            .with_connected(true)],
    );
    service.set_children(
        Some("server_3"),
        vec![NodeData::new("coll-database", 3, "Databases").with_inode(true)],
    );
    service.set_children(
        Some("coll-database_3"),
        vec![NodeData::new("database", 16384, "shop")
            .with_parent(3)
            .with_inode(true)
            .with_connected(true)],
    );
    service.set_children(
        Some("database_16384"),
        vec![NodeData::new("coll-schema", 16384, "Schemas").with_inode(true)],
    );
    service.set_children(
        Some("coll-schema_16384"),
        vec![
            NodeData::new("schema", 10, "public").with_parent(16384).with_inode(true),
            NodeData::new("schema", 20, "sales").with_parent(16384).with_inode(true),
        ],
    );
    service.set_children(
        Some("schema_10"),
        vec![NodeData::new("coll-table", 10, "Tables").with_inode(true)],
    );
    service.set_children(
        Some("coll-table_10"),
        vec![
            table(3, "products", 10),
            table(1, "customers", 10),
            table(2, "invoices", 10),
        ],
    );
    service.set_children(
        Some("schema_20"),
        vec![NodeData::new("coll-table", 20, "Tables").with_inode(true)],
    );
    service.set_children(Some("coll-table_20"), vec![table(30, "archive", 20)]);
    Arc::new(service)
}

pub fn tracker() -> Arc<Mutex<TreeStateTracker>> {
    Arc::new(Mutex::new(TreeStateTracker::default()))
}

pub async fn browser_with(
    service: Arc<MemoryNodeService>,
    tracker: Arc<Mutex<TreeStateTracker>>,
    options: BrowserOptions,
) -> Browser {
    let mut browser = Browser::new(
        Arc::new(NodeTypeRegistry::postgres()),
        service,
        tracker,
        options,
    );
    browser.load_root().await.unwrap();
    browser
}

pub async fn browser_with_registry(
    service: Arc<MemoryNodeService>,
    registry: NodeTypeRegistry,
) -> Browser {
    let mut browser = Browser::new(
        Arc::new(registry),
        service,
        tracker(),
        BrowserOptions::default(),
    );
    browser.load_root().await.unwrap();
    browser
}

pub async fn browser(service: Arc<MemoryNodeService>) -> Browser {
    browser_with(service, tracker(), BrowserOptions::default()).await
}

/// Open every item along `path` (tree ids from the top level) and return the last one.
pub async fn open(browser: &mut Browser, path: &[&str]) -> ItemId {
    let path: Vec<String> = path.iter().map(|s| s.to_string()).collect();
    let item = open_path(browser, &path).await.unwrap();
    browser.open(item).await.unwrap();
    item
}

/// Open the Tables collection of schema `schema`.
pub async fn open_tables(browser: &mut Browser, schema: i64) -> ItemId {
    let mut path = SCHEMAS_PATH.to_vec();
    let schema_id = format!("schema_{}", schema);
    let tables_id = format!("coll-table_{}", schema);
    path.push(&schema_id);
    path.push(&tables_id);
    open(browser, &path).await
}

/// Item reached by following tree ids through already loaded items.
pub fn find(browser: &Browser, path: &[&str]) -> Option<ItemId> {
    let mut parent = None;
    for tree_id in path {
        parent = Some(
            browser
                .tree()
                .find_child(parent, |d| d.tree_id() == *tree_id)?,
        );
    }
    parent
}

pub fn labels(browser: &Browser, parent: ItemId) -> Vec<String> {
    browser
        .tree()
        .children(Some(parent))
        .iter()
        .filter_map(|c| browser.tree().data(*c))
        .map(|d| d.label.clone())
        .collect()
}

/// Hierarchy of an object living in schema `schema`.
pub fn schema_hierarchy(schema: i64) -> TreeHierarchy {
    let registry = NodeTypeRegistry::postgres();
    [
        ("server_group", 1),
        ("server", 3),
        ("database", 16384),
        ("schema", schema),
    ]
    .into_iter()
    .map(|(node_type, id)| HierarchyEntry::new(&registry, node_type, ObjectId::from(id)))
    .collect()
}
