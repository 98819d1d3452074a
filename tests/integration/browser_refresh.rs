use crate::support::{
    browser, browser_with_registry, find, fixture, labels, open_tables, table, SCHEMAS_PATH,
};
use treesync::registry::{Capability, NodeTypeRegistry};
use treesync::{BrowserEvent, EventOptions, MutationOutcome, NodeData, Notice, TreeError};

fn schema_path(schema: &str) -> Vec<&str> {
    let mut path = SCHEMAS_PATH.to_vec();
    path.push(schema);
    path
}

#[tokio::test]
async fn refresh_reopens_previously_open_branches() {
    let service = fixture();
    let mut browser = browser(service.clone()).await;
    open_tables(&mut browser, 10).await;
    let schema = find(&browser, &schema_path("schema_10")).unwrap();

    service.replace_node("table_1", table(1, "clients", 10));
    let outcome = browser.refresh(schema).await.unwrap();
    assert_eq!(outcome, MutationOutcome::Refreshed(schema));

    assert!(browser.tree().is_open(schema));
    let mut path = schema_path("schema_10");
    path.push("coll-table_10");
    let tables = find(&browser, &path).unwrap();
    assert!(browser.tree().is_open(tables));
    assert_eq!(labels(&browser, tables), ["clients", "invoices", "products"]);
    assert_eq!(browser.tree().data(tables).unwrap().collection_count, Some(3));
}

#[tokio::test]
async fn refresh_applies_new_node_data() {
    let service = fixture();
    let mut browser = browser(service.clone()).await;
    open_tables(&mut browser, 10).await;
    let schema = find(&browser, &schema_path("schema_20")).unwrap();

    service.replace_node(
        "schema_20",
        treesync::NodeData::new("schema", 20, "sales_eu")
            .with_parent(16384)
            .with_inode(true),
    );
    browser.refresh(schema).await.unwrap();

    assert_eq!(browser.tree().data(schema).unwrap().label, "sales_eu");
    assert!(!browser.tree().is_open(schema));
}

#[tokio::test]
async fn gone_node_is_removed_and_reported() {
    let service = fixture();
    let mut browser = browser(service.clone()).await;
    let tables = open_tables(&mut browser, 10).await;
    let customers = browser
        .tree()
        .find_child(Some(tables), |d| d.label == "customers")
        .unwrap();

    let schema = browser.tree().parent(tables).unwrap();

    service.mark_gone("table_1");
    let (tx, rx) = std::sync::mpsc::channel();
    let result = browser
        .handle(BrowserEvent::Refresh {
            item: customers,
            options: EventOptions::default().on_fail(move |item, data: &NodeData| {
                let _ = tx.send((item, data.label.clone()));
            }),
        })
        .await;

    assert!(result.unwrap_err().is_gone());
    let (reached, label) = rx.try_recv().unwrap();
    assert_eq!(reached, Some(schema));
    assert_eq!(label, "customers");
    assert!(!browser.tree().contains(customers));

    let mut path = schema_path("schema_10");
    path.push("coll-table_10");
    let tables = find(&browser, &path).unwrap();
    assert_eq!(labels(&browser, tables), ["invoices", "products"]);
}

#[tokio::test]
async fn collection_refresh_goes_through_its_parent() {
    let mut browser = browser(fixture()).await;
    let tables = open_tables(&mut browser, 10).await;
    let schema = browser.tree().parent(tables).unwrap();
    browser.take_notices();

    let outcome = browser.refresh(tables).await.unwrap();

    assert_eq!(outcome, MutationOutcome::Refreshed(schema));
    assert!(browser.take_notices().contains(&Notice::Refreshing {
        item: tables,
        node_type: "coll-table".to_string(),
    }));
}

#[tokio::test]
async fn failed_refresh_unloads_the_node() {
    let service = fixture();
    let mut browser = browser(service.clone()).await;
    open_tables(&mut browser, 10).await;
    let schema = find(&browser, &schema_path("schema_10")).unwrap();

    service.fail_children(Some("schema_10"));
    let err = browser.refresh(schema).await.unwrap_err();

    assert!(!err.is_gone());
    assert!(!browser.tree().was_loaded(Some(schema)));
}

#[tokio::test]
async fn refresh_is_refused_for_types_without_the_capability() {
    let mut registry = NodeTypeRegistry::postgres();
    let mut table_type = registry.require("table").unwrap().clone();
    table_type.capabilities.retain(|c| *c != Capability::Refresh);
    registry.register(table_type);

    let service = fixture();
    let mut browser = browser_with_registry(service.clone(), registry).await;
    let tables = open_tables(&mut browser, 10).await;
    let customers = browser.tree().children(Some(tables))[0];
    let calls = service.calls();
    browser.take_notices();

    let err = browser.refresh(customers).await.unwrap_err();

    assert!(matches!(err, TreeError::Unsupported { ref node_type, .. } if node_type == "table"));
    assert_eq!(service.calls(), calls);
    assert!(browser.take_notices().is_empty());
    assert!(browser.refresh(tables).await.is_ok());
}
