use crate::support::{browser, fixture, labels, open_tables, schema_hierarchy, table};
use treesync::{MutationOutcome, Notice, ObjectId};

#[tokio::test]
async fn removed_node_hands_selection_to_next_sibling() {
    let mut browser = browser(fixture()).await;
    let tables = open_tables(&mut browser, 10).await;

    let outcome = browser
        .remove_node(&table(2, "invoices", 10), &schema_hierarchy(10))
        .await
        .unwrap();

    assert!(matches!(outcome, MutationOutcome::Removed(_)));
    assert_eq!(labels(&browser, tables), ["customers", "products"]);
    let selected = browser.tree().selected().unwrap();
    assert_eq!(browser.tree().data(selected).unwrap().label, "products");
    assert_eq!(browser.tree().data(tables).unwrap().collection_count, Some(2));
}

#[tokio::test]
async fn removing_last_child_selects_parent() {
    let mut browser = browser(fixture()).await;
    let tables = open_tables(&mut browser, 20).await;

    browser
        .remove_node(&table(30, "archive", 20), &schema_hierarchy(20))
        .await
        .unwrap();

    assert!(labels(&browser, tables).is_empty());
    assert_eq!(browser.tree().selected(), Some(tables));
    assert_eq!(browser.tree().data(tables).unwrap().collection_count, Some(0));
}

#[tokio::test]
async fn removal_clears_caches_after_settling() {
    let mut browser = browser(fixture()).await;
    open_tables(&mut browser, 10).await;
    browser.take_notices();

    browser
        .remove_node(&table(1, "customers", 10), &schema_hierarchy(10))
        .await
        .unwrap();

    let cleared: Vec<String> = browser
        .take_notices()
        .into_iter()
        .filter_map(|n| match n {
            Notice::CacheCleared(c) => Some(c.node_type),
            _ => None,
        })
        .collect();
    assert_eq!(cleared, ["coll-table", "table"]);
}

#[tokio::test]
async fn hidden_node_removal_is_deferred() {
    let service = fixture();
    let mut browser = browser(service.clone()).await;
    let calls = service.calls();

    let outcome = browser
        .remove_node(&table(1, "customers", 10), &schema_hierarchy(10))
        .await
        .unwrap();

    assert_eq!(outcome, MutationOutcome::Deferred);
    assert_eq!(service.calls(), calls);
}

#[tokio::test]
async fn children_removed_by_id() {
    let mut browser = browser(fixture()).await;
    let tables = open_tables(&mut browser, 10).await;

    let removed = browser
        .remove_child_tree_nodes_by_id(
            Some(tables),
            "table",
            &[ObjectId::from(1), ObjectId::from(3), ObjectId::from(99)],
        )
        .unwrap();
    browser.flush_events().await.unwrap();

    assert_eq!(removed, 2);
    assert_eq!(labels(&browser, tables), ["invoices"]);
    assert_eq!(browser.tree().data(tables).unwrap().collection_count, Some(1));
}

#[tokio::test]
async fn lookups_find_relatives() {
    let mut browser = browser(fixture()).await;
    let tables = open_tables(&mut browser, 10).await;
    let customers = browser.tree().children(Some(tables))[0];
    let schema = browser.tree().parent(tables).unwrap();

    assert_eq!(
        browser.find_parent_tree_node_by_type(customers, "schema"),
        Some(schema)
    );
    assert_eq!(
        browser.find_child_collection_tree_node(Some(schema), "table"),
        Some(tables)
    );
    let products = browser
        .find_sibling_tree_node(customers, "table", &ObjectId::from(3))
        .unwrap();
    assert_eq!(browser.tree().data(products).unwrap().label, "products");
    assert_eq!(browser.find_parent_tree_node_by_type(customers, "view"), None);
}
