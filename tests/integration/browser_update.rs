use crate::support::{browser, fixture, labels, open_tables, schema_hierarchy, table};
use treesync::hierarchy::HierarchyEntry;
use treesync::{MutationOutcome, NodeTypeRegistry, ObjectId};

#[tokio::test]
async fn icon_change_updates_in_place() {
    let mut browser = browser(fixture()).await;
    let tables = open_tables(&mut browser, 10).await;
    let before = browser.tree().children(Some(tables)).to_vec();

    let old = table(2, "invoices", 10);
    let new = old.clone().with_icon("icon-partition");
    let outcome = browser
        .update_node(&old, new, &schema_hierarchy(10))
        .await
        .unwrap();

    let MutationOutcome::Updated(item) = outcome else {
        panic!("expected an in-place update, got {:?}", outcome);
    };
    assert_eq!(browser.tree().children(Some(tables)), before.as_slice());
    assert_eq!(
        browser.tree().data(item).unwrap().icon.as_deref(),
        Some("icon-partition")
    );
    assert_eq!(browser.tree().selected(), Some(item));
}

#[tokio::test]
async fn rename_resorts_the_node() {
    let mut browser = browser(fixture()).await;
    let tables = open_tables(&mut browser, 10).await;

    let old = table(1, "customers", 10);
    let new = table(1, "stock", 10);
    let outcome = browser
        .update_node(&old, new, &schema_hierarchy(10))
        .await
        .unwrap();

    assert!(matches!(outcome, MutationOutcome::Recreated(Some(_))));
    assert_eq!(labels(&browser, tables), ["invoices", "products", "stock"]);
    assert_eq!(browser.tree().data(tables).unwrap().collection_count, Some(3));
}

#[tokio::test]
async fn move_to_loaded_schema_inserts_sorted() {
    let mut browser = browser(fixture()).await;
    let public_tables = open_tables(&mut browser, 10).await;
    let sales_tables = open_tables(&mut browser, 20).await;

    let old = table(2, "invoices", 10);
    let new = table(2, "invoices", 20);
    let outcome = browser
        .update_node(&old, new, &schema_hierarchy(10))
        .await
        .unwrap();

    let MutationOutcome::Recreated(Some(item)) = outcome else {
        panic!("expected the node to be recreated, got {:?}", outcome);
    };
    assert_eq!(labels(&browser, public_tables), ["customers", "products"]);
    assert_eq!(labels(&browser, sales_tables), ["archive", "invoices"]);
    assert_eq!(browser.tree().parent(item), Some(sales_tables));
    assert_eq!(browser.tree().selected(), Some(item));
    assert_eq!(browser.tree().data(public_tables).unwrap().collection_count, Some(2));
    assert_eq!(browser.tree().data(sales_tables).unwrap().collection_count, Some(2));
}

#[tokio::test]
async fn move_to_unloaded_schema_shows_on_expand() {
    let service = fixture();
    let mut browser = browser(service.clone()).await;
    let public_tables = open_tables(&mut browser, 10).await;

    let old = table(2, "invoices", 10);
    let new = table(2, "invoices", 20);
    let outcome = browser
        .update_node(&old, new.clone(), &schema_hierarchy(10))
        .await
        .unwrap();
    assert_eq!(outcome, MutationOutcome::Recreated(None));
    assert_eq!(labels(&browser, public_tables), ["customers", "products"]);

    service.remove_node("table_2");
    service.push_child(Some("coll-table_20"), new);
    let sales_tables = open_tables(&mut browser, 20).await;
    assert_eq!(labels(&browser, sales_tables), ["archive", "invoices"]);
}

#[tokio::test]
async fn missing_node_falls_back_to_add() {
    let mut browser = browser(fixture()).await;
    let tables = open_tables(&mut browser, 10).await;

    let old = table(7, "ledger", 10);
    let new = old.clone().with_icon("icon-table");
    let outcome = browser
        .update_node(&old, new, &schema_hierarchy(10))
        .await
        .unwrap();

    assert!(matches!(outcome, MutationOutcome::Inserted(_)));
    assert_eq!(
        labels(&browser, tables),
        ["customers", "invoices", "ledger", "products"]
    );
}

#[tokio::test]
async fn fallback_add_drops_the_old_node_entry() {
    let mut browser = browser(fixture()).await;
    let tables = open_tables(&mut browser, 10).await;

    let mut hierarchy = schema_hierarchy(10);
    hierarchy.insert(HierarchyEntry::new(
        &NodeTypeRegistry::postgres(),
        "table",
        ObjectId::from(99),
    ));
    let outcome = browser
        .update_node(&table(99, "ghost", 10), table(100, "ledger", 10), &hierarchy)
        .await
        .unwrap();

    assert!(matches!(outcome, MutationOutcome::Inserted(_)));
    assert_eq!(
        labels(&browser, tables),
        ["customers", "invoices", "ledger", "products"]
    );
    assert_eq!(browser.tree().data(tables).unwrap().collection_count, Some(4));
}
