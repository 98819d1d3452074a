use crate::support::{
    browser, find, fixture, labels, open_tables, schema_hierarchy, table, SCHEMAS_PATH,
};
use treesync::{BrowserEvent, EventOptions, MutationOutcome, NodeData, Notice, TreeError};

#[tokio::test]
async fn added_table_lands_in_sorted_position() {
    let service = fixture();
    let mut browser = browser(service).await;
    let tables = open_tables(&mut browser, 10).await;
    assert_eq!(labels(&browser, tables), ["customers", "invoices", "products"]);
    assert_eq!(browser.tree().data(tables).unwrap().collection_count, Some(3));

    let outcome = browser
        .add_node(table(5, "orders", 10), &schema_hierarchy(10))
        .await
        .unwrap();

    let MutationOutcome::Inserted(item) = outcome else {
        panic!("expected an insertion, got {:?}", outcome);
    };
    assert_eq!(
        labels(&browser, tables),
        ["customers", "invoices", "orders", "products"]
    );
    assert_eq!(browser.tree().position(item), Some(2));
    assert_eq!(browser.tree().selected(), Some(item));
    assert_eq!(browser.tree().data(tables).unwrap().collection_count, Some(4));
}

#[tokio::test]
async fn added_node_clears_type_caches() {
    let mut browser = browser(fixture()).await;
    open_tables(&mut browser, 10).await;
    browser.take_notices();

    browser
        .add_node(table(5, "orders", 10), &schema_hierarchy(10))
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
    assert!(cleared.contains(&"table".to_string()));
    assert!(cleared.contains(&"coll-table".to_string()));
}

#[tokio::test]
async fn adding_a_shown_node_selects_it() {
    let mut browser = browser(fixture()).await;
    let tables = open_tables(&mut browser, 10).await;

    let outcome = browser
        .add_node(table(1, "customers", 10), &schema_hierarchy(10))
        .await
        .unwrap();

    let MutationOutcome::Selected(item) = outcome else {
        panic!("expected a selection, got {:?}", outcome);
    };
    assert_eq!(browser.tree().data(item).unwrap().label, "customers");
    assert_eq!(labels(&browser, tables).len(), 3);
    assert_eq!(browser.tree().selected(), Some(item));
}

#[tokio::test]
async fn unloaded_parent_defers_until_expanded() {
    let service = fixture();
    let mut browser = browser(service.clone()).await;
    open_tables(&mut browser, 10).await;

    let orders = table(40, "orders", 20);
    let outcome = browser
        .add_node(orders.clone(), &schema_hierarchy(20))
        .await
        .unwrap();
    assert_eq!(outcome, MutationOutcome::Deferred);

    let mut path = SCHEMAS_PATH.to_vec();
    path.push("schema_20");
    let schema = find(&browser, &path).unwrap();
    assert!(!browser.tree().was_loaded(Some(schema)));

    service.push_child(Some("coll-table_20"), orders);
    let tables = open_tables(&mut browser, 20).await;
    assert_eq!(labels(&browser, tables), ["archive", "orders"]);
}

#[tokio::test]
async fn empty_parent_is_reloaded() {
    let service = fixture();
    service.set_children(Some("coll-table_20"), Vec::new());
    let mut browser = browser(service.clone()).await;
    let tables = open_tables(&mut browser, 20).await;
    assert!(labels(&browser, tables).is_empty());

    let ledger = table(41, "ledger", 20);
    service.push_child(Some("coll-table_20"), ledger.clone());
    let outcome = browser.add_node(ledger, &schema_hierarchy(20)).await.unwrap();

    let MutationOutcome::Reloaded(Some(item)) = outcome else {
        panic!("expected a reload, got {:?}", outcome);
    };
    assert_eq!(labels(&browser, tables), ["ledger"]);
    assert_eq!(browser.tree().selected(), Some(item));
    assert!(browser.tree().is_open(tables));
}

#[tokio::test]
async fn add_event_reports_the_new_item() {
    let mut browser = browser(fixture()).await;
    open_tables(&mut browser, 10).await;

    let (tx, rx) = std::sync::mpsc::channel();
    let options = EventOptions::default().on_success(move |item, data: &NodeData| {
        let _ = tx.send((item, data.label.clone()));
    });
    let outcome = browser
        .handle(BrowserEvent::Add {
            data: table(5, "orders", 10),
            hierarchy: schema_hierarchy(10),
            options,
        })
        .await
        .unwrap();

    let (item, label) = rx.try_recv().unwrap();
    assert_eq!(item, outcome.item());
    assert_eq!(label, "orders");
}

#[tokio::test]
async fn add_event_failure_reports_where_the_path_ended() {
    let mut browser = browser(fixture()).await;

    let (tx, rx) = std::sync::mpsc::channel();
    let options = EventOptions::default().on_fail(move |item, data: &NodeData| {
        let _ = tx.send((item, data.label.clone()));
    });
    let err = browser
        .handle(BrowserEvent::Add {
            data: table(5, "orders", 99),
            hierarchy: schema_hierarchy(99),
            options,
        })
        .await
        .unwrap_err();

    assert!(matches!(err, TreeError::NodeNotFound { ref node_type, .. } if node_type == "schema"));
    let (reached, label) = rx.try_recv().unwrap();
    assert_eq!(reached, find(&browser, &SCHEMAS_PATH));
    assert!(reached.is_some());
    assert_eq!(label, "orders");
}

#[tokio::test]
async fn unknown_type_is_rejected() {
    let mut browser = browser(fixture()).await;
    let err = browser
        .add_node(NodeData::new("gizmo", 1, "widget"), &schema_hierarchy(10))
        .await
        .unwrap_err();
    assert!(err.to_string().contains("gizmo"));
}
