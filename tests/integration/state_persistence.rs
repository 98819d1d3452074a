use crate::support::{browser_with, find, fixture, open, open_tables, tracker, SCHEMAS_PATH};
use std::sync::Arc;
use std::time::Duration;
use treesync::state::{save_interval, MemoryStateStore, StateMap, TreeStatePersistence};
use treesync::BrowserOptions;

const OPEN_TABLES_CHAIN: &str = "server_group_1,server_3,coll-database_3,database_16384,\
coll-schema_16384,schema_10,coll-table_10";

#[tokio::test(start_paused = true)]
async fn state_is_saved_once_per_change() {
    let tracker = tracker();
    let mut browser = browser_with(fixture(), tracker.clone(), BrowserOptions::default()).await;
    open_tables(&mut browser, 10).await;

    let store = Arc::new(MemoryStateStore::new());
    let persistence = TreeStatePersistence::new(tracker, store.clone(), save_interval(Some(30)));
    persistence.init().await;
    assert!(persistence.is_running());

    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(store.save_count(), 0);

    tokio::time::sleep(Duration::from_secs(21)).await;
    assert_eq!(store.save_count(), 1);
    let saves = store.saves();
    let saved = &saves[0]["3"];
    assert_eq!(saved.paths, [OPEN_TABLES_CHAIN]);
    assert_eq!(saved.is_opened.get("database_16384"), Some(&1));
    assert_eq!(saved.conn_status.get("database_16384"), Some(&1));

    tokio::time::sleep(Duration::from_secs(60)).await;
    assert_eq!(store.save_count(), 1);

    persistence.stop().await;
    assert!(!persistence.is_running());
}

#[tokio::test(start_paused = true)]
async fn later_state_wins_within_one_interval() {
    let tracker = tracker();
    let mut browser = browser_with(fixture(), tracker.clone(), BrowserOptions::default()).await;
    let store = Arc::new(MemoryStateStore::new());
    let persistence = TreeStatePersistence::new(tracker, store.clone(), save_interval(Some(30)));
    persistence.start();

    let public_tables = open_tables(&mut browser, 10).await;

    tokio::time::sleep(Duration::from_secs(5)).await;
    browser.close(public_tables).await.unwrap();
    open_tables(&mut browser, 20).await;

    tokio::time::sleep(Duration::from_secs(26)).await;
    assert_eq!(store.save_count(), 1);
    let saves = store.saves();
    let paths = &saves[0]["3"].paths;
    let prefix = SCHEMAS_PATH.join(",");
    assert!(paths.contains(&format!("{},schema_20,coll-table_20", prefix)));
    assert!(!paths.iter().any(|p| p.ends_with("coll-table_10")));
    persistence.stop().await;
}

#[tokio::test(start_paused = true)]
async fn failed_save_is_retried_on_next_tick() {
    let tracker = tracker();
    let mut browser = browser_with(fixture(), tracker.clone(), BrowserOptions::default()).await;
    open_tables(&mut browser, 10).await;

    let store = Arc::new(MemoryStateStore::new());
    store.fail_next_saves(1);
    let persistence = TreeStatePersistence::new(tracker, store.clone(), save_interval(Some(30)));
    persistence.start();

    tokio::time::sleep(Duration::from_secs(31)).await;
    assert_eq!(store.save_count(), 0);

    tokio::time::sleep(Duration::from_secs(30)).await;
    assert_eq!(store.save_count(), 1);
    persistence.stop().await;
}

#[tokio::test]
async fn shutdown_saves_pending_changes() {
    let tracker = tracker();
    let mut browser = browser_with(fixture(), tracker.clone(), BrowserOptions::default()).await;
    open_tables(&mut browser, 10).await;

    let store = Arc::new(MemoryStateStore::new());
    let persistence = TreeStatePersistence::new(tracker, store.clone(), save_interval(Some(30)));
    persistence.init().await;
    persistence.shutdown().await;

    assert_eq!(store.save_count(), 1);
    assert!(store.current().contains_key("3"));
}

#[tokio::test]
async fn expanded_branches_come_back_in_next_session() {
    let store = Arc::new(MemoryStateStore::new());

    let first = tracker();
    let mut browser = browser_with(fixture(), first.clone(), BrowserOptions::default()).await;
    let tables = open_tables(&mut browser, 10).await;
    let products = browser
        .tree()
        .find_child(Some(tables), |d| d.label == "products")
        .unwrap();
    browser.select(products).await.unwrap();
    let persistence = TreeStatePersistence::new(first, store.clone(), save_interval(Some(30)));
    assert!(persistence.save_state().await.unwrap());

    let second = tracker();
    let persistence = TreeStatePersistence::new(second.clone(), store.clone(), save_interval(Some(30)));
    persistence.fetch_state().await.unwrap();
    let mut browser = browser_with(fixture(), second, BrowserOptions::default()).await;

    // Connecting to the server brings the rest of the saved branch back
    open(&mut browser, &["server_group_1", "server_3"]).await;

    let mut path = SCHEMAS_PATH.to_vec();
    path.extend(["schema_10", "coll-table_10"]);
    let tables = find(&browser, &path).unwrap();
    assert!(browser.tree().is_open(tables));
    let selected = browser.tree().selected().unwrap();
    assert_eq!(browser.tree().data(selected).unwrap().label, "products");

    let mut sales = SCHEMAS_PATH.to_vec();
    sales.push("schema_20");
    let sales = find(&browser, &sales).unwrap();
    assert!(!browser.tree().is_open(sales));
}

#[tokio::test]
async fn disabled_persistence_resets_the_store() {
    let store = Arc::new(MemoryStateStore::with_state(StateMap::from([(
        "3".to_string(),
        Default::default(),
    )])));
    let persistence = TreeStatePersistence::new(tracker(), store.clone(), save_interval(Some(0)));

    persistence.init().await;

    assert!(!persistence.is_enabled());
    assert!(!persistence.is_running());
    assert_eq!(store.reset_count(), 1);
    assert!(store.current().is_empty());
    persistence.shutdown().await;
    assert_eq!(store.save_count(), 0);
}
