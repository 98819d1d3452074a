use crate::support::{browser_with, fixture, open_tables, schema_hierarchy, table, tracker};
use proptest::collection::btree_set;
use proptest::prelude::*;
use std::cmp::Ordering;
use std::collections::HashSet;
use treesync::tree::sort::natural_cmp;
use treesync::{Browser, BrowserOptions, ItemId};

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
}

fn assert_consistent(browser: &Browser, tables: ItemId) {
    let tree = browser.tree();
    let children = tree.children(Some(tables));
    let nodes: Vec<_> = children.iter().filter_map(|c| tree.data(*c)).collect();

    for pair in nodes.windows(2) {
        assert_ne!(
            natural_cmp(&pair[0].label, &pair[1].label),
            Ordering::Greater,
            "{} shown before {}",
            pair[0].label,
            pair[1].label
        );
    }
    let ids: HashSet<_> = nodes.iter().map(|d| d.id.clone()).collect();
    assert_eq!(ids.len(), nodes.len());
    assert_eq!(
        tree.data(tables).unwrap().collection_count,
        Some(children.len() as u32)
    );
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn incremental_adds_keep_siblings_ordered(
        labels in btree_set("[a-z]{1,5}[0-9]{0,3}", 1..40),
        loaded in 0usize..40,
        threshold in 2usize..12,
        removals in proptest::collection::vec(0usize..40, 0..6),
    ) {
        let labels: Vec<String> = labels.into_iter().collect();
        let loaded = loaded.clamp(1, labels.len());

        runtime().block_on(async {
            let service = fixture();
            let initial = labels[..loaded]
                .iter()
                .enumerate()
                .map(|(i, label)| table(100 + i as i64, label, 10))
                .collect();
            service.set_children(Some("coll-table_10"), initial);

            let options = BrowserOptions {
                insertion_search_threshold: threshold,
                ..BrowserOptions::default()
            };
            let mut browser = browser_with(service, tracker(), options).await;
            let tables = open_tables(&mut browser, 10).await;
            assert_consistent(&browser, tables);

            for (i, label) in labels.iter().enumerate().skip(loaded) {
                browser
                    .add_node(table(100 + i as i64, label, 10), &schema_hierarchy(10))
                    .await
                    .unwrap();
                assert_consistent(&browser, tables);
            }

            // Adding a node that is already shown changes nothing
            browser
                .add_node(table(100, &labels[0], 10), &schema_hierarchy(10))
                .await
                .unwrap();
            assert_eq!(browser.tree().children(Some(tables)).len(), labels.len());

            for index in removals {
                let children = browser.tree().children(Some(tables));
                if children.is_empty() {
                    break;
                }
                let victim = browser.tree().data(children[index % children.len()]).unwrap().clone();
                browser.remove_node(&victim, &schema_hierarchy(10)).await.unwrap();
                assert_consistent(&browser, tables);
            }
        });
    }
}
