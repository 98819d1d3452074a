use clap::Parser;
use serde_json::Value;
use std::path::Path;
use tempfile::TempDir;
use treesync::config::{StateBackend, TreeSyncConfig};
use treesync::tooling::cli::{Cli, CliContext, Commands};

const FIXTURE: &str = r#"{
    "": [{"_id": 1, "_type": "server_group", "label": "Servers", "inode": true}],
    "server_group_1": [{"_id": 3, "_type": "server", "_pid": 1, "label": "local", "inode": true, "connected": true}],
    "server_3": [{"_id": 3, "_type": "coll-database", "label": "Databases", "inode": true}],
    "coll-database_3": [{"_id": 16384, "_type": "database", "_pid": 3, "label": "shop", "inode": true, "connected": true}],
    "database_16384": [{"_id": 16384, "_type": "coll-schema", "label": "Schemas", "inode": true}],
    "coll-schema_16384": [{"_id": 10, "_type": "schema", "_pid": 16384, "label": "public", "inode": true}],
    "schema_10": [{"_id": 10, "_type": "coll-table", "label": "Tables", "inode": true}],
    "coll-table_10": [
        {"_id": 1, "_type": "table", "_pid": 10, "label": "customers"},
        {"_id": 3, "_type": "table", "_pid": 10, "label": "products"}
    ]
}"#;

const SCRIPT: &str = r#"[
    {"op": "open", "path": ["server_group_1", "server_3", "coll-database_3", "database_16384",
                            "coll-schema_16384", "schema_10", "coll-table_10"]},
    {"op": "add",
     "data": {"_id": 2, "_type": "table", "_pid": 10, "label": "invoices"},
     "hierarchy": [{"_type": "server_group", "_id": 1}, {"_type": "server", "_id": 3},
                   {"_type": "database", "_id": 16384}, {"_type": "schema", "_id": 10}]}
]"#;

fn write(dir: &Path, name: &str, content: &str) -> std::path::PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, content).unwrap();
    path
}

fn sled_context(dir: &TempDir) -> CliContext {
    let mut config = TreeSyncConfig::default();
    config.state.backend = StateBackend::Sled;
    config.state.sled_path = Some(dir.path().join("state"));
    CliContext::from_config(config).unwrap()
}

#[tokio::test]
async fn replay_prints_sorted_tree_and_state_as_json() {
    let dir = TempDir::new().unwrap();
    let fixture = write(dir.path(), "fixture.json", FIXTURE);
    let script = write(dir.path(), "script.json", SCRIPT);

    let cli = Cli::parse_from([
        "treesync",
        "replay",
        fixture.to_str().unwrap(),
        script.to_str().unwrap(),
        "--format",
        "json",
    ]);
    let ctx = CliContext::from_config(TreeSyncConfig::default()).unwrap();
    let output = ctx.execute(&cli.command).await.unwrap();
    let output: Value = serde_json::from_str(&output).unwrap();

    assert_eq!(output["steps"][1]["op"], "add");
    assert!(output["steps"][1]["outcome"]
        .as_str()
        .unwrap()
        .starts_with("Inserted"));

    let tables: Vec<&str> = output["tree"]
        .as_array()
        .unwrap()
        .iter()
        .filter(|row| row["depth"] == 7)
        .map(|row| row["label"].as_str().unwrap())
        .collect();
    assert_eq!(tables, ["customers", "invoices", "products"]);
    assert!(output["caches_cleared"].as_u64().unwrap() > 0);
    assert!(output["state"]["3"]["paths"].as_array().unwrap().len() == 1);
}

#[tokio::test]
async fn saved_replay_state_can_be_shown_and_reset() {
    let dir = TempDir::new().unwrap();
    let fixture = write(dir.path(), "fixture.json", FIXTURE);
    let script = write(dir.path(), "script.json", SCRIPT);
    let ctx = sled_context(&dir);

    let replay = Cli::parse_from([
        "treesync",
        "replay",
        fixture.to_str().unwrap(),
        script.to_str().unwrap(),
        "--save",
    ]);
    ctx.execute(&replay.command).await.unwrap();

    let show = Cli::parse_from(["treesync", "state", "show", "--format", "json"]);
    let stored: Value = serde_json::from_str(&ctx.execute(&show.command).await.unwrap()).unwrap();
    assert_eq!(
        stored["3"]["selected"]["database_16384"],
        "table_2",
        "the added table was selected"
    );

    let reset = Cli::parse_from(["treesync", "state", "reset", "--yes"]);
    ctx.execute(&reset.command).await.unwrap();
    let show = Cli::parse_from(["treesync", "state", "show"]);
    assert_eq!(ctx.execute(&show.command).await.unwrap(), "No stored tree state");
}

#[tokio::test]
async fn url_command_resolves_object_urls() {
    let ctx = CliContext::from_config(TreeSyncConfig::default()).unwrap();

    let cli = Cli::parse_from([
        "treesync",
        "url",
        "--type",
        "table",
        "--id",
        "5",
        "--hierarchy",
        "server_group=1,server=3,database=16384,schema=10",
    ]);
    assert_eq!(
        ctx.execute(&cli.command).await.unwrap(),
        "/browser/table/obj/1/3/16384/10/5"
    );

    let cli = Cli::parse_from([
        "treesync",
        "url",
        "--type",
        "schema",
        "--action",
        "children",
        "--id",
        "10",
        "--hierarchy",
        "server_group=1,server=3,database=16384",
    ]);
    assert_eq!(
        ctx.execute(&cli.command).await.unwrap(),
        "/browser/schema/children/1/3/16384/10"
    );
}

#[test]
fn unknown_hierarchy_type_is_an_error() {
    let cli = Cli::parse_from(["treesync", "url", "--type", "table", "--hierarchy", "gizmo=1"]);
    assert!(matches!(cli.command, Commands::Url { .. }));

    let runtime = tokio::runtime::Runtime::new().unwrap();
    let ctx = CliContext::from_config(TreeSyncConfig::default()).unwrap();
    assert!(runtime.block_on(ctx.execute(&cli.command)).is_err());
}
