use assert_cmd::prelude::*;
use predicates::prelude::*;
use serde_json::{json, Value};
use std::fs;
use std::path::Path;
use std::process::Command;
use tempfile::{tempdir, TempDir};

fn supply_finder(workdir: &Path) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("supply-finder"));
    cmd.current_dir(workdir)
        .env_remove("SUPPLY_FINDER_DATABASE_DIR")
        .env_remove("SUPPLY_FINDER_MAPPING_URL")
        .env_remove("SUPPLY_FINDER_MAPPING_FILE")
        .env_remove("SUPPLY_FINDER_LEXICON")
        .env("RUST_LOG", "warn");
    cmd
}

fn setup_store() -> TempDir {
    let temp = tempdir().unwrap();
    let root = temp.path();
    fs::create_dir_all(root.join("database")).unwrap();
    fs::write(
        root.join("mapping.json"),
        r#"{"inventory management": "inventory.json", "order fulfillment": "orders.json", "shipping": "missing.json", "shipping delay": "delays.json"}"#,
    )
    .unwrap();
    fs::write(
        root.join("database/inventory.json"),
        json!({"activity": "inventory management", "inventory_level": 81}).to_string(),
    )
    .unwrap();
    fs::write(
        root.join("database/delays.json"),
        json!({"activity": "shipping delay", "delayed_shipments": 3}).to_string(),
    )
    .unwrap();
    temp
}

fn resolve(workdir: &Path, extra: &[&str], query: &str) -> Value {
    let output = supply_finder(workdir)
        .args(extra)
        .args(["resolve", query])
        .output()
        .expect("command run");
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).expect("valid json")
}

#[test]
fn resolve_prints_matching_dataset() {
    let temp = setup_store();
    let body = resolve(
        temp.path(),
        &["--mapping-file", "mapping.json"],
        "inventory management levels",
    );
    assert_eq!(body["inventory_level"], 81);
}

#[test]
fn resolve_skips_missing_dataset_and_uses_next_match() {
    let temp = setup_store();
    let body = resolve(
        temp.path(),
        &["--mapping-file", "mapping.json"],
        "shipping delay issue",
    );
    assert_eq!(body["delayed_shipments"], 3);
}

#[test]
fn resolve_unrelated_query_is_not_found() {
    let temp = setup_store();
    let body = resolve(
        temp.path(),
        &["--mapping-file", "mapping.json"],
        "zzz unrelated nonsense",
    );
    assert_eq!(body, json!({"error": "No data found for the given query"}));
}

#[test]
fn resolve_with_unreachable_mapping_is_not_found() {
    let temp = setup_store();
    let body = resolve(
        temp.path(),
        &["--mapping-url", "http://127.0.0.1:1/mapping"],
        "inventory management",
    );
    assert_eq!(body, json!({"error": "No data found for the given query"}));

    let body = resolve(
        temp.path(),
        &["--mapping-file", "absent.json"],
        "inventory management",
    );
    assert_eq!(body, json!({"error": "No data found for the given query"}));
}

#[test]
fn resolve_reads_config_file() {
    let temp = setup_store();
    fs::write(
        temp.path().join("supply-finder.toml"),
        "database_dir = \"database\"\nmapping_file = \"mapping.json\"\n",
    )
    .unwrap();
    let body = resolve(temp.path(), &[], "inventory management");
    assert_eq!(body["inventory_level"], 81);
}

#[test]
fn env_selects_database_dir() {
    let temp = setup_store();
    let output = supply_finder(temp.path())
        .env("SUPPLY_FINDER_DATABASE_DIR", "elsewhere")
        .args(["--mapping-file", "mapping.json", "resolve", "inventory management"])
        .output()
        .expect("command run");
    assert!(output.status.success());
    let body: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(body, json!({"error": "No data found for the given query"}));
}

#[test]
fn explain_reports_scores_in_table_order() {
    let temp = setup_store();
    let body = resolve(
        temp.path(),
        &["--mapping-file", "mapping.json"],
        "shipping delay issue",
    );
    assert_eq!(body["delayed_shipments"], 3);

    let output = supply_finder(temp.path())
        .args(["--mapping-file", "mapping.json", "resolve", "--explain", "shipping delay issue"])
        .output()
        .expect("command run");
    assert!(output.status.success());
    let report: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["tokens"], json!(["shipping", "delay", "issue"]));
    let labels: Vec<&str> = report["entries"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["label"].as_str().unwrap())
        .collect();
    assert_eq!(
        labels,
        vec!["inventory management", "order fulfillment", "shipping", "shipping delay"]
    );
    assert_eq!(report["entries"][2]["qualifies"], true);
    assert_eq!(report["entries"][0]["score"], 0.0);
}

#[test]
fn invalid_config_file_fails() {
    let temp = setup_store();
    fs::write(temp.path().join("bad.toml"), "database_dir = [").unwrap();
    supply_finder(temp.path())
        .args(["--config", "bad.toml", "resolve", "inventory"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid config file"));
}

#[test]
fn tool_schema_describes_retrieval_operation() {
    let temp = tempdir().unwrap();
    let output = supply_finder(temp.path())
        .arg("tool-schema")
        .output()
        .expect("command run");
    assert!(output.status.success());
    let def: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(def["function"]["name"], "get_supply_chain_data");
    assert_eq!(def["function"]["parameters"]["required"], json!(["query"]));
}
