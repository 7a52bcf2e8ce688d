use std::fs;
use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;

const BOL: &str = "BILL OF LADING\nSHIPPED ON BOARD 12-MAR-2024\n";

fn docfill() -> Command {
    Command::cargo_bin("docfill").unwrap()
}

/// An empty config file, so tests never read the user's configuration.
fn config_file(dir: &Path) -> String {
    let path = dir.join("config.json");
    fs::write(&path, "{}").unwrap();
    path.display().to_string()
}

fn orders_file(dir: &Path) -> std::path::PathBuf {
    let bl = dir.join("bl.txt");
    fs::write(&bl, BOL).unwrap();

    let orders = serde_json::json!([{
        "id": "o1",
        "po_number": "PO-4711",
        "documents": [{
            "id": "d1",
            "doc_type": "bill_of_lading",
            "file_name": "bl.txt",
            "metadata": { "resolved_path": bl.display().to_string() }
        }]
    }]);
    let path = dir.join("orders.json");
    fs::write(&path, serde_json::to_string_pretty(&orders).unwrap()).unwrap();
    path
}

#[test]
fn test_help() {
    docfill()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("run"))
        .stdout(predicate::str::contains("extract"));
}

#[test]
fn test_dry_run_leaves_orders_untouched() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_file(dir.path());
    let orders = orders_file(dir.path());
    let before = fs::read_to_string(&orders).unwrap();
    let report = dir.path().join("report.json");

    docfill()
        .args(["-c", &config, "run"])
        .arg(&orders)
        .arg("--report")
        .arg(&report)
        .assert()
        .success()
        .stdout(predicate::str::contains("actual_departure"))
        .stdout(predicate::str::contains("dry run"));

    assert_eq!(fs::read_to_string(&orders).unwrap(), before);
    let json = fs::read_to_string(&report).unwrap();
    assert!(json.contains("\"decision\": \"apply\""));
    assert!(json.contains("native-text"));
}

#[test]
fn test_apply_writes_orders_and_summary() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_file(dir.path());
    let orders = orders_file(dir.path());
    let summary = dir.path().join("summary.csv");

    docfill()
        .args(["-c", &config, "run"])
        .arg(&orders)
        .arg("--apply")
        .arg("--report")
        .arg(dir.path().join("report.json"))
        .arg("--summary")
        .arg(&summary)
        .assert()
        .success();

    let stored: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&orders).unwrap()).unwrap();
    assert_eq!(stored[0]["header"]["actual_departure"], "2024-03-12");

    let csv = fs::read_to_string(&summary).unwrap();
    assert!(csv.starts_with("order_id,po_number,line_id,field,value,canonicalization"));
    assert!(csv.contains("o1,PO-4711,,actual_departure,2024-03-12,false"));
}

#[test]
fn test_run_missing_orders_file() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_file(dir.path());

    docfill()
        .args(["-c", &config, "run"])
        .arg(dir.path().join("missing.json"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("Orders file not found"));
}

#[test]
fn test_extract_json() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_file(dir.path());
    let bl = dir.path().join("bl.txt");
    fs::write(&bl, BOL).unwrap();

    docfill()
        .args(["-c", &config, "extract"])
        .arg(&bl)
        .args(["--doc-type", "bol"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"actual_departure\""))
        .stdout(predicate::str::contains("\"method\": \"native-text\""));
}

#[test]
fn test_extract_unknown_doc_type() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_file(dir.path());
    let bl = dir.path().join("bl.txt");
    fs::write(&bl, BOL).unwrap();

    docfill()
        .args(["-c", &config, "extract"])
        .arg(&bl)
        .args(["--doc-type", "menu"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown document type"));
}

#[test]
fn test_config_init_set_get() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("config.json");
    let path = path.display().to_string();

    docfill()
        .args(["-c", &path, "config", "init"])
        .assert()
        .success();
    docfill()
        .args(["-c", &path, "config", "init"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));

    docfill()
        .args(["-c", &path, "config", "set", "reconcile.allow_ocr_evidence", "true"])
        .assert()
        .success();
    docfill()
        .args(["-c", &path, "config", "get", "reconcile.allow_ocr_evidence"])
        .assert()
        .success()
        .stdout(predicate::str::contains("true"));

    docfill()
        .args(["-c", &path, "config", "set", "reconcile.no_such_key", "1"])
        .assert()
        .failure();
}
