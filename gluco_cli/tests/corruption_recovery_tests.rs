//! Corruption recovery tests for gluco.
//!
//! These tests verify the CLI can handle:
//! - Corrupted or partial log lines
//! - Missing and unreadable companion files
//! - Appends after a crash mid-write

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::io::Write as IoWrite;
use std::path::Path;
use tempfile::TempDir;

const NOW: &str = "2024-06-15T20:00:00Z";

fn cli() -> Command {
    Command::new(assert_cmd::cargo::cargo_bin!("gluco"))
}

fn setup_test_dir() -> TempDir {
    tempfile::tempdir().expect("Failed to create temp dir")
}

fn gluco(data_dir: &Path) -> Command {
    let config_path = data_dir.join("config.toml");
    if !config_path.exists() {
        fs::write(&config_path, "").expect("Failed to write config");
    }
    let mut cmd = cli();
    cmd.arg("--data-dir")
        .arg(data_dir)
        .arg("--config")
        .arg(&config_path)
        .arg("--now")
        .arg(NOW);
    cmd
}

#[test]
fn test_corrupted_log_lines_are_skipped() {
    let temp_dir = setup_test_dir();
    let log_path = temp_dir.path().join("logs.jsonl");

    fs::write(
        &log_path,
        "{ invalid json }\n\
         {\"type\":\"glucose\",\"value\":150.0,\"taken_at\":\"2024-06-15T08:00:00Z\"}\n\
         {\"type\":\"teleport\",\"value\":1}\n",
    )
    .unwrap();

    gluco(temp_dir.path())
        .args(["stats", "--json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"reading_count\": 1"));
}

#[test]
fn test_partial_last_line() {
    let temp_dir = setup_test_dir();
    let log_path = temp_dir.path().join("logs.jsonl");

    // Valid line followed by a line cut off mid-write
    let mut file = fs::File::create(&log_path).unwrap();
    writeln!(
        file,
        r#"{{"type":"glucose","value":120.0,"taken_at":"2024-06-15T09:00:00Z"}}"#
    )
    .unwrap();
    write!(file, r#"{{"type":"glucose","value":1"#).unwrap();
    drop(file);

    gluco(temp_dir.path())
        .arg("report")
        .assert()
        .success()
        .stdout(predicate::str::contains("Readings: 1"));
}

#[test]
fn test_append_after_partial_line_keeps_new_entry_readable() {
    let temp_dir = setup_test_dir();
    let log_path = temp_dir.path().join("logs.jsonl");

    // Partial line terminated by a newline, as left by an interrupted writer
    fs::write(&log_path, "{\"type\":\"glucose\",\"val\n").unwrap();

    gluco(temp_dir.path())
        .args(["log", "glucose", "101"])
        .assert()
        .success();

    gluco(temp_dir.path())
        .arg("streak")
        .assert()
        .success()
        .stdout(predicate::str::contains("Active days:    1"));
}

#[test]
fn test_empty_log_file() {
    let temp_dir = setup_test_dir();
    fs::write(temp_dir.path().join("logs.jsonl"), "").unwrap();

    gluco(temp_dir.path())
        .arg("insights")
        .assert()
        .success()
        .stdout(predicate::str::contains("No glucose readings yet"));
}

#[test]
fn test_corrupted_product_catalog_is_empty() {
    let temp_dir = setup_test_dir();
    let products = temp_dir.path().join("products.json");
    fs::write(&products, "[{ broken").unwrap();

    gluco(temp_dir.path())
        .arg("lookup")
        .arg("123")
        .arg("--products")
        .arg(&products)
        .assert()
        .success()
        .stdout(predicate::str::contains("No product found"));
}

#[test]
fn test_import_missing_csv_fails() {
    let temp_dir = setup_test_dir();

    gluco(temp_dir.path())
        .arg("import-csv")
        .arg(temp_dir.path().join("missing.csv"))
        .assert()
        .failure();

    assert!(!temp_dir.path().join("logs.jsonl").exists());
}
