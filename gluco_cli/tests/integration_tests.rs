//! Integration tests for the gluco binary.
//!
//! These tests verify end-to-end behavior including:
//! - Manual logging and CSV import into the JSONL log
//! - Meal parsing and committing
//! - Report, insight, stats and streak output
//! - Product lookups

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

const NOW: &str = "2024-06-15T20:00:00Z";

fn setup_test_dir() -> TempDir {
    tempfile::tempdir().expect("Failed to create temp dir")
}

fn cli() -> Command {
    Command::new(assert_cmd::cargo::cargo_bin!("gluco"))
}

/// Command with a temp data dir, a default config and a fixed clock
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

fn log_lines(data_dir: &Path) -> Vec<String> {
    fs::read_to_string(data_dir.join("logs.jsonl"))
        .unwrap_or_default()
        .lines()
        .map(str::to_string)
        .collect()
}

#[test]
fn test_cli_help() {
    cli()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "Diabetes self-management insights",
        ));
}

#[test]
fn test_report_on_empty_data_dir() {
    let temp_dir = setup_test_dir();

    gluco(temp_dir.path())
        .arg("report")
        .assert()
        .success()
        .stdout(predicate::str::contains("== Glucose =="))
        .stdout(predicate::str::contains("== Mood =="))
        .stdout(predicate::str::contains("No data for this period"))
        .stdout(predicate::str::contains("No glucose readings yet"));
}

#[test]
fn test_meal_parse_without_commit() {
    let temp_dir = setup_test_dir();

    gluco(temp_dir.path())
        .args(["meal", "2 cups rice and chicken"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Total: 90.0 g carbs, 577 kcal"))
        .stdout(predicate::str::contains("Glycemic load: High"))
        .stdout(predicate::str::contains("Not logged"));

    assert!(log_lines(temp_dir.path()).is_empty());
}

#[test]
fn test_meal_commit_writes_carb_entries() {
    let temp_dir = setup_test_dir();

    gluco(temp_dir.path())
        .args(["meal", "--commit", "2", "cups", "rice", "and", "chicken"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Logged 2 carb entries"));

    let lines = log_lines(temp_dir.path());
    assert_eq!(lines.len(), 2);
    let first: serde_json::Value = serde_json::from_str(&lines[0]).unwrap();
    assert_eq!(first["type"], "carbs");
    assert_eq!(first["food_name"], "rice");
    assert_eq!(first["carbs_grams"], 90.0);
}

#[test]
fn test_unrecognized_meal_uses_generic_estimate() {
    let temp_dir = setup_test_dir();

    gluco(temp_dir.path())
        .args(["meal", "grandma's mystery casserole"])
        .assert()
        .success()
        .stdout(predicate::str::contains("generic estimate"))
        .stdout(predicate::str::contains("Total: 25.0 g carbs, 200 kcal"));
}

#[test]
fn test_log_glucose_and_insulin() {
    let temp_dir = setup_test_dir();

    gluco(temp_dir.path())
        .args(["log", "glucose", "132"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Logged glucose entry"));

    gluco(temp_dir.path())
        .args(["log", "insulin", "6", "--kind", "long"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Logged insulin entry"));

    let lines = log_lines(temp_dir.path());
    assert_eq!(lines.len(), 2);
    assert!(lines[1].contains("\"kind\":\"long\""));
}

#[test]
fn test_log_rejects_non_positive_glucose() {
    let temp_dir = setup_test_dir();

    gluco(temp_dir.path())
        .args(["log", "glucose", "0"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("glucose value must be positive"));

    assert!(log_lines(temp_dir.path()).is_empty());
}

#[test]
fn test_log_rejects_unknown_insulin_kind() {
    let temp_dir = setup_test_dir();

    gluco(temp_dir.path())
        .args(["log", "insulin", "6", "--kind", "glacial"])
        .assert()
        .failure();

    assert!(log_lines(temp_dir.path()).is_empty());
}

#[test]
fn test_import_csv_then_stats() {
    let temp_dir = setup_test_dir();
    let csv_path = temp_dir.path().join("meter.csv");
    fs::write(
        &csv_path,
        "taken_at,value\n\
         2024-06-15T07:00:00Z,110\n\
         2024-06-15T09:00:00Z,140\n\
         2024-06-15T12:00:00Z,bad\n\
         2024-06-15T13:00:00Z,180\n\
         2024-06-15T16:00:00Z,120\n\
         2024-06-15T19:00:00Z,100\n",
    )
    .unwrap();

    gluco(temp_dir.path())
        .arg("import-csv")
        .arg(&csv_path)
        .assert()
        .success()
        .stdout(predicate::str::contains("Imported 5 glucose readings"));

    let output = gluco(temp_dir.path())
        .args(["stats", "--period", "7", "--json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let stats: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(stats["period"], "week");
    assert_eq!(stats["glucose"]["reading_count"], 5);
    assert_eq!(stats["glucose"]["average"]["status"], "available");
    assert_eq!(stats["glucose"]["average"]["value"], 130);
    assert_eq!(stats["insulin"]["status"], "insufficient");
    assert_eq!(stats["streak"]["current"], 1);
}

#[test]
fn test_stats_rejects_unsupported_period() {
    let temp_dir = setup_test_dir();

    gluco(temp_dir.path())
        .args(["stats", "--period", "5"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unsupported period"));
}

#[test]
fn test_insights_and_streak_after_logging() {
    let temp_dir = setup_test_dir();

    gluco(temp_dir.path())
        .args(["log", "glucose", "120"])
        .assert()
        .success();

    gluco(temp_dir.path())
        .arg("insights")
        .assert()
        .success()
        .stdout(predicate::str::contains("[SUCCESS] Great control: 100%"));

    gluco(temp_dir.path())
        .arg("streak")
        .assert()
        .success()
        .stdout(predicate::str::contains("Current streak: 1 days"))
        .stdout(predicate::str::contains("First Log"));
}

#[test]
fn test_report_in_mmol() {
    let temp_dir = setup_test_dir();
    fs::write(
        temp_dir.path().join("config.toml"),
        "[targets]\nunit = \"mmol/L\"\n",
    )
    .unwrap();

    gluco(temp_dir.path())
        .args(["log", "glucose", "180"])
        .assert()
        .success();

    gluco(temp_dir.path())
        .arg("report")
        .assert()
        .success()
        .stdout(predicate::str::contains("Average: 10.0 mmol/L"));
}

#[test]
fn test_invalid_config_is_rejected() {
    let temp_dir = setup_test_dir();
    fs::write(
        temp_dir.path().join("config.toml"),
        "[targets]\nglucose_min = 180\nglucose_max = 70\n",
    )
    .unwrap();

    gluco(temp_dir.path())
        .arg("report")
        .assert()
        .failure()
        .stderr(predicate::str::contains("glucose_max"));
}

#[test]
fn test_lookup_by_barcode() {
    let temp_dir = setup_test_dir();
    let products = temp_dir.path().join("products.json");
    fs::write(
        &products,
        r#"[{
            "code": "123",
            "product_name": "Granola Bar",
            "brands": "Crunchy",
            "nutriments": { "carbohydrates_serving": 29.0, "energy-kcal_serving": 190.0 },
            "nutriscore_grade": "c",
            "nova_group": 4
        }]"#,
    )
    .unwrap();

    gluco(temp_dir.path())
        .arg("lookup")
        .arg("123")
        .arg("--products")
        .arg(&products)
        .assert()
        .success()
        .stdout(predicate::str::contains("Granola Bar (Crunchy)"))
        .stdout(predicate::str::contains("Carbs per portion: 29.0 g"));

    gluco(temp_dir.path())
        .arg("lookup")
        .arg("999")
        .arg("--products")
        .arg(&products)
        .assert()
        .success()
        .stdout(predicate::str::contains("No product found"));

    // Catalog records extend the meal parser's table
    gluco(temp_dir.path())
        .args(["meal", "granola bar"])
        .arg("--products")
        .arg(&products)
        .assert()
        .success()
        .stdout(predicate::str::contains("Total: 29.0 g carbs"));
}
