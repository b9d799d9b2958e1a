//! Concurrency tests for gluco.
//!
//! These tests verify that multiple processes can safely append to the
//! JSONL log (file locking) and read it while others write.

use assert_cmd::Command;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;
use tempfile::TempDir;

fn setup_test_dir() -> TempDir {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    std::fs::write(dir.path().join("config.toml"), "").expect("Failed to write config");
    dir
}

fn gluco(data_dir: &Path) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("gluco"));
    cmd.arg("--data-dir")
        .arg(data_dir)
        .arg("--config")
        .arg(data_dir.join("config.toml"))
        .arg("--now")
        .arg("2024-06-15T20:00:00Z");
    cmd
}

fn read_log(data_dir: &Path) -> String {
    std::fs::read_to_string(data_dir.join("logs.jsonl")).expect("Failed to read log")
}

#[test]
fn test_sequential_logging() {
    let temp_dir = setup_test_dir();

    for i in 0..5u64 {
        thread::sleep(Duration::from_millis(i * 5));
        gluco(temp_dir.path())
            .args(["log", "glucose", &format!("{}", 100 + i)])
            .assert()
            .success();
    }

    assert_eq!(read_log(temp_dir.path()).lines().count(), 5);
}

#[test]
fn test_reads_while_writing() {
    let temp_dir = setup_test_dir();
    let data_dir: PathBuf = temp_dir.path().to_path_buf();

    gluco(&data_dir)
        .args(["log", "glucose", "110"])
        .assert()
        .success();

    let reader_dir = data_dir.clone();
    let reader = thread::spawn(move || {
        for _ in 0..3 {
            gluco(&reader_dir).arg("report").assert().success();
            thread::sleep(Duration::from_millis(5));
        }
    });

    for _ in 0..3 {
        gluco(&data_dir)
            .args(["log", "insulin", "2"])
            .assert()
            .success();
    }

    reader.join().expect("Reader thread panicked");
    assert_eq!(read_log(&data_dir).lines().count(), 4);
}

#[test]
fn test_no_log_corruption_under_load() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path().to_path_buf();

    let handles: Vec<_> = (0..10u64)
        .map(|i| {
            let data_dir = data_dir.clone();
            thread::spawn(move || {
                thread::sleep(Duration::from_millis(i * 5));
                gluco(&data_dir)
                    .args(["meal", "--commit", "toast and 2 eggs"])
                    .timeout(Duration::from_secs(10))
                    .assert()
                    .success();
            })
        })
        .collect();

    for handle in handles {
        handle.join().expect("Thread panicked");
    }

    let content = read_log(&data_dir);
    let mut valid_count = 0;
    for line in content.lines().filter(|l| !l.is_empty()) {
        let parsed: Result<serde_json::Value, _> = serde_json::from_str(line);
        assert!(parsed.is_ok(), "Log contains invalid JSON line: {}", line);
        valid_count += 1;
    }

    // Two carb entries per meal
    assert_eq!(valid_count, 20, "Expected 20 valid entries in log");
}
