//! Integration tests for `process-data` and `convert-csv`.
#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use assert_cmd::Command;
use predicates::str::contains;
use tempfile::TempDir;

mod common;

use common::{CLEAN_CSV, DUPLICATE_ID_CSV, arg, write_csv};

type TestResult = Result<(), Box<dyn std::error::Error>>;

fn process_data() -> Command {
    Command::new(assert_cmd::cargo::cargo_bin!("process-data"))
}

fn convert_csv() -> Command {
    Command::new(assert_cmd::cargo::cargo_bin!("convert-csv"))
}

#[test]
fn process_data_uses_default_paths() -> TestResult {
    let tmp = TempDir::new()?;
    write_csv(&tmp, "data/raw/input.csv", CLEAN_CSV)?;

    process_data()
        .current_dir(tmp.path())
        .assert()
        .success()
        .stdout(contains("Processed 3 rows"));

    assert!(tmp.path().join("data/output/result.parquet").is_file());
    Ok(())
}

#[test]
fn process_data_missing_input_fails() -> TestResult {
    let tmp = TempDir::new()?;

    process_data()
        .args([
            arg(&tmp.path().join("nope.csv")),
            arg(&tmp.path().join("out.parquet")),
        ])
        .assert()
        .failure()
        .code(1);
    assert!(!tmp.path().join("out.parquet").exists());
    Ok(())
}

#[test]
fn process_data_validate_stops_on_duplicates() -> TestResult {
    let tmp = TempDir::new()?;
    let input = write_csv(&tmp, "input.csv", DUPLICATE_ID_CSV)?;
    let output = tmp.path().join("out.parquet");

    process_data()
        .args([arg(&input), arg(&output)])
        .arg("--validate")
        .assert()
        .failure()
        .code(1)
        .stdout(contains("Duplicate IDs found"));
    assert!(!output.exists());
    Ok(())
}

#[test]
fn convert_csv_writes_json_array() -> TestResult {
    let tmp = TempDir::new()?;
    let input = write_csv(&tmp, "input.csv", CLEAN_CSV)?;
    let output = tmp.path().join("out/result.json");

    convert_csv()
        .args([arg(&input), arg(&output)])
        .arg("--validate")
        .assert()
        .success()
        .stdout(contains("failed: 0"))
        .stdout(contains("Converted 3 rows"));

    let parsed: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&output)?)?;
    let rows = parsed.as_array().expect("json array");
    assert_eq!(rows.len(), 3);
    assert_eq!(rows[0]["name"], "c");
    Ok(())
}
