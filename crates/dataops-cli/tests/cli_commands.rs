//! Integration tests for the `dataops` binary.
#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use std::fs::File;

use assert_cmd::Command;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use predicates::str::contains;
use tempfile::TempDir;

mod common;

use common::{CLEAN_CSV, DUPLICATE_ID_CSV, arg, write_csv, write_file};

type TestResult = Result<(), Box<dyn std::error::Error>>;

fn cli() -> Command {
    Command::new(assert_cmd::cargo::cargo_bin!("dataops"))
}

#[test]
fn convert_csv_to_parquet_infers_formats() -> TestResult {
    let tmp = TempDir::new()?;
    let input = write_csv(&tmp, "input.csv", CLEAN_CSV)?;
    let output = tmp.path().join("out/data.parquet");

    cli()
        .args(["convert", "--input", &arg(&input), "--output", &arg(&output)])
        .args(["--compression", "zstd"])
        .assert()
        .success()
        .stdout(contains("Converted 3 rows"));

    let reader = ParquetRecordBatchReaderBuilder::try_new(File::open(&output)?)?.build()?;
    let mut rows = 0;
    for batch in reader {
        rows += batch?.num_rows();
    }
    assert_eq!(rows, 3);
    Ok(())
}

#[test]
fn convert_xml_with_record_path() -> TestResult {
    let tmp = TempDir::new()?;
    let input = tmp.path().join("orders.xml");
    write_file(
        &input,
        "<root><orders>\
         <order><id>1</id><item>pen</item></order>\
         <order><id>2</id><item>ink</item></order>\
         </orders></root>",
    )?;
    let output = tmp.path().join("orders.json");

    cli()
        .args(["convert", "--input", &arg(&input), "--output", &arg(&output)])
        .args(["--record-path", "root.orders.order", "--json-layout", "pretty"])
        .assert()
        .success()
        .stdout(contains("Converted 2 rows"));

    let text = std::fs::read_to_string(&output)?;
    assert!(text.starts_with('['));
    assert!(text.contains("\"item\": \"ink\""));
    Ok(())
}

#[test]
fn convert_rejects_unknown_extension() -> TestResult {
    let tmp = TempDir::new()?;
    let input = write_csv(&tmp, "input.csv", CLEAN_CSV)?;

    cli()
        .args(["convert", "--input", &arg(&input)])
        .args(["--output", &arg(&tmp.path().join("out.bin"))])
        .assert()
        .failure()
        .code(1)
        .stderr(contains("Could not infer the format"));
    Ok(())
}

#[test]
fn query_joins_named_tables() -> TestResult {
    let tmp = TempDir::new()?;
    let left = write_csv(&tmp, "left.csv", CLEAN_CSV)?;
    let right = tmp.path().join("scores.jsonl");
    write_file(
        &right,
        "{\"id\": 1, \"score\": 7}\n{\"id\": 2, \"score\": 8}\n{\"id\": 3, \"score\": 9}\n",
    )?;
    let output = tmp.path().join("joined.csv");

    cli()
        .args([
            "query",
            "--table",
            &format!("l={}", arg(&left)),
            "--table",
            &arg(&right),
            "--sql",
            "SELECT l.name, s.score FROM l JOIN scores s ON l.id = s.id ORDER BY s.score",
            "--max-rows",
            "2",
            "--output",
            &arg(&output),
        ])
        .assert()
        .success()
        .stdout(contains("Preview output"))
        .stdout(contains("total_rows: 3"))
        .stdout(contains("wrote:"));

    let written = std::fs::read_to_string(&output)?;
    assert_eq!(written.lines().count(), 4);
    Ok(())
}

#[test]
fn query_explain_prints_plan() -> TestResult {
    let tmp = TempDir::new()?;
    let input = write_csv(&tmp, "input.csv", CLEAN_CSV)?;

    cli()
        .args(["query", "--table", &format!("t={}", arg(&input))])
        .args(["--sql", "SELECT id FROM t WHERE value > 10", "--explain"])
        .assert()
        .success()
        .stdout(contains("logical_plan"));
    Ok(())
}

#[test]
fn query_reports_sql_errors() -> TestResult {
    cli()
        .args(["query", "--sql", "SELECT * FROM missing_table"])
        .assert()
        .failure()
        .code(1)
        .stderr(contains("missing_table"));
    Ok(())
}

#[test]
fn profile_prints_shape() -> TestResult {
    let tmp = TempDir::new()?;
    let input = write_csv(&tmp, "input.csv", "id,name\n1,a\n1,a\n2,\n")?;

    cli()
        .args(["profile", "--input", &arg(&input)])
        .assert()
        .success()
        .stdout(contains("rows: 3"))
        .stdout(contains("columns: 2"))
        .stdout(contains("duplicates: 1"));

    let out = cli()
        .args(["profile", "--input", &arg(&input), "--json"])
        .output()?;
    assert!(out.status.success());
    let json: serde_json::Value = serde_json::from_slice(&out.stdout)?;
    assert_eq!(json["rows"], 3);
    Ok(())
}

#[test]
fn validate_clean_file_succeeds() -> TestResult {
    let tmp = TempDir::new()?;
    let input = write_csv(&tmp, "input.csv", CLEAN_CSV)?;

    cli()
        .args(["validate", "--input", &arg(&input)])
        .assert()
        .success()
        .stdout(contains("failed: 0"))
        .stdout(contains("warnings: 0"));
    Ok(())
}

#[test]
fn validate_duplicate_ids_exits_1() -> TestResult {
    let tmp = TempDir::new()?;
    let input = write_csv(&tmp, "input.csv", DUPLICATE_ID_CSV)?;

    cli()
        .args(["validate", "--input", &arg(&input)])
        .assert()
        .failure()
        .code(1)
        .stdout(contains("Duplicate IDs found"));
    Ok(())
}

#[test]
fn validate_with_custom_suite() -> TestResult {
    let tmp = TempDir::new()?;
    let input = write_csv(&tmp, "input.csv", DUPLICATE_ID_CSV)?;
    let suite = tmp.path().join("suite.json");
    write_file(
        &suite,
        r#"{
            "name": "lenient",
            "checks": [
                {
                    "expectation": {"type": "values_unique", "column": "id"},
                    "on_failure": "warning",
                    "passed": "IDs are unique",
                    "failed": "Duplicate IDs found"
                }
            ]
        }"#,
    )?;

    cli()
        .args(["validate", "--input", &arg(&input), "--suite", &arg(&suite)])
        .arg("--json")
        .assert()
        .success()
        .stdout(contains("\"warnings\": [\n    \"Duplicate IDs found\""));
    Ok(())
}

#[test]
fn check_raw_missing_dir_succeeds() -> TestResult {
    let tmp = TempDir::new()?;

    cli()
        .args(["check-raw", "--dir", &arg(&tmp.path().join("data/raw"))])
        .assert()
        .success()
        .stdout(contains("No data directory found"));
    Ok(())
}

#[test]
fn check_raw_flags_ragged_file() -> TestResult {
    let tmp = TempDir::new()?;
    write_csv(&tmp, "raw/good.csv", "a,b\n1,2\n")?;
    write_csv(&tmp, "raw/bad.csv", "a,b\n1,2\n3,4,5,6\n")?;

    cli()
        .args(["check-raw", "--dir", &arg(&tmp.path().join("raw"))])
        .assert()
        .failure()
        .code(1)
        .stdout(contains("good.csv: 1 rows"))
        .stdout(contains("bad.csv: INVALID"));
    Ok(())
}

#[test]
fn delta_create_append_read_history() -> TestResult {
    let tmp = TempDir::new()?;
    let input = write_csv(&tmp, "input.csv", CLEAN_CSV)?;
    let table = tmp.path().join("delta/events");

    cli()
        .args(["delta", "create", "--source", &arg(&input), "--table", &arg(&table)])
        .assert()
        .success()
        .stdout(contains("version 0, 3 rows"));

    cli()
        .args(["delta", "append", "--source", &arg(&input), "--table", &arg(&table)])
        .assert()
        .success()
        .stdout(contains("(version 1)"));

    cli()
        .args(["delta", "read", "--table", &arg(&table)])
        .assert()
        .success()
        .stdout(contains("version: 1"))
        .stdout(contains("total_rows: 6"));

    cli()
        .args(["delta", "read", "--table", &arg(&table), "--version", "0"])
        .assert()
        .success()
        .stdout(contains("total_rows: 3"));

    cli()
        .args(["delta", "history", "--table", &arg(&table)])
        .assert()
        .success()
        .stdout(contains("version"))
        .stdout(contains("WRITE"));

    cli()
        .args(["delta", "query", "--table", &arg(&table), "--limit", "4"])
        .assert()
        .success()
        .stdout(contains("total_rows: 4"));

    cli()
        .args([
            "query",
            "--table",
            &format!("events={}", arg(&table)),
            "--sql",
            "SELECT COUNT(*) AS n FROM events",
        ])
        .assert()
        .success()
        .stdout(contains("6"));
    Ok(())
}
