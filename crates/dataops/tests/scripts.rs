//! Integration tests for the batch entry points.
#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use std::fs;

use arrow::array::{Array, Int64Array};
use dataops::prelude::*;
use tempfile::TempDir;

type TestResult = Result<(), Box<dyn std::error::Error>>;

const UNSORTED: &str = "id,name,value,timestamp\n\
                        3,c,30.0,2024-01-03T00:00:00\n\
                        1,a,10.0,2024-01-01T00:00:00\n\
                        2,b,20.0,2024-01-02T00:00:00\n";

#[tokio::test]
async fn process_data_sorts_and_stamps_rows() -> TestResult {
    let tmp = TempDir::new()?;
    let input = tmp.path().join("data/raw/input.csv");
    fs::create_dir_all(tmp.path().join("data/raw"))?;
    fs::write(&input, UNSORTED)?;
    let output = tmp.path().join("data/output/result.parquet");

    let rows = process_data(&input, &output).await?;
    assert_eq!(rows, 3);

    let pipeline = DataPipeline::new(tmp.path().join("data/output"))?;
    let ds = pipeline.read_parquet(&output)?;
    assert_eq!(
        ds.column_names(),
        vec!["id", "name", "value", "timestamp", "processed_at"]
    );

    let ids = ds.column("id")?;
    let ids = ids.as_any().downcast_ref::<Int64Array>().unwrap();
    assert_eq!(ids.values().to_vec(), vec![1, 2, 3]);
    assert_eq!(ds.column("processed_at")?.null_count(), 0);
    Ok(())
}

#[tokio::test]
async fn process_data_reports_missing_input() -> TestResult {
    let tmp = TempDir::new()?;
    let err = process_data(
        &tmp.path().join("missing.csv"),
        &tmp.path().join("out.parquet"),
    )
    .await
    .expect_err("input does not exist");
    assert!(matches!(err, PipelineError::Sql { .. }));
    assert!(!tmp.path().join("out.parquet").exists());
    Ok(())
}

#[test]
fn convert_csv_to_json_writes_array() -> TestResult {
    let tmp = TempDir::new()?;
    let input = tmp.path().join("input.csv");
    fs::write(&input, UNSORTED)?;
    let output = tmp.path().join("nested/result.json");

    let rows = convert_csv_to_json(&input, &output)?;
    assert_eq!(rows, 3);

    let text = fs::read_to_string(&output)?;
    assert!(text.starts_with("[\n  {"));
    assert!(text.contains("\"name\": \"c\""));
    Ok(())
}

#[test]
fn default_suite_flags_duplicate_ids() -> TestResult {
    let tmp = TempDir::new()?;
    let input = tmp.path().join("input.csv");
    fs::write(
        &input,
        "id,name,value,timestamp\n1,a,1,2024-01-01T00:00:00\n1,b,2,2024-01-02T00:00:00\n",
    )?;

    let pipeline = DataPipeline::new(tmp.path().join("out"))?;
    let ds = pipeline.read_csv(&input)?;
    let report = pipeline.validate(&ds);
    assert_eq!(report.failed, vec!["Duplicate IDs found"]);
    Ok(())
}
