//! Integration tests for versioned tables queried through a SQL session.
#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use std::fs;

use dataops_core::formats::{self, Format, ReadOptions};
use dataops_datafusion::{SqlSession, VersionedTable, default_table_name};
use tempfile::TempDir;

type TestResult = Result<(), Box<dyn std::error::Error>>;

#[tokio::test]
async fn csv_to_delta_to_sql() -> TestResult {
    let tmp = TempDir::new()?;
    let csv_path = tmp.path().join("input.csv");
    fs::write(
        &csv_path,
        "id,name,value,timestamp\n\
         1,a,1.5,2024-01-01T00:00:00\n\
         2,b,2.5,2024-01-02T00:00:00\n\
         3,c,3.5,2024-01-03T00:00:00\n",
    )?;

    let ds = formats::read(&csv_path, Format::Csv, &ReadOptions::default())?;
    let table_path = tmp.path().join("delta/events");
    let mut table = VersionedTable::create(&table_path, &ds).await?;
    table.append(&ds).await?;
    assert_eq!(table.version(), 1);

    let session = SqlSession::new();
    let name = default_table_name(&table_path);
    table.register(&session, &name)?;

    let out = session
        .sql("SELECT COUNT(*) AS n, SUM(value) AS total FROM events")
        .await?;
    assert_eq!(out.num_rows(), 1);
    assert_eq!(out.column_names(), vec!["n", "total"]);

    let v0 = VersionedTable::open_version(&table_path, 0).await?;
    v0.register(&session, "events_v0")?;
    assert_eq!(session.count_rows("events_v0").await?, 3);
    assert_eq!(session.count_rows("events").await?, 6);
    Ok(())
}

#[tokio::test]
async fn sql_over_registered_files() -> TestResult {
    let tmp = TempDir::new()?;
    let left = tmp.path().join("left.csv");
    let right = tmp.path().join("right.jsonl");
    fs::write(&left, "id,name\n1,a\n2,b\n")?;
    fs::write(&right, "{\"id\": 1, \"score\": 10}\n{\"id\": 2, \"score\": 20}\n")?;

    let session = SqlSession::new();
    session.register_file("l", &left, Format::Csv).await?;
    session.register_file("r", &right, Format::Json).await?;

    let out = session
        .sql("SELECT l.name, r.score FROM l JOIN r ON l.id = r.id ORDER BY r.score")
        .await?;
    assert_eq!(out.num_rows(), 2);
    session.close();
    Ok(())
}
