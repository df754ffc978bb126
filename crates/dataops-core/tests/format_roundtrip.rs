//! Integration tests for moving one dataset through every writable format.
#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use std::fs;

use dataops_core::formats::{self, Format, JsonLayout, ReadOptions, WriteOptions};
use dataops_core::{ParquetCompression, profile_data, validate_data_quality};
use tempfile::TempDir;

type TestResult = Result<(), Box<dyn std::error::Error>>;

const INPUT: &str = "\
id,name,value,timestamp
1,alpha,10.5,2024-01-01T00:00:00
2,beta,20.0,2024-01-02T00:00:00
3,gamma,,2024-01-03T00:00:00
4,delta,999.9,2024-01-04T00:00:00
";

#[test]
fn csv_json_parquet_keep_rows_and_columns() -> TestResult {
    let tmp = TempDir::new()?;
    let csv_path = tmp.path().join("raw/input.csv");
    fs::create_dir_all(tmp.path().join("raw"))?;
    fs::write(&csv_path, INPUT)?;

    let original = formats::read(&csv_path, Format::Csv, &ReadOptions::default())?;
    assert_eq!(original.num_rows(), 4);

    let targets = [
        ("out/result.json", Format::Json, JsonLayout::Lines),
        ("out/result_array.json", Format::Json, JsonLayout::PrettyArray),
        ("out/result.parquet", Format::Parquet, JsonLayout::Lines),
        ("out/result.csv", Format::Csv, JsonLayout::Lines),
    ];

    for (rel, format, json_layout) in targets {
        let path = tmp.path().join(rel);
        let opts = WriteOptions {
            compression: ParquetCompression::Zstd,
            json_layout,
        };
        formats::write(&original, &path, format, &opts)?;

        let detected = Format::from_path(&path)?;
        assert_eq!(detected, format);

        let back = formats::read(&path, detected, &ReadOptions::default())?;
        assert_eq!(back.num_rows(), original.num_rows(), "{rel}");
        assert_eq!(back.column_names(), original.column_names(), "{rel}");
    }

    Ok(())
}

#[test]
fn csv_input_profiles_and_validates() -> TestResult {
    let tmp = TempDir::new()?;
    let csv_path = tmp.path().join("input.csv");
    fs::write(&csv_path, INPUT)?;

    let ds = formats::read(&csv_path, Format::Csv, &ReadOptions::default())?;

    let profile = profile_data(&ds)?;
    assert_eq!(profile.rows, 4);
    assert_eq!(profile.columns, 4);
    assert_eq!(profile.duplicates, 0);
    assert!(
        profile
            .missing_values
            .contains(&("value".to_string(), 1))
    );

    let report = validate_data_quality(&ds);
    assert!(report.failed.is_empty(), "{report:?}");
    assert!(report.warnings.is_empty(), "{report:?}");
    Ok(())
}

#[test]
fn xml_records_reach_parquet() -> TestResult {
    let tmp = TempDir::new()?;
    let xml_path = tmp.path().join("input.xml");
    fs::write(
        &xml_path,
        "<root><items>\
         <item><id>1</id><name>a</name></item>\
         <item><id>2</id><name>b</name></item>\
         </items></root>",
    )?;

    let opts = ReadOptions {
        record_path: Some("root.items.item".to_string()),
        ..ReadOptions::default()
    };
    let ds = formats::read(&xml_path, Format::Xml, &opts)?;
    assert_eq!(ds.num_rows(), 2);

    let out = tmp.path().join("items.parquet");
    formats::write(&ds, &out, Format::Parquet, &WriteOptions::default())?;
    let back = formats::read(&out, Format::Parquet, &ReadOptions::default())?;
    assert_eq!(back.column_names(), vec!["id", "name"]);
    Ok(())
}
