//! Excel / OpenDocument reader.
//!
//! One sheet is loaded per call. Its first row supplies the column names
//! (blank cells become `Unnamed: <index>`, repeated names get a `.<n>`
//! suffix) and every following row becomes a record.

use std::{collections::HashMap, convert::Infallible, fmt, path::Path, str::FromStr};

use calamine::{Data, Reader, open_workbook_auto};
use serde_json::{Map, Number, Value};
use snafu::prelude::*;

use crate::{dataset::Dataset, storage::open_input};

use super::{
    ExcelSnafu, FormatResult, SheetNotFoundSnafu, StorageSnafu, display_path,
    records::records_to_dataset,
};

/// Which sheet of a workbook to read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SheetSelector {
    /// Sheet by name.
    Name(String),
    /// Sheet by zero-based position.
    Index(usize),
}

impl Default for SheetSelector {
    fn default() -> Self {
        SheetSelector::Index(0)
    }
}

impl fmt::Display for SheetSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SheetSelector::Name(name) => write!(f, "'{name}'"),
            SheetSelector::Index(idx) => write!(f, "#{idx}"),
        }
    }
}

impl FromStr for SheetSelector {
    type Err = Infallible;

    /// Digits select by position, anything else by name.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim().parse::<usize>() {
            Ok(idx) => SheetSelector::Index(idx),
            Err(_) => SheetSelector::Name(s.to_string()),
        })
    }
}

/// Read one sheet of a workbook.
pub fn read_excel(path: &Path, sheet: &SheetSelector) -> FormatResult<Dataset> {
    // Surface a missing file as a storage error, like every other reader.
    drop(open_input(path).context(StorageSnafu)?);

    let mut workbook = open_workbook_auto(path).context(ExcelSnafu {
        path: display_path(path),
    })?;

    let names = workbook.sheet_names();
    let name = match sheet {
        SheetSelector::Name(name) if names.contains(name) => name.clone(),
        SheetSelector::Index(idx) if *idx < names.len() => names[*idx].clone(),
        _ => {
            return SheetNotFoundSnafu {
                path: display_path(path),
                sheet: sheet.clone(),
            }
            .fail();
        }
    };

    let range = workbook.worksheet_range(&name).context(ExcelSnafu {
        path: display_path(path),
    })?;

    let records = rows_to_records(range.rows());
    log::debug!(
        "read {} rows from sheet '{name}' of {}",
        records.len(),
        path.display()
    );
    records_to_dataset(&records, path)
}

/// Turn sheet rows into JSON records keyed by the header row.
pub fn rows_to_records<'a>(mut rows: impl Iterator<Item = &'a [Data]>) -> Vec<Value> {
    let Some(header) = rows.next() else {
        return Vec::new();
    };
    let columns = header_names(header);

    rows.map(|row| {
        let mut record = Map::with_capacity(columns.len());
        for (idx, column) in columns.iter().enumerate() {
            let value = row.get(idx).map(cell_to_value).unwrap_or(Value::Null);
            record.insert(column.clone(), value);
        }
        Value::Object(record)
    })
    .collect()
}

fn header_names(header: &[Data]) -> Vec<String> {
    let mut seen: HashMap<String, usize> = HashMap::new();
    header
        .iter()
        .enumerate()
        .map(|(idx, cell)| {
            let base = match cell {
                Data::Empty => format!("Unnamed: {idx}"),
                other => {
                    let text = other.to_string();
                    if text.trim().is_empty() {
                        format!("Unnamed: {idx}")
                    } else {
                        text
                    }
                }
            };
            let count = seen.entry(base.clone()).or_insert(0);
            let name = if *count == 0 {
                base
            } else {
                format!("{base}.{count}")
            };
            *count += 1;
            name
        })
        .collect()
}

fn cell_to_value(cell: &Data) -> Value {
    match cell {
        Data::Empty | Data::Error(_) => Value::Null,
        Data::Int(i) => Value::from(*i),
        Data::Float(f) if f.fract() == 0.0 && f.abs() < i64::MAX as f64 => Value::from(*f as i64),
        Data::Float(f) => Number::from_f64(*f).map(Value::Number).unwrap_or(Value::Null),
        Data::Bool(b) => Value::Bool(*b),
        Data::String(s) if s.is_empty() => Value::Null,
        Data::String(s) => Value::String(s.clone()),
        other => Value::String(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use tempfile::TempDir;

    use super::*;
    use crate::formats::FormatError;

    type TestResult = Result<(), Box<dyn std::error::Error>>;

    #[test]
    fn header_row_names_columns() {
        let rows = [
            vec![
                Data::String("id".into()),
                Data::Empty,
                Data::String("id".into()),
            ],
            vec![Data::Float(1.0), Data::String("x".into()), Data::Float(2.5)],
            vec![Data::Int(2), Data::Empty],
        ];

        let records = rows_to_records(rows.iter().map(Vec::as_slice));
        assert_eq!(
            records,
            vec![
                json!({"id": 1, "Unnamed: 1": "x", "id.1": 2.5}),
                json!({"id": 2, "Unnamed: 1": null, "id.1": null}),
            ]
        );
    }

    #[test]
    fn empty_sheet_has_no_records() {
        let rows: Vec<Vec<Data>> = Vec::new();
        assert!(rows_to_records(rows.iter().map(Vec::as_slice)).is_empty());
    }

    #[test]
    fn parses_sheet_selector() {
        assert_eq!("2".parse::<SheetSelector>(), Ok(SheetSelector::Index(2)));
        assert_eq!(
            "Sheet1".parse::<SheetSelector>(),
            Ok(SheetSelector::Name("Sheet1".to_string()))
        );
    }

    #[test]
    fn missing_workbook_is_storage_error() -> TestResult {
        let tmp = TempDir::new()?;
        let err = read_excel(&tmp.path().join("input.xlsx"), &SheetSelector::default())
            .expect_err("workbook does not exist");
        assert!(matches!(err, FormatError::Storage { .. }));
        Ok(())
    }
}
