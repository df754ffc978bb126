//! Quick dataset profiling.

use std::collections::{BTreeMap, HashSet};

use arrow::array::Array;
use arrow::row::{RowConverter, SortField};
use serde::Serialize;
use snafu::prelude::*;

use crate::dataset::{ArrowSnafu, Dataset, DatasetError};

/// Shape and content summary of a dataset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DataProfile {
    /// Number of rows.
    pub rows: usize,
    /// Number of columns.
    pub columns: usize,
    /// Arrow buffer memory in bytes.
    pub memory_bytes: usize,
    /// Column count per Arrow type.
    pub dtypes: BTreeMap<String, usize>,
    /// Null count per column, in column order.
    pub missing_values: Vec<(String, usize)>,
    /// Rows that repeat an earlier row exactly.
    pub duplicates: usize,
}

impl DataProfile {
    /// Memory in mebibytes.
    pub fn memory_mb(&self) -> f64 {
        self.memory_bytes as f64 / (1024.0 * 1024.0)
    }
}

/// Profile a dataset.
pub fn profile_data(dataset: &Dataset) -> Result<DataProfile, DatasetError> {
    let schema = dataset.schema();

    let mut dtypes = BTreeMap::new();
    for field in schema.fields() {
        *dtypes.entry(field.data_type().to_string()).or_insert(0) += 1;
    }

    let missing_values = schema
        .fields()
        .iter()
        .map(|field| {
            let nulls = dataset
                .batches()
                .iter()
                .filter_map(|b| b.column_by_name(field.name()))
                .map(|c| c.null_count())
                .sum();
            (field.name().to_string(), nulls)
        })
        .collect();

    let profile = DataProfile {
        rows: dataset.num_rows(),
        columns: dataset.num_columns(),
        memory_bytes: dataset.memory_size(),
        dtypes,
        missing_values,
        duplicates: count_duplicate_rows(dataset)?,
    };

    log::info!(
        "Profiled {} rows x {} columns ({:.2} MB), {} duplicate rows",
        profile.rows,
        profile.columns,
        profile.memory_mb(),
        profile.duplicates
    );
    Ok(profile)
}

fn count_duplicate_rows(dataset: &Dataset) -> Result<usize, DatasetError> {
    if dataset.num_columns() == 0 || dataset.num_rows() == 0 {
        return Ok(0);
    }

    let fields = dataset
        .schema()
        .fields()
        .iter()
        .map(|f| SortField::new(f.data_type().clone()))
        .collect();
    let converter = RowConverter::new(fields).context(ArrowSnafu)?;

    let mut all_rows = Vec::with_capacity(dataset.batches().len());
    for batch in dataset.batches() {
        all_rows.push(converter.convert_columns(batch.columns()).context(ArrowSnafu)?);
    }

    let mut seen = HashSet::with_capacity(dataset.num_rows());
    let mut duplicates = 0;
    for rows in &all_rows {
        for row in rows.iter() {
            if !seen.insert(row) {
                duplicates += 1;
            }
        }
    }
    Ok(duplicates)
}
