//! Data-quality checks.
//!
//! A [`QualitySuite`] is an ordered list of [`Check`]s. Each check evaluates
//! one [`Expectation`] against a [`Dataset`] and files its message into the
//! `passed`, `failed` or `warnings` bucket of a [`ValidationReport`]. Checks
//! are independent: a check that cannot be evaluated (missing column,
//! non-numeric column, Arrow error) is logged and treated as not met, and
//! the remaining checks still run.
//!
//! The default suite is the fixed checklist used by `process-data` and
//! `dataops validate`; suites can also be stored as JSON.

use std::{collections::HashSet, io::Write, path::Path};

use arrow::array::{Array, Float64Array};
use arrow::compute::{cast, max, min};
use arrow::datatypes::DataType;
use arrow::error::ArrowError;
use arrow::row::{RowConverter, SortField};
use serde::{Deserialize, Serialize};
use snafu::prelude::*;

use crate::{
    dataset::{Dataset, DatasetError},
    storage::{OutputSink, StorageError, read_input_to_string},
};

/// Errors raised while evaluating a single expectation.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum ExpectationError {
    /// The column is missing or could not be materialized.
    #[snafu(display("{source}"))]
    Column {
        /// Underlying dataset error.
        source: DatasetError,
    },

    /// A range check was asked of a non-numeric column.
    #[snafu(display("Column {column} has non-numeric type {data_type}"))]
    NonNumeric {
        /// Column name.
        column: String,
        /// Its Arrow type.
        data_type: DataType,
    },

    /// An Arrow kernel failed.
    #[snafu(display("Arrow error while checking {column}: {source}"))]
    Kernel {
        /// Column being checked.
        column: String,
        /// Underlying Arrow error.
        source: ArrowError,
    },
}

/// Errors raised while loading or saving a suite file.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum SuiteError {
    /// Reading or writing the suite file failed.
    #[snafu(display("Suite file error: {source}"))]
    SuiteStorage {
        /// Underlying storage error.
        #[snafu(backtrace)]
        source: StorageError,
    },

    /// The suite file is not a valid suite document.
    #[snafu(display("Invalid suite file {path}: {source}"))]
    SuiteFormat {
        /// Suite file path.
        path: String,
        /// Underlying serde_json error.
        source: serde_json::Error,
    },
}

/// A single condition a dataset is expected to meet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Expectation {
    /// Column names equal `columns`, in order.
    ColumnsMatchOrderedList {
        /// Expected column names.
        columns: Vec<String>,
    },
    /// The column has no nulls.
    ValuesNotNull {
        /// Column to check.
        column: String,
    },
    /// Every non-null value lies within `[min, max]`.
    ValuesBetween {
        /// Column to check.
        column: String,
        /// Inclusive lower bound.
        min: f64,
        /// Inclusive upper bound.
        max: f64,
    },
    /// Non-null values are unique.
    ValuesUnique {
        /// Column to check.
        column: String,
    },
    /// The column has a signed or unsigned integer type.
    IntegerType {
        /// Column to check.
        column: String,
    },
}

impl Expectation {
    /// Evaluate against `dataset`. `Ok(false)` means the expectation is not met.
    pub fn evaluate(&self, dataset: &Dataset) -> Result<bool, ExpectationError> {
        match self {
            Expectation::ColumnsMatchOrderedList { columns } => {
                Ok(dataset.column_names() == *columns)
            }

            Expectation::ValuesNotNull { column } => {
                let col = dataset.column(column).context(ColumnSnafu)?;
                Ok(col.null_count() == 0)
            }

            Expectation::ValuesBetween { column, min: lo, max: hi } => {
                let col = dataset.column(column).context(ColumnSnafu)?;
                if !col.data_type().is_numeric() {
                    return NonNumericSnafu {
                        column: column.clone(),
                        data_type: col.data_type().clone(),
                    }
                    .fail();
                }

                let floats = cast(&col, &DataType::Float64).context(KernelSnafu {
                    column: column.clone(),
                })?;
                let floats = floats
                    .as_any()
                    .downcast_ref::<Float64Array>()
                    .ok_or_else(|| ExpectationError::Kernel {
                        column: column.clone(),
                        source: ArrowError::CastError(format!(
                            "expected Float64 after cast, found {}",
                            floats.data_type()
                        )),
                    })?;

                let below = min(floats).is_some_and(|v| v < *lo);
                let above = max(floats).is_some_and(|v| v > *hi);
                Ok(!below && !above)
            }

            Expectation::ValuesUnique { column } => {
                let col = dataset.column(column).context(ColumnSnafu)?;
                let converter = RowConverter::new(vec![SortField::new(col.data_type().clone())])
                    .context(KernelSnafu {
                        column: column.clone(),
                    })?;
                let rows = converter
                    .convert_columns(&[col.clone()])
                    .context(KernelSnafu {
                        column: column.clone(),
                    })?;

                let mut seen = HashSet::with_capacity(rows.num_rows());
                for (idx, row) in rows.iter().enumerate() {
                    if col.is_valid(idx) && !seen.insert(row) {
                        return Ok(false);
                    }
                }
                Ok(true)
            }

            Expectation::IntegerType { column } => {
                let col = dataset.column(column).context(ColumnSnafu)?;
                Ok(col.data_type().is_integer())
            }
        }
    }
}

/// Bucket a check's message goes into when its expectation is not met.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// Goes into `failed`.
    Failure,
    /// Goes into `warnings`.
    Warning,
}

/// One entry of a [`QualitySuite`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Check {
    /// Condition to evaluate.
    pub expectation: Expectation,
    /// Bucket used when the condition is not met.
    pub on_failure: Severity,
    /// Message recorded when the condition is met.
    pub passed: String,
    /// Message recorded when the condition is not met.
    pub failed: String,
}

impl Check {
    fn new(expectation: Expectation, on_failure: Severity, passed: &str, failed: &str) -> Self {
        Self {
            expectation,
            on_failure,
            passed: passed.to_string(),
            failed: failed.to_string(),
        }
    }
}

/// Outcome of running a suite: three lists of messages.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationReport {
    /// Messages of checks that were met.
    pub passed: Vec<String>,
    /// Messages of failure-severity checks that were not met.
    pub failed: Vec<String>,
    /// Messages of warning-severity checks that were not met.
    pub warnings: Vec<String>,
}

/// An ordered, reusable list of checks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualitySuite {
    /// Suite name, used in logs.
    pub name: String,
    /// Checks in evaluation order.
    pub checks: Vec<Check>,
}

impl Default for QualitySuite {
    /// The built-in checklist for `id`/`name`/`value`/`timestamp` datasets.
    fn default() -> Self {
        let id = || "id".to_string();
        Self {
            name: "data_quality_suite".to_string(),
            checks: vec![
                Check::new(
                    Expectation::ColumnsMatchOrderedList {
                        columns: ["id", "name", "value", "timestamp"]
                            .map(String::from)
                            .to_vec(),
                    },
                    Severity::Failure,
                    "Required columns present",
                    "Missing required columns",
                ),
                Check::new(
                    Expectation::ValuesNotNull { column: id() },
                    Severity::Failure,
                    "No nulls in id column",
                    "Nulls found in id column",
                ),
                Check::new(
                    Expectation::ValuesBetween {
                        column: "value".to_string(),
                        min: 0.0,
                        max: 1000.0,
                    },
                    Severity::Warning,
                    "Values within expected range",
                    "Some values outside expected range",
                ),
                Check::new(
                    Expectation::ValuesUnique { column: id() },
                    Severity::Failure,
                    "No duplicate IDs",
                    "Duplicate IDs found",
                ),
                Check::new(
                    Expectation::IntegerType { column: id() },
                    Severity::Warning,
                    "Correct data types",
                    "Unexpected data types",
                ),
            ],
        }
    }
}

impl QualitySuite {
    /// Load a suite from a JSON file.
    pub fn load(path: &Path) -> Result<Self, SuiteError> {
        let text = read_input_to_string(path).context(SuiteStorageSnafu)?;
        serde_json::from_str(&text).context(SuiteFormatSnafu {
            path: path.display().to_string(),
        })
    }

    /// Save the suite as pretty JSON.
    pub fn save(&self, path: &Path) -> Result<(), SuiteError> {
        let mut sink = OutputSink::create(path).context(SuiteStorageSnafu)?;
        serde_json::to_writer_pretty(sink.writer(), self).context(SuiteFormatSnafu {
            path: path.display().to_string(),
        })?;
        sink.writer()
            .write_all(b"\n")
            .map_err(|source| SuiteError::SuiteFormat {
                path: path.display().to_string(),
                source: serde_json::Error::io(source),
            })?;
        sink.finish().context(SuiteStorageSnafu)
    }

    /// Run every check and sort the messages into buckets.
    pub fn validate(&self, dataset: &Dataset) -> ValidationReport {
        let mut report = ValidationReport::default();

        for check in &self.checks {
            let met = match check.expectation.evaluate(dataset) {
                Ok(met) => met,
                Err(err) => {
                    log::warn!("{}: check could not be evaluated: {err}", check.failed);
                    false
                }
            };

            if met {
                report.passed.push(check.passed.clone());
            } else {
                match check.on_failure {
                    Severity::Failure => report.failed.push(check.failed.clone()),
                    Severity::Warning => report.warnings.push(check.failed.clone()),
                }
            }
        }

        log::info!(
            "Validation summary ({}): {} passed, {} failed, {} warnings",
            self.name,
            report.passed.len(),
            report.failed.len(),
            report.warnings.len()
        );
        if !report.failed.is_empty() {
            log::warn!("Failed checks: {:?}", report.failed);
        }

        report
    }
}

/// Run the default checklist.
pub fn validate_data_quality(dataset: &Dataset) -> ValidationReport {
    QualitySuite::default().validate(dataset)
}
