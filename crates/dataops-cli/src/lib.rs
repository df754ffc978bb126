//! Shared pieces of the `dataops`, `process-data` and `convert-csv`
//! binaries: the error type, logging setup and terminal rendering.

use std::path::Path;

use dataops::{
    ValidationReport,
    formats::{CsvOptions, read_csv},
    validate_data_quality,
};
use snafu::prelude::*;

use crate::error::{CliResult, ReadInputSnafu};

pub mod error;
pub mod logging;
pub mod render;

/// How a command ended when it did not error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Everything succeeded.
    Success,
    /// The command ran, but a data check reported failures.
    ChecksFailed,
}

impl Outcome {
    /// Process exit code for this outcome.
    pub fn exit_code(self) -> i32 {
        match self {
            Outcome::Success => 0,
            Outcome::ChecksFailed => 1,
        }
    }
}

/// Read a CSV file and run the default quality checklist on it.
pub fn validate_input(path: &Path) -> CliResult<ValidationReport> {
    let dataset = read_csv(path, &CsvOptions::default()).context(ReadInputSnafu { path })?;
    Ok(validate_data_quality(&dataset))
}
