//! Terminal rendering of datasets, reports and table history.

use std::io::Write;

use arrow::util::display::{ArrayFormatter, FormatOptions};
use dataops::{CsvCheckReport, CsvFileStatus, DataProfile, Dataset, HistoryEntry, ValidationReport};
use snafu::prelude::*;
use tabled::{
    builder::Builder,
    settings::{Style, object::Rows, style::LineText, width::MinWidth},
};

use crate::error::{CliResult, JsonSnafu, PreviewSnafu, StdoutSnafu};

/// Label drawn into the top border of a preview table.
const PREVIEW_LABEL: &str = "Preview output";
/// Border characters before the label.
const LABEL_OFFSET: usize = 6;

/// The first rows of a dataset, formatted as strings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Preview {
    /// Column names.
    pub columns: Vec<String>,
    /// At most `max_rows` formatted rows.
    pub rows: Vec<Vec<String>>,
    /// Row count of the whole dataset.
    pub total_rows: usize,
    /// Row limit the preview was taken with.
    pub max_rows: usize,
}

impl Preview {
    /// Format up to `max_rows` rows of `dataset`.
    pub fn from_dataset(dataset: &Dataset, max_rows: usize) -> CliResult<Self> {
        let options = FormatOptions::default();
        let mut rows = Vec::new();

        'batches: for batch in dataset.batches() {
            let formatters = batch
                .columns()
                .iter()
                .map(|col| ArrayFormatter::try_new(col.as_ref(), &options))
                .collect::<Result<Vec<_>, _>>()
                .context(PreviewSnafu)?;

            for i in 0..batch.num_rows() {
                if rows.len() >= max_rows {
                    break 'batches;
                }
                let row = formatters
                    .iter()
                    .map(|f| f.value(i).try_to_string())
                    .collect::<Result<Vec<_>, _>>()
                    .context(PreviewSnafu)?;
                rows.push(row);
            }
        }

        Ok(Self {
            columns: dataset.column_names(),
            rows,
            total_rows: dataset.num_rows(),
            max_rows,
        })
    }

    /// Table, optional note and `total_rows` line.
    pub fn write_to<W: Write>(&self, out: &mut W) -> CliResult<()> {
        let show_table = !self.rows.is_empty() || self.max_rows == 0;
        if show_table && !self.columns.is_empty() {
            writeln!(out, "{}", self.table()).context(StdoutSnafu)?;
        }

        if let Some(message) = self.message() {
            writeln!(out, "{message}").context(StdoutSnafu)?;
        }

        writeln!(out, "total_rows: {}", self.total_rows).context(StdoutSnafu)?;
        Ok(())
    }

    /// Header and rows in a rounded grid, wide enough for the label.
    pub fn table(&self) -> String {
        let records = std::iter::once(&self.columns).chain(&self.rows);
        let mut table = Builder::from_iter(records.map(|r| r.iter().cloned())).build();

        let min_width = LABEL_OFFSET + PREVIEW_LABEL.len() + 4;
        table
            .with(Style::rounded())
            .with(MinWidth::new(min_width))
            .with(LineText::new(PREVIEW_LABEL, Rows::first()).offset(LABEL_OFFSET))
            // The label resets the width estimate.
            .with(MinWidth::new(min_width));
        table.to_string()
    }

    fn message(&self) -> Option<&'static str> {
        if self.max_rows == 0 && self.total_rows > 0 {
            return Some("(preview suppressed; use --max-rows > 0)");
        }
        if self.total_rows == 0 {
            return Some("(no rows)");
        }
        None
    }
}

/// Print a validation report as three lists, or as JSON.
pub fn write_report<W: Write>(report: &ValidationReport, json: bool, out: &mut W) -> CliResult<()> {
    if json {
        let text = serde_json::to_string_pretty(report).context(JsonSnafu)?;
        writeln!(out, "{text}").context(StdoutSnafu)?;
        return Ok(());
    }

    for (label, messages) in [
        ("passed", &report.passed),
        ("failed", &report.failed),
        ("warnings", &report.warnings),
    ] {
        writeln!(out, "{label}: {}", messages.len()).context(StdoutSnafu)?;
        for message in messages {
            writeln!(out, "  - {message}").context(StdoutSnafu)?;
        }
    }
    Ok(())
}

/// Print a profile as `key: value` lines, or as JSON.
pub fn write_profile<W: Write>(profile: &DataProfile, json: bool, out: &mut W) -> CliResult<()> {
    if json {
        let text = serde_json::to_string_pretty(profile).context(JsonSnafu)?;
        writeln!(out, "{text}").context(StdoutSnafu)?;
        return Ok(());
    }

    writeln!(out, "rows: {}", profile.rows).context(StdoutSnafu)?;
    writeln!(out, "columns: {}", profile.columns).context(StdoutSnafu)?;
    writeln!(out, "memory_mb: {:.2}", profile.memory_mb()).context(StdoutSnafu)?;
    writeln!(out, "dtypes:").context(StdoutSnafu)?;
    for (dtype, count) in &profile.dtypes {
        writeln!(out, "  {dtype}: {count}").context(StdoutSnafu)?;
    }
    writeln!(out, "missing_values:").context(StdoutSnafu)?;
    for (column, count) in &profile.missing_values {
        writeln!(out, "  {column}: {count}").context(StdoutSnafu)?;
    }
    writeln!(out, "duplicates: {}", profile.duplicates).context(StdoutSnafu)?;
    Ok(())
}

/// Print table history, newest first.
pub fn write_history<W: Write>(entries: &[HistoryEntry], out: &mut W) -> CliResult<()> {
    if entries.is_empty() {
        writeln!(out, "(no history)").context(StdoutSnafu)?;
        return Ok(());
    }

    let mut builder = Builder::default();
    builder.push_record(["version", "timestamp", "operation"]);
    for entry in entries {
        builder.push_record([
            entry.version.to_string(),
            entry
                .timestamp()
                .map(|ts| ts.to_rfc3339())
                .unwrap_or_default(),
            entry.operation.clone().unwrap_or_default(),
        ]);
    }

    let mut table = builder.build();
    table.with(Style::rounded());
    writeln!(out, "{table}").context(StdoutSnafu)?;
    Ok(())
}

/// Print one line per checked raw file.
pub fn write_csv_check<W: Write>(report: &CsvCheckReport, out: &mut W) -> CliResult<()> {
    if !report.dir_exists {
        writeln!(out, "No data directory found, skipping validation").context(StdoutSnafu)?;
        return Ok(());
    }
    if report.files.is_empty() {
        writeln!(out, "No CSV files found").context(StdoutSnafu)?;
        return Ok(());
    }

    for file in &report.files {
        match &file.status {
            CsvFileStatus::Valid(rows) => {
                writeln!(out, "{}: {rows} rows", file.path.display()).context(StdoutSnafu)?
            }
            CsvFileStatus::Invalid(reason) => {
                writeln!(out, "{}: INVALID - {reason}", file.path.display()).context(StdoutSnafu)?
            }
        }
    }
    Ok(())
}
