//! Format reader/writer façade.
//!
//! Each supported [`Format`] maps to exactly one library call:
//!
//! | format  | read                        | write                         |
//! |---------|-----------------------------|-------------------------------|
//! | CSV     | `arrow_csv::ReaderBuilder`  | `arrow_csv::WriterBuilder`    |
//! | JSON    | `arrow_json` (lines / doc)  | `arrow_json::WriterBuilder`   |
//! | Parquet | `ParquetRecordBatchReader`  | `parquet::arrow::ArrowWriter` |
//! | XML     | `roxmltree` + `arrow_json`  | unsupported                   |
//! | Excel   | `calamine` + `arrow_json`   | unsupported                   |
//!
//! There is no schema validation, chunking or partial-failure recovery:
//! library errors are returned as the `source` of a [`FormatError`] that only
//! adds the offending path.

pub mod csv;
pub mod excel;
pub mod json;
pub mod parquet;
pub mod records;
pub mod xml;

use std::{fmt, path::Path, str::FromStr};

use arrow::error::ArrowError;
use snafu::{Backtrace, prelude::*};

use crate::{dataset::Dataset, storage::StorageError};

pub use self::{
    csv::{CsvOptions, read_csv, write_csv},
    excel::{SheetSelector, read_excel},
    json::{JsonLayout, read_json, write_json},
    parquet::{ParquetCompression, read_parquet, write_parquet},
    records::records_to_dataset,
    xml::read_xml,
};

/// Result alias used by every reader and writer.
pub type FormatResult<T> = Result<T, FormatError>;

/// Errors raised by format readers and writers.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum FormatError {
    /// Opening, creating or renaming a file failed.
    #[snafu(display("Storage error: {source}"))]
    Storage {
        /// Underlying storage error.
        #[snafu(backtrace)]
        source: StorageError,
    },

    /// The CSV reader or writer rejected the data.
    #[snafu(display("CSV error in {path}: {source}"))]
    Csv {
        /// File being read or written.
        path: String,
        /// Underlying Arrow CSV error.
        source: ArrowError,
    },

    /// The Arrow JSON reader or writer rejected the data.
    #[snafu(display("JSON error in {path}: {source}"))]
    Json {
        /// File being read or written.
        path: String,
        /// Underlying Arrow JSON error.
        source: ArrowError,
    },

    /// The file is neither JSON Lines nor a JSON document.
    #[snafu(display("Invalid JSON document in {path}: {source}"))]
    JsonDocument {
        /// File being read.
        path: String,
        /// Underlying serde_json error.
        source: serde_json::Error,
    },

    /// Parquet encoding or decoding failed.
    #[snafu(display("Parquet error in {path}: {source}"))]
    Parquet {
        /// File being read or written.
        path: String,
        /// Underlying Parquet error.
        source: ::parquet::errors::ParquetError,
    },

    /// Decoding Parquet row groups into Arrow batches failed.
    #[snafu(display("Failed to decode Parquet data in {path}: {source}"))]
    ParquetDecode {
        /// File being read.
        path: String,
        /// Underlying Arrow error.
        source: ArrowError,
    },

    /// The XML document could not be parsed.
    #[snafu(display("XML parse error in {path}: {source}"))]
    Xml {
        /// File being read.
        path: String,
        /// Underlying roxmltree error.
        source: roxmltree::Error,
    },

    /// A key on the dotted record path does not exist.
    #[snafu(display("Record path key '{key}' not found in {path} (record path '{record_path}')"))]
    RecordPathNotFound {
        /// File being read.
        path: String,
        /// Full dotted record path.
        record_path: String,
        /// First key that could not be resolved.
        key: String,
        /// Backtrace for debugging.
        backtrace: Backtrace,
    },

    /// The workbook could not be opened or the sheet could not be read.
    #[snafu(display("Excel error in {path}: {source}"))]
    Excel {
        /// Workbook path.
        path: String,
        /// Underlying calamine error.
        source: calamine::Error,
    },

    /// The requested sheet does not exist.
    #[snafu(display("Sheet {sheet} not found in {path}"))]
    SheetNotFound {
        /// Workbook path.
        path: String,
        /// Requested sheet.
        sheet: SheetSelector,
    },

    /// JSON-shaped records could not be turned into Arrow batches.
    #[snafu(display("Failed to build dataset from records in {path}: {source}"))]
    Records {
        /// Source file of the records.
        path: String,
        /// Underlying Arrow error.
        source: ArrowError,
    },

    /// CSV cannot represent nested columns.
    #[snafu(display("CSV output does not support column '{field}' of type {data_type}"))]
    CsvUnsupportedType {
        /// Offending column.
        field: String,
        /// Its Arrow type.
        data_type: String,
    },

    /// The format has a reader but no writer.
    #[snafu(display("Writing {format} is not supported"))]
    UnsupportedWrite {
        /// Requested output format.
        format: Format,
    },

    /// The format tag or file extension is not recognised.
    #[snafu(display("Unknown data format '{spec}'"))]
    UnknownFormat {
        /// Tag or extension that failed to parse.
        spec: String,
    },
}

/// File formats understood by the façade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Format {
    /// Comma-separated values with a header row.
    Csv,
    /// JSON Lines, or a JSON array of records.
    Json,
    /// Apache Parquet.
    Parquet,
    /// XML flattened through a dotted record path.
    Xml,
    /// Excel / OpenDocument spreadsheet (one sheet).
    Excel,
}

impl Format {
    /// Detect the format from a file extension.
    pub fn from_path(path: &Path) -> FormatResult<Self> {
        let ext = path
            .extension()
            .map(|e| e.to_string_lossy().to_string())
            .unwrap_or_default();

        ext.parse().map_err(|_| FormatError::UnknownFormat {
            spec: path.display().to_string(),
        })
    }

    /// Lowercase tag used in messages and CLI flags.
    pub fn as_str(&self) -> &'static str {
        match self {
            Format::Csv => "csv",
            Format::Json => "json",
            Format::Parquet => "parquet",
            Format::Xml => "xml",
            Format::Excel => "excel",
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Format {
    type Err = FormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "csv" => Ok(Format::Csv),
            "json" | "jsonl" | "ndjson" => Ok(Format::Json),
            "parquet" | "pq" => Ok(Format::Parquet),
            "xml" => Ok(Format::Xml),
            "excel" | "xlsx" | "xls" | "xlsm" | "xlsb" | "ods" => Ok(Format::Excel),
            other => UnknownFormatSnafu { spec: other }.fail(),
        }
    }
}

/// Format-specific knobs for [`read`].
#[derive(Debug, Clone, Default)]
pub struct ReadOptions {
    /// CSV parsing options.
    pub csv: CsvOptions,
    /// Sheet to load from a workbook.
    pub sheet: SheetSelector,
    /// Dotted path to the records inside an XML document.
    pub record_path: Option<String>,
}

/// Format-specific knobs for [`write`].
#[derive(Debug, Clone, Copy, Default)]
pub struct WriteOptions {
    /// Parquet compression codec.
    pub compression: ParquetCompression,
    /// JSON output layout.
    pub json_layout: JsonLayout,
}

/// Read `path` as `format`.
pub fn read(path: &Path, format: Format, opts: &ReadOptions) -> FormatResult<Dataset> {
    match format {
        Format::Csv => read_csv(path, &opts.csv),
        Format::Json => read_json(path),
        Format::Parquet => read_parquet(path),
        Format::Xml => read_xml(path, opts.record_path.as_deref()),
        Format::Excel => read_excel(path, &opts.sheet),
    }
}

/// Write `dataset` to `path` as `format`.
pub fn write(
    dataset: &Dataset,
    path: &Path,
    format: Format,
    opts: &WriteOptions,
) -> FormatResult<()> {
    match format {
        Format::Csv => write_csv(dataset, path),
        Format::Json => write_json(dataset, path, opts.json_layout),
        Format::Parquet => write_parquet(dataset, path, opts.compression),
        Format::Xml | Format::Excel => UnsupportedWriteSnafu { format }.fail(),
    }
}

fn display_path(path: &Path) -> String {
    path.display().to_string()
}
