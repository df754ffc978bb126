//! Core building blocks for `dataops`.
//!
//! This crate provides the pieces that do not need a query engine:
//!
//! - [`Dataset`], the in-memory tabular value passed between every façade
//!   call (an Arrow schema plus record batches).
//! - Format readers and writers for CSV, JSON / JSON Lines, Parquet, XML and
//!   Excel (`formats` module). Parsing and encoding are delegated to the
//!   Arrow, Parquet, `roxmltree` and `calamine` crates.
//! - Data-quality checks that sort each expectation into passed, failed or
//!   warning buckets (`quality` module).
//! - Quick dataset profiling (`profile` module).
//! - Local output sinks with write-then-rename semantics (`storage` module).
//!
//! SQL and versioned tables live in `dataops-datafusion`; the `dataops`
//! crate ties everything together behind `DataPipeline`.
#![deny(missing_docs)]

pub mod dataset;
pub mod formats;
pub mod profile;
pub mod quality;
pub mod storage;

pub use dataset::{Dataset, DatasetError};
pub use formats::{
    CsvOptions, Format, FormatError, JsonLayout, ParquetCompression, ReadOptions, SheetSelector,
    WriteOptions,
};
pub use profile::{DataProfile, profile_data};
pub use quality::{
    Check, Expectation, QualitySuite, Severity, SuiteError, ValidationReport,
    validate_data_quality,
};
