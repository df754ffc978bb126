//! Wrapper prelude.
//!
//! Downstream code should prefer importing from this prelude instead of
//! depending on the `dataops-core` or `dataops-datafusion` module paths.

pub use crate::{
    DataPipeline, DataProfile, Dataset, Format, HistoryEntry, PipelineError, QualitySuite,
    SqlSession, ValidationReport, VersionedTable, convert_csv_to_json, process_data,
    validate_csv_files,
};
pub use dataops_core::{
    CsvOptions, JsonLayout, ParquetCompression, ReadOptions, SheetSelector, WriteOptions,
};
