//! # dataops
//!
//! Thin façades for moving tabular data between CSV, JSON, Parquet, XML,
//! Excel and Delta Lake tables, with SQL transforms, profiling and
//! data-quality checks along the way.
//!
//! This crate is the supported public entry point. It re-exports the pieces
//! of `dataops-core` and `dataops-datafusion` and adds [`DataPipeline`] plus
//! the batch entry points used by the command-line tools.
//!
//! ## Example
//!
//! ```rust,ignore
//! use dataops::prelude::*;
//!
//! let mut pipeline = DataPipeline::new("data/output")?;
//! let ds = pipeline.read_csv(Path::new("data/raw/input.csv"))?;
//! pipeline.register("input", &ds)?;
//! let summary = pipeline.transform_sql("SELECT name, SUM(value) FROM input GROUP BY name").await?;
//! pipeline.write_parquet(&summary, "summary.parquet")?;
//! ```

/// Convenience prelude with the stable, supported surface.
pub mod prelude;

mod pipeline;
mod scripts;

pub use pipeline::{DataPipeline, PipelineError, PipelineResult};
pub use scripts::{
    CsvCheckReport, CsvFileCheck, CsvFileStatus, DEFAULT_INPUT, DEFAULT_JSON_OUTPUT,
    DEFAULT_PARQUET_OUTPUT, DEFAULT_RAW_DIR, convert_csv_to_json, process_data,
    validate_csv_files,
};

/// Format readers and writers.
pub mod formats {
    pub use dataops_core::formats::*;
}

/// Data-quality suites and checks.
pub mod quality {
    pub use dataops_core::quality::*;
}

/// SQL sessions and Delta tables.
pub mod sql {
    pub use dataops_datafusion::*;
}

pub use dataops_core::{
    DataProfile, Dataset, DatasetError, Format, FormatError, QualitySuite, ValidationReport,
    profile_data, validate_data_quality,
};
pub use dataops_datafusion::{HistoryEntry, SqlError, SqlSession, VersionedError, VersionedTable};
