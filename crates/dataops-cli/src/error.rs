//! Error type of the command-line tools.

use std::path::PathBuf;

use dataops::{
    DatasetError, FormatError, PipelineError, SqlError, VersionedError, quality::SuiteError,
};
use snafu::Snafu;

/// Result alias for command handlers.
pub type CliResult<T> = std::result::Result<T, CliError>;

/// Everything a command can fail with.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum CliError {
    /// `--from`/`--to` was omitted and the extension says nothing.
    #[snafu(display("Could not infer the format of {}: {source}", path.display()))]
    InferFormat {
        /// File whose extension was inspected.
        path: PathBuf,
        /// Underlying format error.
        source: FormatError,
    },

    /// Reading an input file failed.
    #[snafu(display("Failed to read {}: {source}", path.display()))]
    ReadInput {
        /// Input path.
        path: PathBuf,
        /// Underlying format error.
        source: FormatError,
    },

    /// Writing an output file failed.
    #[snafu(display("Failed to write {}: {source}", path.display()))]
    WriteOutput {
        /// Output path.
        path: PathBuf,
        /// Underlying format error.
        source: FormatError,
    },

    /// A batch pipeline step failed.
    #[snafu(display("{source}"))]
    Pipeline {
        /// Underlying pipeline error.
        source: PipelineError,
    },

    /// A SQL step failed.
    #[snafu(display("{source}"))]
    Sql {
        /// Underlying session error.
        source: SqlError,
    },

    /// A Delta table step failed.
    #[snafu(display("{source}"))]
    Delta {
        /// Underlying versioned-table error.
        #[snafu(source(from(VersionedError, Box::new)))]
        source: Box<VersionedError>,
    },

    /// A quality suite file could not be loaded.
    #[snafu(display("{source}"))]
    Suite {
        /// Underlying suite error.
        source: SuiteError,
    },

    /// Profiling failed.
    #[snafu(display("Profiling failed: {source}"))]
    Profile {
        /// Underlying dataset error.
        source: DatasetError,
    },

    /// A cell could not be formatted for the preview.
    #[snafu(display("Failed to format preview: {source}"))]
    Preview {
        /// Underlying Arrow error.
        source: arrow::error::ArrowError,
    },

    /// A report could not be serialized as JSON.
    #[snafu(display("Failed to serialize report: {source}"))]
    Json {
        /// Underlying serde error.
        source: serde_json::Error,
    },

    /// Writing to stdout failed.
    #[snafu(display("Failed to write output: {source}"))]
    Stdout {
        /// Underlying I/O error.
        source: std::io::Error,
    },
}
