//! The [`DataPipeline`] façade.

use std::{
    fs,
    path::{Path, PathBuf},
};

use dataops_core::{
    DataProfile, Dataset, DatasetError, FormatError, JsonLayout, ParquetCompression, ReadOptions,
    SheetSelector, ValidationReport, WriteOptions,
    formats::{self, Format},
    profile_data, storage, validate_data_quality,
};
use dataops_datafusion::{SqlError, SqlSession, VersionedError, VersionedTable};
use snafu::prelude::*;

/// Result alias for pipeline operations.
pub type PipelineResult<T> = Result<T, PipelineError>;

/// Errors raised by [`DataPipeline`] and the script entry points.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum PipelineError {
    /// The output directory could not be created or listed.
    #[snafu(display("Directory error at {path}: {source}"))]
    Directory {
        /// Directory path.
        path: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Reading or writing a file failed.
    #[snafu(display("{source}"))]
    Format {
        /// Underlying format error.
        source: FormatError,
    },

    /// A SQL step failed.
    #[snafu(display("{source}"))]
    Sql {
        /// Underlying session error.
        source: SqlError,
    },

    /// A Delta table step failed.
    #[snafu(display("{source}"))]
    Versioned {
        /// Underlying versioned-table error.
        source: VersionedError,
    },

    /// Profiling failed.
    #[snafu(display("Profiling failed: {source}"))]
    Profile {
        /// Underlying dataset error.
        source: DatasetError,
    },
}

/// One object that owns an output directory and a lazily created SQL
/// session, and forwards to the format, SQL, Delta, profiling and quality
/// façades.
#[derive(Debug)]
pub struct DataPipeline {
    output_dir: PathBuf,
    session: Option<SqlSession>,
}

impl DataPipeline {
    /// Create a pipeline writing into `output_dir` (created if missing).
    pub fn new(output_dir: impl AsRef<Path>) -> PipelineResult<Self> {
        let output_dir = output_dir.as_ref().to_path_buf();
        fs::create_dir_all(&output_dir).context(DirectorySnafu {
            path: output_dir.display().to_string(),
        })?;
        Ok(Self {
            output_dir,
            session: None,
        })
    }

    /// Directory that `write_*` and `create_delta_table` write into.
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    fn session(&mut self) -> &SqlSession {
        self.session.get_or_insert_with(SqlSession::new)
    }

    /// Read any supported format.
    pub fn read(&self, path: &Path, format: Format, opts: &ReadOptions) -> PipelineResult<Dataset> {
        log::info!("Reading {}: {}", format.as_str().to_uppercase(), path.display());
        let ds = formats::read(path, format, opts).context(FormatSnafu)?;
        log::info!("Loaded {} rows, {} columns", ds.num_rows(), ds.num_columns());
        Ok(ds)
    }

    /// Read a CSV file with default options.
    pub fn read_csv(&self, path: &Path) -> PipelineResult<Dataset> {
        self.read(path, Format::Csv, &ReadOptions::default())
    }

    /// Read a JSON or JSON Lines file.
    pub fn read_json(&self, path: &Path) -> PipelineResult<Dataset> {
        self.read(path, Format::Json, &ReadOptions::default())
    }

    /// Read a Parquet file.
    pub fn read_parquet(&self, path: &Path) -> PipelineResult<Dataset> {
        self.read(path, Format::Parquet, &ReadOptions::default())
    }

    /// Read an XML file, descending into `record_path` when given.
    pub fn read_xml(&self, path: &Path, record_path: Option<&str>) -> PipelineResult<Dataset> {
        let opts = ReadOptions {
            record_path: record_path.map(str::to_string),
            ..ReadOptions::default()
        };
        self.read(path, Format::Xml, &opts)
    }

    /// Read one sheet of a workbook.
    pub fn read_excel(&self, path: &Path, sheet: SheetSelector) -> PipelineResult<Dataset> {
        let opts = ReadOptions {
            sheet,
            ..ReadOptions::default()
        };
        self.read(path, Format::Excel, &opts)
    }

    /// Write `dataset` as Snappy Parquet into the output directory.
    pub fn write_parquet(&self, dataset: &Dataset, filename: &str) -> PipelineResult<PathBuf> {
        let path = self.output_dir.join(filename);
        let opts = WriteOptions {
            compression: ParquetCompression::Snappy,
            ..WriteOptions::default()
        };
        formats::write(dataset, &path, Format::Parquet, &opts).context(FormatSnafu)?;

        let size = storage::file_size(&path)
            .map(|bytes| bytes as f64 / (1024.0 * 1024.0))
            .unwrap_or_default();
        log::info!("Wrote Parquet: {} ({size:.2} MB)", path.display());
        Ok(path)
    }

    /// Write `dataset` as JSON Lines into the output directory.
    pub fn write_json(&self, dataset: &Dataset, filename: &str) -> PipelineResult<PathBuf> {
        let path = self.output_dir.join(filename);
        let opts = WriteOptions {
            json_layout: JsonLayout::Lines,
            ..WriteOptions::default()
        };
        formats::write(dataset, &path, Format::Json, &opts).context(FormatSnafu)?;
        log::info!("Wrote JSON: {}", path.display());
        Ok(path)
    }

    /// Write `dataset` as CSV into the output directory.
    pub fn write_csv(&self, dataset: &Dataset, filename: &str) -> PipelineResult<PathBuf> {
        let path = self.output_dir.join(filename);
        formats::write(dataset, &path, Format::Csv, &WriteOptions::default())
            .context(FormatSnafu)?;
        log::info!("Wrote CSV: {}", path.display());
        Ok(path)
    }

    /// Make `dataset` visible to SQL as `name`.
    pub fn register(&mut self, name: &str, dataset: &Dataset) -> PipelineResult<()> {
        self.session()
            .register_dataset(name, dataset)
            .context(SqlSnafu)
    }

    /// Run SQL over everything registered so far.
    pub async fn transform_sql(&mut self, query: &str) -> PipelineResult<Dataset> {
        self.session().sql(query).await.context(SqlSnafu)
    }

    /// Profile a dataset.
    pub fn profile_data(&self, dataset: &Dataset) -> PipelineResult<DataProfile> {
        profile_data(dataset).context(ProfileSnafu)
    }

    /// Run the default quality checklist.
    pub fn validate(&self, dataset: &Dataset) -> ValidationReport {
        validate_data_quality(dataset)
    }

    /// Create a Delta table `output_dir/<table_name>` from a CSV file.
    pub async fn create_delta_table(
        &self,
        csv_path: &Path,
        table_name: &str,
    ) -> PipelineResult<VersionedTable> {
        let ds = self.read_csv(csv_path)?;
        let table_path = self.output_dir.join(table_name);
        let table = VersionedTable::create(&table_path, &ds)
            .await
            .context(VersionedSnafu)?;
        log::info!(
            "Created Delta table at {} with columns {:?}",
            table_path.display(),
            ds.column_names()
        );
        Ok(table)
    }

    /// First `limit` rows of the latest version of a Delta table.
    pub async fn query_delta(&mut self, table_path: &Path, limit: usize) -> PipelineResult<Dataset> {
        let table = VersionedTable::open(table_path)
            .await
            .context(VersionedSnafu)?;
        let name = dataops_datafusion::default_table_name(table_path);
        table
            .query(self.session(), &name, limit)
            .await
            .context(VersionedSnafu)
    }

    /// Append `dataset` to a Delta table as one new version.
    pub async fn append_delta(
        &self,
        table_path: &Path,
        dataset: &Dataset,
    ) -> PipelineResult<VersionedTable> {
        let mut table = VersionedTable::open(table_path)
            .await
            .context(VersionedSnafu)?;
        table.append(dataset).await.context(VersionedSnafu)?;
        Ok(table)
    }

    /// Read a Delta table as of `version`.
    pub async fn time_travel(&self, table_path: &Path, version: i64) -> PipelineResult<Dataset> {
        let table = VersionedTable::open_version(table_path, version)
            .await
            .context(VersionedSnafu)?;
        table.to_dataset().await.context(VersionedSnafu)
    }

    /// Release the SQL session, if one was started.
    pub fn close(self) {
        if let Some(session) = self.session {
            session.close();
        }
    }
}
