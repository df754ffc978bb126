//! Versioned tables backed by Delta Lake.
//!
//! Every write is one atomic Delta commit. The first write creates version 0
//! and each append adds exactly one version. Reads can target any earlier
//! version (time travel). Versioning, conflict handling and the transaction
//! log all belong to `deltalake`; this module only forwards to it.

use std::{
    fs,
    path::{Path, PathBuf},
    sync::Arc,
};

use arrow::array::{ArrayRef, RecordBatch};
use arrow::compute::{CastOptions, cast_with_options};
use arrow::datatypes::{DataType, Field, Schema, TimeUnit};
use arrow::error::ArrowError;
use chrono::{DateTime, Utc};
use dataops_core::{Dataset, DatasetError};
use deltalake::datafusion::{error::DataFusionError, prelude::SessionContext};
use deltalake::{DeltaOps, DeltaTable, DeltaTableError, protocol::SaveMode};
use snafu::prelude::*;

use crate::{
    identifier::quote_identifier,
    session::{SqlError, SqlSession},
};

/// Result alias for versioned-table operations.
pub type VersionedResult<T> = Result<T, VersionedError>;

/// Errors raised by [`VersionedTable`].
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum VersionedError {
    /// The table directory could not be created or resolved.
    #[snafu(display("Table directory error at {path}: {source}"))]
    TableDir {
        /// Directory path.
        path: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// A Delta Lake operation failed.
    #[snafu(display("Delta operation '{operation}' failed for table {table}: {source}"))]
    Delta {
        /// Operation name (`create`, `append`, `open`, `history`).
        operation: String,
        /// Table location.
        table: String,
        /// Underlying Delta error.
        #[snafu(source(from(DeltaTableError, Box::new)))]
        source: Box<DeltaTableError>,
    },

    /// Casting batches to Delta-compatible types failed.
    #[snafu(display("Failed to cast column {column} to {target}: {source}"))]
    DeltaCast {
        /// Column being cast.
        column: String,
        /// Target type.
        target: DataType,
        /// Underlying Arrow error.
        source: ArrowError,
    },

    /// Scanning the table through DataFusion failed.
    #[snafu(display("Failed to read table {table}: {source}"))]
    Scan {
        /// Table location.
        table: String,
        /// Underlying DataFusion error.
        source: DataFusionError,
    },

    /// Querying the table through a SQL session failed.
    #[snafu(display("{source}"))]
    TableSql {
        /// Underlying session error.
        source: SqlError,
    },

    /// The scanned batches did not form a dataset.
    #[snafu(display("Table scan is not a valid dataset: {source}"))]
    ScanDataset {
        /// Underlying dataset error.
        source: DatasetError,
    },
}

/// One commit in a table's history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryEntry {
    /// Table version produced by the commit.
    pub version: i64,
    /// Commit time in milliseconds since the Unix epoch.
    pub timestamp_ms: Option<i64>,
    /// Operation name (`WRITE`, `CREATE TABLE`, ...).
    pub operation: Option<String>,
}

impl HistoryEntry {
    /// Commit time as a UTC datetime.
    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        self.timestamp_ms.and_then(DateTime::from_timestamp_millis)
    }
}

/// A Delta table directory plus an open handle at some version.
#[derive(Debug, Clone)]
pub struct VersionedTable {
    path: PathBuf,
    table: DeltaTable,
}

impl VersionedTable {
    /// Create (or overwrite) the table at `path` with the rows of `dataset`.
    pub async fn create(path: &Path, dataset: &Dataset) -> VersionedResult<Self> {
        fs::create_dir_all(path).context(TableDirSnafu {
            path: path.display().to_string(),
        })?;
        let uri = table_uri(path)?;

        let batches = delta_compatible_batches(dataset)?;
        let table = DeltaOps::try_from_uri(&uri)
            .await
            .context(DeltaSnafu {
                operation: "create",
                table: &uri,
            })?
            .write(batches)
            .with_save_mode(SaveMode::Overwrite)
            .await
            .context(DeltaSnafu {
                operation: "create",
                table: &uri,
            })?;

        log::info!(
            "Created Delta table {} at version {} ({} rows)",
            path.display(),
            table.version(),
            dataset.num_rows()
        );
        Ok(Self {
            path: path.to_path_buf(),
            table,
        })
    }

    /// Open the latest version of an existing table.
    pub async fn open(path: &Path) -> VersionedResult<Self> {
        let uri = table_uri(path)?;
        let table = deltalake::open_table(&uri).await.context(DeltaSnafu {
            operation: "open",
            table: &uri,
        })?;
        Ok(Self {
            path: path.to_path_buf(),
            table,
        })
    }

    /// Open the table as of `version` (time travel).
    pub async fn open_version(path: &Path, version: i64) -> VersionedResult<Self> {
        let uri = table_uri(path)?;
        let table = deltalake::open_table_with_version(&uri, version)
            .await
            .context(DeltaSnafu {
                operation: "time travel",
                table: &uri,
            })?;
        log::info!("Loaded {} at version {version}", path.display());
        Ok(Self {
            path: path.to_path_buf(),
            table,
        })
    }

    /// Append the rows of `dataset` as one new version.
    pub async fn append(&mut self, dataset: &Dataset) -> VersionedResult<()> {
        let batches = delta_compatible_batches(dataset)?;
        let table = DeltaOps(self.table.clone())
            .write(batches)
            .with_save_mode(SaveMode::Append)
            .await
            .context(DeltaSnafu {
                operation: "append",
                table: self.path.display().to_string(),
            })?;

        log::info!(
            "Appended {} rows to {} (version {})",
            dataset.num_rows(),
            self.path.display(),
            table.version()
        );
        self.table = table;
        Ok(())
    }

    /// Table directory.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Version of the loaded snapshot.
    pub fn version(&self) -> i64 {
        self.table.version()
    }

    /// Underlying Delta handle.
    pub fn delta(&self) -> &DeltaTable {
        &self.table
    }

    /// Materialize the loaded snapshot.
    pub async fn to_dataset(&self) -> VersionedResult<Dataset> {
        let ctx = SessionContext::new();
        let df = ctx
            .read_table(Arc::new(self.table.clone()))
            .context(ScanSnafu {
                table: self.path.display().to_string(),
            })?;
        let plan_schema = df.schema().inner().clone();
        let batches = df.collect().await.context(ScanSnafu {
            table: self.path.display().to_string(),
        })?;
        let schema = batches
            .first()
            .map(|b| b.schema())
            .unwrap_or(plan_schema);
        Dataset::try_new(schema, batches).context(ScanDatasetSnafu)
    }

    /// Commit history, newest first, at most `limit` entries.
    ///
    /// Commit info does not record its own version, so versions count down
    /// from the loaded snapshot: the log is listed backwards from it and
    /// Delta versions are contiguous, so position `i` is version `loaded - i`.
    /// This relies on every commit carrying commit info, which holds for
    /// tables written through this module.
    pub async fn history(&self, limit: Option<usize>) -> VersionedResult<Vec<HistoryEntry>> {
        let commits = self.table.history(limit).await.context(DeltaSnafu {
            operation: "history",
            table: self.path.display().to_string(),
        })?;

        let loaded = self.table.version();
        Ok(commits
            .into_iter()
            .enumerate()
            .map(|(idx, info)| HistoryEntry {
                version: loaded - idx as i64,
                timestamp_ms: info.timestamp,
                operation: info.operation,
            })
            .collect())
    }

    /// Expose the loaded snapshot to `session` under `name`.
    pub fn register(&self, session: &SqlSession, name: &str) -> VersionedResult<()> {
        session
            .register_provider(name, Arc::new(self.table.clone()))
            .context(TableSqlSnafu)
    }

    /// Register the table as `name` and run `SELECT * FROM name LIMIT limit`.
    pub async fn query(
        &self,
        session: &SqlSession,
        name: &str,
        limit: usize,
    ) -> VersionedResult<Dataset> {
        self.register(session, name)?;
        let sql = format!("SELECT * FROM {} LIMIT {limit}", quote_identifier(name));
        session.sql(&sql).await.context(TableSqlSnafu)
    }
}

fn table_uri(path: &Path) -> VersionedResult<String> {
    let abs = path.canonicalize().context(TableDirSnafu {
        path: path.display().to_string(),
    })?;
    Ok(abs.to_string_lossy().to_string())
}

/// Delta's type system is narrower than Arrow's. Map each column to the type
/// Delta stores:
///
/// - every timestamp becomes microseconds in UTC;
/// - unsigned integers widen to the next signed type (`UInt64` to `Int64`);
/// - large and view strings/binaries become their plain forms;
/// - `Date64` becomes `Date32`, `Float16` becomes `Float32` and `Null`
///   becomes `Utf8`.
pub fn delta_compatible_type(dt: &DataType) -> Option<DataType> {
    let target = match dt {
        DataType::Timestamp(TimeUnit::Microsecond, Some(tz)) if tz.as_ref() == "UTC" => {
            return None;
        }
        DataType::Timestamp(_, _) => DataType::Timestamp(TimeUnit::Microsecond, Some("UTC".into())),
        DataType::UInt8 => DataType::Int16,
        DataType::UInt16 => DataType::Int32,
        DataType::UInt32 | DataType::UInt64 => DataType::Int64,
        DataType::LargeUtf8 | DataType::Utf8View => DataType::Utf8,
        DataType::LargeBinary | DataType::BinaryView => DataType::Binary,
        DataType::Date64 => DataType::Date32,
        DataType::Float16 => DataType::Float32,
        DataType::Null => DataType::Utf8,
        _ => return None,
    };
    Some(target)
}

fn delta_compatible_batches(dataset: &Dataset) -> VersionedResult<Vec<RecordBatch>> {
    let schema = dataset.schema();
    let targets: Vec<Option<DataType>> = schema
        .fields()
        .iter()
        .map(|f| delta_compatible_type(f.data_type()))
        .collect();

    if targets.iter().all(Option::is_none) {
        return Ok(dataset.batches_or_empty());
    }

    let fields: Vec<Field> = schema
        .fields()
        .iter()
        .zip(&targets)
        .map(|(field, target)| match target {
            Some(dt) => Field::new(
                field.name(),
                dt.clone(),
                field.is_nullable() || field.data_type() == &DataType::Null,
            ),
            None => field.as_ref().clone(),
        })
        .collect();
    let new_schema = Arc::new(Schema::new_with_metadata(fields, schema.metadata().clone()));

    // Values the target type cannot hold fail the write instead of turning null.
    let options = CastOptions {
        safe: false,
        ..Default::default()
    };

    dataset
        .batches_or_empty()
        .iter()
        .map(|batch| {
            let columns = batch
                .columns()
                .iter()
                .zip(schema.fields())
                .zip(&targets)
                .map(|((col, field), target)| match target {
                    Some(dt) => cast_with_options(col, dt, &options).context(DeltaCastSnafu {
                        column: field.name(),
                        target: dt.clone(),
                    }),
                    None => Ok(col.clone()),
                })
                .collect::<VersionedResult<Vec<ArrayRef>>>()?;

            RecordBatch::try_new(new_schema.clone(), columns).context(DeltaCastSnafu {
                column: "*",
                target: DataType::Null,
            })
        })
        .collect()
}
