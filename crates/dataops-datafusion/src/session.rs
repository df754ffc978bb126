//! SQL sessions over datasets, files and table providers.
//!
//! [`SqlSession`] owns one DataFusion [`SessionContext`]. Tables registered
//! on it live as long as the session; dropping the session (or calling
//! [`SqlSession::close`]) releases all of them.

use std::{path::Path, sync::Arc};

use arrow::error::ArrowError;
use arrow::util::pretty::pretty_format_batches;
use dataops_core::{Dataset, DatasetError, Format};
use deltalake::datafusion::{
    common::TableReference,
    datasource::{MemTable, TableProvider},
    error::DataFusionError,
    prelude::{CsvReadOptions, NdJsonReadOptions, ParquetReadOptions, SessionConfig, SessionContext},
};
use snafu::prelude::*;

/// Result alias for SQL session operations.
pub type SqlResult<T> = Result<T, SqlError>;

/// Errors raised by [`SqlSession`].
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum SqlError {
    /// Registering a table under `table` failed.
    #[snafu(display("Failed to register table {table}: {source}"))]
    Register {
        /// Table name.
        table: String,
        /// Underlying DataFusion error.
        source: DataFusionError,
    },

    /// Planning or executing a query failed.
    #[snafu(display("Query failed: {source}\n  query: {query}"))]
    Query {
        /// SQL text.
        query: String,
        /// Underlying DataFusion error.
        source: DataFusionError,
    },

    /// Rendering query output failed.
    #[snafu(display("Failed to render query output: {source}"))]
    Render {
        /// Underlying Arrow error.
        source: ArrowError,
    },

    /// Query results did not form a consistent dataset.
    #[snafu(display("Query result is not a valid dataset: {source}"))]
    ResultDataset {
        /// Underlying dataset error.
        source: DatasetError,
    },

    /// Only CSV, JSON Lines and Parquet files can be registered directly.
    #[snafu(display("Cannot register {format} file {path}; load it into a dataset first"))]
    UnsupportedFileFormat {
        /// File path.
        path: String,
        /// Its format.
        format: Format,
    },
}

/// A DataFusion session that can see registered datasets, files and
/// versioned tables.
pub struct SqlSession {
    ctx: SessionContext,
}

impl Default for SqlSession {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for SqlSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqlSession")
            .field("session_id", &self.ctx.session_id())
            .finish()
    }
}

impl SqlSession {
    /// Start a session with default configuration.
    pub fn new() -> Self {
        let cfg = SessionConfig::new();
        let ctx = SessionContext::new_with_config(cfg);
        log::debug!("opened SQL session {}", ctx.session_id());
        Self { ctx }
    }

    /// Underlying DataFusion context.
    pub fn context(&self) -> &SessionContext {
        &self.ctx
    }

    /// Register an in-memory dataset, replacing any table of the same name.
    pub fn register_dataset(&self, name: &str, dataset: &Dataset) -> SqlResult<()> {
        let table = MemTable::try_new(dataset.schema(), vec![dataset.batches().to_vec()])
            .context(RegisterSnafu { table: name })?;
        self.register_provider(name, Arc::new(table))?;
        log::debug!("registered dataset {name} ({} rows)", dataset.num_rows());
        Ok(())
    }

    /// Register any table provider, replacing any table of the same name.
    pub fn register_provider(&self, name: &str, provider: Arc<dyn TableProvider>) -> SqlResult<()> {
        self.deregister(name)?;
        self.ctx
            .register_table(TableReference::bare(name), provider)
            .context(RegisterSnafu { table: name })?;
        Ok(())
    }

    /// Register a CSV, JSON Lines or Parquet file so SQL can read it directly.
    pub async fn register_file(&self, name: &str, path: &Path, format: Format) -> SqlResult<()> {
        self.deregister(name)?;

        let location = path.to_string_lossy().to_string();
        let extension = path
            .extension()
            .map(|e| format!(".{}", e.to_string_lossy()))
            .unwrap_or_default();
        let table = TableReference::bare(name);

        match format {
            Format::Csv => self
                .ctx
                .register_csv(
                    table,
                    &location,
                    CsvReadOptions::new().file_extension(&extension),
                )
                .await
                .context(RegisterSnafu { table: name })?,
            Format::Json => self
                .ctx
                .register_json(
                    table,
                    &location,
                    NdJsonReadOptions {
                        file_extension: &extension,
                        ..NdJsonReadOptions::default()
                    },
                )
                .await
                .context(RegisterSnafu { table: name })?,
            Format::Parquet => self
                .ctx
                .register_parquet(
                    table,
                    &location,
                    ParquetReadOptions {
                        file_extension: &extension,
                        ..ParquetReadOptions::default()
                    },
                )
                .await
                .context(RegisterSnafu { table: name })?,
            Format::Xml | Format::Excel => {
                return UnsupportedFileFormatSnafu {
                    path: location,
                    format,
                }
                .fail();
            }
        }

        log::debug!("registered {format} file {} as {name}", path.display());
        Ok(())
    }

    fn deregister(&self, name: &str) -> SqlResult<()> {
        self.ctx
            .deregister_table(TableReference::bare(name))
            .context(RegisterSnafu { table: name })?;
        Ok(())
    }

    /// Run a query and collect its result.
    pub async fn sql(&self, query: &str) -> SqlResult<Dataset> {
        log::info!("Running SQL query...");
        let df = self
            .ctx
            .sql(query)
            .await
            .context(QuerySnafu { query })?;
        let plan_schema = df.schema().inner().clone();
        let batches = df.collect().await.context(QuerySnafu { query })?;
        let schema = batches
            .first()
            .map(|b| b.schema())
            .unwrap_or(plan_schema);

        let dataset = Dataset::try_new(schema, batches).context(ResultDatasetSnafu)?;
        log::info!("Query returned {} rows", dataset.num_rows());
        Ok(dataset)
    }

    /// Render the plan of a query as text.
    pub async fn explain(&self, query: &str) -> SqlResult<String> {
        let explain_sql = format!("EXPLAIN {query}");
        let df = self
            .ctx
            .sql(&explain_sql)
            .await
            .context(QuerySnafu { query: &explain_sql })?;
        let batches = df
            .collect()
            .await
            .context(QuerySnafu { query: &explain_sql })?;
        let rendered = pretty_format_batches(&batches).context(RenderSnafu)?;
        Ok(rendered.to_string())
    }

    /// Count the rows of a registered table.
    pub async fn count_rows(&self, table: &str) -> SqlResult<usize> {
        let query = format!("SELECT COUNT(*) FROM {}", crate::quote_identifier(table));
        let df = self
            .ctx
            .table(TableReference::bare(table))
            .await
            .context(QuerySnafu { query: &query })?;
        df.count().await.context(QuerySnafu { query })
    }

    /// Release the session and everything registered on it.
    pub fn close(self) {
        log::debug!("closed SQL session {}", self.ctx.session_id());
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use arrow::array::{Array, Int64Array, RecordBatch, StringArray};
    use arrow::datatypes::{DataType, Field, Schema};
    use tempfile::TempDir;

    use super::*;

    type TestResult = Result<(), Box<dyn std::error::Error>>;

    fn sample() -> Result<Dataset, ArrowError> {
        let schema = Arc::new(Schema::new(vec![
            Field::new("id", DataType::Int64, false),
            Field::new("name", DataType::Utf8, true),
        ]));
        let batch = RecordBatch::try_new(
            schema,
            vec![
                Arc::new(Int64Array::from(vec![3, 1, 2])),
                Arc::new(StringArray::from(vec!["c", "a", "b"])),
            ],
        )?;
        Ok(Dataset::from_batch(batch))
    }

    #[tokio::test]
    async fn queries_registered_dataset() -> TestResult {
        let session = SqlSession::new();
        session.register_dataset("input", &sample()?)?;

        let out = session
            .sql("SELECT id, name FROM input WHERE id > 1 ORDER BY id")
            .await?;
        assert_eq!(out.num_rows(), 2);

        let ids = out.column("id")?;
        let ids = ids
            .as_any()
            .downcast_ref::<Int64Array>()
            .ok_or("id is not Int64")?;
        assert_eq!(ids.values().to_vec(), vec![2, 3]);
        Ok(())
    }

    #[tokio::test]
    async fn reregistering_replaces_table() -> TestResult {
        let session = SqlSession::new();
        session.register_dataset("input", &sample()?)?;
        let single = Dataset::from_batch(sample()?.concat()?.slice(0, 1));
        session.register_dataset("input", &single)?;

        assert_eq!(session.count_rows("input").await?, 1);
        Ok(())
    }

    #[tokio::test]
    async fn registers_csv_file() -> TestResult {
        let tmp = TempDir::new()?;
        let path = tmp.path().join("input.csv");
        fs::write(&path, "id,value\n1,10\n2,20\n3,30\n")?;

        let session = SqlSession::new();
        session.register_file("input", &path, Format::Csv).await?;

        assert_eq!(session.count_rows("input").await?, 3);
        let out = session.sql("SELECT SUM(value) AS total FROM input").await?;
        assert_eq!(out.column_names(), vec!["total"]);
        Ok(())
    }

    #[tokio::test]
    async fn bad_sql_is_query_error() -> TestResult {
        let session = SqlSession::new();
        let err = session
            .sql("SELECT * FROM missing_table")
            .await
            .expect_err("table does not exist");
        assert!(matches!(err, SqlError::Query { .. }));
        Ok(())
    }

    #[tokio::test]
    async fn explain_renders_plan() -> TestResult {
        let session = SqlSession::new();
        session.register_dataset("input", &sample()?)?;
        let plan = session.explain("SELECT * FROM input").await?;
        assert!(plan.contains("logical_plan"));
        Ok(())
    }

    #[tokio::test]
    async fn xml_files_cannot_be_registered() -> TestResult {
        let session = SqlSession::new();
        let err = session
            .register_file("x", Path::new("input.xml"), Format::Xml)
            .await
            .expect_err("xml is not a listing format");
        assert!(matches!(err, SqlError::UnsupportedFileFormat { .. }));
        Ok(())
    }
}
