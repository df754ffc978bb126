//! Batch entry points behind `process-data`, `convert-csv` and
//! `dataops check-raw`.

use std::{
    fs, io,
    path::{Path, PathBuf},
};

use dataops_core::{
    CsvOptions, JsonLayout, ParquetCompression,
    formats::{self, Format, read_csv, write_json},
};
use dataops_datafusion::{SqlSession, sanitize_identifier};
use snafu::prelude::*;

use crate::pipeline::{DirectorySnafu, FormatSnafu, PipelineResult, SqlSnafu};

/// Default input of `process-data` and `convert-csv`.
pub const DEFAULT_INPUT: &str = "data/raw/input.csv";
/// Default output of `process-data`.
pub const DEFAULT_PARQUET_OUTPUT: &str = "data/output/result.parquet";
/// Default output of `convert-csv`.
pub const DEFAULT_JSON_OUTPUT: &str = "data/output/result.json";
/// Default directory scanned by `check-raw`.
pub const DEFAULT_RAW_DIR: &str = "data/raw";

const PROCESS_QUERY: &str = "SELECT *, now() AS processed_at FROM input ORDER BY 1";

/// Stamp every row of a CSV file with `processed_at`, sort by the first
/// column and write ZSTD Parquet. Returns the number of rows written.
pub async fn process_data(input: &Path, output: &Path) -> PipelineResult<usize> {
    log::info!("Processing {}...", input.display());

    let session = SqlSession::new();
    session
        .register_file("input", input, Format::Csv)
        .await
        .context(SqlSnafu)?;
    let processed = session.sql(PROCESS_QUERY).await.context(SqlSnafu)?;
    session.close();

    formats::write_parquet(&processed, output, ParquetCompression::Zstd).context(FormatSnafu)?;

    let rows = processed.num_rows();
    log::info!("Processed {rows} rows -> {}", output.display());
    Ok(rows)
}

/// Convert a CSV file to an indented JSON array. Returns the number of rows.
pub fn convert_csv_to_json(input: &Path, output: &Path) -> PipelineResult<usize> {
    log::info!("Converting {} to JSON...", input.display());

    let ds = read_csv(input, &CsvOptions::default()).context(FormatSnafu)?;
    write_json(&ds, output, JsonLayout::PrettyArray).context(FormatSnafu)?;

    let rows = ds.num_rows();
    log::info!("Converted {rows} rows -> {}", output.display());
    Ok(rows)
}

/// Outcome of checking one raw CSV file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CsvFileStatus {
    /// The file was read; it holds this many rows.
    Valid(usize),
    /// The file could not be read.
    Invalid(String),
}

/// One checked raw CSV file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvFileCheck {
    /// File path.
    pub path: PathBuf,
    /// What happened when reading it.
    pub status: CsvFileStatus,
}

/// Result of [`validate_csv_files`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CsvCheckReport {
    /// `false` when the directory does not exist.
    pub dir_exists: bool,
    /// Checked files, sorted by path.
    pub files: Vec<CsvFileCheck>,
}

impl CsvCheckReport {
    /// True unless some file could not be read. A missing directory or an
    /// empty one counts as valid.
    pub fn all_valid(&self) -> bool {
        self.files
            .iter()
            .all(|f| matches!(f.status, CsvFileStatus::Valid(_)))
    }
}

/// Count the rows of every `*.csv` file directly inside `dir` through the
/// SQL engine. Per-file failures are recorded, not returned.
pub async fn validate_csv_files(dir: &Path) -> PipelineResult<CsvCheckReport> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            log::info!("No data directory found at {}, skipping validation", dir.display());
            return Ok(CsvCheckReport::default());
        }
        Err(e) => {
            return Err(e).context(DirectorySnafu {
                path: dir.display().to_string(),
            });
        }
    };

    let mut paths = Vec::new();
    for entry in entries {
        let entry = entry.context(DirectorySnafu {
            path: dir.display().to_string(),
        })?;
        let path = entry.path();
        let is_csv = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"));
        if is_csv && path.is_file() {
            paths.push(path);
        }
    }
    paths.sort();

    if paths.is_empty() {
        log::info!("No CSV files to validate in {}", dir.display());
    } else {
        log::info!("Validating {} CSV file(s)...", paths.len());
    }

    let session = SqlSession::new();
    let mut files = Vec::with_capacity(paths.len());
    for (idx, path) in paths.into_iter().enumerate() {
        let name = format!("raw_{idx}_{}", sanitize_identifier(&file_stem(&path)));
        let status = match count_csv_rows(&session, &name, &path).await {
            Ok(rows) => {
                log::info!("{}: {rows} rows", path.display());
                CsvFileStatus::Valid(rows)
            }
            Err(e) => {
                log::warn!("{}: INVALID - {e}", path.display());
                CsvFileStatus::Invalid(e.to_string())
            }
        };
        files.push(CsvFileCheck { path, status });
    }
    session.close();

    Ok(CsvCheckReport {
        dir_exists: true,
        files,
    })
}

async fn count_csv_rows(
    session: &SqlSession,
    name: &str,
    path: &Path,
) -> Result<usize, dataops_datafusion::SqlError> {
    session.register_file(name, path, Format::Csv).await?;
    session.count_rows(name).await
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default()
}
