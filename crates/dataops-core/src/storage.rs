//! Local file access for readers and writers.
//!
//! Readers open inputs through [`open_input`] so a missing file surfaces as
//! [`StorageError::NotFound`] with its path. Writers stream into an
//! [`OutputSink`], which writes to a temporary file next to the destination
//! and renames it into place on [`OutputSink::finish`]. Dropping an
//! unfinished sink removes the temporary file, so a failed write never
//! leaves a truncated output behind.

use std::{
    fs::{self, File},
    io::{self, BufWriter, Write},
    path::{Path, PathBuf},
};

use snafu::{Backtrace, IntoError, prelude::*};

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors that can occur while touching the local filesystem.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum StorageError {
    /// The specified path was not found.
    #[snafu(display("Path not found: {path}"))]
    NotFound {
        /// The path that was not found.
        path: String,
        /// Underlying I/O error.
        source: io::Error,
        /// The backtrace at the time the error occurred.
        backtrace: Backtrace,
    },

    /// Any other I/O failure.
    #[snafu(display("Local I/O error at {path}: {source}"))]
    OtherIo {
        /// The path where the I/O error occurred.
        path: String,
        /// Underlying I/O error.
        source: io::Error,
        /// The backtrace at the time the error occurred.
        backtrace: Backtrace,
    },
}

fn io_error(path: &Path, e: io::Error) -> StorageError {
    let path = path.display().to_string();
    if e.kind() == io::ErrorKind::NotFound {
        NotFoundSnafu { path }.into_error(e)
    } else {
        OtherIoSnafu { path }.into_error(e)
    }
}

/// Open an input file for reading.
pub fn open_input(path: &Path) -> StorageResult<File> {
    File::open(path).map_err(|e| io_error(path, e))
}

/// Read an entire input file as UTF-8 text.
pub fn read_input_to_string(path: &Path) -> StorageResult<String> {
    fs::read_to_string(path).map_err(|e| io_error(path, e))
}

/// Create the parent directory of `path` if it has one.
pub fn create_parent_dir(path: &Path) -> StorageResult<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).context(OtherIoSnafu {
            path: parent.display().to_string(),
        })?;
    }
    Ok(())
}

/// Size of a file in bytes.
pub fn file_size(path: &Path) -> StorageResult<u64> {
    fs::metadata(path)
        .map(|m| m.len())
        .map_err(|e| io_error(path, e))
}

/// Guard that removes a temporary file on drop unless disarmed.
struct TempFileGuard {
    path: PathBuf,
    armed: bool,
}

impl TempFileGuard {
    fn new(path: PathBuf) -> Self {
        Self { path, armed: true }
    }

    /// Call after a successful rename.
    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for TempFileGuard {
    fn drop(&mut self) {
        if self.armed {
            // Best-effort; we are usually already unwinding another error.
            let _ = fs::remove_file(&self.path);
        }
    }
}

/// Streaming output that becomes visible at its final path only on `finish`.
pub struct OutputSink {
    tmp_path: PathBuf,
    final_path: PathBuf,
    writer: BufWriter<File>,
    guard: TempFileGuard,
}

impl OutputSink {
    /// Create a sink for `path`, creating parent directories as needed.
    pub fn create(path: &Path) -> StorageResult<Self> {
        create_parent_dir(path)?;

        let tmp_path = tmp_path_for(path);
        let file = File::create(&tmp_path).context(OtherIoSnafu {
            path: tmp_path.display().to_string(),
        })?;

        Ok(Self {
            guard: TempFileGuard::new(tmp_path.clone()),
            tmp_path,
            final_path: path.to_path_buf(),
            writer: BufWriter::new(file),
        })
    }

    /// Writer handle for streaming bytes.
    pub fn writer(&mut self) -> &mut BufWriter<File> {
        &mut self.writer
    }

    /// Final destination of this sink.
    pub fn path(&self) -> &Path {
        &self.final_path
    }

    /// Flush, fsync, and rename into the final location.
    pub fn finish(mut self) -> StorageResult<()> {
        self.writer.flush().context(OtherIoSnafu {
            path: self.tmp_path.display().to_string(),
        })?;

        self.writer.get_ref().sync_all().context(OtherIoSnafu {
            path: self.tmp_path.display().to_string(),
        })?;

        fs::rename(&self.tmp_path, &self.final_path).context(OtherIoSnafu {
            path: self.final_path.display().to_string(),
        })?;

        self.guard.disarm();
        Ok(())
    }
}

fn tmp_path_for(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| "output".into());
    name.push(".tmp");
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    type TestResult = Result<(), Box<dyn std::error::Error>>;

    #[test]
    fn sink_renames_on_finish() -> TestResult {
        let tmp = TempDir::new()?;
        let dst = tmp.path().join("nested/out.csv");

        let mut sink = OutputSink::create(&dst)?;
        sink.writer().write_all(b"a,b\n1,2\n")?;
        assert!(!dst.exists());
        sink.finish()?;

        assert_eq!(fs::read_to_string(&dst)?, "a,b\n1,2\n");
        assert!(!tmp.path().join("nested/out.csv.tmp").exists());
        Ok(())
    }

    #[test]
    fn dropped_sink_removes_temp_file() -> TestResult {
        let tmp = TempDir::new()?;
        let dst = tmp.path().join("out.json");

        {
            let mut sink = OutputSink::create(&dst)?;
            sink.writer().write_all(b"{")?;
        }

        assert!(!dst.exists());
        assert!(!tmp.path().join("out.json.tmp").exists());
        Ok(())
    }

    #[test]
    fn open_input_reports_not_found() -> TestResult {
        let tmp = TempDir::new()?;
        let err = open_input(&tmp.path().join("missing.csv")).expect_err("missing file");
        assert!(matches!(err, StorageError::NotFound { .. }));
        Ok(())
    }
}
