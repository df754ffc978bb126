#![allow(missing_docs, dead_code)]

use std::path::{Path, PathBuf};

use tempfile::TempDir;

type TestResult<T = ()> = Result<T, Box<dyn std::error::Error>>;

/// Three clean rows in the layout the default checklist expects.
pub const CLEAN_CSV: &str = "id,name,value,timestamp\n\
                             3,c,30,2024-01-03T00:00:00\n\
                             1,a,10,2024-01-01T00:00:00\n\
                             2,b,20,2024-01-02T00:00:00\n";

/// Same layout, but the id column repeats.
pub const DUPLICATE_ID_CSV: &str = "id,name,value,timestamp\n\
                                    1,a,10,2024-01-01T00:00:00\n\
                                    1,b,20,2024-01-02T00:00:00\n";

pub fn write_file(path: &Path, contents: &str) -> TestResult {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, contents)?;
    Ok(())
}

pub fn write_csv(tmp: &TempDir, name: &str, contents: &str) -> TestResult<PathBuf> {
    let path = tmp.path().join(name);
    write_file(&path, contents)?;
    Ok(path)
}

pub fn arg(path: &Path) -> String {
    path.to_string_lossy().to_string()
}
