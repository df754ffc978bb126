//! Parquet reader and writer.

use std::path::Path;

use parquet::arrow::{ArrowWriter, arrow_reader::ParquetRecordBatchReaderBuilder};
use parquet::basic::{Compression, ZstdLevel};
use parquet::file::properties::WriterProperties;
use snafu::prelude::*;

use crate::{
    dataset::Dataset,
    storage::{OutputSink, open_input},
};

use super::{FormatResult, ParquetDecodeSnafu, ParquetSnafu, StorageSnafu, display_path};

/// Compression codec for Parquet output.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ParquetCompression {
    /// Snappy (the usual default for analytics tooling).
    #[default]
    Snappy,
    /// Zstandard at its default level.
    Zstd,
    /// No compression.
    Uncompressed,
}

impl ParquetCompression {
    fn codec(self) -> Compression {
        match self {
            ParquetCompression::Snappy => Compression::SNAPPY,
            ParquetCompression::Zstd => Compression::ZSTD(ZstdLevel::default()),
            ParquetCompression::Uncompressed => Compression::UNCOMPRESSED,
        }
    }
}

/// Read every row group of a Parquet file.
pub fn read_parquet(path: &Path) -> FormatResult<Dataset> {
    let file = open_input(path).context(StorageSnafu)?;

    let builder = ParquetRecordBatchReaderBuilder::try_new(file).context(ParquetSnafu {
        path: display_path(path),
    })?;
    let schema = builder.schema().clone();
    let reader = builder.build().context(ParquetSnafu {
        path: display_path(path),
    })?;

    let batches = reader
        .collect::<Result<Vec<_>, _>>()
        .context(ParquetDecodeSnafu {
            path: display_path(path),
        })?;

    Ok(Dataset::from_reader(schema, batches))
}

/// Write a dataset to a single Parquet file.
pub fn write_parquet(
    dataset: &Dataset,
    path: &Path,
    compression: ParquetCompression,
) -> FormatResult<()> {
    let props = WriterProperties::builder()
        .set_compression(compression.codec())
        .build();

    let mut sink = OutputSink::create(path).context(StorageSnafu)?;
    {
        let mut writer = ArrowWriter::try_new(sink.writer(), dataset.schema(), Some(props))
            .context(ParquetSnafu {
                path: display_path(path),
            })?;
        for batch in dataset.batches() {
            writer.write(batch).context(ParquetSnafu {
                path: display_path(path),
            })?;
        }
        writer.close().context(ParquetSnafu {
            path: display_path(path),
        })?;
    }

    log::debug!(
        "wrote {} rows to {} ({compression:?})",
        dataset.num_rows(),
        path.display()
    );
    sink.finish().context(StorageSnafu)
}
