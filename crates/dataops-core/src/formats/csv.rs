//! CSV reader and writer.

use std::{io::Seek, path::Path, sync::Arc};

use arrow::datatypes::{DataType, Schema};
use arrow::error::ArrowError;
use arrow_csv::reader::Format as CsvFormat;
use snafu::prelude::*;

use crate::{
    dataset::Dataset,
    storage::{OutputSink, open_input},
};

use super::{CsvSnafu, CsvUnsupportedTypeSnafu, FormatResult, StorageSnafu, display_path};

/// CSV parsing options.
#[derive(Debug, Clone)]
pub struct CsvOptions {
    /// Field delimiter.
    pub delimiter: u8,
    /// Whether the first line holds column names.
    pub has_header: bool,
    /// Rows sampled for type inference; `None` scans the whole file.
    pub infer_max_records: Option<usize>,
    /// Rows per decoded batch.
    pub batch_size: usize,
}

impl Default for CsvOptions {
    fn default() -> Self {
        Self {
            delimiter: b',',
            has_header: true,
            infer_max_records: Some(1000),
            batch_size: 8192,
        }
    }
}

/// Read a CSV file, inferring column types from the leading rows.
pub fn read_csv(path: &Path, opts: &CsvOptions) -> FormatResult<Dataset> {
    let mut file = open_input(path).context(StorageSnafu)?;
    let csv_format = CsvFormat::default()
        .with_header(opts.has_header)
        .with_delimiter(opts.delimiter);

    let (schema, _) = csv_format
        .infer_schema(&mut file, opts.infer_max_records)
        .context(CsvSnafu {
            path: display_path(path),
        })?;
    file.rewind()
        .map_err(ArrowError::from)
        .context(CsvSnafu {
            path: display_path(path),
        })?;

    let schema = Arc::new(schema);
    let reader = arrow_csv::ReaderBuilder::new(schema.clone())
        .with_header(opts.has_header)
        .with_delimiter(opts.delimiter)
        .with_batch_size(opts.batch_size)
        .build(file)
        .context(CsvSnafu {
            path: display_path(path),
        })?;

    let batches = reader.collect::<Result<Vec<_>, _>>().context(CsvSnafu {
        path: display_path(path),
    })?;

    log::debug!(
        "read {} rows from {}",
        batches.iter().map(|b| b.num_rows()).sum::<usize>(),
        path.display()
    );
    Ok(Dataset::from_reader(schema, batches))
}

/// Write a dataset as CSV with a header row.
pub fn write_csv(dataset: &Dataset, path: &Path) -> FormatResult<()> {
    ensure_csv_supported(dataset.schema().as_ref())?;

    let mut sink = OutputSink::create(path).context(StorageSnafu)?;
    {
        let mut writer = arrow_csv::WriterBuilder::new()
            .with_header(true)
            .build(sink.writer());
        for batch in dataset.batches_or_empty() {
            writer.write(&batch).context(CsvSnafu {
                path: display_path(path),
            })?;
        }
    }
    sink.finish().context(StorageSnafu)
}

pub(crate) fn ensure_csv_supported(schema: &Schema) -> FormatResult<()> {
    for field in schema.fields() {
        let dt = field.data_type();
        let unsupported = matches!(
            dt,
            DataType::List(_)
                | DataType::LargeList(_)
                | DataType::FixedSizeList(_, _)
                | DataType::Struct(_)
                | DataType::Map(_, _)
                | DataType::Union(_, _)
        );

        if unsupported {
            return CsvUnsupportedTypeSnafu {
                field: field.name().to_string(),
                data_type: format!("{dt:?}"),
            }
            .fail();
        }
    }

    Ok(())
}
