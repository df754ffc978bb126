//! JSON and JSON Lines reader and writer.

use std::{io::Cursor, path::Path, sync::Arc};

use arrow::datatypes::Schema;
use arrow_json::writer::{JsonArray, JsonFormat, LineDelimited};
use serde_json::Value;
use snafu::prelude::*;

use crate::{
    dataset::Dataset,
    storage::{OutputSink, read_input_to_string},
};

use super::{
    FormatResult, JsonDocumentSnafu, JsonSnafu, StorageSnafu, display_path,
    records::{RECORD_BATCH_SIZE, into_records, records_to_dataset},
};

/// Layout of JSON output.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum JsonLayout {
    /// One object per line.
    #[default]
    Lines,
    /// A single compact JSON array of objects.
    Array,
    /// A JSON array of objects, indented for humans.
    PrettyArray,
}

/// Read a JSON file.
///
/// The file is read as JSON Lines first. If that fails it is parsed as a
/// single JSON document: an array of records, or one object. When neither
/// parse succeeds, text that opens with `[` reports the document error and
/// anything else reports the JSON Lines error.
pub fn read_json(path: &Path) -> FormatResult<Dataset> {
    let text = read_input_to_string(path).context(StorageSnafu)?;
    let trimmed = text.trim_start();

    if trimmed.is_empty() {
        return Ok(Dataset::empty(Arc::new(Schema::empty())));
    }

    match read_json_lines(trimmed, path) {
        Ok(ds) => Ok(ds),
        Err(lines_err) => {
            log::debug!("{lines_err}; retrying {} as a JSON document", path.display());
            match serde_json::from_str::<Value>(trimmed) {
                Ok(doc) => records_to_dataset(&into_records(doc), path),
                Err(_) if !trimmed.starts_with('[') => Err(lines_err),
                Err(source) => Err(source).context(JsonDocumentSnafu {
                    path: display_path(path),
                }),
            }
        }
    }
}

fn read_json_lines(text: &str, path: &Path) -> FormatResult<Dataset> {
    let (schema, _) = arrow_json::reader::infer_json_schema(Cursor::new(text.as_bytes()), None)
        .context(JsonSnafu {
            path: display_path(path),
        })?;
    let schema = Arc::new(schema);

    let reader = arrow_json::ReaderBuilder::new(schema.clone())
        .with_batch_size(RECORD_BATCH_SIZE)
        .with_coerce_primitive(true)
        .build(Cursor::new(text.as_bytes()))
        .context(JsonSnafu {
            path: display_path(path),
        })?;

    let batches = reader.collect::<Result<Vec<_>, _>>().context(JsonSnafu {
        path: display_path(path),
    })?;

    Ok(Dataset::from_reader(schema, batches))
}

/// Write a dataset as JSON using the given layout. Nulls are written
/// explicitly so every object carries every column.
pub fn write_json(dataset: &Dataset, path: &Path, layout: JsonLayout) -> FormatResult<()> {
    let mut sink = OutputSink::create(path).context(StorageSnafu)?;

    match layout {
        JsonLayout::Lines => encode::<_, LineDelimited>(dataset, sink.writer(), path)?,
        JsonLayout::Array => encode::<_, JsonArray>(dataset, sink.writer(), path)?,
        JsonLayout::PrettyArray => {
            let mut buf = Vec::new();
            encode::<_, JsonArray>(dataset, &mut buf, path)?;
            let value: Value = if buf.is_empty() {
                Value::Array(Vec::new())
            } else {
                serde_json::from_slice(&buf).context(JsonDocumentSnafu {
                    path: display_path(path),
                })?
            };
            serde_json::to_writer_pretty(sink.writer(), &value).context(JsonDocumentSnafu {
                path: display_path(path),
            })?;
        }
    }

    sink.finish().context(StorageSnafu)
}

fn encode<W: std::io::Write, F: JsonFormat>(
    dataset: &Dataset,
    out: W,
    path: &Path,
) -> FormatResult<()> {
    let mut writer = arrow_json::WriterBuilder::new()
        .with_explicit_nulls(true)
        .build::<_, F>(out);
    for batch in dataset.batches() {
        writer.write(batch).context(JsonSnafu {
            path: display_path(path),
        })?;
    }
    writer.finish().context(JsonSnafu {
        path: display_path(path),
    })
}
