//! JSON-shaped records to Arrow.
//!
//! XML, Excel and JSON documents are first turned into a list of
//! `serde_json::Value` objects; this module infers an Arrow schema from them
//! and decodes them with `arrow_json`.

use std::{path::Path, sync::Arc};

use arrow::datatypes::Schema;
use serde_json::{Map, Value};
use snafu::prelude::*;

use crate::dataset::Dataset;

use super::{FormatResult, RecordsSnafu, display_path};

/// Rows per batch when decoding records.
pub const RECORD_BATCH_SIZE: usize = 8192;

/// Column used for records that are not JSON objects.
pub const SCALAR_COLUMN: &str = "value";

/// Flatten a located JSON value into records.
///
/// An array yields one record per element, an object yields a single record.
/// Anything that is not an object becomes `{"value": <x>}`.
pub fn into_records(value: Value) -> Vec<Value> {
    match value {
        Value::Array(items) => items.into_iter().map(as_record).collect(),
        other => vec![as_record(other)],
    }
}

fn as_record(value: Value) -> Value {
    match value {
        Value::Object(_) => value,
        other => {
            let mut map = Map::with_capacity(1);
            map.insert(SCALAR_COLUMN.to_string(), other);
            Value::Object(map)
        }
    }
}

/// Decode JSON object records into a [`Dataset`].
///
/// `origin` is only used for error messages.
pub fn records_to_dataset(records: &[Value], origin: &Path) -> FormatResult<Dataset> {
    if records.is_empty() {
        return Ok(Dataset::empty(Arc::new(Schema::empty())));
    }

    let schema = arrow_json::reader::infer_json_schema_from_iterator(records.iter().map(Ok))
        .context(RecordsSnafu {
            path: display_path(origin),
        })?;
    let schema = Arc::new(schema);

    // Inference widens number/text mixes to Utf8; coerce keeps the numbers as text.
    let mut decoder = arrow_json::ReaderBuilder::new(schema.clone())
        .with_batch_size(RECORD_BATCH_SIZE)
        .with_coerce_primitive(true)
        .build_decoder()
        .context(RecordsSnafu {
            path: display_path(origin),
        })?;

    let mut batches = Vec::with_capacity(records.len().div_ceil(RECORD_BATCH_SIZE));
    for chunk in records.chunks(RECORD_BATCH_SIZE) {
        decoder.serialize(chunk).context(RecordsSnafu {
            path: display_path(origin),
        })?;
        if let Some(batch) = decoder.flush().context(RecordsSnafu {
            path: display_path(origin),
        })? {
            batches.push(batch);
        }
    }

    Ok(Dataset::from_reader(schema, batches))
}
