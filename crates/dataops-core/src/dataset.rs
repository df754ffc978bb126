//! In-memory tabular dataset.
//!
//! A [`Dataset`] is an ordered set of named, equal-length columns represented
//! as an Arrow schema plus zero or more [`RecordBatch`]es that share it.
//! Readers produce one, writers and transforms consume one; it has no identity
//! beyond the variable holding it.

use arrow::array::{Array, ArrayRef, RecordBatch, new_empty_array};
use arrow::compute::{concat, concat_batches};
use arrow::datatypes::SchemaRef;
use arrow::error::ArrowError;
use snafu::prelude::*;

/// Errors raised while constructing or slicing a [`Dataset`].
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum DatasetError {
    /// The requested column is not part of the schema.
    #[snafu(display("Column not found: {column}"))]
    ColumnNotFound {
        /// Requested column name.
        column: String,
    },

    /// A batch does not carry the dataset's fields.
    #[snafu(display("Batch {index} does not match dataset schema: {detail}"))]
    SchemaMismatch {
        /// Position of the offending batch.
        index: usize,
        /// Human-readable mismatch description.
        detail: String,
    },

    /// Arrow failed while concatenating arrays or batches.
    #[snafu(display("Arrow error: {source}"))]
    Arrow {
        /// Underlying Arrow error.
        source: ArrowError,
    },
}

/// Tabular dataset: an Arrow schema plus the batches holding its rows.
#[derive(Debug, Clone)]
pub struct Dataset {
    schema: SchemaRef,
    batches: Vec<RecordBatch>,
}

impl Dataset {
    /// Build a dataset, checking every batch has the dataset's fields.
    pub fn try_new(schema: SchemaRef, batches: Vec<RecordBatch>) -> Result<Self, DatasetError> {
        for (index, batch) in batches.iter().enumerate() {
            if batch.schema().fields() != schema.fields() {
                return SchemaMismatchSnafu {
                    index,
                    detail: format!(
                        "expected columns {:?}, found {:?}",
                        schema.fields().iter().map(|f| f.name()).collect::<Vec<_>>(),
                        batch
                            .schema()
                            .fields()
                            .iter()
                            .map(|f| f.name())
                            .collect::<Vec<_>>()
                    ),
                }
                .fail();
            }
        }

        Ok(Self { schema, batches })
    }

    /// Batches decoded by a reader that was built from `schema`.
    pub(crate) fn from_reader(schema: SchemaRef, batches: Vec<RecordBatch>) -> Self {
        Self { schema, batches }
    }

    /// Wrap a single batch.
    pub fn from_batch(batch: RecordBatch) -> Self {
        Self {
            schema: batch.schema(),
            batches: vec![batch],
        }
    }

    /// A dataset with the given schema and no rows.
    pub fn empty(schema: SchemaRef) -> Self {
        Self {
            schema,
            batches: Vec::new(),
        }
    }

    /// Shared schema of all batches.
    pub fn schema(&self) -> SchemaRef {
        self.schema.clone()
    }

    /// Batches in row order.
    pub fn batches(&self) -> &[RecordBatch] {
        &self.batches
    }

    /// Consume the dataset and return its batches.
    pub fn into_batches(self) -> Vec<RecordBatch> {
        self.batches
    }

    /// Batches to hand to a writer: never empty, so header-only outputs
    /// still carry the schema.
    pub fn batches_or_empty(&self) -> Vec<RecordBatch> {
        if self.batches.is_empty() {
            vec![RecordBatch::new_empty(self.schema.clone())]
        } else {
            self.batches.clone()
        }
    }

    /// Total number of rows across batches.
    pub fn num_rows(&self) -> usize {
        self.batches.iter().map(RecordBatch::num_rows).sum()
    }

    /// Number of columns.
    pub fn num_columns(&self) -> usize {
        self.schema.fields().len()
    }

    /// Column names in schema order.
    pub fn column_names(&self) -> Vec<String> {
        self.schema
            .fields()
            .iter()
            .map(|f| f.name().to_string())
            .collect()
    }

    /// A single column, concatenated across all batches.
    pub fn column(&self, name: &str) -> Result<ArrayRef, DatasetError> {
        let idx = self
            .schema
            .index_of(name)
            .map_err(|_| DatasetError::ColumnNotFound {
                column: name.to_string(),
            })?;

        match self.batches.as_slice() {
            [] => Ok(new_empty_array(self.schema.field(idx).data_type())),
            [only] => Ok(only.column(idx).clone()),
            many => {
                let parts: Vec<&dyn Array> = many.iter().map(|b| b.column(idx).as_ref()).collect();
                concat(&parts).context(ArrowSnafu)
            }
        }
    }

    /// All rows as one batch.
    pub fn concat(&self) -> Result<RecordBatch, DatasetError> {
        concat_batches(&self.schema, &self.batches).context(ArrowSnafu)
    }

    /// Approximate in-memory footprint of all Arrow buffers, in bytes.
    pub fn memory_size(&self) -> usize {
        self.batches
            .iter()
            .map(RecordBatch::get_array_memory_size)
            .sum()
    }
}

impl From<RecordBatch> for Dataset {
    fn from(batch: RecordBatch) -> Self {
        Dataset::from_batch(batch)
    }
}
