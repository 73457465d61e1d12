// src/load/sink.rs

use anyhow::Result;
use arrow::{datatypes::Schema, record_batch::RecordBatch};

/// Sink defines the write interface between Arrow batches and the destination store.
///
/// A table's lifecycle is two separate steps: [`Sink::replace_table`] drops and
/// recreates it empty, then any number of [`Sink::append`] calls add rows. Each
/// append stands alone; nothing rolls back earlier appends if a later one fails.
#[allow(async_fn_in_trait)]
pub trait Sink {
    /// Drop `table` if it exists and create it empty with one column per field.
    async fn replace_table(&self, table: &str, schema: &Schema) -> Result<()>;

    /// Append every row of `batch` to `table`, returning the number of rows written.
    async fn append(&self, table: &str, batch: &RecordBatch) -> Result<u64>;
}
