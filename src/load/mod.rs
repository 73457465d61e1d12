pub mod cell;
pub mod coerce;
pub mod sink;

pub use cell::{cell_at, Cell};
pub use coerce::{coerce_batch, coerce_schema};
pub use sink::Sink;

use anyhow::{bail, Context, Result};
use arrow::{datatypes::Schema, record_batch::RecordBatchReader};
use parquet::arrow::arrow_reader::{ParquetRecordBatchReader, ParquetRecordBatchReaderBuilder};
use std::{fs::File, path::Path, time::Instant};
use tracing::{info, instrument, warn};

/// Open a Parquet file as a forward-only stream of record batches of `batch_size` rows.
pub fn open_batches(path: &Path, batch_size: usize) -> Result<ParquetRecordBatchReader> {
    if batch_size == 0 {
        bail!("batch size must be at least 1");
    }
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    let builder = ParquetRecordBatchReaderBuilder::try_new(file)
        .with_context(|| format!("reading parquet metadata of {}", path.display()))?;
    info!(
        rows = builder.metadata().file_metadata().num_rows(),
        row_groups = builder.metadata().num_row_groups(),
        "opened parquet file"
    );
    builder
        .with_batch_size(batch_size)
        .build()
        .context("building parquet batch reader")
}

/// Stream the trip file at `path` into `table`, one coerced batch at a time.
///
/// The table is replaced using the schema of the first coerced batch, then every
/// batch (the first included) is appended. A file with no rows still gets an
/// empty table shaped like its coerced schema. Returns the number of rows loaded.
#[instrument(level = "info", skip(sink, path, declared), fields(file = %path.display()))]
pub async fn load_trips<S: Sink>(
    path: &Path,
    sink: &S,
    table: &str,
    declared: &Schema,
    batch_size: usize,
) -> Result<u64> {
    let start = Instant::now();
    let reader = open_batches(path, batch_size)?;
    let file_schema = reader.schema();

    let mut created = false;
    let mut total: u64 = 0;
    for (idx, batch) in reader.enumerate() {
        let batch = batch.with_context(|| format!("reading batch {idx}"))?;
        let batch = coerce_batch(&batch, declared)
            .with_context(|| format!("coercing batch {idx} for {table}"))?;

        if !created {
            sink.replace_table(table, batch.schema().as_ref())
                .await
                .with_context(|| format!("creating table {table}"))?;
            created = true;
            info!(table, "table created");
        }

        let rows = sink
            .append(table, &batch)
            .await
            .with_context(|| format!("appending batch {idx} to {table}"))?;
        total += rows;
        info!(batch = idx, rows, total, "loaded batch");
    }

    if !created {
        warn!(table, "file holds no rows; creating empty table");
        let schema = coerce_schema(file_schema.as_ref(), declared)
            .with_context(|| format!("coercing schema for {table}"))?;
        sink.replace_table(table, schema.as_ref())
            .await
            .with_context(|| format!("creating table {table}"))?;
    }

    info!(table, rows = total, elapsed = ?start.elapsed(), "trip data loaded");
    Ok(total)
}
