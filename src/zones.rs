// src/zones.rs

use anyhow::{Context, Result};
use arrow::{
    csv::{reader::Format, ReaderBuilder},
    datatypes::SchemaRef,
    record_batch::RecordBatch,
};
use regex::Regex;
use std::{io::Cursor, sync::Arc};
use tracing::{info, instrument};

use crate::config::ZONES_TABLE;
use crate::fetch::Remote;
use crate::load::Sink;

/// Field values that read as null: empty, or a common missing-value spelling.
const NULL_MARKERS: &str = r"^(|#N/A|#N/A N/A|#NA|-1\.#IND|-1\.#QNAN|-NaN|-nan|1\.#IND|1\.#QNAN|<NA>|N/A|NA|NULL|NaN|None|n/a|nan|null)$";

/// Parse a CSV body with a header row, inferring column types from every record.
///
/// Empty fields and the usual missing-value markers (`N/A`, `NA`, `NULL`, ...) load as null.
pub fn parse_csv(body: &[u8]) -> Result<(SchemaRef, Vec<RecordBatch>)> {
    let nulls = Regex::new(NULL_MARKERS).context("compiling null marker pattern")?;
    let format = Format::default().with_header(true).with_null_regex(nulls);
    let (schema, records) = format
        .infer_schema(Cursor::new(body), None)
        .context("inferring CSV schema")?;
    info!(columns = schema.fields().len(), records, "inferred CSV schema");
    let schema = Arc::new(schema);

    let reader = ReaderBuilder::new(schema.clone())
        .with_format(format)
        .build(Cursor::new(body))
        .context("creating CSV reader")?;
    let batches = reader
        .collect::<Result<Vec<_>, _>>()
        .context("parsing CSV records")?;
    Ok((schema, batches))
}

/// Download the zone lookup from `url` and replace the zones table with it.
///
/// The whole file is fetched and parsed in one go; it is a few hundred rows.
#[instrument(level = "info", skip(remote, sink))]
pub async fn load_zones<R: Remote, S: Sink>(remote: &R, sink: &S, url: &str) -> Result<u64> {
    let body = remote
        .download(url)
        .await
        .with_context(|| format!("downloading zone lookup from {url}"))?;
    let (schema, batches) = parse_csv(&body)?;

    sink.replace_table(ZONES_TABLE, schema.as_ref())
        .await
        .with_context(|| format!("creating table {ZONES_TABLE}"))?;
    let mut total = 0u64;
    for batch in &batches {
        total += sink
            .append(ZONES_TABLE, batch)
            .await
            .with_context(|| format!("appending to {ZONES_TABLE}"))?;
    }
    info!(rows = total, "loaded rows to {}", ZONES_TABLE);
    Ok(total)
}
