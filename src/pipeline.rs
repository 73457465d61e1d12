// src/pipeline.rs

use anyhow::{Context, Result};
use std::time::Instant;
use tracing::info;

use crate::config::Config;
use crate::fetch::{fetch, Fetched, Remote};
use crate::load::{load_trips, Sink};
use crate::schema::trip_schema;
use crate::zones::load_zones;

/// What one run did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Summary {
    pub cache: Fetched,
    pub trip_table: String,
    pub trip_rows: u64,
    pub zone_rows: u64,
}

/// Fetch the month's trip file, load it, then replace the zone lookup.
///
/// Stops at the first error. A failed download never reaches the loader.
pub async fn run<R: Remote, S: Sink>(config: &Config, remote: &R, sink: &S) -> Result<Summary> {
    let start = Instant::now();

    // ─── 1) trip file ────────────────────────────────────────────────
    let url = config.trip_url();
    let cache = fetch(remote, &url, &config.cache_file())
        .await
        .with_context(|| format!("fetching {url}"))?;

    // ─── 2) trip records ─────────────────────────────────────────────
    let trip_table = config.trip_table();
    let trip_rows = load_trips(
        cache.path(),
        sink,
        &trip_table,
        &trip_schema(),
        config.batch_size,
    )
    .await?;

    // ─── 3) zone lookup ──────────────────────────────────────────────
    let zone_rows = load_zones(remote, sink, config.zone_url()).await?;

    let summary = Summary {
        cache,
        trip_table,
        trip_rows,
        zone_rows,
    };
    info!(?summary, elapsed = ?start.elapsed(), "run complete");
    Ok(summary)
}
