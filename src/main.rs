use anyhow::Result;
use clap::Parser;
use reqwest::Client;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};
use tripload::{db, pipeline, Config};

#[tokio::main]
async fn main() -> Result<()> {
    // ─── 1) init logging ─────────────────────────────────────────────
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder()
        .with_env_filter(env)
        .with_span_events(fmt::format::FmtSpan::CLOSE)
        .init();

    // ─── 2) configure ────────────────────────────────────────────────
    let config = Config::parse();
    info!(?config, "startup");

    // ─── 3) connect ──────────────────────────────────────────────────
    let client = Client::new();
    let pg = db::connect(&config).await?;

    // ─── 4) ingest ───────────────────────────────────────────────────
    let summary = pipeline::run(&config, &client, &pg).await?;
    info!(
        table = %summary.trip_table,
        trip_rows = summary.trip_rows,
        zone_rows = summary.zone_rows,
        "all done"
    );
    Ok(())
}
