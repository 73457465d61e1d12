// src/db.rs

use anyhow::{Context, Result};
use arrow::{datatypes::Schema, record_batch::RecordBatch};
use tokio_postgres::{binary_copy::BinaryCopyInWriter, types::ToSql, Client, NoTls};
use tracing::{debug, error, info};

use crate::config::Config;
use crate::load::{cell_at, Cell, Sink};
use crate::schema::{copy_in_sql, create_table_sql, drop_table_sql, pg_type};

/// Connect to Postgres and drive the connection on a background task.
pub async fn connect(config: &Config) -> Result<Client> {
    connect_url(&config.connection_string()?)
        .await
        .with_context(|| {
            format!(
                "connecting to postgres at {}:{}/{}",
                config.pg_host, config.pg_port, config.pg_db
            )
        })
}

pub async fn connect_url(url: &str) -> Result<Client> {
    let (client, connection) = tokio_postgres::connect(url, NoTls).await?;
    tokio::spawn(async move {
        if let Err(e) = connection.await {
            error!("postgres connection error: {}", e);
        }
    });
    info!("connected to postgres");
    Ok(client)
}

impl Sink for Client {
    async fn replace_table(&self, table: &str, schema: &Schema) -> Result<()> {
        let create = create_table_sql(table, schema)?;
        debug!(sql = %create, "replacing table");
        self.batch_execute(&format!("{}; {}", drop_table_sql(table), create))
            .await
            .with_context(|| format!("replacing table {table}"))?;
        Ok(())
    }

    async fn append(&self, table: &str, batch: &RecordBatch) -> Result<u64> {
        let schema = batch.schema();
        let types = schema
            .fields()
            .iter()
            .map(|f| pg_type(f.data_type()))
            .collect::<Result<Vec<_>>>()?;

        let sql = copy_in_sql(table, &schema);
        let sink = self
            .copy_in(sql.as_str())
            .await
            .with_context(|| format!("starting COPY into {table}"))?;
        let writer = BinaryCopyInWriter::new(sink, &types);
        futures::pin_mut!(writer);

        let mut row: Vec<Cell> = Vec::with_capacity(batch.num_columns());
        for i in 0..batch.num_rows() {
            row.clear();
            for col in batch.columns() {
                row.push(cell_at(col.as_ref(), i).with_context(|| format!("row {i}"))?);
            }
            let refs: Vec<&(dyn ToSql + Sync)> =
                row.iter().map(|c| c as &(dyn ToSql + Sync)).collect();
            writer
                .as_mut()
                .write(&refs)
                .await
                .with_context(|| format!("writing row {i} to {table}"))?;
        }
        let rows = writer
            .finish()
            .await
            .with_context(|| format!("completing COPY into {table}"))?;
        Ok(rows)
    }
}
