// src/schema/postgres.rs

use anyhow::{bail, Result};
use arrow::datatypes::{DataType, Schema};
use tokio_postgres::types::Type;

/// Map an Arrow DataType onto the Postgres column type it is stored as.
///
/// Unsigned types widen to the next signed type so every value fits.
/// `Null` columns (e.g. an all-empty fee column) become TEXT.
pub fn pg_type(dt: &DataType) -> Result<Type> {
    let ty = match dt {
        DataType::Boolean => Type::BOOL,
        DataType::Int8 | DataType::Int16 | DataType::UInt8 => Type::INT2,
        DataType::Int32 | DataType::UInt16 => Type::INT4,
        DataType::Int64 | DataType::UInt32 => Type::INT8,
        DataType::Float16 | DataType::Float32 => Type::FLOAT4,
        DataType::Float64 => Type::FLOAT8,
        DataType::Utf8 | DataType::LargeUtf8 | DataType::Utf8View => Type::TEXT,
        DataType::Timestamp(_, None) => Type::TIMESTAMP,
        DataType::Timestamp(_, Some(_)) => Type::TIMESTAMPTZ,
        DataType::Date32 | DataType::Date64 => Type::DATE,
        DataType::Null => Type::TEXT,
        other => bail!("no Postgres column type for Arrow type {other}"),
    };
    Ok(ty)
}

/// Double-quote an identifier, preserving case (`VendorID` stays `VendorID`).
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

pub fn drop_table_sql(table: &str) -> String {
    format!("DROP TABLE IF EXISTS {}", quote_ident(table))
}

/// `CREATE TABLE` with one column per Arrow field, all nullable.
pub fn create_table_sql(table: &str, schema: &Schema) -> Result<String> {
    if schema.fields().is_empty() {
        bail!("cannot create table {table} with no columns");
    }
    let cols = schema
        .fields()
        .iter()
        .map(|f| Ok(format!("{} {}", quote_ident(f.name()), pg_type(f.data_type())?.name())))
        .collect::<Result<Vec<_>>>()?;
    Ok(format!(
        "CREATE TABLE {} ({})",
        quote_ident(table),
        cols.join(", ")
    ))
}

pub fn copy_in_sql(table: &str, schema: &Schema) -> String {
    let cols = schema
        .fields()
        .iter()
        .map(|f| quote_ident(f.name()))
        .collect::<Vec<_>>()
        .join(", ");
    format!("COPY {} ({}) FROM STDIN BINARY", quote_ident(table), cols)
}
