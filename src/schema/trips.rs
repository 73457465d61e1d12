// src/schema/trips.rs

use arrow::datatypes::{DataType, Field, Schema, SchemaRef, TimeUnit};
use std::sync::Arc;

/// Declared type of every known trip-record column, as loose type names.
///
/// Anything in the file but not listed here keeps the type the reader produced.
pub const TRIP_COLUMNS: &[(&str, &str)] = &[
    ("VendorID", "Int64"),
    ("lpep_pickup_datetime", "datetime"),
    ("lpep_dropoff_datetime", "datetime"),
    ("store_and_fwd_flag", "str"),
    ("RatecodeID", "Int64"),
    ("PULocationID", "Int64"),
    ("DOLocationID", "Int64"),
    ("passenger_count", "Int64"),
    ("trip_distance", "float64"),
    ("fare_amount", "float64"),
    ("extra", "float64"),
    ("mta_tax", "float64"),
    ("tip_amount", "float64"),
    ("tolls_amount", "float64"),
    ("ehail_fee", "float64"),
    ("improvement_surcharge", "float64"),
    ("total_amount", "float64"),
    ("payment_type", "Int64"),
    ("trip_type", "Int64"),
    ("congestion_surcharge", "float64"),
    ("cbd_congestion_fee", "float64"),
];

/// Map a loose type name onto an Arrow DataType.
///
/// - Int64, int, integer           → Int64
/// - datetime, timestamp           → Timestamp(µs, no tz), Postgres' resolution
/// - float64, float, double        → Float64
/// - str, string, text             → Utf8
/// - fallback                      → Utf8
pub fn map_to_arrow_type(ty: &str) -> DataType {
    let lower = ty.to_ascii_lowercase();
    if lower == "int64" || lower == "int" || lower == "integer" {
        DataType::Int64
    } else if lower.starts_with("datetime") || lower.starts_with("timestamp") {
        DataType::Timestamp(TimeUnit::Microsecond, None)
    } else if lower == "float64" || lower == "float" || lower == "double" {
        DataType::Float64
    } else {
        DataType::Utf8
    }
}

/// The declared trip schema; every field nullable.
pub fn trip_schema() -> SchemaRef {
    let fields: Vec<Field> = TRIP_COLUMNS
        .iter()
        .map(|(name, ty)| Field::new(*name, map_to_arrow_type(ty), true))
        .collect();
    Arc::new(Schema::new(fields))
}
