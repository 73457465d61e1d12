// src/load/cell.rs

use anyhow::{anyhow, bail, Result};
use arrow::{
    array::{Array, AsArray},
    datatypes::{
        DataType, Date32Type, Date64Type, Float16Type, Float32Type, Float64Type, Int16Type,
        Int32Type, Int64Type, Int8Type, TimeUnit, TimestampMicrosecondType,
        TimestampMillisecondType, TimestampNanosecondType, TimestampSecondType, UInt16Type,
        UInt32Type, UInt8Type,
    },
    temporal_conversions::{date32_to_datetime, date64_to_datetime},
};
use bytes::BytesMut;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use std::error::Error;
use tokio_postgres::types::{to_sql_checked, IsNull, ToSql, Type};

/// One Arrow value in the shape Postgres' binary COPY expects for the column
/// type [`crate::schema::pg_type`] chose.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Null,
    Bool(bool),
    I16(i16),
    I32(i32),
    I64(i64),
    F32(f32),
    F64(f64),
    Text(String),
    Timestamp(NaiveDateTime),
    TimestampTz(DateTime<Utc>),
    Date(NaiveDate),
}

/// Read row `row` of `array`.
pub fn cell_at(array: &dyn Array, row: usize) -> Result<Cell> {
    if array.is_null(row) {
        return Ok(Cell::Null);
    }
    let cell = match array.data_type() {
        DataType::Null => Cell::Null,
        DataType::Boolean => Cell::Bool(array.as_boolean().value(row)),
        DataType::Int8 => Cell::I16(array.as_primitive::<Int8Type>().value(row).into()),
        DataType::Int16 => Cell::I16(array.as_primitive::<Int16Type>().value(row)),
        DataType::UInt8 => Cell::I16(array.as_primitive::<UInt8Type>().value(row).into()),
        DataType::Int32 => Cell::I32(array.as_primitive::<Int32Type>().value(row)),
        DataType::UInt16 => Cell::I32(array.as_primitive::<UInt16Type>().value(row).into()),
        DataType::Int64 => Cell::I64(array.as_primitive::<Int64Type>().value(row)),
        DataType::UInt32 => Cell::I64(array.as_primitive::<UInt32Type>().value(row).into()),
        DataType::Float16 => Cell::F32(array.as_primitive::<Float16Type>().value(row).to_f32()),
        DataType::Float32 => Cell::F32(array.as_primitive::<Float32Type>().value(row)),
        DataType::Float64 => Cell::F64(array.as_primitive::<Float64Type>().value(row)),
        DataType::Utf8 => Cell::Text(array.as_string::<i32>().value(row).to_string()),
        DataType::LargeUtf8 => Cell::Text(array.as_string::<i64>().value(row).to_string()),
        DataType::Utf8View => Cell::Text(array.as_string_view().value(row).to_string()),
        DataType::Timestamp(unit, tz) => {
            let raw = match unit {
                TimeUnit::Second => array.as_primitive::<TimestampSecondType>().value(row),
                TimeUnit::Millisecond => {
                    array.as_primitive::<TimestampMillisecondType>().value(row)
                }
                TimeUnit::Microsecond => {
                    array.as_primitive::<TimestampMicrosecondType>().value(row)
                }
                TimeUnit::Nanosecond => array.as_primitive::<TimestampNanosecondType>().value(row),
            };
            let utc = timestamp(raw, unit)
                .ok_or_else(|| anyhow!("timestamp {raw} ({unit:?}) out of range"))?;
            match tz {
                Some(_) => Cell::TimestampTz(utc),
                None => Cell::Timestamp(utc.naive_utc()),
            }
        }
        DataType::Date32 => {
            let v = array.as_primitive::<Date32Type>().value(row);
            Cell::Date(
                date32_to_datetime(v)
                    .ok_or_else(|| anyhow!("date {v} out of range"))?
                    .date(),
            )
        }
        DataType::Date64 => {
            let v = array.as_primitive::<Date64Type>().value(row);
            Cell::Date(
                date64_to_datetime(v)
                    .ok_or_else(|| anyhow!("date {v} out of range"))?
                    .date(),
            )
        }
        other => bail!("unsupported Arrow type {other}"),
    };
    Ok(cell)
}

fn timestamp(v: i64, unit: &TimeUnit) -> Option<DateTime<Utc>> {
    match unit {
        TimeUnit::Second => DateTime::from_timestamp(v, 0),
        TimeUnit::Millisecond => DateTime::from_timestamp_millis(v),
        TimeUnit::Microsecond => DateTime::from_timestamp_micros(v),
        TimeUnit::Nanosecond => Some(DateTime::from_timestamp_nanos(v)),
    }
}

impl ToSql for Cell {
    fn to_sql(&self, ty: &Type, out: &mut BytesMut) -> Result<IsNull, Box<dyn Error + Sync + Send>> {
        match self {
            Cell::Null => Ok(IsNull::Yes),
            Cell::Bool(v) => v.to_sql(ty, out),
            Cell::I16(v) => v.to_sql(ty, out),
            Cell::I32(v) => v.to_sql(ty, out),
            Cell::I64(v) => v.to_sql(ty, out),
            Cell::F32(v) => v.to_sql(ty, out),
            Cell::F64(v) => v.to_sql(ty, out),
            Cell::Text(v) => v.to_sql(ty, out),
            Cell::Timestamp(v) => v.to_sql(ty, out),
            Cell::TimestampTz(v) => v.to_sql(ty, out),
            Cell::Date(v) => v.to_sql(ty, out),
        }
    }

    // the column type is fixed by pg_type; each variant matches one of them
    fn accepts(_ty: &Type) -> bool {
        true
    }

    to_sql_checked!();
}
