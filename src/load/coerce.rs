// src/load/coerce.rs

use anyhow::{anyhow, bail, Context, Result};
use arrow::{
    array::{Array, ArrayRef, ArrowNativeTypeOp, AsArray},
    compute::{cast_with_options, CastOptions},
    datatypes::{
        i256, DataType, Decimal128Type, Decimal256Type, Field, Float32Type, Float64Type, Schema,
        SchemaRef,
    },
    record_batch::RecordBatch,
    util::display::FormatOptions,
};
use std::sync::Arc;

/// Schema a batch with `source` fields has after coercion against `declared`.
///
/// Declared columns take the declared type; every other column passes through.
/// Errors if a declared column is missing from `source`.
pub fn coerce_schema(source: &Schema, declared: &Schema) -> Result<SchemaRef> {
    if let Some(missing) = declared
        .fields()
        .iter()
        .find(|f| source.field_with_name(f.name()).is_err())
    {
        bail!("declared column {} not present in source", missing.name());
    }
    let fields: Vec<Field> = source
        .fields()
        .iter()
        .map(|f| match declared.field_with_name(f.name()) {
            Ok(target) => Field::new(f.name(), target.data_type().clone(), true),
            Err(_) => f.as_ref().clone(),
        })
        .collect();
    Ok(Arc::new(Schema::new(fields)))
}

/// Cast every declared column of `batch` to its declared type.
///
/// Strict: a value that cannot be represented in the declared type is an error,
/// including a fractional float or decimal headed for an integer column. Nulls stay null.
pub fn coerce_batch(batch: &RecordBatch, declared: &Schema) -> Result<RecordBatch> {
    let schema = coerce_schema(batch.schema().as_ref(), declared)?;
    let options = CastOptions {
        safe: false,
        format_options: FormatOptions::default(),
    };

    let mut out = Vec::with_capacity(batch.num_columns());
    for (arr, target) in batch.columns().iter().zip(schema.fields()) {
        if arr.data_type() == target.data_type() {
            out.push(arr.clone());
            continue;
        }
        if target.data_type().is_integer() {
            ensure_integral(arr).with_context(|| format!("column {}", target.name()))?;
        }
        let cast = cast_with_options(arr, target.data_type(), &options).with_context(|| {
            format!(
                "casting column {} from {} to {}",
                target.name(),
                arr.data_type(),
                target.data_type()
            )
        })?;
        out.push(cast);
    }

    RecordBatch::try_new(schema, out).map_err(Into::into)
}

/// Floats and scaled decimals must be whole numbers before they become integers.
fn ensure_integral(arr: &ArrayRef) -> Result<()> {
    let bad = match arr.data_type() {
        DataType::Float64 => arr
            .as_primitive::<Float64Type>()
            .iter()
            .flatten()
            .find(|v| !v.is_finite() || v.fract() != 0.0)
            .map(|v| v.to_string()),
        DataType::Float32 => arr
            .as_primitive::<Float32Type>()
            .iter()
            .flatten()
            .map(f64::from)
            .find(|v| !v.is_finite() || v.fract() != 0.0)
            .map(|v| v.to_string()),
        DataType::Decimal128(_, scale) if *scale > 0 => {
            let unit = 10_i128.pow(*scale as u32);
            arr.as_primitive::<Decimal128Type>()
                .iter()
                .flatten()
                .find(|v| v % unit != 0)
                .map(|v| format!("{v}e-{scale}"))
        }
        DataType::Decimal256(_, scale) if *scale > 0 => {
            let unit = i256::from_i128(10).pow_wrapping(*scale as u32);
            arr.as_primitive::<Decimal256Type>()
                .iter()
                .flatten()
                .find(|v| *v % unit != i256::ZERO)
                .map(|v| format!("{v}e-{scale}"))
        }
        _ => None,
    };
    match bad {
        Some(v) => Err(anyhow!("{v} cannot be stored as an integer")),
        None => Ok(()),
    }
}
