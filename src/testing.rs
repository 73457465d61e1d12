// src/testing.rs
//! In-memory stand-ins for HTTP and Postgres shared by the unit tests.

use crate::fetch::{FetchError, Remote};
use crate::load::Sink;
use anyhow::{anyhow, bail, Result};
use arrow::{
    array::{
        ArrayRef, Float64Array, Int32Array, NullArray, StringArray, TimestampMicrosecondArray,
    },
    datatypes::{DataType, Field, Schema, SchemaRef, TimeUnit},
    record_batch::RecordBatch,
};
use bytes::Bytes;
use parquet::arrow::ArrowWriter;
use reqwest::StatusCode;
use std::{
    collections::{BTreeMap, HashMap},
    fs::File,
    path::Path,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
};
use tracing_subscriber::{fmt, EnvFilter};

pub fn init_logging() {
    let _ = fmt()
        .with_env_filter(EnvFilter::new("debug"))
        .with_target(false)
        .with_test_writer()
        .try_init();
}

/// Serves canned bodies by URL and counts every request.
pub struct CannedRemote {
    default: std::result::Result<Bytes, StatusCode>,
    by_url: HashMap<String, Bytes>,
    calls: AtomicUsize,
}

impl CannedRemote {
    pub fn ok(body: Vec<u8>) -> Self {
        Self {
            default: Ok(Bytes::from(body)),
            by_url: HashMap::new(),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn status(status: StatusCode) -> Self {
        Self {
            default: Err(status),
            by_url: HashMap::new(),
            calls: AtomicUsize::new(0),
        }
    }

    /// Serve `body` for `url`; other URLs fall back to the default response.
    pub fn with(mut self, url: impl Into<String>, body: Vec<u8>) -> Self {
        self.by_url.insert(url.into(), Bytes::from(body));
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Remote for CannedRemote {
    async fn download(&self, url: &str) -> std::result::Result<Bytes, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(body) = self.by_url.get(url) {
            return Ok(body.clone());
        }
        match &self.default {
            Ok(body) => Ok(body.clone()),
            Err(status) => Err(FetchError::Status {
                url: url.to_string(),
                status: *status,
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SinkEvent {
    Replace(String),
    Append(String, u64),
}

#[derive(Default)]
struct Tables {
    tables: BTreeMap<String, (SchemaRef, Vec<RecordBatch>)>,
    events: Vec<SinkEvent>,
    appends_left: Option<usize>,
}

/// A `Sink` that keeps tables in memory and rejects appends whose columns
/// don't match the table, the way Postgres would.
#[derive(Default)]
pub struct MemorySink {
    inner: Mutex<Tables>,
}

impl MemorySink {
    /// Accept `n` appends, then fail every one after.
    pub fn failing_after(n: usize) -> Self {
        let sink = Self::default();
        sink.inner.lock().unwrap().appends_left = Some(n);
        sink
    }

    pub fn events(&self) -> Vec<SinkEvent> {
        self.inner.lock().unwrap().events.clone()
    }

    pub fn row_count(&self, table: &str) -> Option<u64> {
        let inner = self.inner.lock().unwrap();
        inner
            .tables
            .get(table)
            .map(|(_, batches)| batches.iter().map(|b| b.num_rows() as u64).sum())
    }

    pub fn schema(&self, table: &str) -> Option<SchemaRef> {
        let inner = self.inner.lock().unwrap();
        inner.tables.get(table).map(|(schema, _)| schema.clone())
    }
}

impl Sink for MemorySink {
    async fn replace_table(&self, table: &str, schema: &Schema) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        inner
            .tables
            .insert(table.to_string(), (Arc::new(schema.clone()), Vec::new()));
        inner.events.push(SinkEvent::Replace(table.to_string()));
        Ok(())
    }

    async fn append(&self, table: &str, batch: &RecordBatch) -> Result<u64> {
        let mut inner = self.inner.lock().unwrap();
        if let Some(left) = inner.appends_left.as_mut() {
            if *left == 0 {
                bail!("connection reset");
            }
            *left -= 1;
        }
        let (schema, batches) = inner
            .tables
            .get_mut(table)
            .ok_or_else(|| anyhow!("relation {table} does not exist"))?;
        let same_columns = schema.fields().len() == batch.num_columns()
            && schema
                .fields()
                .iter()
                .zip(batch.schema().fields())
                .all(|(a, b)| a.name() == b.name() && a.data_type() == b.data_type());
        if !same_columns {
            bail!("batch columns do not match table {table}");
        }
        batches.push(batch.clone());
        let rows = batch.num_rows() as u64;
        inner
            .events
            .push(SinkEvent::Append(table.to_string(), rows));
        Ok(rows)
    }
}

/// Write `n` synthetic trip records to `path`, typed the way the published
/// files are before coercion (floats for several integer columns, an all-null fee).
pub fn write_trip_parquet(path: &Path, n: usize) -> Result<()> {
    write_trip_parquet_with(path, n, &|i| {
        if i % 10 == 0 {
            None
        } else {
            Some((i % 4) as f64 + 1.0)
        }
    })
}

/// Like `write_trip_parquet`, with `passengers(i)` as the passenger count of row `i`.
pub fn write_trip_parquet_with(
    path: &Path,
    n: usize,
    passengers: &dyn Fn(usize) -> Option<f64>,
) -> Result<()> {
    let micros = |i: usize| 1_761_955_200_000_000 + (i as i64) * 60_000_000;
    let float = |f: &dyn Fn(usize) -> Option<f64>| -> ArrayRef {
        Arc::new(Float64Array::from((0..n).map(f).collect::<Vec<_>>()))
    };
    let fields = vec![
        Field::new("VendorID", DataType::Int32, true),
        Field::new(
            "lpep_pickup_datetime",
            DataType::Timestamp(TimeUnit::Microsecond, None),
            true,
        ),
        Field::new(
            "lpep_dropoff_datetime",
            DataType::Timestamp(TimeUnit::Microsecond, None),
            true,
        ),
        Field::new("store_and_fwd_flag", DataType::Utf8, true),
        Field::new("RatecodeID", DataType::Float64, true),
        Field::new("PULocationID", DataType::Int32, true),
        Field::new("DOLocationID", DataType::Int32, true),
        Field::new("passenger_count", DataType::Float64, true),
        Field::new("trip_distance", DataType::Float64, true),
        Field::new("fare_amount", DataType::Float64, true),
        Field::new("extra", DataType::Float64, true),
        Field::new("mta_tax", DataType::Float64, true),
        Field::new("tip_amount", DataType::Float64, true),
        Field::new("tolls_amount", DataType::Float64, true),
        Field::new("ehail_fee", DataType::Null, true),
        Field::new("improvement_surcharge", DataType::Float64, true),
        Field::new("total_amount", DataType::Float64, true),
        Field::new("payment_type", DataType::Float64, true),
        Field::new("trip_type", DataType::Float64, true),
        Field::new("congestion_surcharge", DataType::Float64, true),
        Field::new("cbd_congestion_fee", DataType::Float64, true),
    ];
    let columns: Vec<ArrayRef> = vec![
        Arc::new(Int32Array::from((0..n).map(|i| (i % 2 + 1) as i32).collect::<Vec<_>>())),
        Arc::new(TimestampMicrosecondArray::from(
            (0..n).map(micros).collect::<Vec<_>>(),
        )),
        Arc::new(TimestampMicrosecondArray::from(
            (0..n).map(|i| micros(i) + 900_000_000).collect::<Vec<_>>(),
        )),
        Arc::new(StringArray::from(
            (0..n)
                .map(|i| if i % 10 == 0 { None } else { Some("N") })
                .collect::<Vec<_>>(),
        )),
        float(&|i| if i % 10 == 0 { None } else { Some(1.0) }),
        Arc::new(Int32Array::from((0..n).map(|i| (i % 265) as i32 + 1).collect::<Vec<_>>())),
        Arc::new(Int32Array::from((0..n).map(|i| (i % 7) as i32 + 1).collect::<Vec<_>>())),
        float(passengers),
        float(&|i| Some((i % 50) as f64 * 0.3)),
        float(&|i| Some(5.0 + (i % 30) as f64)),
        float(&|_| Some(0.5)),
        float(&|_| Some(0.5)),
        float(&|i| Some((i % 5) as f64)),
        float(&|_| Some(0.0)),
        Arc::new(NullArray::new(n)),
        float(&|_| Some(1.0)),
        float(&|i| Some(8.0 + (i % 30) as f64)),
        float(&|i| if i % 10 == 0 { None } else { Some(1.0) }),
        float(&|i| if i % 10 == 0 { None } else { Some(1.0) }),
        float(&|_| Some(2.75)),
        float(&|_| Some(0.0)),
    ];
    let schema = Arc::new(Schema::new(fields));
    let batch = RecordBatch::try_new(schema.clone(), columns)?;

    let file = File::create(path)?;
    let mut writer = ArrowWriter::try_new(file, schema, None)?;
    if n > 0 {
        writer.write(&batch)?;
    }
    writer.close()?;
    Ok(())
}

pub const ZONES_CSV: &str = "\"LocationID\",\"Borough\",\"Zone\",\"service_zone\"
1,\"EWR\",\"Newark Airport\",\"EWR\"
2,\"Queens\",\"Jamaica Bay\",\"Boro Zone\"
3,\"Bronx\",\"Allerton/Pelham Gardens\",\"Boro Zone\"
4,\"Manhattan\",\"Alphabet City\",\"Yellow Zone\"
264,\"Unknown\",\"N/A\",\"N/A\"
265,\"N/A\",\"Outside of NYC\",\"N/A\"
";
