//! Shared fakes and fixtures for integration tests

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use arrow::array::{
    ArrayRef, Float64Array, Int32Array, Int64Array, StringArray, TimestampMicrosecondArray,
};
use arrow::datatypes::{DataType, Field, Schema, TimeUnit};
use arrow::record_batch::RecordBatch;
use async_trait::async_trait;
use bytes::Bytes;
use chrono::NaiveDate;
use parquet::arrow::ArrowWriter;
use taxi_etl::config::DEFAULT_URL_TEMPLATE;
use taxi_etl::{
    DatabaseBackend, DatabaseError, DatabaseResult, FetchError, TripMonth, TripSource,
    download_url,
};

/// Event recorded when a backend is closed
pub const CLOSE: &str = "CLOSE";

/// In-memory backend that records every statement it receives
#[derive(Default)]
pub struct RecordingBackend {
    events: Mutex<Vec<String>>,
    copied: Mutex<Vec<Bytes>>,
    closed: Mutex<bool>,
    fail_on: Option<String>,
}

impl RecordingBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Backend that fails any statement containing `pattern`
    pub fn failing_on(pattern: &str) -> Self {
        Self {
            fail_on: Some(pattern.to_string()),
            ..Self::default()
        }
    }

    pub fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }

    pub fn copied(&self) -> Vec<Bytes> {
        self.copied.lock().unwrap().clone()
    }

    pub fn is_closed(&self) -> bool {
        *self.closed.lock().unwrap()
    }

    fn record(&self, sql: &str) -> DatabaseResult<()> {
        if self.is_closed() {
            return Err(DatabaseError::NotConnected);
        }
        self.events.lock().unwrap().push(sql.trim().to_string());

        match &self.fail_on {
            Some(pattern) if sql.contains(pattern.as_str()) => Err(DatabaseError::QueryFailed(
                format!("simulated failure on '{}'", pattern),
            )),
            _ => Ok(()),
        }
    }
}

#[async_trait(?Send)]
impl DatabaseBackend for RecordingBackend {
    async fn batch_execute(&self, sql: &str) -> DatabaseResult<()> {
        self.record(sql)
    }

    async fn execute(&self, sql: &str, _params: &[&str]) -> DatabaseResult<u64> {
        self.record(sql)?;
        Ok(0)
    }

    async fn copy_in(&self, copy_sql: &str, data: Bytes) -> DatabaseResult<u64> {
        self.record(copy_sql)
            .map_err(|e| DatabaseError::CopyFailed(e.to_string()))?;
        let rows = data.iter().filter(|b| **b == b'\n').count() as u64;
        self.copied.lock().unwrap().push(data);
        Ok(rows)
    }

    async fn close(&self) -> DatabaseResult<()> {
        self.events.lock().unwrap().push(CLOSE.to_string());
        *self.closed.lock().unwrap() = true;
        Ok(())
    }

    fn backend_type(&self) -> &'static str {
        "recording"
    }
}

/// Trip source serving one fixed body for every month, or failing
pub struct FakeSource {
    body: Option<Bytes>,
    fetched: Mutex<Vec<TripMonth>>,
}

impl FakeSource {
    pub fn serving(body: Bytes) -> Self {
        Self {
            body: Some(body),
            fetched: Mutex::new(Vec::new()),
        }
    }

    /// Source answering every request with HTTP 404
    pub fn failing() -> Self {
        Self {
            body: None,
            fetched: Mutex::new(Vec::new()),
        }
    }

    pub fn fetched(&self) -> Vec<TripMonth> {
        self.fetched.lock().unwrap().clone()
    }
}

#[async_trait(?Send)]
impl TripSource for FakeSource {
    fn url(&self, month: TripMonth) -> String {
        download_url(DEFAULT_URL_TEMPLATE, month)
    }

    async fn fetch(&self, month: TripMonth) -> Result<Bytes, FetchError> {
        self.fetched.lock().unwrap().push(month);
        self.body.clone().ok_or_else(|| FetchError::Status {
            url: self.url(month),
            status: 404,
        })
    }
}

pub fn month(year: i32, month: u32) -> TripMonth {
    TripMonth::new(year, month).unwrap()
}

fn micros(day: u32, h: u32, m: u32, s: u32) -> i64 {
    NaiveDate::from_ymd_opt(2024, 1, day)
        .unwrap()
        .and_hms_opt(h, m, s)
        .unwrap()
        .and_utc()
        .timestamp_micros()
}

/// Two-row trip file laid out like the published 2024 files
///
/// Columns use the published spelling (`VendorID`, `Airport_fee`, ...) and a
/// trailing `cbd_congestion_fee` column that bronze does not have. The second
/// row has null `passenger_count` and `Airport_fee`.
pub fn trip_parquet() -> Bytes {
    build_parquet(None)
}

/// Same as [`trip_parquet`] with column `skip` left out
pub fn trip_parquet_without(skip: &str) -> Bytes {
    build_parquet(Some(skip))
}

fn build_parquet(skip: Option<&str>) -> Bytes {
    let timestamp = DataType::Timestamp(TimeUnit::Microsecond, None);
    let money = |a: f64, b: f64| -> ArrayRef { Arc::new(Float64Array::from(vec![a, b])) };

    let columns: Vec<(&str, DataType, ArrayRef)> = vec![
        ("VendorID", DataType::Int32, Arc::new(Int32Array::from(vec![1, 2])) as ArrayRef),
        (
            "tpep_pickup_datetime",
            timestamp.clone(),
            Arc::new(TimestampMicrosecondArray::from(vec![
                micros(1, 0, 57, 55),
                micros(1, 0, 3, 0),
            ])) as ArrayRef,
        ),
        (
            "tpep_dropoff_datetime",
            timestamp,
            Arc::new(TimestampMicrosecondArray::from(vec![
                micros(1, 1, 17, 43),
                micros(1, 0, 9, 36),
            ])) as ArrayRef,
        ),
        (
            "passenger_count",
            DataType::Int64,
            Arc::new(Int64Array::from(vec![Some(1), None])) as ArrayRef,
        ),
        ("trip_distance", DataType::Float64, money(1.72, 1.8)),
        ("RatecodeID", DataType::Int64, Arc::new(Int64Array::from(vec![1, 1])) as ArrayRef),
        (
            "store_and_fwd_flag",
            DataType::Utf8,
            Arc::new(StringArray::from(vec!["N", "N"])) as ArrayRef,
        ),
        ("PULocationID", DataType::Int32, Arc::new(Int32Array::from(vec![186, 140])) as ArrayRef),
        ("DOLocationID", DataType::Int32, Arc::new(Int32Array::from(vec![79, 236])) as ArrayRef),
        ("payment_type", DataType::Int64, Arc::new(Int64Array::from(vec![2, 1])) as ArrayRef),
        ("fare_amount", DataType::Float64, money(17.7, 10.0)),
        ("extra", DataType::Float64, money(1.0, 3.5)),
        ("mta_tax", DataType::Float64, money(0.5, 0.5)),
        ("tip_amount", DataType::Float64, money(0.0, 3.75)),
        ("tolls_amount", DataType::Float64, money(0.0, 0.0)),
        ("improvement_surcharge", DataType::Float64, money(1.0, 1.0)),
        ("total_amount", DataType::Float64, money(22.7, 18.75)),
        ("congestion_surcharge", DataType::Float64, money(2.5, 2.5)),
        (
            "Airport_fee",
            DataType::Float64,
            Arc::new(Float64Array::from(vec![Some(0.0), None])) as ArrayRef,
        ),
        ("cbd_congestion_fee", DataType::Float64, money(0.0, 0.75)),
    ];

    let (fields, arrays): (Vec<Field>, Vec<ArrayRef>) = columns
        .into_iter()
        .filter(|(name, _, _)| Some(*name) != skip)
        .map(|(name, data_type, array)| (Field::new(name, data_type, true), array))
        .unzip();

    let schema = Arc::new(Schema::new(fields));
    let batch = RecordBatch::try_new(schema.clone(), arrays).unwrap();

    let mut buf = Vec::new();
    let mut writer = ArrowWriter::try_new(&mut buf, schema, None).unwrap();
    writer.write(&batch).unwrap();
    writer.close().unwrap();
    Bytes::from(buf)
}

/// Write stub silver and gold scripts into `dir`
pub fn write_layer_scripts(dir: &std::path::Path) {
    std::fs::write(
        dir.join("silver_full_refresh_transformation.sql"),
        "-- silver\nTRUNCATE silver.yellow_taxi;",
    )
    .unwrap();
    std::fs::write(
        dir.join("gold_aggregate_layer.sql"),
        "-- gold\nDROP TABLE IF EXISTS gold.daily_trip_summary;",
    )
    .unwrap();
}
