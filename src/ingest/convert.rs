//! Parquet to COPY-ready CSV conversion
//!
//! Trip files are decoded into Arrow record batches, the bronze columns are
//! projected by name in bronze order, and the result is rendered as headerless
//! comma-delimited text with empty fields for nulls.

use arrow::csv::WriterBuilder;
use arrow::datatypes::Schema;
use bytes::Bytes;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;

use crate::error::LoadError;

/// Columns of `bronze.yellow_taxi_raw`, in table order
pub const BRONZE_COLUMNS: [&str; 19] = [
    "vendorid",
    "tpep_pickup_datetime",
    "tpep_dropoff_datetime",
    "passenger_count",
    "trip_distance",
    "ratecodeid",
    "store_and_fwd_flag",
    "pulocationid",
    "dolocationid",
    "payment_type",
    "fare_amount",
    "extra",
    "mta_tax",
    "tip_amount",
    "tolls_amount",
    "improvement_surcharge",
    "total_amount",
    "congestion_surcharge",
    "airport_fee",
];

/// Timestamp rendering accepted by PostgreSQL `timestamp` input
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

/// CSV rendition of one trip file, ready for COPY
#[derive(Debug, Clone)]
pub struct StagingBuffer {
    /// Headerless CSV bytes
    pub csv: Bytes,
    /// Number of data rows in `csv`
    pub rows: usize,
}

/// Positions of the bronze columns in `schema`, matched case-insensitively
///
/// Source files spell columns `VendorID`, `Airport_fee`, ... and newer files
/// carry extra columns; those are ignored.
pub fn bronze_column_indices(schema: &Schema) -> Result<Vec<usize>, LoadError> {
    BRONZE_COLUMNS
        .iter()
        .map(|column| {
            schema
                .fields()
                .iter()
                .position(|field| field.name().eq_ignore_ascii_case(column))
                .ok_or_else(|| LoadError::MissingColumn(column.to_string()))
        })
        .collect()
}

/// Decode a Parquet file and render its bronze columns as CSV
pub fn parquet_to_csv(data: Bytes) -> Result<StagingBuffer, LoadError> {
    let builder = ParquetRecordBatchReaderBuilder::try_new(data)
        .map_err(|e| LoadError::Parquet(e.to_string()))?;

    let indices = bronze_column_indices(builder.schema())?;
    let reader = builder
        .build()
        .map_err(|e| LoadError::Parquet(e.to_string()))?;

    let mut writer = WriterBuilder::new()
        .with_header(false)
        .with_delimiter(b',')
        .with_null(String::new())
        .with_timestamp_format(TIMESTAMP_FORMAT.to_string())
        .with_timestamp_tz_format(TIMESTAMP_FORMAT.to_string())
        .build(Vec::new());

    let mut rows = 0;
    for batch in reader {
        let batch = batch.map_err(|e| LoadError::Parquet(e.to_string()))?;
        let projected = batch
            .project(&indices)
            .map_err(|e| LoadError::Parquet(e.to_string()))?;

        writer
            .write(&projected)
            .map_err(|e| LoadError::Csv(e.to_string()))?;
        rows += projected.num_rows();
    }

    Ok(StagingBuffer {
        csv: Bytes::from(writer.into_inner()),
        rows,
    })
}
