//! Monthly trip file ingestion into the bronze layer
//!
//! One call to [`ingest_month`] downloads a month's Parquet file, replaces the
//! session-local `raw_stage` table with its rows, and asks the database to
//! merge them into `bronze.yellow_taxi_raw` through
//! `bronze.incremental_load()`.

use std::time::{Duration, Instant};

use tracing::{debug, info};

pub mod convert;
pub mod month;
pub mod source;

pub use convert::{BRONZE_COLUMNS, StagingBuffer, TIMESTAMP_FORMAT, parquet_to_csv};
pub use month::{MonthRange, TripMonth};
pub use source::{HttpTripSource, TripSource, download_url};

use crate::database::DatabaseBackend;
use crate::error::{EtlError, EtlResult, LoadError};

/// Drops the previous call's staging table
pub const DROP_STAGING_SQL: &str = "DROP TABLE IF EXISTS raw_stage";

/// Creates an empty staging table shaped like bronze
pub const CREATE_STAGING_SQL: &str =
    "CREATE TEMP TABLE IF NOT EXISTS raw_stage (LIKE bronze.yellow_taxi_raw)";

/// Bulk-load contract for staged rows
pub const COPY_STAGING_SQL: &str =
    "COPY raw_stage FROM STDIN WITH (FORMAT csv, DELIMITER ',', NULL '')";

/// Merges staged rows into bronze
pub const CALL_MERGE_SQL: &str = "CALL bronze.incremental_load();";

/// Statistics from ingesting one month
#[derive(Debug, Clone)]
pub struct IngestStats {
    /// Month ingested
    pub month: TripMonth,
    /// Size of the downloaded file
    pub bytes_downloaded: u64,
    /// Rows decoded from the Parquet file
    pub rows_decoded: usize,
    /// Rows the server reported for COPY
    pub rows_copied: u64,
    pub fetch_duration: Duration,
    pub stage_duration: Duration,
    pub procedure_duration: Duration,
    /// Wall time for the whole call
    pub duration: Duration,
}

impl IngestStats {
    /// Create empty stats for `month`
    pub fn new(month: TripMonth) -> Self {
        Self {
            month,
            bytes_downloaded: 0,
            rows_decoded: 0,
            rows_copied: 0,
            fetch_duration: Duration::ZERO,
            stage_duration: Duration::ZERO,
            procedure_duration: Duration::ZERO,
            duration: Duration::ZERO,
        }
    }

    /// Get copied rows per second over the whole call
    pub fn throughput(&self) -> f64 {
        let secs = self.duration.as_secs_f64();
        if secs == 0.0 {
            0.0
        } else {
            self.rows_copied as f64 / secs
        }
    }

    /// Format duration as human-readable string
    pub fn duration_string(&self) -> String {
        format_duration(self.duration)
    }
}

/// Render a duration as `12.3s`, `3m 4s` or `1h 2m 3s`
pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    if secs < 60 {
        format!("{:.1}s", duration.as_secs_f64())
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}

/// Ingest one month into bronze on the caller's session
///
/// Nothing is sent to the database until the file has been downloaded and
/// converted, so a fetch or decode failure never reaches the merge
/// procedure. The staging table is dropped and recreated on every call.
pub async fn ingest_month<B, S>(backend: &B, source: &S, month: TripMonth) -> EtlResult<IngestStats>
where
    B: DatabaseBackend + ?Sized,
    S: TripSource + ?Sized,
{
    let start = Instant::now();
    let mut stats = IngestStats::new(month);

    info!("Downloading and loading {}", source.url(month));
    let body = source
        .fetch(month)
        .await
        .map_err(|e| EtlError::Fetch { month, source: e })?;
    stats.bytes_downloaded = body.len() as u64;

    let buffer = parquet_to_csv(body).map_err(|source| EtlError::Load { month, source })?;
    stats.rows_decoded = buffer.rows;
    stats.fetch_duration = start.elapsed();
    info!(
        "Fetched {} ({} bytes, {} rows) in {}",
        month,
        stats.bytes_downloaded,
        stats.rows_decoded,
        format_duration(stats.fetch_duration)
    );

    let stage_start = Instant::now();
    stats.rows_copied = stage(backend, buffer)
        .await
        .map_err(|source| EtlError::Load { month, source })?;
    stats.stage_duration = stage_start.elapsed();
    info!(
        "COPY into raw_stage: {} rows in {}",
        stats.rows_copied,
        format_duration(stats.stage_duration)
    );

    debug!("Calling bronze.incremental_load()");
    let procedure_start = Instant::now();
    backend
        .batch_execute(CALL_MERGE_SQL)
        .await
        .map_err(|source| EtlError::Procedure { month, source })?;
    stats.procedure_duration = procedure_start.elapsed();
    info!(
        "Procedure runtime: {}",
        format_duration(stats.procedure_duration)
    );

    stats.duration = start.elapsed();
    info!(
        "Finished ingestion for {} in {} ({:.0} rows/s)",
        month,
        stats.duration_string(),
        stats.throughput()
    );

    Ok(stats)
}

async fn stage<B>(backend: &B, buffer: StagingBuffer) -> Result<u64, LoadError>
where
    B: DatabaseBackend + ?Sized,
{
    backend.batch_execute(DROP_STAGING_SQL).await?;
    backend.batch_execute(CREATE_STAGING_SQL).await?;
    Ok(backend.copy_in(COPY_STAGING_SQL, buffer.csv).await?)
}
