//! taxi-etl - batch ETL for NYC yellow-taxi trip data
//!
//! Provides:
//! - Monthly Parquet ingestion into a bronze PostgreSQL layer via COPY and a
//!   server-side merge procedure
//! - Silver and gold layer transforms driven by SQL scripts
//! - One-shot warehouse schema setup
//! - A sequential pipeline orchestrator over a month range
//!
//! All database work goes through the [`DatabaseBackend`] trait and all trip
//! file downloads through [`TripSource`], so stages can run against in-memory
//! fakes.

pub mod config;
pub mod database;
pub mod error;
pub mod ingest;
pub mod pipeline;
pub mod transform;

pub use config::{EtlConfig, sample_config};
pub use database::{DatabaseBackend, DatabaseError, DatabaseResult, PostgresBackend};
pub use error::{EtlError, EtlResult, FetchError, LoadError, TransformError};
pub use ingest::{
    HttpTripSource, IngestStats, MonthRange, TripMonth, TripSource, download_url, ingest_month,
};
pub use pipeline::{Pipeline, PipelineReport};
pub use transform::{Layer, SqlScripts, run_layer};
