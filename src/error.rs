//! Error kinds for the ETL stages
//!
//! Each stage fails with its own kind so the orchestrator can decide centrally
//! how to log and abort. Drivers never log-and-rethrow.

use std::path::PathBuf;

use thiserror::Error;

use crate::database::DatabaseError;
use crate::ingest::TripMonth;
use crate::transform::Layer;

/// Failure while downloading a trip file
#[derive(Debug, Error)]
pub enum FetchError {
    /// Request could not be sent or the body could not be read
    #[error("request to {url} failed: {message}")]
    Request { url: String, message: String },

    /// Server answered with a non-success status
    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },
}

/// Failure while turning a downloaded file into staged rows
#[derive(Debug, Error)]
pub enum LoadError {
    /// Body is not a readable Parquet file
    #[error("Parquet decode failed: {0}")]
    Parquet(String),

    /// Record batch could not be rendered as CSV
    #[error("CSV render failed: {0}")]
    Csv(String),

    /// Source file lacks a column the bronze table requires
    #[error("source file has no column '{0}'")]
    MissingColumn(String),

    /// Dropping, creating or copying into the staging table failed
    #[error("staging failed: {0}")]
    Staging(#[from] DatabaseError),
}

/// Failure while running a layer script
#[derive(Debug, Error)]
pub enum TransformError {
    /// Script file could not be read
    #[error("failed to read {path}: {message}")]
    ScriptRead { path: PathBuf, message: String },

    /// Script was rejected by the database
    #[error("script execution failed: {0}")]
    Execution(#[from] DatabaseError),
}

/// Top-level error for pipeline and setup runs
#[derive(Debug, Error)]
pub enum EtlError {
    /// Configuration is missing or invalid
    #[error("Configuration error: {0}")]
    Config(String),

    /// Month outside 1..=12
    #[error("Invalid month {month} for year {year}")]
    InvalidMonth { year: i32, month: u32 },

    /// Could not open a database connection
    #[error("Connection error: {0}")]
    Connection(DatabaseError),

    /// Remote trip file could not be fetched
    #[error("Fetch failed for {month}: {source}")]
    Fetch { month: TripMonth, source: FetchError },

    /// Downloaded file could not be staged
    #[error("Load failed for {month}: {source}")]
    Load { month: TripMonth, source: LoadError },

    /// Merge procedure failed
    #[error("bronze.incremental_load() failed for {month}: {source}")]
    Procedure {
        month: TripMonth,
        source: DatabaseError,
    },

    /// Silver or gold script failed
    #[error("{layer} transformation failed: {source}")]
    Transform {
        layer: Layer,
        source: TransformError,
    },

    /// Schema initialization failed
    #[error("Setup failed at '{step}': {source}")]
    Setup {
        step: String,
        source: DatabaseError,
    },
}

/// Result type for ETL operations
pub type EtlResult<T> = Result<T, EtlError>;
