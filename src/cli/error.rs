//! CLI-specific error types

use taxi_etl::EtlError;
use thiserror::Error;

/// CLI-specific error type
#[derive(Error, Debug)]
pub enum CliError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("{0}")]
    Etl(#[from] EtlError),

    #[error("IO error: {0}")]
    IoError(String),
}
