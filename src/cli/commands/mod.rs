//! CLI command implementations

pub mod config;
pub mod pipeline;
pub mod setup;

use taxi_etl::{EtlConfig, MonthRange, TripMonth};

use crate::error::CliError;

/// Month selection shared by `ingest`, `run` and `url`
///
/// Unset values fall back to the `[pipeline]` section.
#[derive(Debug, Clone, Default)]
pub struct RangeArgs {
    pub year: Option<i32>,
    /// Single month; overrides `month_start` and `month_end`
    pub month: Option<u32>,
    pub month_start: Option<u32>,
    pub month_end: Option<u32>,
}

impl RangeArgs {
    /// Resolve against the configured defaults
    pub fn resolve(&self, config: &EtlConfig) -> Result<MonthRange, CliError> {
        let year = self.year.unwrap_or(config.pipeline.year);
        let range = match self.month {
            Some(month) => MonthRange::single(TripMonth::new(year, month)?),
            None => MonthRange::new(
                year,
                self.month_start.unwrap_or(config.pipeline.month_start),
                self.month_end.unwrap_or(config.pipeline.month_end),
            )?,
        };
        Ok(range)
    }
}

/// Build the runtime every async command runs on
pub fn runtime() -> Result<tokio::runtime::Runtime, CliError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| CliError::IoError(format!("Failed to create runtime: {}", e)))
}
