//! End-to-end pipeline orchestration
//!
//! Ingests each month of a range into bronze, then rebuilds silver and gold,
//! all on one session. This is the only place stage failures are logged.

use std::time::{Duration, Instant};

use tracing::{error, info};

use crate::database::DatabaseBackend;
use crate::error::EtlResult;
use crate::ingest::{IngestStats, MonthRange, TripSource, format_duration, ingest_month};
use crate::transform::{Layer, SqlScripts, run_layer};

/// Outcome of a successful pipeline run
#[derive(Debug, Clone)]
pub struct PipelineReport {
    /// Per-month ingestion stats, in month order
    pub months: Vec<IngestStats>,
    pub silver: Duration,
    pub gold: Duration,
    /// Wall time for the whole run
    pub total: Duration,
}

impl PipelineReport {
    /// Rows copied into staging across all months
    pub fn rows_copied(&self) -> u64 {
        self.months.iter().map(|m| m.rows_copied).sum()
    }
}

/// Sequential bronze, silver, gold pipeline over a single backend session
pub struct Pipeline<'a, B: ?Sized, S: ?Sized> {
    backend: &'a B,
    source: &'a S,
    scripts: SqlScripts,
}

impl<'a, B, S> Pipeline<'a, B, S>
where
    B: DatabaseBackend + ?Sized,
    S: TripSource + ?Sized,
{
    pub fn new(backend: &'a B, source: &'a S, scripts: SqlScripts) -> Self {
        Self {
            backend,
            source,
            scripts,
        }
    }

    /// Run every stage for `range`, then close the backend
    ///
    /// The first failure aborts the run. The backend is closed whether or not
    /// the stages succeed.
    pub async fn run(&self, range: &MonthRange) -> EtlResult<PipelineReport> {
        let start = Instant::now();
        info!("Pipeline started for {}", range);

        let result = self.run_stages(range, start).await;
        if let Ok(report) = &result {
            info!(
                "Pipeline ran successfully: {} month(s), {} rows in {}",
                report.months.len(),
                report.rows_copied(),
                format_duration(report.total)
            );
        }
        self.conclude("end-to-end pipeline", result).await
    }

    /// Ingest `range` into bronze only, then close the backend
    pub async fn ingest(&self, range: &MonthRange) -> EtlResult<Vec<IngestStats>> {
        let result = self.ingest_range(range).await;
        self.conclude("ingestion", result).await
    }

    /// Run the given layer scripts in order, then close the backend
    pub async fn transform(&self, layers: &[Layer]) -> EtlResult<Vec<Duration>> {
        let result = self.run_layers(layers).await;
        self.conclude("transformation", result).await
    }

    /// Log a failure once and close the backend
    async fn conclude<T>(&self, stage: &str, result: EtlResult<T>) -> EtlResult<T> {
        if let Err(e) = &result {
            error!("Error during {}: {}", stage, e);
        }
        if let Err(e) = self.backend.close().await {
            error!("Failed to close {} connection: {}", self.backend.backend_type(), e);
        }
        result
    }

    async fn ingest_range(&self, range: &MonthRange) -> EtlResult<Vec<IngestStats>> {
        let mut months = Vec::with_capacity(range.len());
        for month in range.iter() {
            months.push(ingest_month(self.backend, self.source, month).await?);
        }
        Ok(months)
    }

    async fn run_layers(&self, layers: &[Layer]) -> EtlResult<Vec<Duration>> {
        let mut durations = Vec::with_capacity(layers.len());
        for layer in layers {
            durations.push(run_layer(self.backend, &self.scripts, *layer).await?);
        }
        Ok(durations)
    }

    async fn run_stages(&self, range: &MonthRange, start: Instant) -> EtlResult<PipelineReport> {
        let months = self.ingest_range(range).await?;
        let silver = run_layer(self.backend, &self.scripts, Layer::Silver).await?;
        let gold = run_layer(self.backend, &self.scripts, Layer::Gold).await?;

        Ok(PipelineReport {
            months,
            silver,
            gold,
            total: start.elapsed(),
        })
    }
}
