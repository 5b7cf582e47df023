//! Pipeline commands: `run`, `ingest` and `transform`

use taxi_etl::ingest::format_duration;
use taxi_etl::{
    EtlConfig, EtlError, HttpTripSource, IngestStats, Layer, Pipeline, PostgresBackend,
    SqlScripts,
};
use tracing::error;

use super::{RangeArgs, runtime};
use crate::error::CliError;

/// Transform command arguments
#[derive(Debug, Clone)]
pub struct TransformArgs {
    /// Layers to run, in order
    pub layers: Vec<Layer>,
}

/// Run the full pipeline: ingest the month range, then silver, then gold
pub fn handle_run(config: &EtlConfig, range: &RangeArgs) -> Result<(), CliError> {
    let range = range.resolve(config)?;
    let source = http_source(config)?;

    let report = runtime()?.block_on(async {
        let backend = connect(config).await?;
        Pipeline::new(&backend, &source, scripts(config))
            .run(&range)
            .await
    })?;

    for stats in &report.months {
        print_ingest(stats);
    }
    println!("silver: {}", format_duration(report.silver));
    println!("gold:   {}", format_duration(report.gold));
    println!(
        "Pipeline completed: {} month(s), {} rows in {}",
        report.months.len(),
        report.rows_copied(),
        format_duration(report.total)
    );
    Ok(())
}

/// Ingest the month range into bronze only
pub fn handle_ingest(config: &EtlConfig, range: &RangeArgs) -> Result<(), CliError> {
    let range = range.resolve(config)?;
    let source = http_source(config)?;

    let months = runtime()?.block_on(async {
        let backend = connect(config).await?;
        Pipeline::new(&backend, &source, scripts(config))
            .ingest(&range)
            .await
    })?;

    for stats in &months {
        print_ingest(stats);
    }
    println!("Ingested {} month(s)", months.len());
    Ok(())
}

/// Run silver and/or gold scripts against the current bronze data
pub fn handle_transform(config: &EtlConfig, args: &TransformArgs) -> Result<(), CliError> {
    let source = http_source(config)?;

    let durations = runtime()?.block_on(async {
        let backend = connect(config).await?;
        Pipeline::new(&backend, &source, scripts(config))
            .transform(&args.layers)
            .await
    })?;

    for (layer, elapsed) in args.layers.iter().zip(&durations) {
        println!("{}: {}", layer, format_duration(*elapsed));
    }
    Ok(())
}

async fn connect(config: &EtlConfig) -> Result<PostgresBackend, EtlError> {
    PostgresBackend::connect(&config.database, &config.database.dbname)
        .await
        .map_err(|e| {
            let e = EtlError::Connection(e);
            error!("{}", e);
            e
        })
}

fn http_source(config: &EtlConfig) -> Result<HttpTripSource, CliError> {
    HttpTripSource::new(&config.source)
        .map_err(|e| CliError::InvalidArgument(format!("Invalid [source] settings: {}", e)))
}

fn scripts(config: &EtlConfig) -> SqlScripts {
    SqlScripts::new(&config.sql.directory)
}

fn print_ingest(stats: &IngestStats) {
    println!(
        "{}: {} rows, {} bytes in {} (fetch {}, copy {}, merge {})",
        stats.month,
        stats.rows_copied,
        stats.bytes_downloaded,
        stats.duration_string(),
        format_duration(stats.fetch_duration),
        format_duration(stats.stage_duration),
        format_duration(stats.procedure_duration)
    );
}
