//! `setup` command

use taxi_etl::EtlConfig;
use taxi_etl::database::setup::run_setup;

use super::runtime;
use crate::error::CliError;

/// Drop and recreate the warehouse database with every layer
pub fn handle_setup(config: &EtlConfig) -> Result<(), CliError> {
    runtime()?.block_on(run_setup(config))?;

    println!(
        "Database {} initialized for {} (bronze, meta, silver, gold)",
        config.database.dbname, config.pipeline.year
    );
    Ok(())
}
