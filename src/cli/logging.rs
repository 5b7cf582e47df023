//! Console and file log sinks

use std::fs::{self, OpenOptions};
use std::path::Path;
use std::sync::Mutex;

use taxi_etl::EtlConfig;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::prelude::*;

use crate::error::CliError;

/// Log file for `setup`
pub const SETUP_LOG: &str = "db_setup.log";

/// Log file for pipeline commands
pub const PIPELINE_LOG: &str = "pipeline.log";

/// Install a console sink and a file sink at `<logging.directory>/<log_name>`
///
/// `RUST_LOG` takes precedence over the configured level.
pub fn init(config: &EtlConfig, log_name: &str, verbose: bool) -> Result<(), CliError> {
    let path = config.log_file(log_name);
    let file = open_log(&path)?;

    let level = if verbose {
        "debug"
    } else {
        config.logging.level.as_str()
    };
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(format!("warn,taxi_etl={}", level)).map_err(|e| {
            CliError::InvalidArgument(format!("Invalid log level '{}': {}", level, e))
        })?,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false))
        .with(
            fmt::layer()
                .with_ansi(false)
                .with_target(false)
                .with_writer(Mutex::new(file)),
        )
        .try_init()
        .map_err(|e| CliError::IoError(format!("Failed to install logger: {}", e)))
}

fn open_log(path: &Path) -> Result<fs::File, CliError> {
    if let Some(dir) = path.parent()
        && !dir.as_os_str().is_empty()
    {
        fs::create_dir_all(dir).map_err(|e| {
            CliError::IoError(format!("Failed to create {}: {}", dir.display(), e))
        })?;
    }

    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| CliError::IoError(format!("Failed to open {}: {}", path.display(), e)))
}
