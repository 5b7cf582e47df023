//! `config` and `url` commands

use std::path::PathBuf;

use taxi_etl::{EtlConfig, download_url, sample_config};

use super::RangeArgs;
use crate::error::CliError;

/// Config command arguments
#[derive(Debug, Clone)]
pub struct ConfigArgs {
    /// Explicit configuration file
    pub path: Option<PathBuf>,
    /// Print the effective configuration instead of the template
    pub resolved: bool,
}

/// Print the sample configuration, or the effective one with `--resolved`
pub fn handle_config(args: &ConfigArgs) -> Result<(), CliError> {
    if !args.resolved {
        print!("{}", sample_config());
        return Ok(());
    }

    let mut config = EtlConfig::load(args.path.as_deref())?;
    if config.database.password.is_some() {
        config.database.password = Some("****".to_string());
    }
    print!("{}", config.to_toml()?);
    Ok(())
}

/// Print the download URL of every month in the range
pub fn handle_url(config: &EtlConfig, range: &RangeArgs) -> Result<(), CliError> {
    for month in range.resolve(config)?.iter() {
        println!("{}", download_url(&config.source.url_template, month));
    }
    Ok(())
}
