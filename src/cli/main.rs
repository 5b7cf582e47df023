//! CLI binary entry point for taxi-etl

mod commands;
mod error;
mod logging;

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use commands::RangeArgs;
use commands::config::{ConfigArgs, handle_config, handle_url};
use commands::pipeline::{TransformArgs, handle_ingest, handle_run, handle_transform};
use commands::setup::handle_setup;
use error::CliError;
use logging::{PIPELINE_LOG, SETUP_LOG};
use taxi_etl::{EtlConfig, Layer};

#[derive(Parser)]
#[command(name = "taxi-etl")]
#[command(about = "Batch ETL for NYC yellow-taxi trips into a bronze/silver/gold warehouse")]
#[command(version)]
struct Cli {
    /// Configuration file (default: ./taxi-etl.toml when present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log at debug level
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Drop and recreate the warehouse database, its layers and the merge procedure
    Setup,

    /// Download months and merge them into bronze
    Ingest {
        /// Calendar year (default: pipeline.year)
        #[arg(short, long)]
        year: Option<i32>,
        /// Single month to ingest
        #[arg(short, long, conflicts_with_all = ["month_start", "month_end"])]
        month: Option<u32>,
        /// First month of the range (default: pipeline.month_start)
        #[arg(long)]
        month_start: Option<u32>,
        /// Last month of the range (default: pipeline.month_end)
        #[arg(long)]
        month_end: Option<u32>,
    },

    /// Rebuild silver and/or gold from the current bronze data
    Transform {
        /// Layer to run (default: silver then gold)
        #[arg(value_enum)]
        layer: Option<LayerArg>,
    },

    /// Ingest the month range, then run silver and gold
    Run {
        /// Calendar year (default: pipeline.year)
        #[arg(short, long)]
        year: Option<i32>,
        /// First month of the range (default: pipeline.month_start)
        #[arg(long)]
        month_start: Option<u32>,
        /// Last month of the range (default: pipeline.month_end)
        #[arg(long)]
        month_end: Option<u32>,
    },

    /// Print trip file download URLs
    Url {
        /// Calendar year (default: pipeline.year)
        #[arg(short, long)]
        year: Option<i32>,
        /// Single month
        #[arg(short, long)]
        month: Option<u32>,
    },

    /// Print a sample configuration file
    Config {
        /// Print the effective configuration (file + environment) instead
        #[arg(long)]
        resolved: bool,
    },
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum LayerArg {
    Silver,
    Gold,
}

impl From<LayerArg> for Layer {
    fn from(arg: LayerArg) -> Self {
        match arg {
            LayerArg::Silver => Layer::Silver,
            LayerArg::Gold => Layer::Gold,
        }
    }
}

/// Load configuration and install log sinks for a command that touches the database
fn prepare(path: Option<&Path>, log_name: &str, verbose: bool) -> Result<EtlConfig, CliError> {
    let config = EtlConfig::load(path)?;
    logging::init(&config, log_name, verbose)?;
    Ok(config)
}

fn main() {
    let cli = Cli::parse();
    let config_path = cli.config.as_deref();

    let result = match cli.command {
        Commands::Setup => {
            prepare(config_path, SETUP_LOG, cli.verbose).and_then(|config| handle_setup(&config))
        }

        Commands::Ingest {
            year,
            month,
            month_start,
            month_end,
        } => {
            let range = RangeArgs {
                year,
                month,
                month_start,
                month_end,
            };
            prepare(config_path, PIPELINE_LOG, cli.verbose)
                .and_then(|config| handle_ingest(&config, &range))
        }

        Commands::Transform { layer } => {
            let args = TransformArgs {
                layers: match layer {
                    Some(layer) => vec![layer.into()],
                    None => vec![Layer::Silver, Layer::Gold],
                },
            };
            prepare(config_path, PIPELINE_LOG, cli.verbose)
                .and_then(|config| handle_transform(&config, &args))
        }

        Commands::Run {
            year,
            month_start,
            month_end,
        } => {
            let range = RangeArgs {
                year,
                month: None,
                month_start,
                month_end,
            };
            prepare(config_path, PIPELINE_LOG, cli.verbose)
                .and_then(|config| handle_run(&config, &range))
        }

        Commands::Url { year, month } => {
            let range = RangeArgs {
                year,
                month,
                ..Default::default()
            };
            EtlConfig::load(config_path)
                .map_err(CliError::from)
                .and_then(|config| handle_url(&config, &range))
        }

        Commands::Config { resolved } => handle_config(&ConfigArgs {
            path: cli.config.clone(),
            resolved,
        }),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
