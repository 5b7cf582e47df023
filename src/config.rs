//! Pipeline configuration file support
//!
//! Handles parsing of `taxi-etl.toml` configuration files and the
//! `HOST`/`USER`/`PORT`/`PASSWORD`/`DBNAME` environment variable overrides.
//! The resulting `EtlConfig` is built once and passed to every component.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::database::is_plain_identifier;
use crate::error::{EtlError, EtlResult};
use crate::ingest::MonthRange;

/// Default configuration filename
pub const CONFIG_FILENAME: &str = "taxi-etl.toml";

/// Environment variable for the database host
pub const ENV_HOST: &str = "HOST";

/// Environment variable for the database user
pub const ENV_USER: &str = "USER";

/// Environment variable for the database port
pub const ENV_PORT: &str = "PORT";

/// Environment variable for the database password
pub const ENV_PASSWORD: &str = "PASSWORD";

/// Environment variable for the target database name (lowercased on read)
pub const ENV_DBNAME: &str = "DBNAME";

/// Default trip file location
pub const DEFAULT_URL_TEMPLATE: &str =
    "https://d37ci6vzurychx.cloudfront.net/trip-data/yellow_tripdata_{year}-{month:02}.parquet";

/// Database connection section
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseSection {
    /// Server host name or address
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Login role
    #[serde(default = "default_user")]
    pub user: String,

    /// Login password
    #[serde(default)]
    pub password: Option<String>,

    /// Warehouse database created by `setup` and used by the pipeline
    #[serde(default = "default_dbname")]
    pub dbname: String,

    /// Database used for DROP/CREATE DATABASE during setup
    #[serde(default = "default_maintenance_db")]
    pub maintenance_db: String,
}

fn default_host() -> String {
    "localhost".to_string()
}

fn default_port() -> u16 {
    5432
}

fn default_user() -> String {
    "postgres".to_string()
}

fn default_dbname() -> String {
    "nyc_taxi".to_string()
}

fn default_maintenance_db() -> String {
    "postgres".to_string()
}

impl Default for DatabaseSection {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            user: default_user(),
            password: None,
            dbname: default_dbname(),
            maintenance_db: default_maintenance_db(),
        }
    }
}

impl DatabaseSection {
    /// Build a tokio-postgres config for `dbname` on this server
    pub fn pg_config(&self, dbname: &str) -> tokio_postgres::Config {
        let mut config = tokio_postgres::Config::new();
        config
            .host(&self.host)
            .port(self.port)
            .user(&self.user)
            .dbname(dbname)
            .application_name("taxi-etl");
        if let Some(password) = &self.password {
            config.password(password);
        }
        config
    }

    /// Connection target for log lines (password masked)
    pub fn connection_string_masked(&self, dbname: &str) -> String {
        let secret = if self.password.is_some() { ":****" } else { "" };
        format!(
            "postgresql://{}{}@{}:{}/{}",
            self.user, secret, self.host, self.port, dbname
        )
    }
}

/// Remote trip file section
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceSection {
    /// URL with `{year}` and `{month}` (or `{month:02}`) placeholders
    #[serde(default = "default_url_template")]
    pub url_template: String,

    /// Per-request timeout in seconds; no timeout when unset
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

fn default_url_template() -> String {
    DEFAULT_URL_TEMPLATE.to_string()
}

impl Default for SourceSection {
    fn default() -> Self {
        Self {
            url_template: default_url_template(),
            timeout_secs: None,
        }
    }
}

impl SourceSection {
    /// Request timeout, if configured
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

/// Month range section
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineSection {
    /// Calendar year to ingest; also the year of the silver partitions
    #[serde(default = "default_year")]
    pub year: i32,

    /// First month to ingest (inclusive)
    #[serde(default = "default_month_start")]
    pub month_start: u32,

    /// Last month to ingest (inclusive)
    #[serde(default = "default_month_end")]
    pub month_end: u32,
}

fn default_year() -> i32 {
    2024
}

fn default_month_start() -> u32 {
    1
}

fn default_month_end() -> u32 {
    5
}

impl Default for PipelineSection {
    fn default() -> Self {
        Self {
            year: default_year(),
            month_start: default_month_start(),
            month_end: default_month_end(),
        }
    }
}

/// SQL script location section
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SqlSection {
    /// Directory holding the bronze/silver/gold scripts
    #[serde(default = "default_sql_directory")]
    pub directory: PathBuf,
}

fn default_sql_directory() -> PathBuf {
    PathBuf::from("sql")
}

impl Default for SqlSection {
    fn default() -> Self {
        Self {
            directory: default_sql_directory(),
        }
    }
}

/// Logging section
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSection {
    /// Directory for log files
    #[serde(default = "default_log_directory")]
    pub directory: PathBuf,

    /// Minimum level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_directory() -> PathBuf {
    PathBuf::from("logs")
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            directory: default_log_directory(),
            level: default_log_level(),
        }
    }
}

/// Main configuration structure
///
/// Represents the `taxi-etl.toml` configuration file format.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct EtlConfig {
    /// Database connection
    #[serde(default)]
    pub database: DatabaseSection,

    /// Remote trip files
    #[serde(default)]
    pub source: SourceSection,

    /// Month range
    #[serde(default)]
    pub pipeline: PipelineSection,

    /// SQL scripts
    #[serde(default)]
    pub sql: SqlSection,

    /// Log sinks
    #[serde(default)]
    pub logging: LoggingSection,
}

impl EtlConfig {
    /// Create a new default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration
    ///
    /// Reads `path` when given (it must exist), otherwise `taxi-etl.toml` in the
    /// working directory if present, otherwise defaults. Environment overrides are
    /// applied and the result is validated.
    pub fn load(path: Option<&Path>) -> EtlResult<Self> {
        Self::load_with(path, |key| std::env::var(key).ok())
    }

    /// Load configuration with overrides taken from `lookup` instead of the environment
    pub fn load_with<F>(path: Option<&Path>, lookup: F) -> EtlResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = match path {
            Some(path) => Self::read(path)?,
            None if Path::new(CONFIG_FILENAME).exists() => Self::read(Path::new(CONFIG_FILENAME))?,
            None => Self::default(),
        };

        config.apply_overrides_from(lookup)?;
        config.validate()?;

        Ok(config)
    }

    fn read(path: &Path) -> EtlResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            EtlError::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::parse(&content)
    }

    /// Parse configuration from TOML string
    pub fn parse(content: &str) -> EtlResult<Self> {
        toml::from_str(content)
            .map_err(|e| EtlError::Config(format!("Failed to parse config: {}", e)))
    }

    /// Convert configuration to TOML string
    pub fn to_toml(&self) -> EtlResult<String> {
        toml::to_string_pretty(self)
            .map_err(|e| EtlError::Config(format!("Failed to serialize config: {}", e)))
    }

    /// Apply overrides from an arbitrary key lookup
    pub fn apply_overrides_from<F>(&mut self, lookup: F) -> EtlResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = lookup(ENV_HOST) {
            self.database.host = host;
        }

        if let Some(user) = lookup(ENV_USER) {
            self.database.user = user;
        }

        if let Some(port) = lookup(ENV_PORT) {
            self.database.port = port
                .trim()
                .parse()
                .map_err(|_| EtlError::Config(format!("{} is not a valid port: {}", ENV_PORT, port)))?;
        }

        if let Some(password) = lookup(ENV_PASSWORD) {
            self.database.password = Some(password);
        }

        // Unquoted identifiers fold to lowercase in PostgreSQL
        if let Some(dbname) = lookup(ENV_DBNAME) {
            self.database.dbname = dbname.to_lowercase();
        }

        Ok(())
    }

    /// Check the configuration for values the pipeline cannot run with
    pub fn validate(&self) -> EtlResult<()> {
        if self.database.host.trim().is_empty() {
            return Err(EtlError::Config("database.host is empty".to_string()));
        }

        if !is_plain_identifier(&self.database.dbname) {
            return Err(EtlError::Config(format!(
                "database.dbname '{}' must be a lowercase identifier ([a-z_][a-z0-9_]*)",
                self.database.dbname
            )));
        }

        if self.database.maintenance_db.trim().is_empty() {
            return Err(EtlError::Config(
                "database.maintenance_db is empty".to_string(),
            ));
        }

        if !self.source.url_template.contains("{year}")
            || !self.source.url_template.contains("{month")
        {
            return Err(EtlError::Config(
                "source.url_template needs {year} and {month} placeholders".to_string(),
            ));
        }

        self.month_range()?;
        Ok(())
    }

    /// Inclusive month range from the `[pipeline]` section
    pub fn month_range(&self) -> EtlResult<MonthRange> {
        MonthRange::new(
            self.pipeline.year,
            self.pipeline.month_start,
            self.pipeline.month_end,
        )
    }

    /// Log file path for a named log
    pub fn log_file(&self, name: &str) -> PathBuf {
        self.logging.directory.join(name)
    }
}

/// Generate a sample configuration file content
pub fn sample_config() -> &'static str {
    r#"# taxi-etl configuration
# HOST, USER, PORT, PASSWORD and DBNAME environment variables override [database].

[database]
host = "localhost"
port = 5432
user = "postgres"
# password = "secret"
# Created by `taxi-etl setup`; must be a lowercase identifier
dbname = "nyc_taxi"
maintenance_db = "postgres"

[source]
url_template = "https://d37ci6vzurychx.cloudfront.net/trip-data/yellow_tripdata_{year}-{month:02}.parquet"
# timeout_secs = 300

[pipeline]
year = 2024
month_start = 1
month_end = 5

[sql]
directory = "sql"

[logging]
directory = "logs"
level = "info"
"#
}
