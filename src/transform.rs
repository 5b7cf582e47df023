//! Silver and gold layer transforms
//!
//! Layer logic lives in SQL scripts. This module only locates a script, reads
//! it, and runs it as one statement batch on the caller's session.

use std::fmt;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::database::DatabaseBackend;
use crate::error::{EtlError, EtlResult, TransformError};

/// Script that installs `bronze.incremental_load()`
pub const BRONZE_PROCEDURE_SCRIPT: &str = "bronze_incremental_load.sql";

/// Layer built from bronze by a SQL script
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Layer {
    Silver,
    Gold,
}

impl Layer {
    /// Script file implementing this layer
    pub fn script_name(&self) -> &'static str {
        match self {
            Layer::Silver => "silver_full_refresh_transformation.sql",
            Layer::Gold => "gold_aggregate_layer.sql",
        }
    }
}

impl fmt::Display for Layer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Layer::Silver => write!(f, "silver"),
            Layer::Gold => write!(f, "gold"),
        }
    }
}

impl std::str::FromStr for Layer {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "silver" => Ok(Layer::Silver),
            "gold" => Ok(Layer::Gold),
            other => Err(format!("unknown layer '{}', expected silver or gold", other)),
        }
    }
}

/// Directory holding the layer scripts
#[derive(Debug, Clone)]
pub struct SqlScripts {
    dir: PathBuf,
}

impl SqlScripts {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Full path of script `name`
    pub fn path(&self, name: &str) -> PathBuf {
        self.dir.join(name)
    }

    /// Read the full text of script `name`
    pub async fn load(&self, name: &str) -> Result<String, TransformError> {
        let path = self.path(name);
        tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| TransformError::ScriptRead {
                path,
                message: e.to_string(),
            })
    }
}

/// Run one layer's script on `backend`
///
/// # Returns
/// Time spent executing the script
pub async fn run_layer<B>(backend: &B, scripts: &SqlScripts, layer: Layer) -> EtlResult<Duration>
where
    B: DatabaseBackend + ?Sized,
{
    let start = Instant::now();
    let wrap = |source: TransformError| EtlError::Transform { layer, source };

    let sql = scripts.load(layer.script_name()).await.map_err(wrap)?;
    info!(
        "Running {} layer from {}",
        layer,
        scripts.path(layer.script_name()).display()
    );

    backend
        .batch_execute(&sql)
        .await
        .map_err(|e| wrap(TransformError::Execution(e)))?;

    let elapsed = start.elapsed();
    info!("{} layer completed in {:.1}s", layer, elapsed.as_secs_f64());
    Ok(elapsed)
}
