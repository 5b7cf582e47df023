//! One-shot warehouse initialization
//!
//! Recreates the target database from the maintenance database, then builds
//! the bronze, meta, silver and gold layers and installs the merge procedure.
//! Setup is destructive: existing warehouse data is dropped.

use tracing::{error, info};

use super::schema::DatabaseSchema;
use super::{DatabaseBackend, DatabaseError, PostgresBackend};
use crate::config::EtlConfig;
use crate::error::{EtlError, EtlResult};
use crate::transform::{BRONZE_PROCEDURE_SCRIPT, SqlScripts};

/// Terminates every other session on the database named by `$1`
pub const TERMINATE_SESSIONS_SQL: &str = "SELECT pg_terminate_backend(pid) \
     FROM pg_stat_activity \
     WHERE datname = $1 AND pid <> pg_backend_pid()";

fn setup_error(step: &str) -> impl Fn(DatabaseError) -> EtlError + '_ {
    move |source| EtlError::Setup {
        step: step.to_string(),
        source,
    }
}

/// Drop and recreate `db_name` using a session on the maintenance database
pub async fn create_database<B>(admin: &B, db_name: &str) -> EtlResult<()>
where
    B: DatabaseBackend + ?Sized,
{
    let terminated = admin
        .execute(TERMINATE_SESSIONS_SQL, &[db_name])
        .await
        .map_err(setup_error("terminate sessions"))?;
    if terminated > 0 {
        info!("Terminated {} session(s) on {}", terminated, db_name);
    }

    for statement in DatabaseSchema::recreate_database(db_name) {
        admin
            .batch_execute(&statement)
            .await
            .map_err(setup_error("create database"))?;
    }
    info!("Database {} was created successfully", db_name);
    Ok(())
}

/// Build every layer and install the merge procedure on a fresh database
///
/// `procedure_sql` is the text of the bronze merge procedure script.
pub async fn create_layers<B>(backend: &B, procedure_sql: &str, year: i32) -> EtlResult<()>
where
    B: DatabaseBackend + ?Sized,
{
    for step in DatabaseSchema::layers(year)? {
        for statement in &step.statements {
            backend
                .batch_execute(statement)
                .await
                .map_err(setup_error(step.name))?;
        }
        info!("{} layer created ({} statements)", step.name, step.statements.len());
    }

    backend
        .batch_execute(procedure_sql)
        .await
        .map_err(setup_error("install bronze.incremental_load"))?;
    info!("bronze.incremental_load created/updated successfully");
    Ok(())
}

/// Recreate the configured warehouse from scratch
pub async fn run_setup(config: &EtlConfig) -> EtlResult<()> {
    let result = setup(config).await;
    match &result {
        Ok(()) => info!("Database setup completed"),
        Err(e) => error!("Error during DB setup: {}", e),
    }
    result
}

async fn setup(config: &EtlConfig) -> EtlResult<()> {
    let database = &config.database;

    // Read the procedure first so a bad sql directory fails before anything is dropped
    let scripts = SqlScripts::new(&config.sql.directory);
    let procedure_sql = scripts
        .load(BRONZE_PROCEDURE_SCRIPT)
        .await
        .map_err(|e| EtlError::Config(e.to_string()))?;

    let admin = PostgresBackend::connect(database, &database.maintenance_db)
        .await
        .map_err(EtlError::Connection)?;
    info!("Connected to {}", admin.connection_string_masked());
    let created = create_database(&admin, &database.dbname).await;
    close_quietly(&admin).await;
    created?;

    let backend = PostgresBackend::connect(database, &database.dbname)
        .await
        .map_err(EtlError::Connection)?;
    let built = create_layers(&backend, &procedure_sql, config.pipeline.year).await;
    close_quietly(&backend).await;
    built
}

async fn close_quietly<B: DatabaseBackend + ?Sized>(backend: &B) {
    if let Err(e) = backend.close().await {
        error!("Failed to close {} connection: {}", backend.backend_type(), e);
    }
}
