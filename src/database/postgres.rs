//! PostgreSQL database backend implementation
//!
//! Wraps a single tokio-postgres session. The pipeline relies on the session
//! being shared across calls because `raw_stage` is a temporary table.

use async_trait::async_trait;
use bytes::Bytes;
use futures::SinkExt;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_postgres::NoTls;
use tokio_postgres::types::ToSql;
use tracing::{debug, error};

use super::{DatabaseBackend, DatabaseError, DatabaseResult};
use crate::config::DatabaseSection;

/// PostgreSQL database backend
///
/// Statements run outside explicit transactions, so each one commits on its
/// own.
pub struct PostgresBackend {
    /// Masked connection target, for log lines
    target: String,
    /// Session; `None` once closed
    client: Mutex<Option<tokio_postgres::Client>>,
    /// Task driving the connection
    connection: Mutex<Option<JoinHandle<()>>>,
}

impl PostgresBackend {
    /// Connect to `dbname` on the server described by `section`
    pub async fn connect(section: &DatabaseSection, dbname: &str) -> DatabaseResult<Self> {
        let target = section.connection_string_masked(dbname);
        debug!("Connecting to {}", target);

        let (client, connection) = section.pg_config(dbname).connect(NoTls).await.map_err(|e| {
            DatabaseError::ConnectionFailed(format!("Failed to connect to {}: {}", target, e))
        })?;

        let handle = tokio::spawn(async move {
            if let Err(e) = connection.await {
                error!("PostgreSQL connection error: {}", e);
            }
        });

        Ok(Self {
            target,
            client: Mutex::new(Some(client)),
            connection: Mutex::new(Some(handle)),
        })
    }

    /// Get the connection target (password masked)
    pub fn connection_string_masked(&self) -> &str {
        &self.target
    }
}

#[async_trait(?Send)]
impl DatabaseBackend for PostgresBackend {
    async fn batch_execute(&self, sql: &str) -> DatabaseResult<()> {
        let guard = self.client.lock().await;
        let client = guard.as_ref().ok_or(DatabaseError::NotConnected)?;

        client
            .batch_execute(sql)
            .await
            .map_err(|e| DatabaseError::QueryFailed(describe(&e)))
    }

    async fn execute(&self, sql: &str, params: &[&str]) -> DatabaseResult<u64> {
        let guard = self.client.lock().await;
        let client = guard.as_ref().ok_or(DatabaseError::NotConnected)?;

        let param_refs: Vec<&(dyn ToSql + Sync)> = params
            .iter()
            .map(|p| p as &(dyn ToSql + Sync))
            .collect();

        client
            .execute(sql, &param_refs)
            .await
            .map_err(|e| DatabaseError::QueryFailed(describe(&e)))
    }

    async fn copy_in(&self, copy_sql: &str, data: Bytes) -> DatabaseResult<u64> {
        let guard = self.client.lock().await;
        let client = guard.as_ref().ok_or(DatabaseError::NotConnected)?;

        let sink = client
            .copy_in::<_, Bytes>(copy_sql)
            .await
            .map_err(|e| DatabaseError::CopyFailed(format!("COPY init: {}", describe(&e))))?;

        tokio::pin!(sink);
        sink.send(data)
            .await
            .map_err(|e| DatabaseError::CopyFailed(format!("sending COPY data: {}", describe(&e))))?;
        sink.as_mut()
            .finish()
            .await
            .map_err(|e| DatabaseError::CopyFailed(format!("finishing COPY: {}", describe(&e))))
    }

    async fn close(&self) -> DatabaseResult<()> {
        // Dropping the client ends the session and lets the connection task finish
        let client = self.client.lock().await.take();
        if client.is_none() {
            return Ok(());
        }
        drop(client);

        if let Some(handle) = self.connection.lock().await.take()
            && let Err(e) = handle.await
        {
            error!("PostgreSQL connection task failed: {}", e);
        }
        debug!("Closed connection to {}", self.target);
        Ok(())
    }

    fn backend_type(&self) -> &'static str {
        "postgres"
    }
}

/// Server-side message when there is one, else the driver's description
fn describe(e: &tokio_postgres::Error) -> String {
    match e.as_db_error() {
        Some(db) => format!("{}: {}", db.severity(), db.message()),
        None => e.to_string(),
    }
}
