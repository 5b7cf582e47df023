//! Database backend abstraction for the warehouse
//!
//! This module provides:
//! - `DatabaseBackend`: the capability every pipeline stage runs against
//! - `PostgresBackend`: the tokio-postgres implementation
//! - `DatabaseSchema`: DDL for the bronze/meta/silver/gold layers
//! - `setup`: one-shot database (re)creation
//!
//! Every statement runs in autocommit mode. There is no transaction spanning
//! more than one call.

use async_trait::async_trait;
use bytes::Bytes;

pub mod postgres;
pub mod schema;
pub mod setup;

pub use postgres::PostgresBackend;
pub use schema::DatabaseSchema;

/// Error type for database operations
#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    /// Failed to connect to database
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Statement execution failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// COPY FROM STDIN failed
    #[error("Copy failed: {0}")]
    CopyFailed(String),

    /// Backend was used after `close()`
    #[error("Connection already closed")]
    NotConnected,
}

/// Result type for database operations
pub type DatabaseResult<T> = Result<T, DatabaseError>;

/// Database capability used by ingestion, transforms and setup
///
/// Implementations hold exactly one session, so session-scoped objects such
/// as temporary tables stay visible across calls.
#[async_trait(?Send)]
pub trait DatabaseBackend {
    /// Execute one or more statements separated by semicolons
    ///
    /// Used for DDL, `CALL`, and whole SQL scripts.
    async fn batch_execute(&self, sql: &str) -> DatabaseResult<()>;

    /// Execute a single parameterized statement
    ///
    /// # Returns
    /// Number of rows affected
    async fn execute(&self, sql: &str, params: &[&str]) -> DatabaseResult<u64>;

    /// Stream `data` into a `COPY ... FROM STDIN` statement
    ///
    /// # Returns
    /// Number of rows copied
    async fn copy_in(&self, copy_sql: &str, data: Bytes) -> DatabaseResult<u64>;

    /// Close the session. Later calls fail with `NotConnected`.
    async fn close(&self) -> DatabaseResult<()>;

    /// Get the database backend type name
    fn backend_type(&self) -> &'static str;
}

/// Check that `name` is a plain lowercase identifier safe to interpolate unquoted
pub fn is_plain_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_lowercase() || c == '_' => {}
        _ => return false,
    }
    name.len() <= 63
        && chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
}
