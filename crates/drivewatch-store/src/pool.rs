//! Database connection pool management
//!
//! Wraps SQLx's SqlitePool with:
//! - DSN-based connection (`sqlite://...` or a bare path)
//! - WAL journal mode for concurrent reads
//! - Foreign-key enforcement
//! - Automatic schema migration on first connection
//! - In-memory mode for testing

use std::str::FromStr;
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};

use drivewatch_core::ports::StoreError;

/// Manages a pool of SQLite connections for drivewatch state persistence
///
/// File-backed pools use WAL mode and up to 5 connections with a 5-second
/// busy timeout. In-memory pools are pinned to a single connection, since
/// SQLite in-memory databases are per-connection.
pub struct DatabasePool {
    pool: SqlitePool,
}

impl DatabasePool {
    /// Creates a pool from a connection string
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Connection` if the connection cannot be
    /// established or `StoreError::Query` if schema migration fails.
    pub async fn connect(dsn: &str) -> Result<Self, StoreError> {
        if dsn.contains(":memory:") {
            return Self::in_memory().await;
        }

        let options = SqliteConnectOptions::from_str(dsn)
            .map_err(|e| StoreError::Connection(format!("invalid DSN '{dsn}': {e}")))?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .foreign_keys(true)
            .busy_timeout(Duration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .map_err(|e| StoreError::Connection(format!("failed to connect to '{dsn}': {e}")))?;

        Self::run_migrations(&pool).await?;

        tracing::info!(dsn, "Database pool initialized");
        Ok(Self { pool })
    }

    /// Creates an in-memory pool for testing
    pub async fn in_memory() -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")
            .map_err(|e| StoreError::Connection(e.to_string()))?
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .map_err(|e| {
                StoreError::Connection(format!("failed to create in-memory database: {e}"))
            })?;

        Self::run_migrations(&pool).await?;

        tracing::debug!("In-memory database pool initialized");
        Ok(Self { pool })
    }

    /// Returns a reference to the underlying SQLite connection pool
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Runs the initial schema migration
    async fn run_migrations(pool: &SqlitePool) -> Result<(), StoreError> {
        let migration_sql = include_str!("migrations/0001_initial.sql");
        sqlx::raw_sql(migration_sql)
            .execute(pool)
            .await
            .map_err(|e| StoreError::Query(format!("failed to run initial migration: {e}")))?;

        tracing::debug!("Database migrations completed");
        Ok(())
    }
}
