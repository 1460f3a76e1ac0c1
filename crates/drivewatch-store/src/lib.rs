//! Drivewatch Store - SQLite state persistence
//!
//! Implements the four repository ports from `drivewatch-core` using
//! SQLite as the storage backend. It is a driven (secondary) adapter in
//! the hexagonal architecture.
//!
//! ## Key Components
//!
//! - [`DatabasePool`] - connection pool with embedded schema migration
//! - [`SqliteStateStore`] - implementation of all four repository ports
//!
//! ## Failure semantics
//!
//! `sqlx` errors are classified into the port-level `StoreError` taxonomy:
//! pool/IO trouble is retryable `Connection`, constraint violations are
//! fatal `Constraint` (they indicate a bug or corrupted payload and abort
//! the reconciliation pass without advancing the cursor), and everything
//! else is fatal `Query`.

pub mod pool;
pub mod repos;

pub use pool::DatabasePool;
pub use repos::SqliteStateStore;

use chrono::{DateTime, SecondsFormat, Utc};
use drivewatch_core::ports::StoreError;

/// Classify a sqlx error into the port-level taxonomy
pub(crate) fn map_sqlx(e: sqlx::Error) -> StoreError {
    match &e {
        sqlx::Error::Database(db) => match db.kind() {
            sqlx::error::ErrorKind::UniqueViolation
            | sqlx::error::ErrorKind::ForeignKeyViolation
            | sqlx::error::ErrorKind::NotNullViolation
            | sqlx::error::ErrorKind::CheckViolation => {
                StoreError::Constraint(db.message().to_string())
            }
            _ => StoreError::Query(e.to_string()),
        },
        sqlx::Error::Io(_)
        | sqlx::Error::PoolTimedOut
        | sqlx::Error::PoolClosed
        | sqlx::Error::WorkerCrashed => StoreError::Connection(e.to_string()),
        _ => StoreError::Query(e.to_string()),
    }
}

/// Render a timestamp in the fixed-width form the schema relies on
pub(crate) fn format_datetime(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Parse a stored timestamp
pub(crate) fn parse_datetime(s: &str) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| StoreError::Serialization(format!("failed to parse datetime '{s}': {e}")))
}

/// Parse an optional stored timestamp
pub(crate) fn parse_optional_datetime(
    s: Option<String>,
) -> Result<Option<DateTime<Utc>>, StoreError> {
    match s {
        Some(ref val) if !val.is_empty() => parse_datetime(val).map(Some),
        _ => Ok(None),
    }
}
