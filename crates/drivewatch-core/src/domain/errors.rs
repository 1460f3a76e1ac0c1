//! Domain error types
//!
//! Validation failures for identifiers, paths and configuration values.

use thiserror::Error;

/// Errors that can occur in domain operations
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Invalid identifier format or content
    #[error("Invalid id: {0}")]
    InvalidId(String),

    /// Invalid delta cursor
    #[error("Invalid cursor: {0}")]
    InvalidCursor(String),

    /// Invalid mirror path
    #[error("Invalid path: {0}")]
    InvalidPath(String),

    /// Shared secret does not satisfy the configured floor
    #[error("Invalid shared secret: {0}")]
    InvalidSecret(String),

    /// Generic validation failure
    #[error("Validation failed: {0}")]
    ValidationFailed(String),
}
