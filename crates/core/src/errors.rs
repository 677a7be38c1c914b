//! Core error types for the sync engine.
//!
//! This module defines database-agnostic error types. Storage-specific errors
//! (from Diesel, SQLite, etc.) are converted to these types by the storage
//! layer; provider HTTP errors are classified by the crates that make the
//! calls.

use thiserror::Error;

/// Type alias for Result using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Root error type for the sync engine.
///
/// The variants mirror how failures are surfaced to callers: deployment
/// misconfiguration, missing records, ownership violations, OAuth CSRF
/// failures, provider rejections and transient upstream trouble each get
/// their own shape so the HTTP layer can map them without string matching.
#[derive(Error, Debug)]
pub enum Error {
    /// Required deployment configuration is missing or malformed.
    #[error("Missing configuration: {0}")]
    Config(String),

    /// A referenced connection/account/instrument does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// The caller does not own the resource it tried to act on.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// The OAuth `state` echoed by the provider does not match the value we
    /// persisted when the flow was initiated.
    #[error("OAuth state mismatch for connection {0}")]
    StateMismatch(String),

    /// The operation is not valid for this provider (e.g. code exchange on a
    /// static-token provider).
    #[error("Unsupported operation: {0}")]
    Unsupported(String),

    /// The provider rejected the request with a client-class (4xx) status.
    /// Surfaced to the caller; retrying the same request will not help.
    #[error("Provider rejected the request ({status}): {message}")]
    ProviderRejected { status: u16, message: String },

    /// Non-auth provider failure (network, 5xx). Retryable.
    #[error("Upstream provider failure: {0}")]
    Upstream(String),

    /// A stored credential could not be decoded. Fatal for that connection
    /// until the user re-authenticates.
    #[error("Credential decode failed: {0}")]
    Decode(String),

    /// The provider had nothing to return for the request.
    #[error("No data: {0}")]
    NoData(String),

    /// Input validation failed.
    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Database operation failed: {0}")]
    Database(#[from] DatabaseError),

    #[error("Unexpected error: {0}")]
    Unexpected(String),
}

/// Database-agnostic error type for storage operations.
///
/// Uses `String` for details so the storage layer can convert Diesel/r2d2
/// errors into this format without leaking backend types.
#[derive(Error, Debug)]
pub enum DatabaseError {
    /// Failed to establish a database connection.
    #[error("Failed to connect to database: {0}")]
    ConnectionFailed(String),

    /// Failed to create or configure the connection pool.
    #[error("Failed to create database pool: {0}")]
    PoolCreationFailed(String),

    /// A database query failed to execute.
    #[error("Database query failed: {0}")]
    QueryFailed(String),

    /// The requested record was not found.
    #[error("Record not found: {0}")]
    NotFound(String),

    /// A unique constraint was violated (e.g., duplicate key).
    #[error("Unique constraint violation: {0}")]
    UniqueViolation(String),

    /// A foreign key constraint was violated.
    #[error("Foreign key violation: {0}")]
    ForeignKeyViolation(String),

    /// Database migration failed.
    #[error("Database migration failed: {0}")]
    MigrationFailed(String),

    /// Internal/unexpected database error.
    #[error("Internal database error: {0}")]
    Internal(String),
}

impl Error {
    /// Whether a scheduled retry of the same operation can succeed without
    /// user intervention.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::Upstream(_))
    }
}

// === From implementations for common error types ===

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Validation(err.to_string())
    }
}

impl From<chrono::ParseError> for Error {
    fn from(err: chrono::ParseError) -> Self {
        Error::Validation(err.to_string())
    }
}

impl From<Error> for String {
    fn from(err: Error) -> Self {
        err.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upstream_is_retryable() {
        assert!(Error::Upstream("503".into()).is_retryable());
    }

    #[test]
    fn provider_rejection_is_not_retryable() {
        let err = Error::ProviderRejected {
            status: 401,
            message: "invalid_grant".into(),
        };
        assert!(!err.is_retryable());
    }

    #[test]
    fn database_error_wraps_into_core() {
        let err: Error = DatabaseError::NotFound("connection abc".into()).into();
        assert!(matches!(err, Error::Database(DatabaseError::NotFound(_))));
    }
}
