//! Error types for the coinfolio core.
//!
//! One root [`Error`] enum carries the stable failure taxonomy callers match
//! on: validation, not-found, conflict, concurrency, and database failures.
//! Storage-specific errors (Diesel, r2d2) are converted into these kinds at
//! the bottom of this module so the rest of the crate stays on `?`.

use diesel::result::{DatabaseErrorKind, Error as DieselError};
use thiserror::Error;

use crate::transactions::DerivationError;

/// Type alias for Result using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Root error type for the portfolio application.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Database operation failed: {0}")]
    Database(#[from] DatabaseError),

    #[error("Input validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    /// The storage engine reported lock contention. The whole operation
    /// rolled back and is safe to retry.
    #[error("Concurrent update failed: {0}")]
    Concurrency(String),
}

#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("Failed to connect to database: {0}")]
    ConnectionFailed(#[from] diesel::result::ConnectionError),

    #[error("Failed to create database pool: {0}")]
    PoolCreationFailed(#[from] r2d2::Error),

    #[error("Database query failed: {0}")]
    QueryFailed(String),

    #[error("Database migration failed: {0}")]
    MigrationFailed(String),
}

#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Required field '{0}' is missing")]
    MissingField(String),

    #[error("Failed to parse decimal number: {0}")]
    DecimalParse(#[from] rust_decimal::Error),

    #[error(transparent)]
    Derivation(#[from] DerivationError),
}

impl From<DieselError> for Error {
    fn from(err: DieselError) -> Self {
        match err {
            DieselError::NotFound => Error::NotFound("record not found".to_string()),
            DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, info) => {
                Error::Conflict(info.message().to_string())
            }
            DieselError::DatabaseError(DatabaseErrorKind::ForeignKeyViolation, info) => {
                Error::NotFound(info.message().to_string())
            }
            DieselError::DatabaseError(_, info)
                if info.message().contains("database is locked")
                    || info.message().contains("database table is locked") =>
            {
                Error::Concurrency(info.message().to_string())
            }
            other => Error::Database(DatabaseError::QueryFailed(other.to_string())),
        }
    }
}

impl From<DerivationError> for Error {
    fn from(err: DerivationError) -> Self {
        Error::Validation(ValidationError::Derivation(err))
    }
}

impl From<rust_decimal::Error> for Error {
    fn from(err: rust_decimal::Error) -> Self {
        Error::Validation(ValidationError::DecimalParse(err))
    }
}

impl From<diesel::result::ConnectionError> for Error {
    fn from(err: diesel::result::ConnectionError) -> Self {
        Error::Database(DatabaseError::ConnectionFailed(err))
    }
}

impl From<r2d2::Error> for Error {
    fn from(err: r2d2::Error) -> Self {
        Error::Database(DatabaseError::PoolCreationFailed(err))
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Validation(ValidationError::InvalidInput(err.to_string()))
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Validation(ValidationError::InvalidInput(err.to_string()))
    }
}

impl From<Error> for String {
    fn from(err: Error) -> Self {
        err.to_string()
    }
}
