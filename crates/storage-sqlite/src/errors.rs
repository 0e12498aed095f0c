//! Storage-level errors and their mapping into the core taxonomy.

use diesel::result::{DatabaseErrorKind, Error as DieselError};
use expense_ledger_core::errors::{DatabaseError, Error};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Query failed: {0}")]
    Query(#[from] DieselError),

    #[error("Connection pool error: {0}")]
    Pool(#[from] r2d2::Error),

    #[error("Connection failed: {0}")]
    Connection(String),

    #[error("Migration failed: {0}")]
    Migration(String),

    /// A stored value could not be decoded into its domain type.
    #[error("Invalid stored value: {0}")]
    InvalidValue(String),

    #[error("Write actor unavailable: {0}")]
    WriterUnavailable(String),
}

impl StorageError {
    pub fn invalid_value(message: impl Into<String>) -> Self {
        Self::InvalidValue(message.into())
    }
}

impl From<StorageError> for Error {
    fn from(err: StorageError) -> Self {
        let database_error = match err {
            StorageError::Query(DieselError::NotFound) => {
                DatabaseError::NotFound("record not found".to_string())
            }
            StorageError::Query(DieselError::DatabaseError(
                DatabaseErrorKind::UniqueViolation,
                info,
            )) => DatabaseError::UniqueViolation(info.message().to_string()),
            StorageError::Query(e) => DatabaseError::QueryFailed(e.to_string()),
            StorageError::Pool(e) => DatabaseError::PoolCreationFailed(e.to_string()),
            StorageError::Connection(msg) => DatabaseError::ConnectionFailed(msg),
            StorageError::Migration(msg) => DatabaseError::MigrationFailed(msg),
            StorageError::InvalidValue(msg) => return Error::InvalidData(msg),
            StorageError::WriterUnavailable(msg) => DatabaseError::Internal(msg),
        };
        Error::Database(database_error)
    }
}
