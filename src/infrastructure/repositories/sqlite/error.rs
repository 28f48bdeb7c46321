// src/infrastructure/repositories/sqlite/error.rs

use diesel::r2d2;
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use thiserror::Error;

use crate::domain::error::DomainError;

#[derive(Error, Debug)]
pub enum SqliteRepositoryError {
    #[error("Database error: {0}")]
    DatabaseError(#[from] DieselError),

    #[error("Connection pool error: {0}")]
    ConnectionPoolError(String),

    #[error("Failed to convert entity: {0}")]
    ConversionError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Migration error: {0}")]
    MigrationError(String),

    #[error("Repository operation failed: {0}")]
    OperationFailed(String),

    /// A typed domain error raised inside a transaction, such as `Cancelled`.
    #[error(transparent)]
    Domain(#[from] DomainError),
}

pub type SqliteResult<T> = Result<T, SqliteRepositoryError>;

impl From<r2d2::PoolError> for SqliteRepositoryError {
    fn from(err: r2d2::PoolError) -> Self {
        SqliteRepositoryError::ConnectionPoolError(err.to_string())
    }
}

impl From<serde_json::Error> for SqliteRepositoryError {
    fn from(err: serde_json::Error) -> Self {
        SqliteRepositoryError::ConversionError(err.to_string())
    }
}

impl From<SqliteRepositoryError> for DomainError {
    fn from(err: SqliteRepositoryError) -> Self {
        match err {
            SqliteRepositoryError::DatabaseError(DieselError::DatabaseError(
                DatabaseErrorKind::UniqueViolation,
                info,
            )) => DomainError::StoreConflict(info.message().to_string()),
            SqliteRepositoryError::DatabaseError(diesel_err) => {
                DomainError::RepositoryError(format!("Database error: {}", diesel_err))
            }
            SqliteRepositoryError::ConnectionPoolError(e) => {
                DomainError::RepositoryError(format!("Connection pool error: {}", e))
            }
            SqliteRepositoryError::ConversionError(e) => {
                DomainError::RepositoryError(format!("Data conversion error: {}", e))
            }
            SqliteRepositoryError::IoError(e) => DomainError::Io(e),
            SqliteRepositoryError::MigrationError(e) => {
                DomainError::RepositoryError(format!("Migration error: {}", e))
            }
            SqliteRepositoryError::OperationFailed(e) => DomainError::RepositoryError(e),
            SqliteRepositoryError::Domain(e) => e,
        }
    }
}
