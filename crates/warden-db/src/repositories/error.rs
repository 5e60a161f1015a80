//! Error handling for repositories

use sqlx::Error as SqlxError;

/// Repository error type
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("Database error: {0}")]
    Database(String),
}

/// Convert an SQLx error into a RepositoryError
pub fn map_db_error(e: SqlxError) -> RepositoryError {
    RepositoryError::Database(e.to_string())
}

/// Repository result type
pub type RepoResult<T> = Result<T, RepositoryError>;
