//! Repository Module
//!
//! CRUD and query functions over the SQLite tables, one module per table.
//! Functions are plain `async fn(pool, ...)` taking the pool by reference;
//! date→millis conversions happen in the API/engine layers, repositories
//! only see `i64` Unix millis and `YYYY-MM-DD` strings.

pub mod account;
pub mod attendance;
pub mod department;
pub mod extension;
pub mod notification;
pub mod password_reset;
pub mod report;
pub mod session;
pub mod work_task;

use thiserror::Error;

/// Repository error types
#[derive(Debug, Error)]
pub enum RepoError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Duplicate: {0}")]
    Duplicate(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Validation error: {0}")]
    Validation(String),
}

impl From<sqlx::Error> for RepoError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                RepoError::Duplicate(db.message().to_string())
            }
            _ => RepoError::Database(err.to_string()),
        }
    }
}

/// Result type for repository operations
pub type RepoResult<T> = Result<T, RepoError>;
