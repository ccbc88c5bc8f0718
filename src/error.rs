//! Error types.
//!
//! The application layer works with `anyhow` errors. The transaction store reports its failures
//! as a typed `StoreError` so that callers can tell a duplicate id from a missing record; these
//! travel inside `anyhow::Error` and can be recovered with `downcast_ref::<StoreError>()`.

use thiserror::Error;

pub type Error = anyhow::Error;
pub type Result<T> = std::result::Result<T, Error>;

/// The result type returned by `Db` operations.
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Failures surfaced by the transaction store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The underlying database could not be opened. Nothing further can be done with the store.
    #[error("Storage is unavailable: {0}")]
    StorageUnavailable(String),

    /// A record with this id already exists.
    #[error("A transaction with id '{0}' already exists")]
    DuplicateId(String),

    /// No record with this id exists.
    #[error("Transaction not found: '{0}'")]
    NotFound(String),

    /// A backup document could not be understood. Nothing was imported.
    #[error("Invalid backup file format: {0}")]
    InvalidFormat(String),

    /// A record failed the store's own checks, e.g. an empty category.
    #[error("Invalid transaction: {0}")]
    InvalidTransaction(String),

    /// Any other failure reported by the database engine.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}
