//! Error types for sidestash-core

use thiserror::Error;

/// Result type alias using sidestash-core's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in sidestash-core operations
#[derive(Error, Debug)]
pub enum Error {
    /// `SQLite` error
    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Record not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// A store-level constraint was violated (duplicate list name, empty
    /// list, foreign key target missing)
    #[error("Constraint violation: {0}")]
    Constraint(String),

    /// Stored ciphertext could not be decrypted
    #[error("Decryption failed: {0}")]
    Decryption(String),

    /// Sealing content failed
    #[error("Encryption failed")]
    Encryption,

    /// A transaction was rolled back; the original failure is attached
    #[error("Transaction rolled back: {0}")]
    Transaction(#[source] Box<Error>),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// The failure that caused a rollback, unwrapped; other errors are
    /// returned as-is. Lets callers match on the underlying variant without
    /// caring whether it crossed a transaction boundary.
    #[must_use]
    pub fn root(&self) -> &Self {
        match self {
            Self::Transaction(inner) => inner.root(),
            other => other,
        }
    }
}
