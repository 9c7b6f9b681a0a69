//! Error types for storage operations.

use std::io;
use thiserror::Error;

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The store file is corrupted beyond the torn tail an engine repairs
    /// on open.
    #[error("storage corrupted: {0}")]
    Corrupted(String),

    /// Another process holds the exclusive store lock.
    #[error("storage locked: another process has exclusive access")]
    Locked,

    /// A transaction operation was issued without an active transaction.
    #[error("no active transaction")]
    NoTransaction,

    /// A transaction was begun while another is still active.
    #[error("transaction already active")]
    TransactionActive,
}
