//! Error types for the wallet record store.

use thiserror::Error;
use walletstore_codec::CodecError;
use walletstore_storage::StorageError;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

/// Errors that can occur in wallet record store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Engine-level failure; fatal to the current operation.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// A value failed to encode.
    #[error("codec error: {0}")]
    Codec(#[from] CodecError),

    /// A stored record's bytes are malformed for its declared version.
    ///
    /// Carries the record kind and raw key so a batch scan can report
    /// exactly which entry failed without aborting.
    #[error("failed to decode {kind} record at key {key}: {source}")]
    Decode {
        /// The record kind being decoded.
        kind: String,
        /// Hex of the raw store key.
        key: String,
        /// The underlying codec failure.
        #[source]
        source: CodecError,
    },

    /// A raw store key did not parse as `<kind-discriminant><natural-key>`.
    #[error("malformed record key: {0}")]
    MalformedKey(String),

    /// A write would decrease the derivation chain counter.
    #[error("chain counter would decrease: stored {stored}, requested {requested}")]
    CounterRegression {
        /// The counter currently on disk.
        stored: u32,
        /// The counter the caller tried to write.
        requested: u32,
    },

    /// Operation not permitted in the current state.
    #[error("invalid operation: {message}")]
    InvalidOperation {
        /// Description of why the operation is invalid.
        message: String,
    },
}

impl StoreError {
    /// Creates a decode error for the record at `key`.
    pub fn decode(kind: impl Into<String>, key: &[u8], source: CodecError) -> Self {
        Self::Decode {
            kind: kind.into(),
            key: hex(key),
            source,
        }
    }

    /// Creates a malformed key error.
    pub fn malformed_key(key: &[u8]) -> Self {
        Self::MalformedKey(hex(key))
    }

    /// Creates an invalid operation error.
    pub fn invalid_operation(message: impl Into<String>) -> Self {
        Self::InvalidOperation {
            message: message.into(),
        }
    }

    /// Returns `true` if this is a per-record decode failure rather than
    /// an engine-level fault.
    #[must_use]
    pub fn is_decode(&self) -> bool {
        matches!(self, Self::Decode { .. } | Self::MalformedKey(_))
    }
}
