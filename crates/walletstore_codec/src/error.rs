//! Error types for the codec crate.

use thiserror::Error;

/// Result type for codec operations.
pub type CodecResult<T> = Result<T, CodecError>;

/// Errors that can occur during encoding or decoding.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// The input ended before a field could be read in full.
    #[error("unexpected end of input: needed {needed} more bytes")]
    UnexpectedEof {
        /// How many bytes were missing.
        needed: usize,
    },

    /// Bytes remained after the record decoded completely.
    #[error("trailing bytes after record: {count}")]
    TrailingBytes {
        /// Number of unconsumed bytes.
        count: usize,
    },

    /// A string field was not valid UTF-8.
    #[error("invalid UTF-8 string")]
    InvalidUtf8,

    /// A length prefix exceeded the remaining input.
    #[error("length prefix {len} exceeds remaining input {remaining}")]
    LengthOverrun {
        /// The declared length.
        len: usize,
        /// Bytes actually remaining.
        remaining: usize,
    },

    /// The record declared a format version this decoder does not know.
    #[error("unsupported format version {version} for {kind}")]
    UnsupportedVersion {
        /// The declared version.
        version: u32,
        /// The record kind being decoded.
        kind: &'static str,
    },

    /// A field held a value outside its valid range.
    #[error("invalid field value: {message}")]
    InvalidValue {
        /// Description of the invalid field.
        message: String,
    },
}

impl CodecError {
    /// Creates an invalid value error.
    pub fn invalid_value(message: impl Into<String>) -> Self {
        Self::InvalidValue {
            message: message.into(),
        }
    }
}
