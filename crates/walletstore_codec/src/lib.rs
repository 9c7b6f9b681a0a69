//! # Walletstore Codec
//!
//! Versioned binary record encoding/decoding primitives for walletstore.
//!
//! Every persisted record value is a fixed-order binary frame that begins
//! with a format-version integer. This crate provides the byte-level
//! reader/writer the record codecs are built from, and the [`Encode`] /
//! [`Decode`] traits they implement.
//!
//! ## Frame Rules
//!
//! - Integers are little-endian, fixed width
//! - Byte strings and UTF-8 strings carry a u32 length prefix
//! - The version field comes first; decoders branch on it and never look
//!   ahead speculatively
//! - A decoder must consume its input exactly; trailing bytes are an error
//!
//! ## Usage
//!
//! ```
//! use walletstore_codec::{RecordReader, RecordWriter};
//!
//! let mut writer = RecordWriter::new();
//! writer.put_u32(1);
//! writer.put_string("label");
//! let bytes = writer.into_bytes();
//!
//! let mut reader = RecordReader::new(&bytes);
//! assert_eq!(reader.read_u32().unwrap(), 1);
//! assert_eq!(reader.read_string().unwrap(), "label");
//! reader.expect_end().unwrap();
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod error;
mod reader;
mod writer;

pub use error::{CodecError, CodecResult};
pub use reader::RecordReader;
pub use writer::RecordWriter;

/// Trait for record values that encode to a versioned binary frame.
pub trait Encode {
    /// Encodes this value at its current format version.
    fn encode(&self) -> CodecResult<Vec<u8>>;
}

/// Trait for record values decodable from any supported format version.
pub trait Decode: Sized {
    /// Decodes this value, branching on the leading version field.
    fn decode(bytes: &[u8]) -> CodecResult<Self>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writer_reader_roundtrip() {
        let mut writer = RecordWriter::new();
        writer.put_u8(7);
        writer.put_u32(42);
        writer.put_i64(-1);
        writer.put_bytes(&[0xCA, 0xFE]);
        writer.put_string("hello");
        let bytes = writer.into_bytes();

        let mut reader = RecordReader::new(&bytes);
        assert_eq!(reader.read_u8().unwrap(), 7);
        assert_eq!(reader.read_u32().unwrap(), 42);
        assert_eq!(reader.read_i64().unwrap(), -1);
        assert_eq!(reader.read_bytes().unwrap(), vec![0xCA, 0xFE]);
        assert_eq!(reader.read_string().unwrap(), "hello");
        reader.expect_end().unwrap();
    }

    #[test]
    fn trailing_bytes_are_an_error() {
        let mut writer = RecordWriter::new();
        writer.put_u32(1);
        writer.put_u8(0);
        let bytes = writer.into_bytes();

        let mut reader = RecordReader::new(&bytes);
        reader.read_u32().unwrap();
        assert!(matches!(
            reader.expect_end(),
            Err(CodecError::TrailingBytes { .. })
        ));
    }
}
