//! Byte-level record reader.

use crate::error::{CodecError, CodecResult};
use bytes::Buf;

/// Reads fixed-order binary record fields from a byte slice.
///
/// All integer fields are little-endian. Variable-length fields carry a
/// u32 length prefix. The reader tracks its position; [`expect_end`]
/// enforces that a record consumed its input exactly.
///
/// [`expect_end`]: RecordReader::expect_end
#[derive(Debug)]
pub struct RecordReader<'a> {
    buf: &'a [u8],
}

impl<'a> RecordReader<'a> {
    /// Creates a reader over the given bytes.
    #[must_use]
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { buf: bytes }
    }

    /// Returns the number of unread bytes.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.buf.remaining()
    }

    fn need(&self, len: usize) -> CodecResult<()> {
        if self.buf.remaining() < len {
            return Err(CodecError::UnexpectedEof {
                needed: len - self.buf.remaining(),
            });
        }
        Ok(())
    }

    /// Reads a single byte.
    pub fn read_u8(&mut self) -> CodecResult<u8> {
        self.need(1)?;
        Ok(self.buf.get_u8())
    }

    /// Reads a little-endian u32.
    pub fn read_u32(&mut self) -> CodecResult<u32> {
        self.need(4)?;
        Ok(self.buf.get_u32_le())
    }

    /// Reads a little-endian u64.
    pub fn read_u64(&mut self) -> CodecResult<u64> {
        self.need(8)?;
        Ok(self.buf.get_u64_le())
    }

    /// Reads a little-endian i64.
    pub fn read_i64(&mut self) -> CodecResult<i64> {
        self.need(8)?;
        Ok(self.buf.get_i64_le())
    }

    /// Reads exactly `len` raw bytes.
    pub fn read_raw(&mut self, len: usize) -> CodecResult<Vec<u8>> {
        self.need(len)?;
        let mut out = vec![0u8; len];
        self.buf.copy_to_slice(&mut out);
        Ok(out)
    }

    /// Reads a fixed-width byte array.
    pub fn read_array<const N: usize>(&mut self) -> CodecResult<[u8; N]> {
        self.need(N)?;
        let mut out = [0u8; N];
        self.buf.copy_to_slice(&mut out);
        Ok(out)
    }

    /// Reads a u32-length-prefixed byte string.
    pub fn read_bytes(&mut self) -> CodecResult<Vec<u8>> {
        let len = self.read_u32()? as usize;
        if len > self.buf.remaining() {
            return Err(CodecError::LengthOverrun {
                len,
                remaining: self.buf.remaining(),
            });
        }
        self.read_raw(len)
    }

    /// Reads a u32-length-prefixed UTF-8 string.
    pub fn read_string(&mut self) -> CodecResult<String> {
        let bytes = self.read_bytes()?;
        String::from_utf8(bytes).map_err(|_| CodecError::InvalidUtf8)
    }

    /// Verifies the whole input was consumed.
    pub fn expect_end(&self) -> CodecResult<()> {
        if self.buf.remaining() != 0 {
            return Err(CodecError::TrailingBytes {
                count: self.buf.remaining(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_integers() {
        let bytes = [
            0x07, // u8
            0x2A, 0x00, 0x00, 0x00, // u32 = 42
            0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, // i64 = -1
        ];
        let mut reader = RecordReader::new(&bytes);
        assert_eq!(reader.read_u8().unwrap(), 7);
        assert_eq!(reader.read_u32().unwrap(), 42);
        assert_eq!(reader.read_i64().unwrap(), -1);
        reader.expect_end().unwrap();
    }

    #[test]
    fn read_past_end_fails() {
        let mut reader = RecordReader::new(&[0x01, 0x02]);
        assert!(matches!(
            reader.read_u32(),
            Err(CodecError::UnexpectedEof { needed: 2 })
        ));
    }

    #[test]
    fn length_prefix_overrun_fails() {
        // Declares 100 bytes but only 2 follow
        let bytes = [0x64, 0x00, 0x00, 0x00, 0xAA, 0xBB];
        let mut reader = RecordReader::new(&bytes);
        assert!(matches!(
            reader.read_bytes(),
            Err(CodecError::LengthOverrun {
                len: 100,
                remaining: 2
            })
        ));
    }

    #[test]
    fn invalid_utf8_fails() {
        let bytes = [0x02, 0x00, 0x00, 0x00, 0xFF, 0xFE];
        let mut reader = RecordReader::new(&bytes);
        assert!(matches!(
            reader.read_string(),
            Err(CodecError::InvalidUtf8)
        ));
    }

    #[test]
    fn read_array_fixed_width() {
        let bytes = [1u8, 2, 3, 4];
        let mut reader = RecordReader::new(&bytes);
        let arr: [u8; 4] = reader.read_array().unwrap();
        assert_eq!(arr, [1, 2, 3, 4]);
    }
}
