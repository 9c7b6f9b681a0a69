//! Byte-level record writer.

use bytes::BufMut;

/// Writes fixed-order binary record fields into a growable buffer.
///
/// The mirror of [`super::RecordReader`]: little-endian integers,
/// u32-length-prefixed variable fields.
#[derive(Debug, Default)]
pub struct RecordWriter {
    buf: Vec<u8>,
}

impl RecordWriter {
    /// Creates an empty writer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a writer with pre-allocated capacity.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: Vec::with_capacity(capacity),
        }
    }

    /// Writes a single byte.
    pub fn put_u8(&mut self, value: u8) {
        self.buf.put_u8(value);
    }

    /// Writes a little-endian u32.
    pub fn put_u32(&mut self, value: u32) {
        self.buf.put_u32_le(value);
    }

    /// Writes a little-endian u64.
    pub fn put_u64(&mut self, value: u64) {
        self.buf.put_u64_le(value);
    }

    /// Writes a little-endian i64.
    pub fn put_i64(&mut self, value: i64) {
        self.buf.put_i64_le(value);
    }

    /// Writes raw bytes with no length prefix.
    pub fn put_raw(&mut self, bytes: &[u8]) {
        self.buf.put_slice(bytes);
    }

    /// Writes a u32-length-prefixed byte string.
    pub fn put_bytes(&mut self, bytes: &[u8]) {
        self.put_u32(bytes.len() as u32);
        self.buf.put_slice(bytes);
    }

    /// Writes a u32-length-prefixed UTF-8 string.
    pub fn put_string(&mut self, value: &str) {
        self.put_bytes(value.as_bytes());
    }

    /// Returns the encoded bytes, consuming the writer.
    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    /// Returns the number of bytes written so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// Returns `true` if nothing has been written.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::RecordReader;
    use proptest::prelude::*;

    #[test]
    fn integers_are_little_endian() {
        let mut writer = RecordWriter::new();
        writer.put_u32(0x0102_0304);
        assert_eq!(writer.into_bytes(), vec![0x04, 0x03, 0x02, 0x01]);
    }

    #[test]
    fn empty_bytes_field() {
        let mut writer = RecordWriter::new();
        writer.put_bytes(&[]);
        let bytes = writer.into_bytes();
        assert_eq!(bytes, vec![0, 0, 0, 0]);

        let mut reader = RecordReader::new(&bytes);
        assert!(reader.read_bytes().unwrap().is_empty());
    }

    proptest! {
        #[test]
        fn string_roundtrip(s in ".*") {
            let mut writer = RecordWriter::new();
            writer.put_string(&s);
            let bytes = writer.into_bytes();

            let mut reader = RecordReader::new(&bytes);
            prop_assert_eq!(reader.read_string().unwrap(), s);
            prop_assert!(reader.expect_end().is_ok());
        }

        #[test]
        fn mixed_field_roundtrip(
            a in any::<u8>(),
            b in any::<u32>(),
            c in any::<i64>(),
            d in proptest::collection::vec(any::<u8>(), 0..256),
        ) {
            let mut writer = RecordWriter::new();
            writer.put_u8(a);
            writer.put_u32(b);
            writer.put_i64(c);
            writer.put_bytes(&d);
            let bytes = writer.into_bytes();

            let mut reader = RecordReader::new(&bytes);
            prop_assert_eq!(reader.read_u8().unwrap(), a);
            prop_assert_eq!(reader.read_u32().unwrap(), b);
            prop_assert_eq!(reader.read_i64().unwrap(), c);
            prop_assert_eq!(reader.read_bytes().unwrap(), d);
            prop_assert!(reader.expect_end().is_ok());
        }
    }
}
