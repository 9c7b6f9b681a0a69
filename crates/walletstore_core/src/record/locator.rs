//! Best-block locator record.

use crate::types::BlockHash;
use walletstore_codec::{CodecResult, Decode, Encode, RecordReader, RecordWriter};

/// A chain locator: block hashes from tip backwards at increasing gaps.
///
/// Stored so a reopened wallet knows where its last sync point was. The
/// store treats the hashes as opaque; ordering and gap strategy belong to
/// the sync layer.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BlockLocator {
    /// Hashes from newest to oldest.
    pub hashes: Vec<BlockHash>,
}

impl BlockLocator {
    /// Version written by the encoder.
    pub const VERSION_CURRENT: u32 = 1;

    /// Creates a locator from hashes ordered newest-first.
    #[must_use]
    pub fn new(hashes: Vec<BlockHash>) -> Self {
        Self { hashes }
    }
}

impl Encode for BlockLocator {
    fn encode(&self) -> CodecResult<Vec<u8>> {
        let mut writer = RecordWriter::with_capacity(8 + self.hashes.len() * 32);
        writer.put_u32(Self::VERSION_CURRENT);
        writer.put_u32(self.hashes.len() as u32);
        for hash in &self.hashes {
            writer.put_raw(hash.as_bytes());
        }
        Ok(writer.into_bytes())
    }
}

impl Decode for BlockLocator {
    fn decode(bytes: &[u8]) -> CodecResult<Self> {
        let mut reader = RecordReader::new(bytes);
        let _version = reader.read_u32()?;
        let count = reader.read_u32()?;
        let mut hashes = Vec::with_capacity(count.min(1024) as usize);
        for _ in 0..count {
            hashes.push(BlockHash::new(reader.read_array()?));
        }
        reader.expect_end()?;
        Ok(Self { hashes })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn locator_roundtrip() {
        let locator = BlockLocator::new(vec![
            BlockHash::new([1u8; 32]),
            BlockHash::new([2u8; 32]),
        ]);
        let decoded = BlockLocator::decode(&locator.encode().unwrap()).unwrap();
        assert_eq!(decoded, locator);
    }

    #[test]
    fn empty_locator_roundtrip() {
        let locator = BlockLocator::default();
        let decoded = BlockLocator::decode(&locator.encode().unwrap()).unwrap();
        assert!(decoded.hashes.is_empty());
    }

    #[test]
    fn count_exceeding_input_fails() {
        let mut writer = RecordWriter::new();
        writer.put_u32(BlockLocator::VERSION_CURRENT);
        writer.put_u32(10);
        writer.put_raw(&[0u8; 32]);
        assert!(BlockLocator::decode(&writer.into_bytes()).is_err());
    }
}
