//! Stored wallet transaction record.

use walletstore_codec::{CodecResult, Decode, Encode, RecordReader, RecordWriter};

/// A wallet transaction as persisted.
///
/// The transaction itself is an opaque consensus-serialized blob; the
/// store only owns the bookkeeping around it. The explicit order position
/// was added in a later format revision - records below
/// [`Self::VERSION_WITH_ORDER`] decode with the position unset, and the
/// reorder pass can re-derive it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalletTx {
    /// Consensus-serialized transaction bytes, opaque to the store.
    pub raw: Vec<u8>,
    /// Unix time the wallet first saw this transaction.
    pub time_received: i64,
    /// Explicit position in the wallet's transaction ordering, if any.
    pub order_pos: Option<i64>,
}

impl WalletTx {
    /// First version: raw bytes and received time.
    pub const VERSION_BASIC: u32 = 1;
    /// Adds the explicit order position.
    pub const VERSION_WITH_ORDER: u32 = 2;
    /// Version written by the encoder.
    pub const VERSION_CURRENT: u32 = Self::VERSION_WITH_ORDER;

    /// Creates a transaction record with no explicit order position.
    #[must_use]
    pub fn new(raw: Vec<u8>, time_received: i64) -> Self {
        Self {
            raw,
            time_received,
            order_pos: None,
        }
    }
}

impl Encode for WalletTx {
    fn encode(&self) -> CodecResult<Vec<u8>> {
        let mut writer = RecordWriter::with_capacity(24 + self.raw.len());
        writer.put_u32(Self::VERSION_CURRENT);
        writer.put_bytes(&self.raw);
        writer.put_i64(self.time_received);
        // Unset encodes as -1; positions are never negative
        writer.put_i64(self.order_pos.unwrap_or(-1));
        Ok(writer.into_bytes())
    }
}

impl Decode for WalletTx {
    fn decode(bytes: &[u8]) -> CodecResult<Self> {
        let mut reader = RecordReader::new(bytes);
        let version = reader.read_u32()?;
        let raw = reader.read_bytes()?;
        let time_received = reader.read_i64()?;
        let order_pos = if version >= Self::VERSION_WITH_ORDER {
            let pos = reader.read_i64()?;
            (pos >= 0).then_some(pos)
        } else {
            None
        };
        reader.expect_end()?;
        Ok(Self {
            raw,
            time_received,
            order_pos,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode_basic(raw: &[u8], time_received: i64) -> Vec<u8> {
        let mut writer = RecordWriter::new();
        writer.put_u32(WalletTx::VERSION_BASIC);
        writer.put_bytes(raw);
        writer.put_i64(time_received);
        writer.into_bytes()
    }

    #[test]
    fn current_version_roundtrip() {
        let mut tx = WalletTx::new(vec![0xDE, 0xAD, 0xBE, 0xEF], 1_600_000_000);
        tx.order_pos = Some(5);

        let decoded = WalletTx::decode(&tx.encode().unwrap()).unwrap();
        assert_eq!(decoded, tx);
    }

    #[test]
    fn unset_position_roundtrips_as_none() {
        let tx = WalletTx::new(vec![1, 2, 3], 99);
        let decoded = WalletTx::decode(&tx.encode().unwrap()).unwrap();
        assert_eq!(decoded.order_pos, None);
    }

    #[test]
    fn basic_version_decodes_without_position() {
        let bytes = encode_basic(&[0xAA], 7);
        let decoded = WalletTx::decode(&bytes).unwrap();
        assert_eq!(decoded.raw, vec![0xAA]);
        assert_eq!(decoded.time_received, 7);
        assert_eq!(decoded.order_pos, None);
    }

    #[test]
    fn truncated_record_fails() {
        let bytes = WalletTx::new(vec![1], 1).encode().unwrap();
        assert!(WalletTx::decode(&bytes[..bytes.len() - 2]).is_err());
    }
}
