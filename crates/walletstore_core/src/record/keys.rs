//! Master key parameters and key pool records.

use crate::types::PubKey;
use walletstore_codec::{CodecResult, Decode, Encode, RecordReader, RecordWriter};

/// Wallet encryption parameters, keyed by a small integer id.
///
/// Holds the encrypted master key and the derivation settings needed to
/// reproduce it from a passphrase. The store persists these bytes; the
/// cryptography itself happens in the in-memory wallet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MasterKey {
    /// The master key, encrypted under the passphrase-derived key.
    pub crypted_key: Vec<u8>,
    /// Salt for the passphrase derivation.
    pub salt: Vec<u8>,
    /// Identifier of the derivation scheme.
    pub derivation_method: u32,
    /// Work factor for the derivation scheme.
    pub derive_iterations: u32,
    /// Extra scheme-specific parameters, opaque here.
    pub other_params: Vec<u8>,
}

impl MasterKey {
    /// Version written by the encoder.
    pub const VERSION_CURRENT: u32 = 1;
}

impl Encode for MasterKey {
    fn encode(&self) -> CodecResult<Vec<u8>> {
        let mut writer = RecordWriter::new();
        writer.put_u32(Self::VERSION_CURRENT);
        writer.put_bytes(&self.crypted_key);
        writer.put_bytes(&self.salt);
        writer.put_u32(self.derivation_method);
        writer.put_u32(self.derive_iterations);
        writer.put_bytes(&self.other_params);
        Ok(writer.into_bytes())
    }
}

impl Decode for MasterKey {
    fn decode(bytes: &[u8]) -> CodecResult<Self> {
        let mut reader = RecordReader::new(bytes);
        let _version = reader.read_u32()?;
        let crypted_key = reader.read_bytes()?;
        let salt = reader.read_bytes()?;
        let derivation_method = reader.read_u32()?;
        let derive_iterations = reader.read_u32()?;
        let other_params = reader.read_bytes()?;
        reader.expect_end()?;
        Ok(Self {
            crypted_key,
            salt,
            derivation_method,
            derive_iterations,
            other_params,
        })
    }
}

/// A pre-generated key waiting in the pool, keyed by its ordinal index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyPoolEntry {
    /// Unix time the key was added to the pool.
    pub create_time: i64,
    /// The pooled public key.
    pub pub_key: PubKey,
}

impl KeyPoolEntry {
    /// Version written by the encoder.
    pub const VERSION_CURRENT: u32 = 1;

    /// Creates a pool entry.
    #[must_use]
    pub fn new(create_time: i64, pub_key: PubKey) -> Self {
        Self {
            create_time,
            pub_key,
        }
    }
}

impl Encode for KeyPoolEntry {
    fn encode(&self) -> CodecResult<Vec<u8>> {
        let mut writer = RecordWriter::new();
        writer.put_u32(Self::VERSION_CURRENT);
        writer.put_i64(self.create_time);
        writer.put_bytes(self.pub_key.as_bytes());
        Ok(writer.into_bytes())
    }
}

impl Decode for KeyPoolEntry {
    fn decode(bytes: &[u8]) -> CodecResult<Self> {
        let mut reader = RecordReader::new(bytes);
        let _version = reader.read_u32()?;
        let create_time = reader.read_i64()?;
        let pub_key = PubKey::new(reader.read_bytes()?);
        reader.expect_end()?;
        Ok(Self {
            create_time,
            pub_key,
        })
    }
}
