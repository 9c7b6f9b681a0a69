//! Key provenance metadata and the derivation chain record.

use crate::types::KeyId;
use std::collections::BTreeMap;
use walletstore_codec::{CodecError, CodecResult, Decode, Encode, RecordReader, RecordWriter};

/// Property key holding the packed origin byte inside the metadata map.
pub const ORIGIN_PROPERTY: &str = "origin";

/// Where a wallet key came from.
///
/// Persisted as byte 0 of the `"origin"` property. The byte is open-ended:
/// values outside this enum round-trip untouched so a future format can
/// extend it without older code destroying the extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum KeyOrigin {
    /// Origin was never recorded.
    Unset = 0x00,
    /// Origin is recorded as unknown.
    Unknown = 0x01,
    /// Key was imported from outside the wallet.
    Imported = 0x02,
    /// Key was generated while the wallet was unencrypted.
    UnencryptedWallet = 0x04,
    /// Key was generated while the wallet was encrypted.
    EncryptedWallet = 0x08,
}

impl KeyOrigin {
    /// Every defined origin, for exhaustive tests.
    pub const ALL: [Self; 5] = [
        Self::Unset,
        Self::Unknown,
        Self::Imported,
        Self::UnencryptedWallet,
        Self::EncryptedWallet,
    ];

    /// Converts a byte to a defined origin, if it is one.
    #[must_use]
    pub fn from_byte(b: u8) -> Option<Self> {
        match b {
            0x00 => Some(Self::Unset),
            0x01 => Some(Self::Unknown),
            0x02 => Some(Self::Imported),
            0x04 => Some(Self::UnencryptedWallet),
            0x08 => Some(Self::EncryptedWallet),
            _ => None,
        }
    }

    /// Returns the packed byte value.
    #[must_use]
    pub const fn as_byte(self) -> u8 {
        self as u8
    }
}

/// Provenance metadata attached to a wallet key.
///
/// The in-memory shape is always the richest one (the property map);
/// decoding a historical packed-byte record converts it into the
/// equivalent one-entry map through [`set_key_origin`].
///
/// Immutable once written except for the property map, which may gain
/// entries (a lazily backfilled origin, say) without bumping the version.
///
/// [`set_key_origin`]: KeyMetadata::set_key_origin
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyMetadata {
    /// Format version this record was decoded from (the current version
    /// for freshly created metadata). Encoding always writes
    /// [`Self::VERSION_CURRENT`] regardless.
    pub version: u32,
    /// Creation timestamp in Unix seconds; 0 means unknown.
    pub create_time: i64,
    /// Hierarchical-derivation path, empty when the key is not derived.
    pub hd_keypath: String,
    /// Fingerprint of the master key this key derives from.
    pub hd_master_key_id: KeyId,
    /// Open-ended properties; values are raw bytes.
    pub props: BTreeMap<String, Vec<u8>>,
}

impl KeyMetadata {
    /// First version: creation time only.
    pub const VERSION_BASIC: u32 = 1;
    /// Adds the single packed origin byte.
    pub const VERSION_WITH_FLAGS: u32 = 2;
    /// Adds the derivation path and master key fingerprint; the packed
    /// byte is gone.
    pub const VERSION_WITH_HD_DATA: u32 = 10;
    /// Adds the generic property map.
    pub const VERSION_WITH_PROPS: u32 = 11;
    /// Version written by the encoder.
    pub const VERSION_CURRENT: u32 = Self::VERSION_WITH_PROPS;

    /// Creates metadata for a key generated at `create_time`.
    #[must_use]
    pub fn new(create_time: i64) -> Self {
        Self {
            version: Self::VERSION_CURRENT,
            create_time,
            hd_keypath: String::new(),
            hd_master_key_id: KeyId::ZERO,
            props: BTreeMap::new(),
        }
    }

    /// Reads the packed origin byte.
    ///
    /// An origin that was never set reads as [`KeyOrigin::Unset`]; that is
    /// the designed default, not an error.
    #[must_use]
    pub fn key_origin(&self) -> u8 {
        match self.props.get(ORIGIN_PROPERTY) {
            Some(bytes) if !bytes.is_empty() => bytes[0],
            _ => KeyOrigin::Unset.as_byte(),
        }
    }

    /// Writes the packed origin byte.
    ///
    /// Only byte 0 of the `"origin"` property is overwritten; trailing
    /// bytes a future format may have stored there are preserved.
    pub fn set_key_origin(&mut self, origin: u8) {
        match self.props.get_mut(ORIGIN_PROPERTY) {
            Some(bytes) => {
                if bytes.is_empty() {
                    bytes.push(origin);
                } else {
                    bytes[0] = origin;
                }
            }
            None => {
                self.props.insert(ORIGIN_PROPERTY.to_string(), vec![origin]);
            }
        }
    }
}

impl Default for KeyMetadata {
    fn default() -> Self {
        Self::new(0)
    }
}

impl Encode for KeyMetadata {
    fn encode(&self) -> CodecResult<Vec<u8>> {
        let mut writer = RecordWriter::new();
        writer.put_u32(Self::VERSION_CURRENT);
        writer.put_i64(self.create_time);
        writer.put_string(&self.hd_keypath);
        writer.put_raw(self.hd_master_key_id.as_bytes());
        writer.put_u32(self.props.len() as u32);
        for (name, value) in &self.props {
            writer.put_string(name);
            writer.put_bytes(value);
        }
        Ok(writer.into_bytes())
    }
}

impl Decode for KeyMetadata {
    fn decode(bytes: &[u8]) -> CodecResult<Self> {
        let mut reader = RecordReader::new(bytes);
        let version = reader.read_u32()?;
        if version < Self::VERSION_BASIC {
            return Err(CodecError::UnsupportedVersion {
                version,
                kind: "key metadata",
            });
        }
        let create_time = reader.read_i64()?;

        let mut meta = Self {
            version,
            create_time,
            ..Self::new(create_time)
        };

        if version >= Self::VERSION_WITH_HD_DATA {
            meta.hd_keypath = reader.read_string()?;
            meta.hd_master_key_id = KeyId::new(reader.read_array()?);
            if version >= Self::VERSION_WITH_PROPS {
                let count = reader.read_u32()?;
                for _ in 0..count {
                    let name = reader.read_string()?;
                    let value = reader.read_bytes()?;
                    meta.props.insert(name, value);
                }
            }
        } else if version >= Self::VERSION_WITH_FLAGS {
            let packed = reader.read_u8()?;
            meta.set_key_origin(packed);
        }

        reader.expect_end()?;
        Ok(meta)
    }
}

/// The hierarchical-derivation chain state.
///
/// One global record. The external chain counter is the single source of
/// truth for the next unused derivation index; it only ever increases
/// (the store refuses a write that would lower it).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HdChain {
    /// Format version.
    pub version: u32,
    /// Next unused external-chain child index.
    pub external_chain_counter: u32,
    /// Fingerprint of the master key the chain derives from.
    pub master_key_id: KeyId,
}

impl HdChain {
    /// Version written by the encoder.
    pub const VERSION_CURRENT: u32 = 1;

    /// Creates a fresh chain rooted at `master_key_id`.
    #[must_use]
    pub fn new(master_key_id: KeyId) -> Self {
        Self {
            version: Self::VERSION_CURRENT,
            external_chain_counter: 0,
            master_key_id,
        }
    }
}

impl Encode for HdChain {
    fn encode(&self) -> CodecResult<Vec<u8>> {
        let mut writer = RecordWriter::with_capacity(28);
        writer.put_u32(Self::VERSION_CURRENT);
        writer.put_u32(self.external_chain_counter);
        writer.put_raw(self.master_key_id.as_bytes());
        Ok(writer.into_bytes())
    }
}

impl Decode for HdChain {
    fn decode(bytes: &[u8]) -> CodecResult<Self> {
        let mut reader = RecordReader::new(bytes);
        let version = reader.read_u32()?;
        let external_chain_counter = reader.read_u32()?;
        let master_key_id = KeyId::new(reader.read_array()?);
        reader.expect_end()?;
        Ok(Self {
            version,
            external_chain_counter,
            master_key_id,
        })
    }
}
