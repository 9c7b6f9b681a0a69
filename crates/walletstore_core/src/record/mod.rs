//! The wallet record model: kinds, key layout, and per-kind codecs.
//!
//! Every entry in the store is `<kind discriminant><natural key>` mapped
//! to `<format version><kind-specific fields>`. This module owns the key
//! layout and the decoded [`WalletRecord`] union; the individual value
//! codecs live in the submodules.

mod account;
mod keys;
mod locator;
mod meta;
mod tx;

pub use account::{Account, AccountingEntry};
pub use keys::{KeyPoolEntry, MasterKey};
pub use locator::BlockLocator;
pub use meta::{HdChain, KeyMetadata, KeyOrigin, ORIGIN_PROPERTY};
pub use tx::WalletTx;

use crate::error::{StoreError, StoreResult};
use crate::types::{PubKey, ScriptId, SecretBytes, TxId};
use walletstore_codec::{CodecError, CodecResult, Decode, RecordReader, RecordWriter};

/// The kind of a stored record, identified by its ASCII discriminant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RecordKind {
    /// Address label.
    Name,
    /// Address usage tag.
    Purpose,
    /// Wallet transaction.
    Tx,
    /// Plaintext private key.
    Key,
    /// Encrypted private key.
    CryptedKey,
    /// Key provenance metadata.
    KeyMeta,
    /// Wallet encryption parameters.
    MasterKey,
    /// Watch-only script.
    WatchOnly,
    /// Redeem script.
    CScript,
    /// Last-synced block locator.
    BestBlock,
    /// Next transaction ordering counter.
    OrderPosNext,
    /// Default receiving key.
    DefaultKey,
    /// Pre-generated key pool entry.
    Pool,
    /// Minimum store version required to load.
    MinVersion,
    /// Named account.
    Account,
    /// Internal accounting move.
    AccountingEntry,
    /// Per-destination auxiliary data.
    DestData,
    /// Hierarchical-derivation chain state.
    HdChain,
}

impl RecordKind {
    /// Every kind, in discriminant order.
    pub const ALL: [Self; 18] = [
        Self::Name,
        Self::Purpose,
        Self::Tx,
        Self::Key,
        Self::CryptedKey,
        Self::KeyMeta,
        Self::MasterKey,
        Self::WatchOnly,
        Self::CScript,
        Self::BestBlock,
        Self::OrderPosNext,
        Self::DefaultKey,
        Self::Pool,
        Self::MinVersion,
        Self::Account,
        Self::AccountingEntry,
        Self::DestData,
        Self::HdChain,
    ];

    /// Returns the ASCII discriminant prefixing this kind's keys.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::Purpose => "purpose",
            Self::Tx => "tx",
            Self::Key => "key",
            Self::CryptedKey => "ckey",
            Self::KeyMeta => "keymeta",
            Self::MasterKey => "mkey",
            Self::WatchOnly => "watchs",
            Self::CScript => "cscript",
            Self::BestBlock => "bestblock",
            Self::OrderPosNext => "orderposnext",
            Self::DefaultKey => "defaultkey",
            Self::Pool => "pool",
            Self::MinVersion => "minversion",
            Self::Account => "acc",
            Self::AccountingEntry => "acentry",
            Self::DestData => "destdata",
            Self::HdChain => "hdchain",
        }
    }

    /// Looks a kind up by its discriminant.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.as_str() == s)
    }

    /// Returns `true` for kinds that carry key material.
    ///
    /// These are the kinds a keys-only recovery keeps, and the kinds whose
    /// decode failure makes a load corrupt rather than noncritical.
    #[must_use]
    pub const fn is_key_material(self) -> bool {
        matches!(
            self,
            Self::Key
                | Self::CryptedKey
                | Self::KeyMeta
                | Self::MasterKey
                | Self::HdChain
                | Self::Pool
                | Self::MinVersion
                | Self::DefaultKey
        )
    }
}

/// Builds the raw store key for a record: one length byte, the ASCII
/// discriminant, then the natural key bytes.
#[must_use]
pub fn raw_key(kind: RecordKind, natural: &[u8]) -> Vec<u8> {
    let disc = kind.as_str().as_bytes();
    let mut key = Vec::with_capacity(1 + disc.len() + natural.len());
    key.push(disc.len() as u8);
    key.extend_from_slice(disc);
    key.extend_from_slice(natural);
    key
}

/// Splits a raw store key into its discriminant and natural key.
///
/// The discriminant comes back as a string even when it names a kind this
/// version does not know, so callers can skip unknown kinds instead of
/// failing on them.
pub fn split_raw_key(raw: &[u8]) -> StoreResult<(&str, &[u8])> {
    let Some((&len, rest)) = raw.split_first() else {
        return Err(StoreError::malformed_key(raw));
    };
    let len = len as usize;
    if len == 0 || rest.len() < len {
        return Err(StoreError::malformed_key(raw));
    }
    let disc = std::str::from_utf8(&rest[..len]).map_err(|_| StoreError::malformed_key(raw))?;
    Ok((disc, &rest[len..]))
}

/// Natural key for a pool record: big-endian so cursor order is numeric.
#[must_use]
pub fn pool_natural_key(index: u64) -> [u8; 8] {
    index.to_be_bytes()
}

/// Natural key for a master key record.
#[must_use]
pub fn master_key_natural_key(id: u32) -> [u8; 4] {
    id.to_be_bytes()
}

/// Natural key for an accounting entry: length-prefixed account name, then
/// the big-endian sequence number so one account's entries scan in order.
pub fn accounting_natural_key(account: &str, seq: u64) -> StoreResult<Vec<u8>> {
    let name = account.as_bytes();
    if name.len() > u8::MAX as usize {
        return Err(StoreError::invalid_operation("account name too long"));
    }
    let mut key = Vec::with_capacity(1 + name.len() + 8);
    key.push(name.len() as u8);
    key.extend_from_slice(name);
    key.extend_from_slice(&seq.to_be_bytes());
    Ok(key)
}

/// Prefix of every accounting-entry natural key for one account.
pub fn accounting_natural_prefix(account: &str) -> StoreResult<Vec<u8>> {
    let name = account.as_bytes();
    if name.len() > u8::MAX as usize {
        return Err(StoreError::invalid_operation("account name too long"));
    }
    let mut key = Vec::with_capacity(1 + name.len());
    key.push(name.len() as u8);
    key.extend_from_slice(name);
    Ok(key)
}

fn parse_accounting_natural_key(natural: &[u8]) -> Option<(String, u64)> {
    let (&len, rest) = natural.split_first()?;
    let len = len as usize;
    if rest.len() != len + 8 {
        return None;
    }
    let account = std::str::from_utf8(&rest[..len]).ok()?.to_string();
    let seq = u64::from_be_bytes(rest[len..].try_into().ok()?);
    Some((account, seq))
}

/// Natural key for destination data: length-prefixed address, then the
/// sub-key bytes.
pub fn dest_data_natural_key(address: &str, sub_key: &str) -> StoreResult<Vec<u8>> {
    let addr = address.as_bytes();
    if addr.len() > u8::MAX as usize {
        return Err(StoreError::invalid_operation("address too long"));
    }
    let mut key = Vec::with_capacity(1 + addr.len() + sub_key.len());
    key.push(addr.len() as u8);
    key.extend_from_slice(addr);
    key.extend_from_slice(sub_key.as_bytes());
    Ok(key)
}

fn parse_dest_data_natural_key(natural: &[u8]) -> Option<(String, String)> {
    let (&len, rest) = natural.split_first()?;
    let len = len as usize;
    if rest.len() < len {
        return None;
    }
    let address = std::str::from_utf8(&rest[..len]).ok()?.to_string();
    let sub_key = std::str::from_utf8(&rest[len..]).ok()?.to_string();
    Some((address, sub_key))
}

/// Format version written for the single-field record kinds.
const SIMPLE_VERSION: u32 = 1;

pub(crate) fn encode_string_value(value: &str) -> Vec<u8> {
    let mut writer = RecordWriter::new();
    writer.put_u32(SIMPLE_VERSION);
    writer.put_string(value);
    writer.into_bytes()
}

pub(crate) fn decode_string_value(bytes: &[u8]) -> CodecResult<String> {
    let mut reader = RecordReader::new(bytes);
    let _version = reader.read_u32()?;
    let value = reader.read_string()?;
    reader.expect_end()?;
    Ok(value)
}

pub(crate) fn encode_bytes_value(value: &[u8]) -> Vec<u8> {
    let mut writer = RecordWriter::new();
    writer.put_u32(SIMPLE_VERSION);
    writer.put_bytes(value);
    writer.into_bytes()
}

pub(crate) fn decode_bytes_value(bytes: &[u8]) -> CodecResult<Vec<u8>> {
    let mut reader = RecordReader::new(bytes);
    let _version = reader.read_u32()?;
    let value = reader.read_bytes()?;
    reader.expect_end()?;
    Ok(value)
}

pub(crate) fn encode_u32_value(value: u32) -> Vec<u8> {
    let mut writer = RecordWriter::with_capacity(8);
    writer.put_u32(SIMPLE_VERSION);
    writer.put_u32(value);
    writer.into_bytes()
}

pub(crate) fn decode_u32_value(bytes: &[u8]) -> CodecResult<u32> {
    let mut reader = RecordReader::new(bytes);
    let _version = reader.read_u32()?;
    let value = reader.read_u32()?;
    reader.expect_end()?;
    Ok(value)
}

pub(crate) fn encode_i64_value(value: i64) -> Vec<u8> {
    let mut writer = RecordWriter::with_capacity(12);
    writer.put_u32(SIMPLE_VERSION);
    writer.put_i64(value);
    writer.into_bytes()
}

pub(crate) fn decode_i64_value(bytes: &[u8]) -> CodecResult<i64> {
    let mut reader = RecordReader::new(bytes);
    let _version = reader.read_u32()?;
    let value = reader.read_i64()?;
    reader.expect_end()?;
    Ok(value)
}

/// Marker byte stored under watch-only script keys.
pub(crate) fn encode_marker_value() -> Vec<u8> {
    let mut writer = RecordWriter::with_capacity(5);
    writer.put_u32(SIMPLE_VERSION);
    writer.put_u8(1);
    writer.into_bytes()
}

pub(crate) fn decode_marker_value(bytes: &[u8]) -> CodecResult<()> {
    let mut reader = RecordReader::new(bytes);
    let _version = reader.read_u32()?;
    let marker = reader.read_u8()?;
    reader.expect_end()?;
    if marker != 1 {
        return Err(CodecError::invalid_value(format!(
            "bad marker byte {marker}"
        )));
    }
    Ok(())
}

/// A fully decoded store entry: kind discriminant resolved, natural key
/// parsed, value decoded at whatever format version it was written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WalletRecord {
    /// Address label.
    Name {
        /// The labeled address.
        address: String,
        /// The label text.
        label: String,
    },
    /// Address usage tag.
    Purpose {
        /// The tagged address.
        address: String,
        /// The usage tag.
        purpose: String,
    },
    /// Wallet transaction.
    Tx {
        /// Transaction hash.
        txid: TxId,
        /// The stored transaction.
        tx: WalletTx,
    },
    /// Plaintext private key.
    Key {
        /// The public half.
        pub_key: PubKey,
        /// The private half.
        priv_key: SecretBytes,
    },
    /// Encrypted private key.
    CryptedKey {
        /// The public half.
        pub_key: PubKey,
        /// The encrypted private half.
        crypted_secret: Vec<u8>,
    },
    /// Key provenance metadata.
    KeyMeta {
        /// The key the metadata describes.
        pub_key: PubKey,
        /// The metadata.
        meta: KeyMetadata,
    },
    /// Wallet encryption parameters.
    MasterKey {
        /// Small integer id.
        id: u32,
        /// The parameters.
        master_key: MasterKey,
    },
    /// Watch-only script.
    WatchOnly {
        /// The watched script bytes.
        script: Vec<u8>,
    },
    /// Redeem script.
    CScript {
        /// Hash keying the script.
        hash: ScriptId,
        /// The script bytes.
        script: Vec<u8>,
    },
    /// Last-synced block locator.
    BestBlock {
        /// The locator.
        locator: BlockLocator,
    },
    /// Next transaction ordering counter.
    OrderPosNext {
        /// The counter value.
        value: i64,
    },
    /// Default receiving key.
    DefaultKey {
        /// The key.
        pub_key: PubKey,
    },
    /// Pre-generated key pool entry.
    Pool {
        /// Ordinal pool index.
        index: u64,
        /// The pooled key.
        entry: KeyPoolEntry,
    },
    /// Minimum store version required to load.
    MinVersion {
        /// The required version.
        version: u32,
    },
    /// Named account.
    Account {
        /// Account name.
        name: String,
        /// The account.
        account: Account,
    },
    /// Internal accounting move.
    AccountingEntry {
        /// Account name.
        account: String,
        /// Monotonic sequence number within the account.
        seq: u64,
        /// The entry.
        entry: AccountingEntry,
    },
    /// Per-destination auxiliary data.
    DestData {
        /// The destination address.
        address: String,
        /// The data sub-key.
        sub_key: String,
        /// The stored value.
        value: String,
    },
    /// Hierarchical-derivation chain state.
    HdChain {
        /// The chain state.
        chain: HdChain,
    },
}

impl WalletRecord {
    /// Returns the kind of this record.
    #[must_use]
    pub const fn kind(&self) -> RecordKind {
        match self {
            Self::Name { .. } => RecordKind::Name,
            Self::Purpose { .. } => RecordKind::Purpose,
            Self::Tx { .. } => RecordKind::Tx,
            Self::Key { .. } => RecordKind::Key,
            Self::CryptedKey { .. } => RecordKind::CryptedKey,
            Self::KeyMeta { .. } => RecordKind::KeyMeta,
            Self::MasterKey { .. } => RecordKind::MasterKey,
            Self::WatchOnly { .. } => RecordKind::WatchOnly,
            Self::CScript { .. } => RecordKind::CScript,
            Self::BestBlock { .. } => RecordKind::BestBlock,
            Self::OrderPosNext { .. } => RecordKind::OrderPosNext,
            Self::DefaultKey { .. } => RecordKind::DefaultKey,
            Self::Pool { .. } => RecordKind::Pool,
            Self::MinVersion { .. } => RecordKind::MinVersion,
            Self::Account { .. } => RecordKind::Account,
            Self::AccountingEntry { .. } => RecordKind::AccountingEntry,
            Self::DestData { .. } => RecordKind::DestData,
            Self::HdChain { .. } => RecordKind::HdChain,
        }
    }
}

fn natural_string(kind: RecordKind, raw: &[u8], natural: &[u8]) -> StoreResult<String> {
    std::str::from_utf8(natural)
        .map(str::to_string)
        .map_err(|_| StoreError::decode(kind.as_str(), raw, CodecError::InvalidUtf8))
}

fn natural_array<const N: usize>(
    kind: RecordKind,
    raw: &[u8],
    natural: &[u8],
) -> StoreResult<[u8; N]> {
    natural.try_into().map_err(|_| {
        StoreError::decode(
            kind.as_str(),
            raw,
            CodecError::invalid_value(format!("natural key must be {N} bytes")),
        )
    })
}

fn expect_empty_natural(kind: RecordKind, raw: &[u8], natural: &[u8]) -> StoreResult<()> {
    if natural.is_empty() {
        Ok(())
    } else {
        Err(StoreError::decode(
            kind.as_str(),
            raw,
            CodecError::invalid_value("singleton record has natural key bytes"),
        ))
    }
}

/// Decodes one raw store entry.
///
/// Returns `Ok(None)` for a discriminant this version does not know -
/// skipping unknown kinds is what keeps old software able to open a store
/// written by newer software. Malformed keys or values are an error
/// carrying the kind and raw key; batch scans decide per-error whether to
/// skip or abort.
pub fn decode_entry(raw: &[u8], value: &[u8]) -> StoreResult<Option<WalletRecord>> {
    let (disc, natural) = split_raw_key(raw)?;
    let Some(kind) = RecordKind::parse(disc) else {
        return Ok(None);
    };
    let wrap = |e: CodecError| StoreError::decode(kind.as_str(), raw, e);

    let record = match kind {
        RecordKind::Name => WalletRecord::Name {
            address: natural_string(kind, raw, natural)?,
            label: decode_string_value(value).map_err(wrap)?,
        },
        RecordKind::Purpose => WalletRecord::Purpose {
            address: natural_string(kind, raw, natural)?,
            purpose: decode_string_value(value).map_err(wrap)?,
        },
        RecordKind::Tx => WalletRecord::Tx {
            txid: TxId::new(natural_array(kind, raw, natural)?),
            tx: WalletTx::decode(value).map_err(wrap)?,
        },
        RecordKind::Key => WalletRecord::Key {
            pub_key: PubKey::new(natural.to_vec()),
            priv_key: SecretBytes::new(decode_bytes_value(value).map_err(wrap)?),
        },
        RecordKind::CryptedKey => WalletRecord::CryptedKey {
            pub_key: PubKey::new(natural.to_vec()),
            crypted_secret: decode_bytes_value(value).map_err(wrap)?,
        },
        RecordKind::KeyMeta => WalletRecord::KeyMeta {
            pub_key: PubKey::new(natural.to_vec()),
            meta: KeyMetadata::decode(value).map_err(wrap)?,
        },
        RecordKind::MasterKey => WalletRecord::MasterKey {
            id: u32::from_be_bytes(natural_array(kind, raw, natural)?),
            master_key: MasterKey::decode(value).map_err(wrap)?,
        },
        RecordKind::WatchOnly => {
            decode_marker_value(value).map_err(wrap)?;
            WalletRecord::WatchOnly {
                script: natural.to_vec(),
            }
        }
        RecordKind::CScript => WalletRecord::CScript {
            hash: ScriptId::new(natural_array(kind, raw, natural)?),
            script: decode_bytes_value(value).map_err(wrap)?,
        },
        RecordKind::BestBlock => {
            expect_empty_natural(kind, raw, natural)?;
            WalletRecord::BestBlock {
                locator: BlockLocator::decode(value).map_err(wrap)?,
            }
        }
        RecordKind::OrderPosNext => {
            expect_empty_natural(kind, raw, natural)?;
            WalletRecord::OrderPosNext {
                value: decode_i64_value(value).map_err(wrap)?,
            }
        }
        RecordKind::DefaultKey => {
            expect_empty_natural(kind, raw, natural)?;
            WalletRecord::DefaultKey {
                pub_key: PubKey::new(decode_bytes_value(value).map_err(wrap)?),
            }
        }
        RecordKind::Pool => WalletRecord::Pool {
            index: u64::from_be_bytes(natural_array(kind, raw, natural)?),
            entry: KeyPoolEntry::decode(value).map_err(wrap)?,
        },
        RecordKind::MinVersion => {
            expect_empty_natural(kind, raw, natural)?;
            WalletRecord::MinVersion {
                version: decode_u32_value(value).map_err(wrap)?,
            }
        }
        RecordKind::Account => WalletRecord::Account {
            name: natural_string(kind, raw, natural)?,
            account: Account::decode(value).map_err(wrap)?,
        },
        RecordKind::AccountingEntry => {
            let (account, seq) = parse_accounting_natural_key(natural)
                .ok_or_else(|| StoreError::malformed_key(raw))?;
            WalletRecord::AccountingEntry {
                account,
                seq,
                entry: AccountingEntry::decode(value).map_err(wrap)?,
            }
        }
        RecordKind::DestData => {
            let (address, sub_key) = parse_dest_data_natural_key(natural)
                .ok_or_else(|| StoreError::malformed_key(raw))?;
            WalletRecord::DestData {
                address,
                sub_key,
                value: decode_string_value(value).map_err(wrap)?,
            }
        }
        RecordKind::HdChain => {
            expect_empty_natural(kind, raw, natural)?;
            WalletRecord::HdChain {
                chain: HdChain::decode(value).map_err(wrap)?,
            }
        }
    };
    Ok(Some(record))
}
