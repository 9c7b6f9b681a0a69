//! The in-memory wallet aggregate the bulk loader populates.

use crate::record::{
    Account, AccountingEntry, BlockLocator, HdChain, KeyMetadata, KeyPoolEntry, MasterKey,
    WalletRecord, WalletTx,
};
use crate::types::{PubKey, ScriptId, SecretBytes, TxId};
use std::collections::{BTreeMap, BTreeSet};

/// Label and usage tag for one address-book entry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AddressBookEntry {
    /// Human-readable label.
    pub label: String,
    /// Usage tag ("receive", "send", ...).
    pub purpose: String,
}

/// Everything a loaded store folds into.
///
/// The aggregate owns no persistence: the store populates it at load time
/// and the caller keeps it consistent with subsequent writes. All maps are
/// ordered so iteration is deterministic.
#[derive(Debug, Default)]
pub struct Wallet {
    /// Address book: address → label and purpose.
    pub address_book: BTreeMap<String, AddressBookEntry>,
    /// Plaintext keys: public key → private key.
    pub keys: BTreeMap<PubKey, SecretBytes>,
    /// Encrypted keys: public key → ciphertext.
    pub crypted_keys: BTreeMap<PubKey, Vec<u8>>,
    /// Provenance metadata per key.
    pub key_metadata: BTreeMap<PubKey, KeyMetadata>,
    /// Encryption parameters by master key id.
    pub master_keys: BTreeMap<u32, MasterKey>,
    /// Watch-only scripts.
    pub watch_scripts: BTreeSet<Vec<u8>>,
    /// Redeem scripts by hash.
    pub scripts: BTreeMap<ScriptId, Vec<u8>>,
    /// Transactions by hash.
    pub txs: BTreeMap<TxId, WalletTx>,
    /// Key pool entries by ordinal index.
    pub pool: BTreeMap<u64, KeyPoolEntry>,
    /// Accounts by name.
    pub accounts: BTreeMap<String, Account>,
    /// Accounting entries by (account, sequence).
    pub accounting_entries: BTreeMap<(String, u64), AccountingEntry>,
    /// Destination data by (address, sub-key).
    pub dest_data: BTreeMap<(String, String), String>,
    /// Last-synced block locator.
    pub best_block: Option<BlockLocator>,
    /// Next transaction ordering position.
    pub order_pos_next: i64,
    /// Default receiving key.
    pub default_key: Option<PubKey>,
    /// Derivation chain state.
    pub hd_chain: Option<HdChain>,
    /// Minimum store version the on-disk data requires.
    pub min_version: u32,
}

impl Wallet {
    /// Creates an empty aggregate.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Folds one decoded record into the aggregate.
    pub fn apply(&mut self, record: WalletRecord) {
        match record {
            WalletRecord::Name { address, label } => {
                self.address_book.entry(address).or_default().label = label;
            }
            WalletRecord::Purpose { address, purpose } => {
                self.address_book.entry(address).or_default().purpose = purpose;
            }
            WalletRecord::Tx { txid, tx } => {
                self.txs.insert(txid, tx);
            }
            WalletRecord::Key { pub_key, priv_key } => {
                self.keys.insert(pub_key, priv_key);
            }
            WalletRecord::CryptedKey {
                pub_key,
                crypted_secret,
            } => {
                self.crypted_keys.insert(pub_key, crypted_secret);
            }
            WalletRecord::KeyMeta { pub_key, meta } => {
                self.key_metadata.insert(pub_key, meta);
            }
            WalletRecord::MasterKey { id, master_key } => {
                self.master_keys.insert(id, master_key);
            }
            WalletRecord::WatchOnly { script } => {
                self.watch_scripts.insert(script);
            }
            WalletRecord::CScript { hash, script } => {
                self.scripts.insert(hash, script);
            }
            WalletRecord::BestBlock { locator } => {
                self.best_block = Some(locator);
            }
            WalletRecord::OrderPosNext { value } => {
                self.order_pos_next = value;
            }
            WalletRecord::DefaultKey { pub_key } => {
                self.default_key = Some(pub_key);
            }
            WalletRecord::Pool { index, entry } => {
                self.pool.insert(index, entry);
            }
            WalletRecord::MinVersion { version } => {
                self.min_version = version;
            }
            WalletRecord::Account { name, account } => {
                self.accounts.insert(name, account);
            }
            WalletRecord::AccountingEntry {
                account,
                seq,
                entry,
            } => {
                self.accounting_entries.insert((account, seq), entry);
            }
            WalletRecord::DestData {
                address,
                sub_key,
                value,
            } => {
                self.dest_data.insert((address, sub_key), value);
            }
            WalletRecord::HdChain { chain } => {
                self.hd_chain = Some(chain);
            }
        }
    }

    /// Returns `true` if the wallet has at least one encrypted key.
    #[must_use]
    pub fn is_crypted(&self) -> bool {
        !self.crypted_keys.is_empty() || !self.master_keys.is_empty()
    }

    /// Total number of spendable keys, plaintext and encrypted.
    #[must_use]
    pub fn key_count(&self) -> usize {
        self.keys.len() + self.crypted_keys.len()
    }

    /// Returns `true` if nothing has been folded in.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.address_book.is_empty()
            && self.keys.is_empty()
            && self.crypted_keys.is_empty()
            && self.key_metadata.is_empty()
            && self.master_keys.is_empty()
            && self.watch_scripts.is_empty()
            && self.scripts.is_empty()
            && self.txs.is_empty()
            && self.pool.is_empty()
            && self.accounts.is_empty()
            && self.accounting_entries.is_empty()
            && self.dest_data.is_empty()
            && self.best_block.is_none()
            && self.default_key.is_none()
            && self.hd_chain.is_none()
            && self.order_pos_next == 0
            && self.min_version == 0
    }
}
