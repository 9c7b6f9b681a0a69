//! Typed record store over a key-value engine.

use crate::error::{StoreError, StoreResult};
use crate::record::{
    self, Account, AccountingEntry, BlockLocator, HdChain, KeyMetadata, KeyPoolEntry, MasterKey,
    RecordKind, WalletTx,
};
use crate::types::{PubKey, ScriptId, SecretBytes, TxId};
use tracing::warn;
use walletstore_codec::{Decode, Encode};
use walletstore_storage::{Cursor, KvEngine};

/// Configuration for a store handle.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Whether [`WalletStore::close`] flushes the engine.
    pub flush_on_close: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            flush_on_close: true,
        }
    }
}

impl StoreConfig {
    /// Creates a configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets whether closing the store flushes the engine.
    #[must_use]
    pub const fn flush_on_close(mut self, value: bool) -> Self {
        self.flush_on_close = value;
        self
    }
}

/// Typed access to the wallet record store.
///
/// Each method maps one record kind onto the engine: the key is the kind
/// discriminant plus the natural key, the value a versioned binary frame.
/// The store owns no cache - every call goes to the engine - and it never
/// batches by itself: a logical operation spanning several records (a key
/// plus its metadata, say) runs inside one engine transaction.
pub struct WalletStore {
    engine: Box<dyn KvEngine>,
    config: StoreConfig,
}

impl WalletStore {
    /// Wraps an engine in a typed store with the default configuration.
    #[must_use]
    pub fn new(engine: Box<dyn KvEngine>) -> Self {
        Self::with_config(engine, StoreConfig::default())
    }

    /// Wraps an engine in a typed store.
    #[must_use]
    pub fn with_config(engine: Box<dyn KvEngine>, config: StoreConfig) -> Self {
        Self { engine, config }
    }

    /// Borrows the underlying engine.
    #[must_use]
    pub fn engine(&self) -> &dyn KvEngine {
        self.engine.as_ref()
    }

    /// Returns the underlying engine, consuming the store.
    #[must_use]
    pub fn into_engine(self) -> Box<dyn KvEngine> {
        self.engine
    }

    /// Closes the store, flushing first when so configured.
    pub fn close(mut self) -> StoreResult<()> {
        if self.config.flush_on_close {
            if let Err(e) = self.engine.flush() {
                warn!(error = %e, "flush on close failed");
                return Err(e.into());
            }
        }
        Ok(())
    }

    /// Opens an ordered cursor over every raw entry.
    pub fn cursor(&self) -> StoreResult<Cursor> {
        Ok(self.engine.cursor()?)
    }

    /// Flushes committed writes to durable storage.
    pub fn flush(&mut self) -> StoreResult<()> {
        Ok(self.engine.flush()?)
    }

    /// Reports the engine's compaction advisory.
    pub fn needs_rewrite(&self) -> StoreResult<bool> {
        Ok(self.engine.needs_rewrite()?)
    }

    /// Runs `f` inside one engine transaction.
    ///
    /// Commits on `Ok`, aborts on `Err`. Abort failures do not mask the
    /// original error.
    pub fn with_transaction<F, T>(&mut self, f: F) -> StoreResult<T>
    where
        F: FnOnce(&mut Self) -> StoreResult<T>,
    {
        self.engine.begin()?;
        match f(self) {
            Ok(result) => {
                self.engine.commit()?;
                Ok(result)
            }
            Err(e) => {
                let _ = self.engine.abort();
                Err(e)
            }
        }
    }

    fn put(&mut self, kind: RecordKind, natural: &[u8], value: &[u8]) -> StoreResult<()> {
        Ok(self.engine.put(&record::raw_key(kind, natural), value)?)
    }

    fn get(&self, kind: RecordKind, natural: &[u8]) -> StoreResult<Option<Vec<u8>>> {
        Ok(self.engine.get(&record::raw_key(kind, natural))?)
    }

    fn del(&mut self, kind: RecordKind, natural: &[u8]) -> StoreResult<bool> {
        Ok(self.engine.erase(&record::raw_key(kind, natural))?)
    }

    fn decode_value<T: Decode>(
        &self,
        kind: RecordKind,
        natural: &[u8],
        value: &[u8],
    ) -> StoreResult<T> {
        T::decode(value)
            .map_err(|e| StoreError::decode(kind.as_str(), &record::raw_key(kind, natural), e))
    }

    /// Writes an address label.
    pub fn write_name(&mut self, address: &str, label: &str) -> StoreResult<()> {
        self.put(
            RecordKind::Name,
            address.as_bytes(),
            &record::encode_string_value(label),
        )
    }

    /// Erases an address label.
    pub fn erase_name(&mut self, address: &str) -> StoreResult<bool> {
        self.del(RecordKind::Name, address.as_bytes())
    }

    /// Writes an address usage tag.
    pub fn write_purpose(&mut self, address: &str, purpose: &str) -> StoreResult<()> {
        self.put(
            RecordKind::Purpose,
            address.as_bytes(),
            &record::encode_string_value(purpose),
        )
    }

    /// Erases an address usage tag.
    pub fn erase_purpose(&mut self, address: &str) -> StoreResult<bool> {
        self.del(RecordKind::Purpose, address.as_bytes())
    }

    /// Writes a transaction record under its hash.
    pub fn write_tx(&mut self, txid: &TxId, tx: &WalletTx) -> StoreResult<()> {
        self.put(RecordKind::Tx, txid.as_bytes(), &tx.encode()?)
    }

    /// Reads a transaction record.
    pub fn read_tx(&self, txid: &TxId) -> StoreResult<Option<WalletTx>> {
        match self.get(RecordKind::Tx, txid.as_bytes())? {
            Some(bytes) => Ok(Some(self.decode_value(
                RecordKind::Tx,
                txid.as_bytes(),
                &bytes,
            )?)),
            None => Ok(None),
        }
    }

    /// Erases a transaction record.
    pub fn erase_tx(&mut self, txid: &TxId) -> StoreResult<bool> {
        self.del(RecordKind::Tx, txid.as_bytes())
    }

    /// Writes a plaintext key and its metadata in one transaction.
    ///
    /// A crash can never leave the key without its metadata.
    pub fn write_key(
        &mut self,
        pub_key: &PubKey,
        priv_key: &SecretBytes,
        meta: &KeyMetadata,
    ) -> StoreResult<()> {
        let meta_bytes = meta.encode()?;
        let key_bytes = record::encode_bytes_value(priv_key.as_bytes());
        self.with_transaction(|store| {
            store.put(RecordKind::KeyMeta, pub_key.as_bytes(), &meta_bytes)?;
            store.put(RecordKind::Key, pub_key.as_bytes(), &key_bytes)
        })
    }

    /// Writes an encrypted key and its metadata in one transaction,
    /// erasing any plaintext record for the same key.
    pub fn write_crypted_key(
        &mut self,
        pub_key: &PubKey,
        crypted_secret: &[u8],
        meta: &KeyMetadata,
    ) -> StoreResult<()> {
        let meta_bytes = meta.encode()?;
        let ckey_bytes = record::encode_bytes_value(crypted_secret);
        self.with_transaction(|store| {
            store.put(RecordKind::KeyMeta, pub_key.as_bytes(), &meta_bytes)?;
            store.put(RecordKind::CryptedKey, pub_key.as_bytes(), &ckey_bytes)?;
            store.del(RecordKind::Key, pub_key.as_bytes())?;
            Ok(())
        })
    }

    /// Writes key metadata alone, for lazily backfilled properties.
    pub fn write_key_metadata(&mut self, pub_key: &PubKey, meta: &KeyMetadata) -> StoreResult<()> {
        self.put(RecordKind::KeyMeta, pub_key.as_bytes(), &meta.encode()?)
    }

    /// Reads key metadata.
    pub fn read_key_metadata(&self, pub_key: &PubKey) -> StoreResult<Option<KeyMetadata>> {
        match self.get(RecordKind::KeyMeta, pub_key.as_bytes())? {
            Some(bytes) => Ok(Some(self.decode_value(
                RecordKind::KeyMeta,
                pub_key.as_bytes(),
                &bytes,
            )?)),
            None => Ok(None),
        }
    }

    /// Writes wallet encryption parameters.
    pub fn write_master_key(&mut self, id: u32, master_key: &MasterKey) -> StoreResult<()> {
        self.put(
            RecordKind::MasterKey,
            &record::master_key_natural_key(id),
            &master_key.encode()?,
        )
    }

    /// Reads wallet encryption parameters.
    pub fn read_master_key(&self, id: u32) -> StoreResult<Option<MasterKey>> {
        let natural = record::master_key_natural_key(id);
        match self.get(RecordKind::MasterKey, &natural)? {
            Some(bytes) => Ok(Some(self.decode_value(
                RecordKind::MasterKey,
                &natural,
                &bytes,
            )?)),
            None => Ok(None),
        }
    }

    /// Writes a redeem script under its hash.
    pub fn write_cscript(&mut self, hash: &ScriptId, script: &[u8]) -> StoreResult<()> {
        self.put(
            RecordKind::CScript,
            hash.as_bytes(),
            &record::encode_bytes_value(script),
        )
    }

    /// Marks a script as watch-only.
    pub fn write_watch_only(&mut self, script: &[u8]) -> StoreResult<()> {
        self.put(RecordKind::WatchOnly, script, &record::encode_marker_value())
    }

    /// Removes a watch-only script.
    pub fn erase_watch_only(&mut self, script: &[u8]) -> StoreResult<bool> {
        self.del(RecordKind::WatchOnly, script)
    }

    /// Writes the last-synced block locator.
    pub fn write_best_block(&mut self, locator: &BlockLocator) -> StoreResult<()> {
        self.put(RecordKind::BestBlock, &[], &locator.encode()?)
    }

    /// Reads the last-synced block locator.
    pub fn read_best_block(&self) -> StoreResult<Option<BlockLocator>> {
        match self.get(RecordKind::BestBlock, &[])? {
            Some(bytes) => Ok(Some(self.decode_value(RecordKind::BestBlock, &[], &bytes)?)),
            None => Ok(None),
        }
    }

    /// Writes the next transaction ordering position.
    pub fn write_order_pos_next(&mut self, value: i64) -> StoreResult<()> {
        self.put(
            RecordKind::OrderPosNext,
            &[],
            &record::encode_i64_value(value),
        )
    }

    /// Writes the default receiving key.
    pub fn write_default_key(&mut self, pub_key: &PubKey) -> StoreResult<()> {
        self.put(
            RecordKind::DefaultKey,
            &[],
            &record::encode_bytes_value(pub_key.as_bytes()),
        )
    }

    /// Writes a key pool entry under its ordinal index.
    pub fn write_pool(&mut self, index: u64, entry: &KeyPoolEntry) -> StoreResult<()> {
        self.put(
            RecordKind::Pool,
            &record::pool_natural_key(index),
            &entry.encode()?,
        )
    }

    /// Reads a key pool entry.
    pub fn read_pool(&self, index: u64) -> StoreResult<Option<KeyPoolEntry>> {
        let natural = record::pool_natural_key(index);
        match self.get(RecordKind::Pool, &natural)? {
            Some(bytes) => Ok(Some(self.decode_value(RecordKind::Pool, &natural, &bytes)?)),
            None => Ok(None),
        }
    }

    /// Erases a key pool entry.
    pub fn erase_pool(&mut self, index: u64) -> StoreResult<bool> {
        self.del(RecordKind::Pool, &record::pool_natural_key(index))
    }

    /// Writes the minimum store version required to load this store.
    pub fn write_min_version(&mut self, version: u32) -> StoreResult<()> {
        self.put(
            RecordKind::MinVersion,
            &[],
            &record::encode_u32_value(version),
        )
    }

    /// Reads the minimum required store version.
    pub fn read_min_version(&self) -> StoreResult<Option<u32>> {
        match self.get(RecordKind::MinVersion, &[])? {
            Some(bytes) => {
                let raw = record::raw_key(RecordKind::MinVersion, &[]);
                record::decode_u32_value(&bytes)
                    .map(Some)
                    .map_err(|e| StoreError::decode(RecordKind::MinVersion.as_str(), &raw, e))
            }
            None => Ok(None),
        }
    }

    /// Writes an accounting entry directly to the engine.
    ///
    /// This bypasses any cached accounting state the caller keeps; the
    /// caller must update its own aggregate separately or reload. It is a
    /// deliberate lower-level escape hatch, not part of the normal typed
    /// write surface.
    pub fn write_accounting_entry_backend(
        &mut self,
        account: &str,
        seq: u64,
        entry: &AccountingEntry,
    ) -> StoreResult<()> {
        let natural = record::accounting_natural_key(account, seq)?;
        self.put(RecordKind::AccountingEntry, &natural, &entry.encode()?)
    }

    /// Writes an account record.
    pub fn write_account(&mut self, name: &str, account: &Account) -> StoreResult<()> {
        self.put(RecordKind::Account, name.as_bytes(), &account.encode()?)
    }

    /// Reads an account record.
    pub fn read_account(&self, name: &str) -> StoreResult<Option<Account>> {
        match self.get(RecordKind::Account, name.as_bytes())? {
            Some(bytes) => Ok(Some(self.decode_value(
                RecordKind::Account,
                name.as_bytes(),
                &bytes,
            )?)),
            None => Ok(None),
        }
    }

    /// Writes a destination data tuple.
    pub fn write_dest_data(&mut self, address: &str, sub_key: &str, value: &str) -> StoreResult<()> {
        let natural = record::dest_data_natural_key(address, sub_key)?;
        self.put(
            RecordKind::DestData,
            &natural,
            &record::encode_string_value(value),
        )
    }

    /// Erases a destination data tuple.
    pub fn erase_dest_data(&mut self, address: &str, sub_key: &str) -> StoreResult<bool> {
        let natural = record::dest_data_natural_key(address, sub_key)?;
        self.del(RecordKind::DestData, &natural)
    }

    /// Writes the derivation chain state.
    ///
    /// The external chain counter is the single source of truth for the
    /// next unused index; a write that would lower it is refused.
    pub fn write_hd_chain(&mut self, chain: &HdChain) -> StoreResult<()> {
        if let Some(stored) = self.read_hd_chain()? {
            if chain.external_chain_counter < stored.external_chain_counter {
                return Err(StoreError::CounterRegression {
                    stored: stored.external_chain_counter,
                    requested: chain.external_chain_counter,
                });
            }
        }
        self.put(RecordKind::HdChain, &[], &chain.encode()?)
    }

    /// Reads the derivation chain state.
    pub fn read_hd_chain(&self) -> StoreResult<Option<HdChain>> {
        match self.get(RecordKind::HdChain, &[])? {
            Some(bytes) => Ok(Some(self.decode_value(RecordKind::HdChain, &[], &bytes)?)),
            None => Ok(None),
        }
    }

    /// Lists one account's accounting entries in sequence order.
    pub fn list_account_credit_debit(
        &self,
        account: &str,
    ) -> StoreResult<Vec<(u64, AccountingEntry)>> {
        let prefix = record::raw_key(
            RecordKind::AccountingEntry,
            &record::accounting_natural_prefix(account)?,
        );
        let mut entries = Vec::new();
        for (key, value) in self.cursor()? {
            if !key.starts_with(&prefix) {
                continue;
            }
            match record::decode_entry(&key, &value)? {
                Some(crate::record::WalletRecord::AccountingEntry { seq, entry, .. }) => {
                    entries.push((seq, entry));
                }
                _ => return Err(StoreError::malformed_key(&key)),
            }
        }
        Ok(entries)
    }

    /// Sums one account's credits and debits.
    pub fn account_credit_debit(&self, account: &str) -> StoreResult<i64> {
        Ok(self
            .list_account_credit_debit(account)?
            .iter()
            .map(|(_, entry)| entry.credit_debit)
            .sum())
    }
}

impl std::fmt::Debug for WalletStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WalletStore").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use walletstore_storage::MemoryEngine;

    fn create_store() -> WalletStore {
        WalletStore::new(Box::new(MemoryEngine::new()))
    }

    #[test]
    fn name_write_and_erase() {
        let mut store = create_store();
        store.write_name("addr", "groceries").unwrap();
        assert!(store.erase_name("addr").unwrap());
        assert!(!store.erase_name("addr").unwrap());
    }

    #[test]
    fn tx_roundtrip_through_engine() {
        let mut store = create_store();
        let txid = TxId::new([0x11; 32]);
        let mut tx = WalletTx::new(vec![0xDE, 0xAD], 1_600_000_000);
        tx.order_pos = Some(2);

        store.write_tx(&txid, &tx).unwrap();
        assert_eq!(store.read_tx(&txid).unwrap(), Some(tx));

        assert!(store.erase_tx(&txid).unwrap());
        assert_eq!(store.read_tx(&txid).unwrap(), None);
    }

    #[test]
    fn absent_read_is_none_not_error() {
        let store = create_store();
        assert!(store.read_tx(&TxId::new([0; 32])).unwrap().is_none());
        assert!(store.read_best_block().unwrap().is_none());
        assert!(store.read_hd_chain().unwrap().is_none());
        assert!(store.read_min_version().unwrap().is_none());
    }

    #[test]
    fn write_key_stores_both_records() {
        let mut store = create_store();
        let pub_key = PubKey::new(vec![0x02; 33]);
        let priv_key = SecretBytes::new(vec![0x55; 32]);
        let meta = KeyMetadata::new(1_500_000_000);

        store.write_key(&pub_key, &priv_key, &meta).unwrap();
        assert_eq!(store.read_key_metadata(&pub_key).unwrap(), Some(meta));

        let raw = record::raw_key(RecordKind::Key, pub_key.as_bytes());
        assert!(store.engine().get(&raw).unwrap().is_some());
    }

    #[test]
    fn write_crypted_key_erases_plaintext_record() {
        let mut store = create_store();
        let pub_key = PubKey::new(vec![0x02; 33]);
        let meta = KeyMetadata::new(0);

        store
            .write_key(&pub_key, &SecretBytes::new(vec![0x55; 32]), &meta)
            .unwrap();
        store
            .write_crypted_key(&pub_key, &[0xEE; 48], &meta)
            .unwrap();

        let plain_raw = record::raw_key(RecordKind::Key, pub_key.as_bytes());
        let crypted_raw = record::raw_key(RecordKind::CryptedKey, pub_key.as_bytes());
        assert!(store.engine().get(&plain_raw).unwrap().is_none());
        assert!(store.engine().get(&crypted_raw).unwrap().is_some());
    }

    #[test]
    fn master_key_roundtrip() {
        let mut store = create_store();
        let mk = MasterKey {
            crypted_key: vec![0xAA; 48],
            salt: vec![0x01; 8],
            derivation_method: 0,
            derive_iterations: 25_000,
            other_params: Vec::new(),
        };
        store.write_master_key(1, &mk).unwrap();
        assert_eq!(store.read_master_key(1).unwrap(), Some(mk));
        assert_eq!(store.read_master_key(2).unwrap(), None);
    }

    #[test]
    fn pool_roundtrip() {
        let mut store = create_store();
        let entry = KeyPoolEntry::new(5, PubKey::new(vec![0x03; 33]));
        store.write_pool(7, &entry).unwrap();
        assert_eq!(store.read_pool(7).unwrap(), Some(entry));
        assert!(store.erase_pool(7).unwrap());
        assert_eq!(store.read_pool(7).unwrap(), None);
    }

    #[test]
    fn hd_chain_counter_cannot_decrease() {
        let mut store = create_store();
        let mut chain = HdChain::new(crate::types::KeyId::new([1; 20]));
        chain.external_chain_counter = 10;
        store.write_hd_chain(&chain).unwrap();

        chain.external_chain_counter = 11;
        store.write_hd_chain(&chain).unwrap();

        chain.external_chain_counter = 5;
        assert!(matches!(
            store.write_hd_chain(&chain),
            Err(StoreError::CounterRegression {
                stored: 11,
                requested: 5
            })
        ));

        assert_eq!(
            store.read_hd_chain().unwrap().unwrap().external_chain_counter,
            11
        );
    }

    #[test]
    fn accounting_entries_sum_and_list_in_order() {
        let mut store = create_store();
        for (seq, amount) in [(0u64, 100i64), (1, -30), (2, 7)] {
            let entry = AccountingEntry {
                credit_debit: amount,
                time: seq as i64,
                other_account: String::new(),
                comment: String::new(),
            };
            store
                .write_accounting_entry_backend("cold", seq, &entry)
                .unwrap();
        }
        // Another account must not leak into the scan
        store
            .write_accounting_entry_backend(
                "hot",
                0,
                &AccountingEntry {
                    credit_debit: 999,
                    ..AccountingEntry::default()
                },
            )
            .unwrap();

        let listed = store.list_account_credit_debit("cold").unwrap();
        assert_eq!(
            listed.iter().map(|(seq, _)| *seq).collect::<Vec<_>>(),
            vec![0, 1, 2]
        );
        assert_eq!(store.account_credit_debit("cold").unwrap(), 77);
        assert_eq!(store.account_credit_debit("hot").unwrap(), 999);
    }

    #[test]
    fn dest_data_roundtrip() {
        let mut store = create_store();
        store.write_dest_data("addr", "rr0", "request").unwrap();
        assert!(store.erase_dest_data("addr", "rr0").unwrap());
        assert!(!store.erase_dest_data("addr", "rr0").unwrap());
    }

    #[test]
    fn transaction_rolls_back_on_error() {
        let mut store = create_store();
        let result: StoreResult<()> = store.with_transaction(|store| {
            store.write_name("addr", "label")?;
            Err(StoreError::invalid_operation("boom"))
        });
        assert!(result.is_err());

        let raw = record::raw_key(RecordKind::Name, b"addr");
        assert!(store.engine().get(&raw).unwrap().is_none());
    }

    #[test]
    fn close_flushes_when_configured() {
        let store = WalletStore::with_config(
            Box::new(MemoryEngine::new()),
            StoreConfig::new().flush_on_close(false),
        );
        store.close().unwrap();

        let mut store = create_store();
        store.write_name("addr", "label").unwrap();
        store.close().unwrap();
    }

    #[test]
    fn corrupt_value_surfaces_as_decode_error() {
        let mut store = create_store();
        let raw = record::raw_key(RecordKind::HdChain, &[]);
        // Write garbage bytes directly past the typed surface
        {
            let engine = &mut store.engine;
            engine.put(&raw, &[0x01, 0x02]).unwrap();
        }
        let err = store.read_hd_chain().unwrap_err();
        assert!(err.is_decode());
    }
}
