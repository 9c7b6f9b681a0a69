//! Bulk loading, transaction reordering, and zap operations.

use crate::error::StoreResult;
use crate::record::{self, RecordKind, WalletRecord, WalletTx};
use crate::store::WalletStore;
use crate::types::TxId;
use crate::wallet::Wallet;
use tracing::{debug, warn};

/// Store version this implementation can load.
///
/// A stored `minversion` above this aborts the load with
/// [`DbStatus::TooNew`].
pub const STORE_VERSION: u32 = 3;

/// Caller-visible outcome of a bulk load.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DbStatus {
    /// Every record loaded.
    Ok,
    /// Some non-key records failed to decode; the aggregate is usable.
    NonCriticalError,
    /// Key-material records failed to decode; refuse to operate until
    /// recovery runs.
    Corrupt,
    /// The store requires a newer implementation.
    TooNew,
    /// The engine failed mid-load.
    LoadFail,
    /// The engine advises an external compact-and-reopen.
    NeedRewrite,
}

/// Scans the whole store and reconstructs the wallet aggregate.
///
/// Decode failures accumulate instead of aborting: one bad record never
/// hides the others. A failed key-material record makes the result
/// [`DbStatus::Corrupt`]; failures on other kinds degrade to
/// [`DbStatus::NonCriticalError`]. Unknown record kinds are skipped so a
/// store written by newer software still opens.
pub fn load_wallet(store: &WalletStore, wallet: &mut Wallet) -> DbStatus {
    // Version gate first: nothing is folded in from a too-new store.
    match store.read_min_version() {
        Ok(Some(version)) if version > STORE_VERSION => {
            warn!(version, supported = STORE_VERSION, "store is too new");
            return DbStatus::TooNew;
        }
        Ok(Some(version)) => wallet.min_version = version,
        Ok(None) => {}
        Err(e) if e.is_decode() => {
            warn!(error = %e, "version record is corrupt");
            return DbStatus::Corrupt;
        }
        Err(e) => {
            warn!(error = %e, "failed to read version record");
            return DbStatus::LoadFail;
        }
    }

    let cursor = match store.cursor() {
        Ok(cursor) => cursor,
        Err(e) => {
            warn!(error = %e, "failed to open scan cursor");
            return DbStatus::LoadFail;
        }
    };

    let mut corrupt = false;
    let mut noncritical = false;
    let mut loaded = 0usize;

    for (key, value) in cursor {
        match record::decode_entry(&key, &value) {
            Ok(Some(entry)) => {
                wallet.apply(entry);
                loaded += 1;
            }
            Ok(None) => {
                debug!("skipping record of unknown kind");
            }
            Err(e) => {
                // Keep scanning to surface the broadest diagnostic
                let critical = record::split_raw_key(&key)
                    .ok()
                    .and_then(|(disc, _)| RecordKind::parse(disc))
                    .map_or(true, RecordKind::is_key_material);
                if critical {
                    corrupt = true;
                } else {
                    noncritical = true;
                }
                warn!(error = %e, critical, "record failed to decode");
            }
        }
    }
    debug!(loaded, "wallet load complete");

    if corrupt {
        DbStatus::Corrupt
    } else if noncritical {
        DbStatus::NonCriticalError
    } else if store.needs_rewrite().unwrap_or(false) {
        DbStatus::NeedRewrite
    } else {
        DbStatus::Ok
    }
}

/// Collects every transaction record without folding into an aggregate.
pub fn find_wallet_txs(store: &WalletStore) -> StoreResult<Vec<(TxId, WalletTx)>> {
    let mut txs = Vec::new();
    for (key, value) in store.cursor()? {
        let Ok((disc, _)) = record::split_raw_key(&key) else {
            continue;
        };
        if RecordKind::parse(disc) != Some(RecordKind::Tx) {
            continue;
        }
        if let Some(WalletRecord::Tx { txid, tx }) = record::decode_entry(&key, &value)? {
            txs.push((txid, tx));
        }
    }
    Ok(txs)
}

/// Erases every transaction record, returning the erased set.
///
/// The "zap" half of zap-and-reload: the caller re-acquires transaction
/// history from the network while keys and metadata stay untouched.
pub fn zap_wallet_txs(store: &mut WalletStore) -> StoreResult<Vec<(TxId, WalletTx)>> {
    let txs = find_wallet_txs(store)?;
    store.with_transaction(|store| {
        for (txid, _) in &txs {
            store.erase_tx(txid)?;
        }
        Ok(())
    })?;
    Ok(txs)
}

/// Erases a chosen subset of transactions, returning the hashes that were
/// actually present and erased.
pub fn zap_select_txs(store: &mut WalletStore, txids: &[TxId]) -> StoreResult<Vec<TxId>> {
    let mut erased = Vec::new();
    store.with_transaction(|store| {
        for txid in txids {
            if store.erase_tx(txid)? {
                erased.push(*txid);
            }
        }
        Ok(())
    })?;
    Ok(erased)
}

/// Rebuilds the explicit transaction ordering.
///
/// Transactions keep their relative order where an explicit position
/// exists; missing or duplicate positions fall back to the cursor scan
/// order, which is stable within one store. Every position is then
/// reassigned densely from zero and the next-position counter rewritten,
/// all inside one engine transaction so a crash cannot half-apply the
/// reorder.
pub fn reorder_transactions(store: &mut WalletStore, wallet: &mut Wallet) -> StoreResult<()> {
    let mut entries: Vec<(usize, TxId, WalletTx)> = find_wallet_txs(store)?
        .into_iter()
        .enumerate()
        .map(|(idx, (txid, tx))| (idx, txid, tx))
        .collect();

    // Explicit positions first in their own order; unset positions after,
    // in scan order. Stable sort makes scan order the tie-break.
    entries.sort_by_key(|(idx, _, tx)| (tx.order_pos.unwrap_or(i64::MAX), *idx));

    let next = entries.len() as i64;
    store.with_transaction(|store| {
        for (pos, (_, txid, tx)) in entries.iter_mut().enumerate() {
            let pos = pos as i64;
            if tx.order_pos != Some(pos) {
                tx.order_pos = Some(pos);
                store.write_tx(txid, tx)?;
            }
        }
        store.write_order_pos_next(next)
    })?;

    for (_, txid, tx) in entries {
        wallet.txs.insert(txid, tx);
    }
    wallet.order_pos_next = next;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{raw_key, HdChain, KeyMetadata, KeyPoolEntry};
    use crate::types::{KeyId, PubKey, SecretBytes};
    use walletstore_storage::{KvEngine, MemoryEngine};

    fn create_store() -> WalletStore {
        WalletStore::new(Box::new(MemoryEngine::new()))
    }

    fn sample_tx(byte: u8) -> (TxId, WalletTx) {
        (
            TxId::new([byte; 32]),
            WalletTx::new(vec![byte, byte], i64::from(byte)),
        )
    }

    #[test]
    fn load_reconstructs_the_aggregate() {
        let mut store = create_store();
        let pub_key = PubKey::new(vec![0x02; 33]);
        store
            .write_key(&pub_key, &SecretBytes::new(vec![0x55; 32]), &KeyMetadata::new(9))
            .unwrap();
        store.write_name("addr", "rent").unwrap();
        store.write_pool(0, &KeyPoolEntry::new(1, pub_key.clone())).unwrap();
        let (txid, tx) = sample_tx(0x21);
        store.write_tx(&txid, &tx).unwrap();
        store.write_min_version(STORE_VERSION).unwrap();

        let mut wallet = Wallet::new();
        assert_eq!(load_wallet(&store, &mut wallet), DbStatus::Ok);

        assert_eq!(wallet.keys.len(), 1);
        assert_eq!(wallet.key_metadata.len(), 1);
        assert_eq!(wallet.address_book.get("addr").unwrap().label, "rent");
        assert_eq!(wallet.pool.len(), 1);
        assert_eq!(wallet.txs.get(&txid), Some(&tx));
        assert_eq!(wallet.min_version, STORE_VERSION);
    }

    #[test]
    fn too_new_store_loads_nothing() {
        let mut store = create_store();
        store.write_name("addr", "rent").unwrap();
        store.write_min_version(STORE_VERSION + 1).unwrap();

        let mut wallet = Wallet::new();
        assert_eq!(load_wallet(&store, &mut wallet), DbStatus::TooNew);
        assert!(wallet.is_empty());
    }

    #[test]
    fn version_at_the_boundary_still_loads() {
        let mut store = create_store();
        store.write_min_version(STORE_VERSION).unwrap();

        let mut wallet = Wallet::new();
        assert_eq!(load_wallet(&store, &mut wallet), DbStatus::Ok);
    }

    #[test]
    fn corrupt_key_record_marks_store_corrupt() {
        let mut store = create_store();
        store.write_name("addr", "rent").unwrap();

        let raw = raw_key(RecordKind::Key, &[0x02; 33]);
        let mut engine = store.into_engine();
        engine.put(&raw, &[0xFF]).unwrap();
        let store = WalletStore::new(engine);

        let mut wallet = Wallet::new();
        assert_eq!(load_wallet(&store, &mut wallet), DbStatus::Corrupt);
        // The scan continued past the bad record
        assert_eq!(wallet.address_book.len(), 1);
    }

    #[test]
    fn corrupt_name_record_is_noncritical() {
        let mut store = create_store();
        let (txid, tx) = sample_tx(3);
        store.write_tx(&txid, &tx).unwrap();

        let raw = raw_key(RecordKind::Name, b"addr");
        let mut engine = store.into_engine();
        engine.put(&raw, &[0xFF]).unwrap();
        let store = WalletStore::new(engine);

        let mut wallet = Wallet::new();
        assert_eq!(load_wallet(&store, &mut wallet), DbStatus::NonCriticalError);
        assert_eq!(wallet.txs.len(), 1);
    }

    #[test]
    fn unknown_kind_is_skipped() {
        let mut engine = MemoryEngine::new();
        let mut key = vec![6u8];
        key.extend_from_slice(b"future");
        engine.put(&key, &[1, 2, 3]).unwrap();
        let store = WalletStore::new(Box::new(engine));

        let mut wallet = Wallet::new();
        assert_eq!(load_wallet(&store, &mut wallet), DbStatus::Ok);
        assert!(wallet.is_empty());
    }

    #[test]
    fn reorder_assigns_scan_order_when_positions_missing() {
        let mut store = create_store();
        let (tx_a, wtx_a) = sample_tx(0x0A);
        let (tx_b, wtx_b) = sample_tx(0x0B);
        let (tx_c, wtx_c) = sample_tx(0x0C);
        store.write_tx(&tx_a, &wtx_a).unwrap();
        store.write_tx(&tx_b, &wtx_b).unwrap();
        store.write_tx(&tx_c, &wtx_c).unwrap();

        let mut wallet = Wallet::new();
        reorder_transactions(&mut store, &mut wallet).unwrap();

        let pos = |txid: &TxId| wallet.txs.get(txid).unwrap().order_pos.unwrap();
        assert!(pos(&tx_a) < pos(&tx_b));
        assert!(pos(&tx_b) < pos(&tx_c));
        assert_eq!(wallet.order_pos_next, 3);

        // Rewritten records carry the explicit positions now
        assert_eq!(store.read_tx(&tx_a).unwrap().unwrap().order_pos, Some(0));
        assert_eq!(store.read_tx(&tx_c).unwrap().unwrap().order_pos, Some(2));
    }

    #[test]
    fn reorder_respects_existing_positions() {
        let mut store = create_store();
        let (tx_a, mut wtx_a) = sample_tx(0x0A);
        let (tx_b, mut wtx_b) = sample_tx(0x0B);
        let (tx_c, wtx_c) = sample_tx(0x0C);
        // Explicit order says b before a; c has none and scans last
        wtx_a.order_pos = Some(50);
        wtx_b.order_pos = Some(10);
        store.write_tx(&tx_a, &wtx_a).unwrap();
        store.write_tx(&tx_b, &wtx_b).unwrap();
        store.write_tx(&tx_c, &wtx_c).unwrap();

        let mut wallet = Wallet::new();
        reorder_transactions(&mut store, &mut wallet).unwrap();

        let pos = |txid: &TxId| wallet.txs.get(txid).unwrap().order_pos.unwrap();
        assert_eq!(pos(&tx_b), 0);
        assert_eq!(pos(&tx_a), 1);
        assert_eq!(pos(&tx_c), 2);
    }

    #[test]
    fn reorder_is_idempotent() {
        let mut store = create_store();
        for byte in [1u8, 2, 3] {
            let (txid, tx) = sample_tx(byte);
            store.write_tx(&txid, &tx).unwrap();
        }

        let mut wallet = Wallet::new();
        reorder_transactions(&mut store, &mut wallet).unwrap();
        let first: Vec<_> = wallet
            .txs
            .iter()
            .map(|(txid, tx)| (*txid, tx.order_pos))
            .collect();

        reorder_transactions(&mut store, &mut wallet).unwrap();
        let second: Vec<_> = wallet
            .txs
            .iter()
            .map(|(txid, tx)| (*txid, tx.order_pos))
            .collect();
        assert_eq!(first, second);
    }

    #[test]
    fn zap_erases_all_txs_and_nothing_else() {
        let mut store = create_store();
        let (txid, tx) = sample_tx(0x42);
        store.write_tx(&txid, &tx).unwrap();
        store.write_name("addr", "keep me").unwrap();
        store
            .write_hd_chain(&HdChain::new(KeyId::new([1; 20])))
            .unwrap();

        let zapped = zap_wallet_txs(&mut store).unwrap();
        assert_eq!(zapped, vec![(txid, tx)]);
        assert_eq!(store.read_tx(&txid).unwrap(), None);

        let mut wallet = Wallet::new();
        assert_eq!(load_wallet(&store, &mut wallet), DbStatus::Ok);
        assert!(wallet.txs.is_empty());
        assert_eq!(wallet.address_book.len(), 1);
        assert!(wallet.hd_chain.is_some());
    }

    #[test]
    fn zap_select_reports_what_was_erased() {
        let mut store = create_store();
        let (present, tx) = sample_tx(0x42);
        store.write_tx(&present, &tx).unwrap();
        let absent = TxId::new([0x77; 32]);

        let erased = zap_select_txs(&mut store, &[present, absent]).unwrap();
        assert_eq!(erased, vec![present]);
    }

    #[test]
    fn find_surfaces_decode_failures() {
        let mut engine = MemoryEngine::new();
        engine
            .put(&raw_key(RecordKind::Tx, &[0xAB; 32]), &[0x00])
            .unwrap();
        let store = WalletStore::new(Box::new(engine));
        assert!(find_wallet_txs(&store).is_err());
    }
}
