//! Salvaging records from a damaged store.

use crate::error::StoreResult;
use crate::record::{self, RecordKind};
use tracing::{debug, warn};
use walletstore_storage::KvEngine;

/// Options for a recovery run.
#[derive(Debug, Clone, Copy, Default)]
pub struct RecoverConfig {
    /// Restrict the rebuilt output to key-material record kinds.
    ///
    /// Used when the caller only needs to recover spending capability and
    /// distrusts transaction and account history.
    pub keys_only: bool,
}

impl RecoverConfig {
    /// Creates the default configuration (recover everything).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the keys-only restriction.
    #[must_use]
    pub const fn keys_only(mut self, value: bool) -> Self {
        self.keys_only = value;
        self
    }
}

/// What a recovery run salvaged.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RecoverReport {
    /// Entries validated and written to the target.
    pub recovered: usize,
    /// Entries dropped because they failed to validate.
    pub dropped: usize,
    /// Entries excluded by the keys-only restriction.
    pub filtered: usize,
}

/// Rebuilds a store from whatever entries in `source` still validate.
///
/// Every source entry is decode-attempted independently of the loader's
/// trust: a failure drops that entry and counts it, never aborting the
/// run. Raw bytes that validate are copied verbatim, so a record written
/// by a newer format revision survives recovery untouched.
///
/// The target is wiped first and written in one transaction - a rerun
/// after a crash starts from scratch against an empty target, and the
/// source is never mutated.
///
/// # Errors
///
/// Only engine-level failures (reading the source, writing the target)
/// abort a recovery.
pub fn recover(
    source: &dyn KvEngine,
    target: &mut dyn KvEngine,
    config: &RecoverConfig,
) -> StoreResult<RecoverReport> {
    target.wipe()?;

    let mut report = RecoverReport::default();
    let mut salvaged: Vec<(Vec<u8>, Vec<u8>)> = Vec::new();

    for (key, value) in source.cursor()? {
        match record::decode_entry(&key, &value) {
            Ok(Some(entry)) => {
                if config.keys_only && !entry.kind().is_key_material() {
                    report.filtered += 1;
                    continue;
                }
                salvaged.push((key, value));
            }
            Ok(None) => {
                // Unknown kind: the bytes may belong to newer software.
                // Keep them unless the caller asked for keys only.
                if config.keys_only {
                    report.filtered += 1;
                } else {
                    salvaged.push((key, value));
                }
            }
            Err(e) => {
                report.dropped += 1;
                warn!(error = %e, "dropping unreadable record");
            }
        }
    }

    target.begin()?;
    for (key, value) in &salvaged {
        if let Err(e) = target.put(key, value) {
            let _ = target.abort();
            return Err(e.into());
        }
    }
    target.commit()?;
    target.flush()?;

    report.recovered = salvaged.len();
    debug!(
        recovered = report.recovered,
        dropped = report.dropped,
        filtered = report.filtered,
        "recovery complete"
    );
    Ok(report)
}

/// Returns `true` if a raw key belongs to a key-material record kind.
///
/// Exposed for operators inspecting a damaged store before deciding
/// between full and keys-only recovery.
#[must_use]
pub fn is_key_material_key(raw: &[u8]) -> bool {
    record::split_raw_key(raw)
        .ok()
        .and_then(|(disc, _)| RecordKind::parse(disc))
        .is_some_and(RecordKind::is_key_material)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{raw_key, KeyMetadata, WalletTx};
    use crate::store::WalletStore;
    use crate::types::{PubKey, SecretBytes, TxId};
    use walletstore_codec::Encode;
    use walletstore_storage::MemoryEngine;

    fn store_with_keys(count: u8) -> WalletStore {
        let mut store = WalletStore::new(Box::new(MemoryEngine::new()));
        for i in 0..count {
            let pub_key = PubKey::new(vec![i + 1; 33]);
            store
                .write_key(
                    &pub_key,
                    &SecretBytes::new(vec![i; 32]),
                    &KeyMetadata::new(i64::from(i)),
                )
                .unwrap();
        }
        store
    }

    #[test]
    fn recovery_drops_only_the_bad_records() {
        // 10 valid key records (5 keys, each a key + metadata pair)
        let store = store_with_keys(5);
        let mut source = store.into_engine();

        // One record with truncated bytes
        let good = KeyMetadata::new(3).encode().unwrap();
        source
            .put(
                &raw_key(RecordKind::KeyMeta, &[0xEE; 33]),
                &good[..good.len() - 3],
            )
            .unwrap();

        let mut target = MemoryEngine::new();
        let report = recover(source.as_ref(), &mut target, &RecoverConfig::new()).unwrap();

        assert_eq!(report.recovered, 10);
        assert_eq!(report.dropped, 1);
        assert_eq!(target.len(), 10);
    }

    #[test]
    fn keys_only_excludes_transaction_records() {
        let mut store = store_with_keys(2);
        let txid = TxId::new([0x99; 32]);
        store.write_tx(&txid, &WalletTx::new(vec![1], 1)).unwrap();
        store.write_name("addr", "label").unwrap();
        let source = store.into_engine();

        let mut target = MemoryEngine::new();
        let report = recover(
            source.as_ref(),
            &mut target,
            &RecoverConfig::new().keys_only(true),
        )
        .unwrap();

        assert_eq!(report.recovered, 4);
        assert_eq!(report.filtered, 2);
        for (key, _) in target.cursor().unwrap() {
            assert!(is_key_material_key(&key));
        }
    }

    #[test]
    fn recovery_wipes_a_stale_target() {
        let source = store_with_keys(1).into_engine();

        let mut target = MemoryEngine::new();
        target.put(b"stale", b"leftover from a failed run").unwrap();

        let report = recover(source.as_ref(), &mut target, &RecoverConfig::new()).unwrap();
        assert_eq!(report.recovered, 2);
        assert_eq!(target.get(b"stale").unwrap(), None);
    }

    #[test]
    fn recovery_leaves_the_source_untouched() {
        let source = store_with_keys(3).into_engine();
        let before: Vec<_> = source.cursor().unwrap().collect();

        let mut target = MemoryEngine::new();
        recover(source.as_ref(), &mut target, &RecoverConfig::new()).unwrap();

        let after: Vec<_> = source.cursor().unwrap().collect();
        assert_eq!(before, after);
    }

    #[test]
    fn recovery_is_rerunnable() {
        let source = store_with_keys(2).into_engine();
        let mut target = MemoryEngine::new();

        let first = recover(source.as_ref(), &mut target, &RecoverConfig::new()).unwrap();
        let second = recover(source.as_ref(), &mut target, &RecoverConfig::new()).unwrap();
        assert_eq!(first, second);
        assert_eq!(target.len(), first.recovered);
    }

    #[test]
    fn recovered_store_loads_cleanly() {
        let store = store_with_keys(3);
        let mut source = store.into_engine();
        source
            .put(&raw_key(RecordKind::Name, b"addr"), &[0xFF])
            .unwrap();

        let mut target = MemoryEngine::new();
        recover(source.as_ref(), &mut target, &RecoverConfig::new()).unwrap();

        let recovered = WalletStore::new(Box::new(target));
        let mut wallet = crate::wallet::Wallet::new();
        assert_eq!(
            crate::loader::load_wallet(&recovered, &mut wallet),
            crate::loader::DbStatus::Ok
        );
        assert_eq!(wallet.keys.len(), 3);
    }

    #[test]
    fn empty_source_recovers_to_empty_target() {
        let source = MemoryEngine::new();
        let mut target = MemoryEngine::new();
        let report = recover(&source, &mut target, &RecoverConfig::new()).unwrap();
        assert_eq!(report, RecoverReport::default());
    }
}
