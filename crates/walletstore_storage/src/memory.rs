//! In-memory key-value engine for testing.

use crate::engine::{Cursor, KvEngine};
use crate::error::{StorageError, StorageResult};
use parking_lot::RwLock;
use std::collections::{BTreeMap, BTreeSet};

/// Journaled writes for an open transaction.
#[derive(Debug, Default)]
struct Journal {
    puts: BTreeMap<Vec<u8>, Vec<u8>>,
    erases: BTreeSet<Vec<u8>>,
}

/// An in-memory key-value engine.
///
/// This engine keeps all entries in an ordered map and is suitable for:
/// - Unit tests
/// - Integration tests
/// - Ephemeral stores that don't need persistence
///
/// # Thread Safety
///
/// Reads take a shared lock on the committed map, so an engine handle can
/// be shared across threads.
///
/// # Example
///
/// ```rust
/// use walletstore_storage::{KvEngine, MemoryEngine};
///
/// let mut engine = MemoryEngine::new();
/// engine.put(b"name", b"alice").unwrap();
/// assert!(engine.erase(b"name").unwrap());
/// assert_eq!(engine.get(b"name").unwrap(), None);
/// ```
#[derive(Debug, Default)]
pub struct MemoryEngine {
    data: RwLock<BTreeMap<Vec<u8>, Vec<u8>>>,
    journal: Option<Journal>,
}

impl MemoryEngine {
    /// Creates a new empty in-memory engine.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an engine pre-populated with entries.
    ///
    /// Useful for constructing load and recovery scenarios in tests.
    #[must_use]
    pub fn with_entries(entries: Vec<(Vec<u8>, Vec<u8>)>) -> Self {
        Self {
            data: RwLock::new(entries.into_iter().collect()),
            journal: None,
        }
    }

    /// Returns the number of committed entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.read().len()
    }

    /// Returns `true` if the engine holds no committed entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.read().is_empty()
    }
}

impl KvEngine for MemoryEngine {
    fn get(&self, key: &[u8]) -> StorageResult<Option<Vec<u8>>> {
        if let Some(journal) = &self.journal {
            if journal.erases.contains(key) {
                return Ok(None);
            }
            if let Some(value) = journal.puts.get(key) {
                return Ok(Some(value.clone()));
            }
        }
        Ok(self.data.read().get(key).cloned())
    }

    fn put(&mut self, key: &[u8], value: &[u8]) -> StorageResult<()> {
        if let Some(journal) = &mut self.journal {
            journal.erases.remove(key);
            journal.puts.insert(key.to_vec(), value.to_vec());
        } else {
            self.data.write().insert(key.to_vec(), value.to_vec());
        }
        Ok(())
    }

    fn erase(&mut self, key: &[u8]) -> StorageResult<bool> {
        if let Some(journal) = &mut self.journal {
            let pending = journal.puts.remove(key).is_some();
            let committed = self.data.read().contains_key(key);
            if committed {
                journal.erases.insert(key.to_vec());
            }
            Ok(pending || committed)
        } else {
            Ok(self.data.write().remove(key).is_some())
        }
    }

    fn cursor(&self) -> StorageResult<Cursor> {
        let entries = self
            .data
            .read()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        Ok(Cursor::new(entries))
    }

    fn begin(&mut self) -> StorageResult<()> {
        if self.journal.is_some() {
            return Err(StorageError::TransactionActive);
        }
        self.journal = Some(Journal::default());
        Ok(())
    }

    fn commit(&mut self) -> StorageResult<()> {
        let journal = self.journal.take().ok_or(StorageError::NoTransaction)?;
        let mut data = self.data.write();
        for key in journal.erases {
            data.remove(&key);
        }
        for (key, value) in journal.puts {
            data.insert(key, value);
        }
        Ok(())
    }

    fn abort(&mut self) -> StorageResult<()> {
        if self.journal.take().is_none() {
            return Err(StorageError::NoTransaction);
        }
        Ok(())
    }

    fn flush(&mut self) -> StorageResult<()> {
        // Nothing buffered outside the transaction journal
        Ok(())
    }

    fn wipe(&mut self) -> StorageResult<()> {
        self.journal = None;
        self.data.write().clear();
        Ok(())
    }

    fn needs_rewrite(&self) -> StorageResult<bool> {
        Ok(false)
    }
}
