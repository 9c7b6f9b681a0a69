//! File-backed key-value engine.

use crate::engine::{Cursor, KvEngine};
use crate::error::{StorageError, StorageResult};
use fs2::FileExt;
use std::collections::{BTreeMap, BTreeSet};
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

/// Magic bytes identifying a log frame.
const FRAME_MAGIC: [u8; 4] = *b"WLOG";

/// Frame header size: magic (4) + op (1) + payload length (4).
const FRAME_HEADER_SIZE: usize = 9;

/// Trailing checksum size.
const FRAME_CRC_SIZE: usize = 4;

/// Per-entry overhead used for the live-byte estimate.
const ENTRY_OVERHEAD: u64 = (FRAME_HEADER_SIZE + FRAME_CRC_SIZE + 8) as u64;

/// Minimum file size before the rewrite advisory can trigger.
const REWRITE_MIN_SIZE: u64 = 16 * 1024;

/// Log frame operation codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
enum FrameOp {
    Put = 1,
    Erase = 2,
    Batch = 3,
}

impl FrameOp {
    fn from_byte(b: u8) -> Option<Self> {
        match b {
            1 => Some(Self::Put),
            2 => Some(Self::Erase),
            3 => Some(Self::Batch),
            _ => None,
        }
    }
}

/// Journaled writes for an open transaction.
#[derive(Debug, Default)]
struct Journal {
    puts: BTreeMap<Vec<u8>, Vec<u8>>,
    erases: BTreeSet<Vec<u8>>,
}

/// A file-backed key-value engine.
///
/// Entries are persisted as an append-only log of checksummed frames and
/// replayed into an ordered map when the engine is opened. A transaction
/// commit is written as a single batch frame, so it is applied atomically:
/// a crash mid-write leaves a torn tail that replay truncates away.
///
/// # Single Writer
///
/// Opening acquires an exclusive advisory lock on a sibling `.lock` file.
/// A second open of the same path fails with [`StorageError::Locked`]
/// until the first engine is dropped.
///
/// # Rewrite Advisory
///
/// Overwrites and erases leave dead frames in the log. When dead bytes
/// dominate the live estimate, [`KvEngine::needs_rewrite`] reports `true`;
/// compaction itself is the caller's job (recover into a fresh target, or
/// rewrite externally).
#[derive(Debug)]
pub struct FileEngine {
    path: PathBuf,
    file: File,
    _lock_file: File,
    map: BTreeMap<Vec<u8>, Vec<u8>>,
    journal: Option<Journal>,
    file_size: u64,
    live_bytes: u64,
}

impl FileEngine {
    /// Opens or creates a file engine at the given path.
    ///
    /// Existing frames are replayed in order. An incomplete frame at the
    /// end of the log (a torn write from abrupt termination) is truncated
    /// away; everything before it is kept.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Locked`] if another process holds the store
    /// open, or an I/O error if the file cannot be opened.
    pub fn open(path: &Path) -> StorageResult<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let lock_path = path.with_extension("lock");
        let lock_file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&lock_path)?;
        if lock_file.try_lock_exclusive().is_err() {
            return Err(StorageError::Locked);
        }

        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)?;

        let mut raw = Vec::new();
        file.read_to_end(&mut raw)?;

        let mut engine = Self {
            path: path.to_path_buf(),
            file,
            _lock_file: lock_file,
            map: BTreeMap::new(),
            journal: None,
            file_size: 0,
            live_bytes: 0,
        };
        engine.replay(&raw)?;
        Ok(engine)
    }

    /// Returns the path to the underlying log file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Replays raw log bytes into the in-memory map, truncating any torn
    /// tail left by abrupt termination.
    fn replay(&mut self, raw: &[u8]) -> StorageResult<()> {
        let mut offset = 0usize;
        while raw.len() - offset >= FRAME_HEADER_SIZE + FRAME_CRC_SIZE {
            let header = &raw[offset..offset + FRAME_HEADER_SIZE];
            if header[0..4] != FRAME_MAGIC {
                break;
            }
            let Some(op) = FrameOp::from_byte(header[4]) else {
                break;
            };
            let payload_len =
                u32::from_le_bytes([header[5], header[6], header[7], header[8]]) as usize;
            let frame_len = FRAME_HEADER_SIZE + payload_len + FRAME_CRC_SIZE;
            if raw.len() - offset < frame_len {
                break;
            }

            let body = &raw[offset..offset + FRAME_HEADER_SIZE + payload_len];
            let crc_at = offset + FRAME_HEADER_SIZE + payload_len;
            let stored_crc = u32::from_le_bytes([
                raw[crc_at],
                raw[crc_at + 1],
                raw[crc_at + 2],
                raw[crc_at + 3],
            ]);
            if crc32fast::hash(body) != stored_crc {
                break;
            }

            let payload = &raw[offset + FRAME_HEADER_SIZE..crc_at];
            if self.apply_payload(op, payload).is_err() {
                break;
            }
            offset += frame_len;
        }

        if offset < raw.len() {
            self.file.set_len(offset as u64)?;
            self.file.sync_all()?;
        }
        self.file_size = offset as u64;
        Ok(())
    }

    /// Applies one decoded frame payload to the in-memory map.
    fn apply_payload(&mut self, op: FrameOp, payload: &[u8]) -> StorageResult<()> {
        match op {
            FrameOp::Put => {
                let (key, value) = decode_pair(payload)?;
                self.apply_put(key, value);
            }
            FrameOp::Erase => {
                let key = decode_key(payload)?;
                self.apply_erase(&key);
            }
            FrameOp::Batch => {
                // Decode the whole batch before touching the map, so a
                // malformed payload cannot half-apply.
                let mut rest = payload;
                let count = take_u32(&mut rest)?;
                let mut ops: Vec<(FrameOp, Vec<u8>, Vec<u8>)> = Vec::new();
                for _ in 0..count {
                    let sub_op = take_op(&mut rest)?;
                    match sub_op {
                        FrameOp::Put => {
                            let klen = take_u32(&mut rest)? as usize;
                            let vlen = take_u32(&mut rest)? as usize;
                            let key = take_bytes(&mut rest, klen)?;
                            let value = take_bytes(&mut rest, vlen)?;
                            ops.push((FrameOp::Put, key, value));
                        }
                        FrameOp::Erase => {
                            let klen = take_u32(&mut rest)? as usize;
                            let key = take_bytes(&mut rest, klen)?;
                            ops.push((FrameOp::Erase, key, Vec::new()));
                        }
                        FrameOp::Batch => {
                            return Err(StorageError::Corrupted(
                                "nested batch frame".to_string(),
                            ));
                        }
                    }
                }
                for (op, key, value) in ops {
                    match op {
                        FrameOp::Put => self.apply_put(key, value),
                        _ => {
                            self.apply_erase(&key);
                        }
                    }
                }
            }
        }
        Ok(())
    }

    fn apply_put(&mut self, key: Vec<u8>, value: Vec<u8>) {
        if let Some(old) = self.map.get(&key) {
            self.live_bytes -= entry_estimate(&key, old);
        }
        self.live_bytes += entry_estimate(&key, &value);
        self.map.insert(key, value);
    }

    fn apply_erase(&mut self, key: &[u8]) -> bool {
        if let Some(old) = self.map.remove(key) {
            self.live_bytes -= entry_estimate(key, &old);
            true
        } else {
            false
        }
    }

    /// Appends a framed record to the log.
    fn append_frame(&mut self, op: FrameOp, payload: &[u8]) -> StorageResult<()> {
        let mut frame = Vec::with_capacity(FRAME_HEADER_SIZE + payload.len() + FRAME_CRC_SIZE);
        frame.extend_from_slice(&FRAME_MAGIC);
        frame.push(op as u8);
        frame.extend_from_slice(&(payload.len() as u32).to_le_bytes());
        frame.extend_from_slice(payload);
        let crc = crc32fast::hash(&frame);
        frame.extend_from_slice(&crc.to_le_bytes());

        self.file.seek(SeekFrom::End(0))?;
        self.file.write_all(&frame)?;
        self.file_size += frame.len() as u64;
        Ok(())
    }
}

fn entry_estimate(key: &[u8], value: &[u8]) -> u64 {
    key.len() as u64 + value.len() as u64 + ENTRY_OVERHEAD
}

fn encode_pair(key: &[u8], value: &[u8]) -> Vec<u8> {
    let mut payload = Vec::with_capacity(8 + key.len() + value.len());
    payload.extend_from_slice(&(key.len() as u32).to_le_bytes());
    payload.extend_from_slice(&(value.len() as u32).to_le_bytes());
    payload.extend_from_slice(key);
    payload.extend_from_slice(value);
    payload
}

fn decode_pair(payload: &[u8]) -> StorageResult<(Vec<u8>, Vec<u8>)> {
    let mut rest = payload;
    let klen = take_u32(&mut rest)? as usize;
    let vlen = take_u32(&mut rest)? as usize;
    let key = take_bytes(&mut rest, klen)?;
    let value = take_bytes(&mut rest, vlen)?;
    if !rest.is_empty() {
        return Err(StorageError::Corrupted("trailing bytes in frame".to_string()));
    }
    Ok((key, value))
}

fn decode_key(payload: &[u8]) -> StorageResult<Vec<u8>> {
    let mut rest = payload;
    let klen = take_u32(&mut rest)? as usize;
    let key = take_bytes(&mut rest, klen)?;
    if !rest.is_empty() {
        return Err(StorageError::Corrupted("trailing bytes in frame".to_string()));
    }
    Ok(key)
}

fn take_u32(rest: &mut &[u8]) -> StorageResult<u32> {
    if rest.len() < 4 {
        return Err(StorageError::Corrupted("short frame payload".to_string()));
    }
    let value = u32::from_le_bytes([rest[0], rest[1], rest[2], rest[3]]);
    *rest = &rest[4..];
    Ok(value)
}

fn take_op(rest: &mut &[u8]) -> StorageResult<FrameOp> {
    if rest.is_empty() {
        return Err(StorageError::Corrupted("short frame payload".to_string()));
    }
    let op = FrameOp::from_byte(rest[0])
        .ok_or_else(|| StorageError::Corrupted("unknown frame op".to_string()))?;
    *rest = &rest[1..];
    Ok(op)
}

fn take_bytes(rest: &mut &[u8], len: usize) -> StorageResult<Vec<u8>> {
    if rest.len() < len {
        return Err(StorageError::Corrupted("short frame payload".to_string()));
    }
    let bytes = rest[..len].to_vec();
    *rest = &rest[len..];
    Ok(bytes)
}

impl KvEngine for FileEngine {
    fn get(&self, key: &[u8]) -> StorageResult<Option<Vec<u8>>> {
        if let Some(journal) = &self.journal {
            if journal.erases.contains(key) {
                return Ok(None);
            }
            if let Some(value) = journal.puts.get(key) {
                return Ok(Some(value.clone()));
            }
        }
        Ok(self.map.get(key).cloned())
    }

    fn put(&mut self, key: &[u8], value: &[u8]) -> StorageResult<()> {
        if let Some(journal) = &mut self.journal {
            journal.erases.remove(key);
            journal.puts.insert(key.to_vec(), value.to_vec());
            return Ok(());
        }
        self.append_frame(FrameOp::Put, &encode_pair(key, value))?;
        self.apply_put(key.to_vec(), value.to_vec());
        Ok(())
    }

    fn erase(&mut self, key: &[u8]) -> StorageResult<bool> {
        if let Some(journal) = &mut self.journal {
            let pending = journal.puts.remove(key).is_some();
            let committed = self.map.contains_key(key);
            if committed {
                journal.erases.insert(key.to_vec());
            }
            return Ok(pending || committed);
        }
        if !self.map.contains_key(key) {
            return Ok(false);
        }
        let mut payload = Vec::with_capacity(4 + key.len());
        payload.extend_from_slice(&(key.len() as u32).to_le_bytes());
        payload.extend_from_slice(key);
        self.append_frame(FrameOp::Erase, &payload)?;
        Ok(self.apply_erase(key))
    }

    fn cursor(&self) -> StorageResult<Cursor> {
        let entries = self
            .map
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
        let count = journal.erases.len() + journal.puts.len();
        if count == 0 {
            return Ok(());
        }

        // One batch frame, one checksum: the commit is all-or-nothing
        // under torn-tail truncation.
        let mut payload = Vec::new();
        payload.extend_from_slice(&(count as u32).to_le_bytes());
        for key in &journal.erases {
            payload.push(FrameOp::Erase as u8);
            payload.extend_from_slice(&(key.len() as u32).to_le_bytes());
            payload.extend_from_slice(key);
        }
        for (key, value) in &journal.puts {
            payload.push(FrameOp::Put as u8);
            payload.extend_from_slice(&(key.len() as u32).to_le_bytes());
            payload.extend_from_slice(&(value.len() as u32).to_le_bytes());
            payload.extend_from_slice(key);
            payload.extend_from_slice(value);
        }
        self.append_frame(FrameOp::Batch, &payload)?;
        self.file.sync_all()?;

        for key in journal.erases {
            self.apply_erase(&key);
        }
        for (key, value) in journal.puts {
            self.apply_put(key, value);
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
        self.file.flush()?;
        self.file.sync_all()?;
        Ok(())
    }

    fn wipe(&mut self) -> StorageResult<()> {
        self.journal = None;
        self.file.set_len(0)?;
        self.file.sync_all()?;
        self.map.clear();
        self.file_size = 0;
        self.live_bytes = 0;
        Ok(())
    }

    fn needs_rewrite(&self) -> StorageResult<bool> {
        Ok(self.file_size > REWRITE_MIN_SIZE && self.live_bytes * 2 < self.file_size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn file_create_new() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("store.dat");

        let engine = FileEngine::open(&path).unwrap();
        assert!(path.exists());
        assert_eq!(engine.cursor().unwrap().remaining(), 0);
    }

    #[test]
    fn file_put_get_survives_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("store.dat");

        {
            let mut engine = FileEngine::open(&path).unwrap();
            engine.put(b"key", b"value").unwrap();
            engine.flush().unwrap();
        }

        let engine = FileEngine::open(&path).unwrap();
        assert_eq!(engine.get(b"key").unwrap(), Some(b"value".to_vec()));
    }

    #[test]
    fn file_erase_survives_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("store.dat");

        {
            let mut engine = FileEngine::open(&path).unwrap();
            engine.put(b"key", b"value").unwrap();
            engine.erase(b"key").unwrap();
            engine.flush().unwrap();
        }

        let engine = FileEngine::open(&path).unwrap();
        assert_eq!(engine.get(b"key").unwrap(), None);
    }

    #[test]
    fn file_committed_transaction_survives_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("store.dat");

        {
            let mut engine = FileEngine::open(&path).unwrap();
            engine.begin().unwrap();
            engine.put(b"a", b"1").unwrap();
            engine.put(b"b", b"2").unwrap();
            engine.commit().unwrap();
        }

        let engine = FileEngine::open(&path).unwrap();
        assert_eq!(engine.get(b"a").unwrap(), Some(b"1".to_vec()));
        assert_eq!(engine.get(b"b").unwrap(), Some(b"2".to_vec()));
    }

    #[test]
    fn file_aborted_transaction_leaves_no_trace() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("store.dat");

        let mut engine = FileEngine::open(&path).unwrap();
        engine.begin().unwrap();
        engine.put(b"ghost", b"1").unwrap();
        engine.abort().unwrap();

        assert_eq!(engine.get(b"ghost").unwrap(), None);
        assert_eq!(engine.file_size, 0);
    }

    #[test]
    fn file_torn_tail_is_truncated_on_open() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("store.dat");

        {
            let mut engine = FileEngine::open(&path).unwrap();
            engine.put(b"good", b"data").unwrap();
            engine.flush().unwrap();
        }

        // Simulate a crash mid-append: garbage after the last full frame
        let good_len = std::fs::metadata(&path).unwrap().len();
        let mut file = OpenOptions::new().append(true).open(&path).unwrap();
        file.write_all(b"WLOG\x01partial-frame-garbage").unwrap();
        drop(file);

        let engine = FileEngine::open(&path).unwrap();
        assert_eq!(engine.get(b"good").unwrap(), Some(b"data".to_vec()));
        assert_eq!(std::fs::metadata(&path).unwrap().len(), good_len);
    }

    #[test]
    fn file_second_open_is_locked() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("store.dat");

        let _engine = FileEngine::open(&path).unwrap();
        assert!(matches!(FileEngine::open(&path), Err(StorageError::Locked)));
    }

    #[test]
    fn file_lock_released_on_drop() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("store.dat");

        {
            let _engine = FileEngine::open(&path).unwrap();
        }
        assert!(FileEngine::open(&path).is_ok());
    }

    #[test]
    fn file_cursor_is_key_ordered() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("store.dat");

        let mut engine = FileEngine::open(&path).unwrap();
        engine.put(b"b", b"2").unwrap();
        engine.put(b"a", b"1").unwrap();

        let keys: Vec<Vec<u8>> = engine.cursor().unwrap().map(|(k, _)| k).collect();
        assert_eq!(keys, vec![b"a".to_vec(), b"b".to_vec()]);
    }

    #[test]
    fn file_wipe_clears_log_and_map() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("store.dat");

        let mut engine = FileEngine::open(&path).unwrap();
        engine.put(b"k", b"v").unwrap();
        engine.wipe().unwrap();

        assert_eq!(engine.get(b"k").unwrap(), None);
        assert_eq!(std::fs::metadata(&path).unwrap().len(), 0);
    }

    #[test]
    fn file_rewrite_advisory_after_churn() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("store.dat");

        let mut engine = FileEngine::open(&path).unwrap();
        assert!(!engine.needs_rewrite().unwrap());

        // Overwrite one key until dead frames dominate
        let value = vec![0xAB; 512];
        for _ in 0..100 {
            engine.put(b"churn", &value).unwrap();
        }
        assert!(engine.needs_rewrite().unwrap());
    }
}
