//! # Walletstore Storage
//!
//! Key-value engine contract and reference engines for walletstore.
//!
//! This crate defines the lowest-level storage abstraction the record store
//! is built on. Engines are **opaque keyed byte stores** - they hold raw
//! key/value pairs and never interpret record contents.
//!
//! ## Design Principles
//!
//! - Engines store raw byte keys and values; all record format
//!   interpretation lives above this crate
//! - Iteration is always in ascending byte order of keys
//! - A transaction is the only atomicity boundary an engine offers
//! - Must be `Send + Sync` so a store handle can cross threads
//!
//! ## Available Engines
//!
//! - [`MemoryEngine`] - Ordered in-memory map for tests and ephemeral stores
//! - [`FileEngine`] - Append-only checksummed log replayed into an ordered
//!   map, with an exclusive advisory file lock
//!
//! ## Example
//!
//! ```rust
//! use walletstore_storage::{KvEngine, MemoryEngine};
//!
//! let mut engine = MemoryEngine::new();
//! engine.put(b"key", b"value").unwrap();
//! assert_eq!(engine.get(b"key").unwrap(), Some(b"value".to_vec()));
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod engine;
mod error;
mod file;
mod memory;

pub use engine::{Cursor, KvEngine};
pub use error::{StorageError, StorageResult};
pub use file::FileEngine;
pub use memory::MemoryEngine;
