//! # Walletstore Core
//!
//! A durable record store for cryptocurrency wallet state.
//!
//! This crate provides:
//! - The wallet record model with versioned binary codecs that stay
//!   decodable across historical format revisions
//! - A typed record store over a pluggable key-value engine
//! - Bulk loading that reconstructs the in-memory wallet aggregate
//! - Recovery that salvages readable records from a damaged store
//!
//! ## Layering
//!
//! The store sits between the embedded engine below it (see
//! `walletstore_storage`) and the caller's in-memory wallet above it. It
//! owns no entity state and no cache: every call hits the engine, and the
//! aggregate lives with the caller.
//!
//! ## Example
//!
//! ```
//! use walletstore_core::{load_wallet, DbStatus, Wallet, WalletStore};
//! use walletstore_storage::MemoryEngine;
//!
//! let mut store = WalletStore::new(Box::new(MemoryEngine::new()));
//! store.write_name("addr", "savings").unwrap();
//!
//! let mut wallet = Wallet::new();
//! assert_eq!(load_wallet(&store, &mut wallet), DbStatus::Ok);
//! assert_eq!(wallet.address_book["addr"].label, "savings");
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod error;
mod loader;
mod recover;
pub mod record;
mod store;
mod types;
mod wallet;

pub use error::{StoreError, StoreResult};
pub use loader::{
    find_wallet_txs, load_wallet, reorder_transactions, zap_select_txs, zap_wallet_txs, DbStatus,
    STORE_VERSION,
};
pub use recover::{is_key_material_key, recover, RecoverConfig, RecoverReport};
pub use store::{StoreConfig, WalletStore};
pub use types::{BlockHash, KeyId, PubKey, ScriptId, SecretBytes, TxId};
pub use wallet::{AddressBookEntry, Wallet};
