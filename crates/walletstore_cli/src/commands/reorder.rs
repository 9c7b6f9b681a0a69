//! Reorder command implementation.

use std::path::Path;
use walletstore_core::{reorder_transactions, Wallet, WalletStore};
use walletstore_storage::FileEngine;

/// Runs the reorder command.
pub fn run(path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    println!("Reordering transactions in {:?}", path);

    let engine = FileEngine::open(path)?;
    let mut store = WalletStore::new(Box::new(engine));

    let mut wallet = Wallet::new();
    reorder_transactions(&mut store, &mut wallet)?;
    store.flush()?;

    println!(
        "  {} transaction(s) ordered, next position {}",
        wallet.txs.len(),
        wallet.order_pos_next
    );
    println!("✓ Ordering rebuilt");
    Ok(())
}
