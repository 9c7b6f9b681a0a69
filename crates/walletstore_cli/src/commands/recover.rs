//! Recover command implementation.

use std::path::Path;
use walletstore_core::{recover, RecoverConfig};
use walletstore_storage::FileEngine;

/// Runs the recover command.
pub fn run(source: &Path, target: &Path, keys_only: bool) -> Result<(), Box<dyn std::error::Error>> {
    if source == target {
        return Err("target must be a different file from the source".into());
    }

    println!("Recovering {:?} into {:?}", source, target);
    if keys_only {
        println!("Keeping key-material records only");
    }
    println!();

    let source_engine = FileEngine::open(source)?;
    let mut target_engine = FileEngine::open(target)?;

    let config = RecoverConfig::new().keys_only(keys_only);
    let report = recover(&source_engine, &mut target_engine, &config)?;

    println!(
        "  recovered: {}, dropped: {}, filtered: {}",
        report.recovered, report.dropped, report.filtered
    );
    println!();

    if report.dropped == 0 {
        println!("✓ Every record was salvaged");
    } else {
        println!("✗ {} record(s) could not be salvaged", report.dropped);
    }
    Ok(())
}
