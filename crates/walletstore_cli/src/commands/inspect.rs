//! Inspect command implementation.

use std::collections::BTreeMap;
use std::path::Path;
use walletstore_core::record;
use walletstore_storage::{FileEngine, KvEngine};

/// Inspection result.
#[derive(Debug, Default)]
struct InspectResult {
    counts: BTreeMap<String, usize>,
    unknown: usize,
    unreadable: usize,
}

/// Runs the inspect command.
pub fn run(path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    println!("Inspecting wallet store at {:?}", path);
    println!();

    let engine = FileEngine::open(path)?;
    let mut result = InspectResult::default();

    for (key, value) in engine.cursor()? {
        match record::decode_entry(&key, &value) {
            Ok(Some(entry)) => {
                *result
                    .counts
                    .entry(entry.kind().as_str().to_string())
                    .or_default() += 1;
            }
            Ok(None) => result.unknown += 1,
            Err(e) => {
                result.unreadable += 1;
                println!("  ERROR: {}", e);
            }
        }
    }

    for (kind, count) in &result.counts {
        println!("  {:<14} {}", kind, count);
    }
    if result.unknown > 0 {
        println!("  {:<14} {}", "(unknown kind)", result.unknown);
    }
    println!();

    if engine.needs_rewrite()? {
        println!("Store has accumulated waste; consider recovering into a fresh file");
    }

    if result.unreadable == 0 {
        println!("✓ All records decode");
        Ok(())
    } else {
        println!("✗ {} record(s) failed to decode", result.unreadable);
        Err("inspection found unreadable records".into())
    }
}
