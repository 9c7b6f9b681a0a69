//! Walletstore CLI
//!
//! Command-line tools for wallet store maintenance.
//!
//! # Commands
//!
//! - `inspect` - Display per-kind record counts and corruption summary
//! - `recover` - Rebuild a wallet file from whatever records still validate
//! - `reorder` - Rebuild the explicit transaction ordering
//! - `version` - Show version information

mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Walletstore command-line maintenance tools.
#[derive(Parser)]
#[command(name = "walletstore")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Display per-kind record counts and corruption summary
    Inspect {
        /// Path to the wallet file
        path: PathBuf,
    },

    /// Rebuild a wallet file from whatever records still validate
    Recover {
        /// Path to the damaged wallet file (never modified)
        source: PathBuf,

        /// Path of the fresh wallet file to write
        target: PathBuf,

        /// Keep only key-material records
        #[arg(short, long)]
        keys_only: bool,
    },

    /// Rebuild the explicit transaction ordering
    Reorder {
        /// Path to the wallet file
        path: PathBuf,
    },

    /// Show version information
    Version,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match cli.command {
        Commands::Inspect { path } => commands::inspect::run(&path)?,
        Commands::Recover {
            source,
            target,
            keys_only,
        } => commands::recover::run(&source, &target, keys_only)?,
        Commands::Reorder { path } => commands::reorder::run(&path)?,
        Commands::Version => {
            println!("walletstore v{}", env!("CARGO_PKG_VERSION"));
            println!("supported store version {}", walletstore_core::STORE_VERSION);
        }
    }

    Ok(())
}
