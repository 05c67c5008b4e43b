//! pkgsync: reconcile a destination package repository with a source.
//!
//! # Usage
//!
//! ```text
//! pkgsync <dest-bucket> <dest-prefix> [dest-region [src-bucket src-prefix [src-region]]]
//!         [--no-remove] [--yes] [--dry-run] [--json] [--diff] [--skip-index]
//!         [--store-root <DIR>] [--config <FILE>]
//! ```
//!
//! Exit status: 0 on success (or when nothing needs doing, or the plan was
//! declined), 1 on any fetch/parse/transfer failure or a declined
//! consistency check, 2 on usage errors.

mod commands;

use std::process::ExitCode;

use clap::Parser;
use colored::Colorize;

use commands::sync::SyncArgs;

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "pkgsync",
    version,
    about = "Reconcile a destination package repository with a source repository",
    long_about = None,
)]
struct Cli {
    #[command(flatten)]
    sync: SyncArgs,
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing();

    match cli.sync.run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{} {err:#}", "error:".red().bold());
            ExitCode::FAILURE
        }
    }
}

/// Progress and warnings go to stderr; stdout carries the plan and summary.
fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
