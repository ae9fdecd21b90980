//! mediamirror - Deduplication-Aware Incremental Media Backup
//!
//! A cross-platform Rust CLI that mirrors a source media tree into a
//! destination directory, skipping files whose content (BLAKE3 digest)
//! already exists anywhere under the destination. A run-scoped content
//! index makes the second run of an unchanged tree copy nothing.

pub mod backup;
pub mod cli;
pub mod config;
pub mod dedup;
pub mod discover;
pub mod error;
pub mod logging;
pub mod progress;
pub mod scanner;
pub mod signal;

use std::sync::Arc;

use anyhow::{Context, Result};
use serde::Serialize;

use crate::backup::BackupEngine;
use crate::cli::{BackupArgs, Cli, Commands, IndexArgs, OutputFormat};
use crate::config::{BackupConfig, UserDefaults};
use crate::dedup::{DestinationIndex, IndexConfig};
use crate::error::ExitCode;
use crate::progress::Progress;
use crate::scanner::{Hasher, WalkerConfig};

/// Run the application with parsed CLI arguments.
///
/// Initializes logging, dispatches the subcommand, and maps the outcome
/// to an [`ExitCode`]. Per-file errors never change the exit code; only
/// fatal startup failures do.
///
/// # Errors
///
/// Returns an error for fatal startup conditions (missing source root,
/// unmounted destination, undiscoverable originals folder).
pub fn run_app(cli: Cli) -> Result<ExitCode> {
    logging::init_logging(cli.verbose, cli.quiet);

    match cli.command {
        Commands::Backup(args) => run_backup(&args, cli.quiet),
        Commands::Index(args) => run_index(&args, cli.quiet),
    }
}

/// Execute the backup subcommand.
fn run_backup(args: &BackupArgs, quiet: bool) -> Result<ExitCode> {
    let source_root = if args.library {
        discover::locate_originals(&args.source)?
    } else {
        args.source.clone()
    };

    let walker_config = WalkerConfig {
        skip_hidden: args.skip_hidden,
        ignore_patterns: args.ignore_patterns.clone(),
    };
    let mut config = UserDefaults::load()
        .apply_to(BackupConfig::default())
        .with_io_threads(args.io_threads)
        .with_walker_config(walker_config);
    if !args.extensions.is_empty() {
        config = config.with_extensions(&args.extensions);
    }

    let mut engine = BackupEngine::new(config);

    match signal::install_handler() {
        Ok(handler) => engine = engine.with_shutdown_flag(handler.get_flag()),
        Err(e) => log::warn!("Failed to install Ctrl+C handler: {}", e),
    }

    let show_progress = !quiet && args.output == OutputFormat::Text;
    engine = engine.with_progress_callback(Arc::new(Progress::new(!show_progress)));

    let stats = engine
        .run(&source_root, &args.destination)
        .context("Backup failed")?;

    match args.output {
        OutputFormat::Text => {
            println!(
                "Backup complete: {} copied ({}), {} skipped, {} errors, {} total, {:.2}s",
                stats.copied_files,
                stats.bytes_copied_display(),
                stats.skipped_files,
                stats.error_files,
                stats.total_files,
                stats.elapsed_seconds
            );
            if stats.error_files > 0 {
                println!(
                    "{} files failed; run with -v and check the log for details",
                    stats.error_files
                );
            }
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }
    }

    Ok(if stats.interrupted {
        ExitCode::Interrupted
    } else {
        ExitCode::Success
    })
}

/// Report produced by the index subcommand.
#[derive(Debug, Serialize)]
struct IndexReport {
    /// Number of distinct content digests in the destination
    entries: usize,
    /// Number of destination files successfully hashed
    indexed_files: usize,
    /// Number of destination files that could not be hashed
    failed_files: usize,
    /// Build duration in seconds
    build_seconds: f64,
}

/// Execute the index subcommand.
fn run_index(args: &IndexArgs, quiet: bool) -> Result<ExitCode> {
    discover::check_mount(&args.destination)?;

    let mut index_config = IndexConfig::default()
        .with_io_threads(args.io_threads.max(1))
        .with_walker_config(WalkerConfig {
            skip_hidden: args.skip_hidden,
            ignore_patterns: Vec::new(),
        });

    match signal::install_handler() {
        Ok(handler) => index_config = index_config.with_shutdown_flag(handler.get_flag()),
        Err(e) => log::warn!("Failed to install Ctrl+C handler: {}", e),
    }

    let show_progress = !quiet && args.output == OutputFormat::Text;
    index_config = index_config.with_progress_callback(Arc::new(Progress::new(!show_progress)));

    let (index, stats) = DestinationIndex::build(&args.destination, &Hasher::new(), &index_config);

    let report = IndexReport {
        entries: index.len(),
        indexed_files: stats.indexed_files,
        failed_files: stats.failed_files,
        build_seconds: stats.build_duration.as_secs_f64(),
    };

    match args.output {
        OutputFormat::Text => {
            println!(
                "Destination index: {} entries ({} files hashed, {} unreadable), {:.2}s",
                report.entries, report.indexed_files, report.failed_files, report.build_seconds
            );
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
    }

    Ok(if stats.interrupted {
        ExitCode::Interrupted
    } else {
        ExitCode::Success
    })
}
