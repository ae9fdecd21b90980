//! Command-line interface definitions.
//!
//! All CLI arguments, subcommands, and options using the clap derive API.
//! Global options (verbosity, color) sit on the top-level struct; each
//! operation is a subcommand.
//!
//! # Example
//!
//! ```bash
//! # Mirror a media tree
//! mediamirror backup ~/Pictures/export /Volumes/Backup/Pictures
//!
//! # Back up a photo library bundle (probes its originals folder)
//! mediamirror backup --library "~/Pictures/Photos Library.photoslibrary" /Volumes/Backup
//!
//! # Restrict to specific extensions, machine-readable summary
//! mediamirror backup src dst -e jpg -e heic --output json
//!
//! # Inspect the destination index only
//! mediamirror index /Volumes/Backup/Pictures
//! ```

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Deduplication-aware incremental media backup.
///
/// mediamirror mirrors a source media tree into a destination directory,
/// skipping any file whose content (BLAKE3 digest) already exists anywhere
/// under the destination.
#[derive(Debug, Parser)]
#[command(name = "mediamirror")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase verbosity level (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true, env = "NO_COLOR")]
    pub no_color: bool,

    /// Emit startup errors as JSON on stderr
    #[arg(long, global = true)]
    pub json_errors: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Mirror a source media tree into a destination directory
    Backup(BackupArgs),
    /// Build and report the destination content index without copying
    Index(IndexArgs),
}

/// Arguments for the backup subcommand.
#[derive(Debug, Args)]
pub struct BackupArgs {
    /// Source directory to mirror (or a library bundle with --library)
    #[arg(value_name = "SOURCE")]
    pub source: PathBuf,

    /// Destination root; must already exist (mounted)
    #[arg(value_name = "DEST")]
    pub destination: PathBuf,

    /// Treat SOURCE as a photo-library bundle and locate its originals folder
    #[arg(long)]
    pub library: bool,

    /// File extension to mirror (can be specified multiple times)
    ///
    /// Overrides the default media allow-list. Case-insensitive; the
    /// leading dot is optional.
    #[arg(short = 'e', long = "extension", value_name = "EXT")]
    pub extensions: Vec<String>,

    /// Glob patterns to ignore during traversal (can be specified multiple times)
    #[arg(short = 'i', long = "ignore", value_name = "PATTERN")]
    pub ignore_patterns: Vec<String>,

    /// Skip hidden files and directories (starting with .)
    #[arg(long)]
    pub skip_hidden: bool,

    /// Number of I/O threads for destination hashing (default: 4)
    ///
    /// Lower values reduce disk thrashing on HDDs.
    #[arg(long, value_name = "N", default_value = "4")]
    pub io_threads: usize,

    /// Output format for the run summary
    #[arg(short, long, value_enum, default_value = "text")]
    pub output: OutputFormat,
}

/// Arguments for the index subcommand.
#[derive(Debug, Args)]
pub struct IndexArgs {
    /// Destination root to index
    #[arg(value_name = "DEST")]
    pub destination: PathBuf,

    /// Number of I/O threads for hashing (default: 4)
    #[arg(long, value_name = "N", default_value = "4")]
    pub io_threads: usize,

    /// Skip hidden files and directories (starting with .)
    #[arg(long)]
    pub skip_hidden: bool,

    /// Output format for the index report
    #[arg(short, long, value_enum, default_value = "text")]
    pub output: OutputFormat,
}

/// Output format for summaries and reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text
    Text,
    /// JSON for scripting
    Json,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}
