//! Backup engine: the incremental, deduplication-aware copy pipeline.
//!
//! # Overview
//!
//! The [`BackupEngine`] drives the whole run:
//!
//! 1. **Index** - Walk the destination tree once and hash every file into
//!    the [`DestinationIndex`](crate::dedup::DestinationIndex)
//! 2. **Walk** - Enumerate source files in a stable sorted order
//! 3. **Per file** - Extension filter → duplicate check → copy → index update
//!
//! Each source file's classify→copy→insert sequence completes before the
//! next file begins, so a later file's duplicate check always observes the
//! content written by every earlier copy in the same run.
//!
//! Per-file failures (unreadable source, failed copy) are logged, counted
//! as errors, and never abort the run. Only startup problems (missing
//! source root, unmounted destination) are fatal.
//!
//! # Example
//!
//! ```no_run
//! use mediamirror::backup::BackupEngine;
//! use mediamirror::config::BackupConfig;
//! use std::path::Path;
//!
//! let engine = BackupEngine::new(BackupConfig::default());
//! let stats = engine
//!     .run(Path::new("/photos/originals"), Path::new("/backup"))
//!     .unwrap();
//! println!("{} copied, {} skipped", stats.copied_files, stats.skipped_files);
//! ```

pub mod transfer;

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::Serialize;

use crate::config::BackupConfig;
use crate::dedup::{classify, Classification, DestinationIndex, IndexConfig};
use crate::progress::ProgressCallback;
use crate::scanner::{FileEntry, Hasher, Walker};

pub use transfer::{copy_file, TransferError};

/// Errors that abort a run before (or instead of) any file processing.
#[derive(thiserror::Error, Debug)]
pub enum BackupError {
    /// The source root does not exist or is not readable.
    #[error("Source root not found: {0}")]
    SourceNotFound(PathBuf),

    /// The given path is not a directory.
    #[error("Not a directory: {0}")]
    NotADirectory(PathBuf),

    /// The destination root does not exist (drive not mounted).
    #[error("Destination {0} is not mounted")]
    DestinationNotMounted(PathBuf),

    /// No accessible originals folder was found in the library bundle.
    #[error("No accessible originals folder found in {0}")]
    OriginalsNotFound(PathBuf),

    /// An I/O error occurred during startup.
    #[error("I/O error for {path}: {source}")]
    Io {
        /// Path where the error occurred
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },
}

/// A per-file fact worth logging, rendered by an external reporter.
#[derive(Debug, Clone)]
pub enum BackupEvent {
    /// The file's extension is not on the allow-list.
    SkippedNonMedia {
        /// Source file that was skipped
        source: PathBuf,
    },
    /// The file's content already exists in the destination.
    DuplicateFound {
        /// Source file that was skipped
        source: PathBuf,
        /// Destination path holding the identical content
        existing: PathBuf,
    },
    /// The file was copied and registered in the index.
    CopySucceeded {
        /// Source file that was copied
        source: PathBuf,
        /// Where the copy landed
        destination: PathBuf,
    },
    /// The file could not be classified or copied.
    CopyFailed {
        /// Source file that failed
        source: PathBuf,
        /// Human-readable failure reason
        reason: String,
    },
}

/// Receiver for per-file [`BackupEvent`]s.
///
/// The engine also logs every event through the `log` facade; this trait
/// exists for callers that want the structured facts (tests, alternative
/// reporters).
pub trait EventSink: Send + Sync {
    /// Called once per terminal per-file state.
    fn on_event(&self, event: &BackupEvent);
}

/// Final counters for one backup run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunStats {
    /// Total number of source files examined
    pub total_files: usize,
    /// Number of files copied to the destination
    pub copied_files: usize,
    /// Number of files skipped (non-media or duplicate)
    pub skipped_files: usize,
    /// Number of files that failed (hash or copy error)
    pub error_files: usize,
    /// Total bytes written by successful copies
    pub bytes_copied: u64,
    /// Wall-clock duration of the copy phase, in seconds
    pub elapsed_seconds: f64,
    /// Whether the run was interrupted by a shutdown signal
    pub interrupted: bool,
}

impl RunStats {
    /// Format the copied byte count as a human-readable string.
    #[must_use]
    pub fn bytes_copied_display(&self) -> String {
        bytesize::ByteSize(self.bytes_copied).to_string()
    }
}

/// Deduplication-aware incremental backup engine.
pub struct BackupEngine {
    config: BackupConfig,
    hasher: Hasher,
    shutdown_flag: Option<Arc<AtomicBool>>,
    progress_callback: Option<Arc<dyn ProgressCallback>>,
    event_sink: Option<Arc<dyn EventSink>>,
}

impl BackupEngine {
    /// Create a new engine with the given configuration.
    #[must_use]
    pub fn new(config: BackupConfig) -> Self {
        Self {
            config,
            hasher: Hasher::new(),
            shutdown_flag: None,
            progress_callback: None,
            event_sink: None,
        }
    }

    /// Set the shutdown flag for graceful termination.
    #[must_use]
    pub fn with_shutdown_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.shutdown_flag = Some(flag);
        self
    }

    /// Set the progress callback.
    #[must_use]
    pub fn with_progress_callback(mut self, callback: Arc<dyn ProgressCallback>) -> Self {
        self.progress_callback = Some(callback);
        self
    }

    /// Set the event sink for per-file facts.
    #[must_use]
    pub fn with_event_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.event_sink = Some(sink);
        self
    }

    /// Check if shutdown has been requested.
    fn is_shutdown_requested(&self) -> bool {
        self.shutdown_flag
            .as_ref()
            .is_some_and(|f| f.load(Ordering::SeqCst))
    }

    /// Emit a per-file event to the sink, if any.
    fn emit(&self, event: &BackupEvent) {
        if let Some(ref sink) = self.event_sink {
            sink.on_event(event);
        }
    }

    /// Run the backup: mirror `source_root` into `dest_root`.
    ///
    /// Builds the destination index up front, then processes source files
    /// sequentially in sorted walk order. An interrupted run finishes the
    /// in-flight file, sets [`RunStats::interrupted`], and returns its
    /// partial counters; copies already performed are real.
    ///
    /// # Errors
    ///
    /// Returns [`BackupError`] only for fatal startup conditions; per-file
    /// failures are counted in [`RunStats::error_files`] instead.
    pub fn run(&self, source_root: &Path, dest_root: &Path) -> Result<RunStats, BackupError> {
        if !source_root.exists() {
            return Err(BackupError::SourceNotFound(source_root.to_path_buf()));
        }
        if !source_root.is_dir() {
            return Err(BackupError::NotADirectory(source_root.to_path_buf()));
        }
        crate::discover::check_mount(dest_root)?;

        log::info!(
            "Starting backup: {} -> {}",
            source_root.display(),
            dest_root.display()
        );

        // Phase 1: destination index, fully built before any duplicate check.
        let mut index_config = IndexConfig::default()
            .with_io_threads(self.config.io_threads)
            .with_walker_config(self.config.walker_config.clone());
        if let Some(ref flag) = self.shutdown_flag {
            index_config = index_config.with_shutdown_flag(flag.clone());
        }
        if let Some(ref callback) = self.progress_callback {
            index_config = index_config.with_progress_callback(callback.clone());
        }

        let (mut index, index_stats) =
            DestinationIndex::build(dest_root, &self.hasher, &index_config);

        let mut stats = RunStats::default();
        if index_stats.interrupted {
            stats.interrupted = true;
            return Ok(stats);
        }

        // Phase 2: stable source enumeration.
        let mut walker = Walker::new(source_root, self.config.walker_config.clone());
        if let Some(ref flag) = self.shutdown_flag {
            walker = walker.with_shutdown_flag(flag.clone());
        }

        let mut files: Vec<FileEntry> = Vec::new();
        for result in walker.walk() {
            match result {
                Ok(entry) => files.push(entry),
                Err(e) => {
                    log::warn!("Source scan error: {}", e);
                    stats.total_files += 1;
                    stats.error_files += 1;
                }
            }
        }
        stats.total_files += files.len();

        log::info!("Processing {} source files", files.len());
        if let Some(ref callback) = self.progress_callback {
            callback.on_phase_start("copying", files.len());
        }

        // Phase 3: sequential per-file pipeline.
        let start = std::time::Instant::now();
        for (idx, entry) in files.iter().enumerate() {
            if self.is_shutdown_requested() {
                log::info!("Backup interrupted by shutdown signal");
                stats.interrupted = true;
                break;
            }

            if let Some(ref callback) = self.progress_callback {
                callback.on_progress(idx + 1, entry.path.to_string_lossy().as_ref());
            }

            self.process_file(entry, source_root, dest_root, &mut index, &mut stats);
        }
        stats.elapsed_seconds = start.elapsed().as_secs_f64();

        if let Some(ref callback) = self.progress_callback {
            callback.on_phase_end("copying");
        }

        log::info!(
            "Backup complete: {} copied, {} skipped, {} errors, {} total, {:.2}s",
            stats.copied_files,
            stats.skipped_files,
            stats.error_files,
            stats.total_files,
            stats.elapsed_seconds
        );

        Ok(stats)
    }

    /// Run one source file through the pipeline:
    /// ExtensionFilter → DuplicateCheck → Copy → IndexUpdate.
    fn process_file(
        &self,
        entry: &FileEntry,
        source_root: &Path,
        dest_root: &Path,
        index: &mut DestinationIndex,
        stats: &mut RunStats,
    ) {
        if !self.config.allows_extension(entry.extension().as_deref()) {
            log::debug!("Skipping non-media file: {}", entry.path.display());
            stats.skipped_files += 1;
            self.emit(&BackupEvent::SkippedNonMedia {
                source: entry.path.clone(),
            });
            return;
        }

        match classify(entry, index, &self.hasher) {
            Ok(Classification::Duplicate { existing }) => {
                log::info!("Skipping duplicate: {}", entry.path.display());
                stats.skipped_files += 1;
                self.emit(&BackupEvent::DuplicateFound {
                    source: entry.path.clone(),
                    existing,
                });
            }
            Ok(Classification::Unique) => {
                self.copy_and_register(entry, source_root, dest_root, index, stats);
            }
            Err(e) => {
                log::error!("Cannot classify {}: {}", entry.path.display(), e);
                stats.error_files += 1;
                self.emit(&BackupEvent::CopyFailed {
                    source: entry.path.clone(),
                    reason: e.to_string(),
                });
            }
        }
    }

    /// Copy a unique file to its mirrored path and register its digest.
    fn copy_and_register(
        &self,
        entry: &FileEntry,
        source_root: &Path,
        dest_root: &Path,
        index: &mut DestinationIndex,
        stats: &mut RunStats,
    ) {
        let relative = entry
            .path
            .strip_prefix(source_root)
            .unwrap_or(entry.path.as_path());
        let dest_dir = match relative.parent() {
            Some(parent) if parent != Path::new("") => dest_root.join(parent),
            _ => dest_root.to_path_buf(),
        };

        match transfer::copy_file(&entry.path, &dest_dir) {
            Ok(dest_path) => {
                stats.copied_files += 1;
                stats.bytes_copied += entry.size;

                // Hash the destination side: the index invariant is that
                // every key is the digest of the file at its mapped path.
                match self.hasher.hash_file(&dest_path) {
                    Ok(digest) => index.insert(digest, entry.size, dest_path.clone()),
                    Err(e) => {
                        // Not indexed: a later identical source file would
                        // be copied again, which fails toward copying.
                        log::warn!("Copied but could not index {}: {}", dest_path.display(), e);
                    }
                }

                self.emit(&BackupEvent::CopySucceeded {
                    source: entry.path.clone(),
                    destination: dest_path,
                });
            }
            Err(e) => {
                log::error!("Error copying {}: {}", entry.path.display(), e);
                stats.error_files += 1;
                self.emit(&BackupEvent::CopyFailed {
                    source: entry.path.clone(),
                    reason: e.to_string(),
                });
            }
        }
    }
}
