//! Run-scoped content index of the destination tree.
//!
//! # Overview
//!
//! The [`DestinationIndex`] answers one question: "does this content
//! already exist somewhere under the destination root?" It is built once
//! per run by walking the destination tree and hashing every regular file,
//! and it is updated incrementally (one insert per successful copy) while
//! the run proceeds. It is never rebuilt mid-run and never removes
//! entries.
//!
//! Alongside the digest map, the index keeps a per-size file count built
//! during the same walk. The duplicate classifier uses it as a cheap
//! pre-filter: a source file whose size matches no destination file can
//! be classified without hashing anything.
//!
//! Destination files that cannot be hashed are counted and logged but
//! simply absent from the index: a missing entry fails toward copying,
//! never toward skipping.
//!
//! # Example
//!
//! ```no_run
//! use mediamirror::dedup::{DestinationIndex, IndexConfig};
//! use mediamirror::scanner::Hasher;
//! use std::path::Path;
//!
//! let hasher = Hasher::new();
//! let (index, stats) =
//!     DestinationIndex::build(Path::new("/backup"), &hasher, &IndexConfig::default());
//! println!("{} entries, {} unreadable", index.len(), stats.failed_files);
//! ```

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use rayon::prelude::*;

use crate::progress::ProgressCallback;
use crate::scanner::{FileEntry, Hash, HashError, Hasher, ScanError, Walker, WalkerConfig};

/// Configuration for the destination index build.
#[derive(Clone, Default)]
pub struct IndexConfig {
    /// Number of I/O threads for parallel hashing.
    /// Zero means "one per core" (rayon's default).
    pub io_threads: usize,
    /// Walker configuration for the destination traversal.
    pub walker_config: WalkerConfig,
    /// Optional shutdown flag for graceful termination.
    pub shutdown_flag: Option<Arc<AtomicBool>>,
    /// Optional progress callback.
    pub progress_callback: Option<Arc<dyn ProgressCallback>>,
}

impl std::fmt::Debug for IndexConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IndexConfig")
            .field("io_threads", &self.io_threads)
            .field("walker_config", &self.walker_config)
            .field("shutdown_flag", &self.shutdown_flag)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<callback>"),
            )
            .finish()
    }
}

impl IndexConfig {
    /// Create a new configuration with custom I/O thread count.
    #[must_use]
    pub fn with_io_threads(mut self, threads: usize) -> Self {
        self.io_threads = threads;
        self
    }

    /// Set the walker configuration.
    #[must_use]
    pub fn with_walker_config(mut self, config: WalkerConfig) -> Self {
        self.walker_config = config;
        self
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

    /// Check if shutdown has been requested.
    fn is_shutdown_requested(&self) -> bool {
        self.shutdown_flag
            .as_ref()
            .is_some_and(|f| f.load(Ordering::SeqCst))
    }
}

/// Statistics from the index build.
#[derive(Debug, Default)]
pub struct IndexStats {
    /// Number of destination files successfully hashed and indexed
    pub indexed_files: usize,
    /// Number of destination files that failed to hash
    pub failed_files: usize,
    /// Hashing errors encountered during the build
    pub errors: Vec<HashError>,
    /// Traversal errors encountered during the build
    pub scan_errors: Vec<ScanError>,
    /// Duration of the build
    pub build_duration: std::time::Duration,
    /// Whether the build was interrupted by shutdown
    pub interrupted: bool,
}

/// Content-addressed index of the destination tree.
///
/// Maps content digest to a destination path holding that content.
/// Invariant: every key is the digest of the file at its mapped path, as
/// of the last time that path was hashed or written by this run. When two
/// destination files share a digest, the later one encountered wins; only
/// presence-of-digest is ever queried, so the choice of path does not
/// affect classification.
#[derive(Debug, Default)]
pub struct DestinationIndex {
    /// digest -> destination path holding that content
    digests: HashMap<Hash, PathBuf>,
    /// file size -> number of destination files with that size
    sizes: HashMap<u64, usize>,
}

impl DestinationIndex {
    /// Create an empty index.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the index by walking and hashing the destination tree.
    ///
    /// Hashing runs on a rayon pool bounded by `config.io_threads`, but
    /// this function returns only after every insertion is visible; no
    /// classification query observes a partially built index.
    ///
    /// Walk order is preserved when resolving digest collisions, so the
    /// build behaves exactly like a sequential last-write-wins pass.
    pub fn build(root: &Path, hasher: &Hasher, config: &IndexConfig) -> (Self, IndexStats) {
        let start = std::time::Instant::now();
        let mut stats = IndexStats::default();

        let mut walker = Walker::new(root, config.walker_config.clone());
        if let Some(ref flag) = config.shutdown_flag {
            walker = walker.with_shutdown_flag(flag.clone());
        }

        let mut entries: Vec<FileEntry> = Vec::new();
        for result in walker.walk() {
            match result {
                Ok(entry) => entries.push(entry),
                Err(e) => {
                    log::warn!("Destination scan error: {}", e);
                    stats.scan_errors.push(e);
                }
            }
        }

        log::info!(
            "Indexing {} destination files under {}",
            entries.len(),
            root.display()
        );

        if let Some(ref callback) = config.progress_callback {
            callback.on_phase_start("indexing", entries.len());
        }

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(config.io_threads)
            .build()
            .unwrap_or_else(|_| {
                log::warn!(
                    "Failed to create custom thread pool, using global pool with {} threads",
                    rayon::current_num_threads()
                );
                rayon::ThreadPoolBuilder::new().build().unwrap()
            });

        // Indexed parallel iterator: collect preserves walk order, which
        // keeps the last-write-wins rule identical to a sequential pass.
        let hash_results: Vec<(FileEntry, Option<Result<Hash, HashError>>)> = pool.install(|| {
            entries
                .into_par_iter()
                .enumerate()
                .map(|(idx, entry)| {
                    if config.is_shutdown_requested() {
                        return (entry, None);
                    }

                    if let Some(ref callback) = config.progress_callback {
                        callback.on_progress(idx + 1, entry.path.to_string_lossy().as_ref());
                    }

                    let result = hasher.hash_file(&entry.path);
                    (entry, Some(result))
                })
                .collect()
        });

        let mut index = Self::new();
        for (entry, result) in hash_results {
            match result {
                Some(Ok(digest)) => {
                    stats.indexed_files += 1;
                    index.insert(digest, entry.size, entry.path);
                }
                Some(Err(e)) => {
                    log::warn!("Failed to hash destination file: {}", e);
                    stats.failed_files += 1;
                    stats.errors.push(e);
                }
                None => {}
            }
        }

        if config.is_shutdown_requested() {
            stats.interrupted = true;
            log::info!("Index build interrupted by shutdown signal");
        }

        if let Some(ref callback) = config.progress_callback {
            callback.on_phase_end("indexing");
        }

        stats.build_duration = start.elapsed();
        log::info!(
            "Destination index built: {} entries, {} unreadable, {:.2}s",
            index.len(),
            stats.failed_files,
            stats.build_duration.as_secs_f64()
        );

        (index, stats)
    }

    /// Register a digest for a destination path.
    ///
    /// Called once per successful copy so the new content is visible to
    /// every later duplicate check within the same run. Last write wins
    /// when a digest is already present.
    pub fn insert(&mut self, digest: Hash, size: u64, path: PathBuf) {
        self.digests.insert(digest, path);
        *self.sizes.entry(size).or_insert(0) += 1;
    }

    /// Look up the destination path holding the given content, if any.
    #[must_use]
    pub fn lookup(&self, digest: &Hash) -> Option<&Path> {
        self.digests.get(digest).map(PathBuf::as_path)
    }

    /// Check whether any destination file has the given size.
    ///
    /// This is the classifier's cheap pre-filter; it never produces a
    /// false negative for indexed content.
    #[must_use]
    pub fn has_size(&self, size: u64) -> bool {
        self.sizes.contains_key(&size)
    }

    /// Number of distinct digests in the index.
    #[must_use]
    pub fn len(&self) -> usize {
        self.digests.len()
    }

    /// Check if the index is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.digests.is_empty()
    }
}
