//! Directory walker implementation using walkdir.
//!
//! # Overview
//!
//! This module provides the [`Walker`] struct for traversing a directory
//! tree and collecting regular files in a stable order. Directory entries
//! are sorted by file name so two walks over an unchanged tree always
//! yield the same sequence; the copy pipeline's duplicate checks depend
//! on that ordering being deterministic.
//!
//! Symbolic links and special files are never yielded; only regular files
//! qualify for mirroring.
//!
//! # Example
//!
//! ```no_run
//! use mediamirror::scanner::{Walker, WalkerConfig};
//! use std::path::Path;
//!
//! let config = WalkerConfig {
//!     skip_hidden: true,
//!     ..Default::default()
//! };
//!
//! let walker = Walker::new(Path::new("/photos"), config);
//! for entry in walker.walk() {
//!     match entry {
//!         Ok(file) => println!("{}: {} bytes", file.path.display(), file.size),
//!         Err(e) => eprintln!("Warning: {}", e),
//!     }
//! }
//! ```

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use ignore::gitignore::{Gitignore, GitignoreBuilder};
use walkdir::WalkDir;

use super::{FileEntry, ScanError, WalkerConfig};

/// Directory walker for stable, sequential file discovery.
#[derive(Debug)]
pub struct Walker {
    /// Root path to walk
    root: PathBuf,
    /// Walker configuration
    config: WalkerConfig,
    /// Optional shutdown flag for graceful termination
    shutdown_flag: Option<Arc<AtomicBool>>,
}

impl Walker {
    /// Create a new walker for the given path.
    #[must_use]
    pub fn new(path: &Path, config: WalkerConfig) -> Self {
        Self {
            root: path.to_path_buf(),
            config,
            shutdown_flag: None,
        }
    }

    /// Set the shutdown flag for graceful termination.
    ///
    /// When the flag is set to `true`, the walker stops yielding entries
    /// as soon as possible. This allows for clean Ctrl+C handling.
    #[must_use]
    pub fn with_shutdown_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.shutdown_flag = Some(flag);
        self
    }

    /// Check if shutdown has been requested.
    fn is_shutdown_requested(&self) -> bool {
        self.shutdown_flag
            .as_ref()
            .is_some_and(|f| f.load(Ordering::SeqCst))
    }

    /// Build a gitignore matcher from config patterns.
    fn build_gitignore(&self) -> Option<Gitignore> {
        if self.config.ignore_patterns.is_empty() {
            return None;
        }

        let mut builder = GitignoreBuilder::new(&self.root);
        for pattern in &self.config.ignore_patterns {
            if let Err(e) = builder.add_line(None, pattern) {
                log::warn!("Invalid ignore pattern '{}': {}", pattern, e);
            }
        }

        match builder.build() {
            Ok(gitignore) if !gitignore.is_empty() => Some(gitignore),
            Ok(_) => None,
            Err(e) => {
                log::warn!("Failed to build ignore patterns: {}", e);
                None
            }
        }
    }

    /// Check if a path should be ignored based on configured patterns.
    fn should_ignore(&self, path: &Path, is_dir: bool, gitignore: &Option<Gitignore>) -> bool {
        if let Some(gi) = gitignore {
            // Gitignore matching expects paths relative to the root and
            // forward slashes even on Windows.
            let relative_path = path.strip_prefix(&self.root).unwrap_or(path);
            let path_str = relative_path.to_string_lossy();
            let normalized_path = if cfg!(windows) {
                path_str.replace('\\', "/")
            } else {
                path_str.into_owned()
            };

            gi.matched(normalized_path, is_dir).is_ignore()
        } else {
            false
        }
    }

    /// Walk the directory tree, yielding regular files in sorted order.
    ///
    /// Returns an iterator over [`FileEntry`] results. Errors are yielded
    /// as [`ScanError`] values rather than stopping iteration; one
    /// unreadable subtree must not abort the whole walk.
    pub fn walk(&self) -> impl Iterator<Item = Result<FileEntry, ScanError>> + '_ {
        let gitignore = self.build_gitignore();
        let skip_hidden = self.config.skip_hidden;

        WalkDir::new(&self.root)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(move |entry| {
                // The root itself is always kept, whatever it is named.
                if entry.depth() == 0 {
                    return true;
                }
                if skip_hidden {
                    let hidden = entry
                        .file_name()
                        .to_str()
                        .is_some_and(|name| name.starts_with('.'));
                    if hidden {
                        return false;
                    }
                }
                true
            })
            .filter_map(move |entry_result| {
                if self.is_shutdown_requested() {
                    log::debug!("Walker: shutdown requested, stopping iteration");
                    return None;
                }

                match entry_result {
                    Ok(entry) => {
                        let path = entry.path();

                        // Skip the root directory itself
                        if entry.depth() == 0 {
                            return None;
                        }

                        let file_type = entry.file_type();
                        if file_type.is_dir() {
                            return None;
                        }

                        // Symlinks and special files are excluded outright
                        if !file_type.is_file() {
                            log::trace!("Skipping non-regular file: {}", path.display());
                            return None;
                        }

                        if self.should_ignore(path, false, &gitignore) {
                            log::trace!("Ignoring file: {}", path.display());
                            return None;
                        }

                        match entry.metadata() {
                            Ok(metadata) => {
                                Some(Ok(FileEntry::new(path.to_path_buf(), metadata.len())))
                            }
                            Err(e) => Some(Err(Self::map_walkdir_error(path.to_path_buf(), e))),
                        }
                    }
                    Err(e) => {
                        let path = e
                            .path()
                            .map_or_else(|| self.root.clone(), Path::to_path_buf);
                        Some(Err(Self::map_walkdir_error(path, e)))
                    }
                }
            })
    }

    /// Convert a walkdir error to a [`ScanError`].
    fn map_walkdir_error(path: PathBuf, error: walkdir::Error) -> ScanError {
        use std::io::ErrorKind;

        match error.io_error().map(std::io::Error::kind) {
            Some(ErrorKind::PermissionDenied) => {
                log::warn!("Permission denied: {}", path.display());
                ScanError::PermissionDenied(path)
            }
            Some(ErrorKind::NotFound) => {
                log::debug!("File not found (may have been deleted): {}", path.display());
                ScanError::NotFound(path)
            }
            _ => {
                log::warn!("Walker error for {}: {}", path.display(), error);
                ScanError::Io {
                    path,
                    source: error
                        .into_io_error()
                        .unwrap_or_else(|| std::io::Error::other("walk error")),
                }
            }
        }
    }
}
