//! BLAKE3 file hasher with streaming support.
//!
//! # Overview
//!
//! This module provides the [`Hasher`] struct for computing BLAKE3 hashes
//! of file contents using memory-efficient streaming. Files are read in
//! fixed-size chunks so that multi-gigabyte video files never have to fit
//! in memory.
//!
//! # Example
//!
//! ```no_run
//! use mediamirror::scanner::{hash_to_hex, Hasher};
//! use std::path::Path;
//!
//! let hasher = Hasher::new();
//! let digest = hasher.hash_file(Path::new("movie.mp4")).unwrap();
//! println!("blake3: {}", hash_to_hex(&digest));
//! ```

use std::fs::File;
use std::io::Read;
use std::path::Path;

use super::HashError;

/// Content digest of a file (32-byte BLAKE3 output).
pub type Hash = [u8; 32];

/// Chunk size for streaming reads (64 KiB).
pub const CHUNK_SIZE: usize = 64 * 1024;

/// Convert a hash to its lowercase hex representation.
#[must_use]
pub fn hash_to_hex(hash: &Hash) -> String {
    use std::fmt::Write as _;

    let mut out = String::with_capacity(64);
    for byte in hash {
        let _ = write!(out, "{byte:02x}");
    }
    out
}

/// Streaming BLAKE3 file hasher.
///
/// Stateless and cheap to clone; a single instance can be shared across
/// threads (e.g. the rayon pool used by the destination index build).
#[derive(Debug, Clone, Default)]
pub struct Hasher;

impl Hasher {
    /// Create a new hasher.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Compute the BLAKE3 digest of a file's full content.
    ///
    /// Reads the file in [`CHUNK_SIZE`] chunks; memory usage is constant
    /// regardless of file size.
    ///
    /// # Errors
    ///
    /// Returns [`HashError`] if the file cannot be opened or read
    /// (missing, permission denied, or any other I/O failure). Callers
    /// must treat this as "cannot classify" rather than assuming the
    /// content is unique.
    pub fn hash_file(&self, path: &Path) -> Result<Hash, HashError> {
        let mut file = File::open(path).map_err(|e| Self::map_error(path, e))?;
        let mut hasher = blake3::Hasher::new();
        let mut buffer = vec![0u8; CHUNK_SIZE];

        loop {
            let read = file
                .read(&mut buffer)
                .map_err(|e| Self::map_error(path, e))?;
            if read == 0 {
                break;
            }
            hasher.update(&buffer[..read]);
        }

        Ok(*hasher.finalize().as_bytes())
    }

    /// Map an I/O error to the matching [`HashError`] variant.
    fn map_error(path: &Path, error: std::io::Error) -> HashError {
        use std::io::ErrorKind;

        match error.kind() {
            ErrorKind::NotFound => HashError::NotFound(path.to_path_buf()),
            ErrorKind::PermissionDenied => HashError::PermissionDenied(path.to_path_buf()),
            _ => HashError::Io {
                path: path.to_path_buf(),
                source: error,
            },
        }
    }
}
