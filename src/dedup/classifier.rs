//! Duplicate classification against the destination index.
//!
//! A source file is a duplicate when its content digest already appears in
//! the [`DestinationIndex`]. Size acts as a cheap pre-filter: when no
//! destination file shares the source file's size, the digest cannot be
//! present and the file is classified without hashing a single byte.
//!
//! A hashing failure is NOT silently treated as "unique"; it propagates
//! to the caller, which must count the file as an error. Misclassifying an
//! unreadable file as unique would either duplicate content or, worse,
//! mask data-integrity problems behind an apparently clean run.

use std::path::PathBuf;

use crate::scanner::{FileEntry, HashError, Hasher};

use super::DestinationIndex;

/// Outcome of a duplicate check for one source file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    /// The content already exists in the destination.
    Duplicate {
        /// Destination path holding the identical content
        existing: PathBuf,
    },
    /// The content is not present in the destination.
    Unique,
}

impl Classification {
    /// Check if this classification is a duplicate.
    #[must_use]
    pub fn is_duplicate(&self) -> bool {
        matches!(self, Self::Duplicate { .. })
    }
}

/// Classify a source file against the destination index.
///
/// Algorithm, short-circuiting on the first decisive step:
/// 1. If no destination file has the source file's size, the file is
///    [`Classification::Unique`] and no hashing is needed.
/// 2. Otherwise the source file is hashed once and the digest is looked up
///    in the index.
///
/// # Errors
///
/// Returns [`HashError`] if the source file cannot be read. The caller
/// must surface this as a per-file error rather than assuming uniqueness.
pub fn classify(
    file: &FileEntry,
    index: &DestinationIndex,
    hasher: &Hasher,
) -> Result<Classification, HashError> {
    if !index.has_size(file.size) {
        log::trace!(
            "No destination file of size {}, skipping hash: {}",
            file.size,
            file.path.display()
        );
        return Ok(Classification::Unique);
    }

    let digest = hasher.hash_file(&file.path)?;
    log::trace!(
        "Source digest {}: {}",
        crate::scanner::hash_to_hex(&digest),
        file.path.display()
    );

    match index.lookup(&digest) {
        Some(existing) => {
            log::info!(
                "Duplicate found: {} matches {}",
                file.path.display(),
                existing.display()
            );
            Ok(Classification::Duplicate {
                existing: existing.to_path_buf(),
            })
        }
        None => Ok(Classification::Unique),
    }
}
