//! Startup discovery: destination mount check and photo-library probing.
//!
//! These are the thin collaborators that hand the engine usable roots.
//! They never prompt or retry; a root is either usable now or the run
//! fails fatally.

use std::path::{Path, PathBuf};

use crate::backup::BackupError;

/// Candidate subfolders holding original media inside a photo-library
/// bundle, probed in order.
const ORIGINALS_CANDIDATES: &[&[&str]] = &[&["originals"], &["Masters"], &["resources", "media"]];

/// Verify the destination root exists ("is mounted").
///
/// Subdirectories below the root are created on demand during copying,
/// but the root itself must already be there. A missing root usually
/// means the backup drive is not plugged in, and auto-creating it would
/// silently mirror onto the system disk.
///
/// # Errors
///
/// Returns [`BackupError::DestinationNotMounted`] if the root is absent.
pub fn check_mount(dest_root: &Path) -> Result<(), BackupError> {
    if !dest_root.exists() {
        log::error!("Destination {} is not mounted", dest_root.display());
        return Err(BackupError::DestinationNotMounted(dest_root.to_path_buf()));
    }
    log::info!("Destination {} is mounted", dest_root.display());
    Ok(())
}

/// Locate the folder containing original files inside a library bundle.
///
/// Probes `originals`, `Masters`, and `resources/media` under the bundle
/// root and returns the first existing directory.
///
/// # Errors
///
/// Returns [`BackupError::OriginalsNotFound`] when no candidate exists.
pub fn locate_originals(library_root: &Path) -> Result<PathBuf, BackupError> {
    for components in ORIGINALS_CANDIDATES {
        let mut candidate = library_root.to_path_buf();
        for component in *components {
            candidate.push(component);
        }
        if candidate.is_dir() {
            log::info!("Found originals folder: {}", candidate.display());
            return Ok(candidate);
        }
    }

    log::error!(
        "No accessible originals folder found in {}",
        library_root.display()
    );
    Err(BackupError::OriginalsNotFound(library_root.to_path_buf()))
}
