//! Metadata-preserving file transfer.
//!
//! # Overview
//!
//! Copies one source file into a destination directory, retaining the
//! file's original name and preserving permission bits and modification
//! time. The copy is written to a `.partial` sibling first and renamed
//! into place, so a crash or failure mid-write never leaves a torn file
//! under the final name.
//!
//! This replaces the external `rsync` invocation a shell-era version of
//! this tool would use: errors come back as structured values instead of
//! text scraped from a subprocess.

use std::fs;
use std::path::{Path, PathBuf};

use filetime::FileTime;

/// Errors that can occur while copying a file.
#[derive(thiserror::Error, Debug)]
pub enum TransferError {
    /// The source file disappeared between discovery and copy.
    #[error("Source file vanished: {0}")]
    SourceVanished(PathBuf),

    /// Permission was denied reading the source or writing the destination.
    #[error("Permission denied: {0}")]
    PermissionDenied(PathBuf),

    /// The source path has no file name component.
    #[error("Source path has no file name: {0}")]
    NoFileName(PathBuf),

    /// An I/O error occurred during the copy.
    #[error("I/O error for {path}: {source}")]
    Io {
        /// Path where the error occurred
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },
}

/// Copy `source` into `dest_dir`, preserving metadata.
///
/// Creates `dest_dir` and all missing ancestors. Returns the final
/// destination path on success.
///
/// # Errors
///
/// Returns [`TransferError`] on any failure; in that case no file exists
/// under the final destination name (the temporary `.partial` file is
/// removed on a best-effort basis) and the caller must not register
/// anything in the destination index.
pub fn copy_file(source: &Path, dest_dir: &Path) -> Result<PathBuf, TransferError> {
    let file_name = source
        .file_name()
        .ok_or_else(|| TransferError::NoFileName(source.to_path_buf()))?;

    fs::create_dir_all(dest_dir).map_err(|e| map_error(dest_dir, e))?;

    let dest_path = dest_dir.join(file_name);
    let partial_path = dest_dir.join(format!(".{}.partial", file_name.to_string_lossy()));

    let result = copy_via_partial(source, &partial_path, &dest_path);
    if result.is_err() {
        let _ = fs::remove_file(&partial_path);
    }
    result?;

    log::debug!(
        "Copied {} -> {}",
        source.display(),
        dest_path.display()
    );
    Ok(dest_path)
}

/// Write the temporary copy, apply metadata, and rename into place.
fn copy_via_partial(
    source: &Path,
    partial_path: &Path,
    dest_path: &Path,
) -> Result<(), TransferError> {
    let metadata = fs::metadata(source).map_err(|e| map_source_error(source, e))?;

    fs::copy(source, partial_path).map_err(|e| map_source_error(source, e))?;

    // fs::copy carries permission bits; modification time needs filetime.
    let mtime = FileTime::from_last_modification_time(&metadata);
    filetime::set_file_mtime(partial_path, mtime).map_err(|e| map_error(partial_path, e))?;

    fs::rename(partial_path, dest_path).map_err(|e| map_error(dest_path, e))?;
    Ok(())
}

/// Map an I/O error on the source side, distinguishing a vanished file.
fn map_source_error(source: &Path, error: std::io::Error) -> TransferError {
    use std::io::ErrorKind;

    match error.kind() {
        ErrorKind::NotFound => TransferError::SourceVanished(source.to_path_buf()),
        ErrorKind::PermissionDenied => TransferError::PermissionDenied(source.to_path_buf()),
        _ => TransferError::Io {
            path: source.to_path_buf(),
            source: error,
        },
    }
}

/// Map an I/O error on the destination side.
fn map_error(path: &Path, error: std::io::Error) -> TransferError {
    use std::io::ErrorKind;

    match error.kind() {
        ErrorKind::PermissionDenied => TransferError::PermissionDenied(path.to_path_buf()),
        _ => TransferError::Io {
            path: path.to_path_buf(),
            source: error,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;
    use tempfile::TempDir;

    #[test]
    fn test_copy_creates_missing_ancestors() {
        let src_dir = TempDir::new().unwrap();
        let dst_dir = TempDir::new().unwrap();

        let source = src_dir.path().join("photo.jpg");
        File::create(&source).unwrap().write_all(b"pixels").unwrap();

        let target = dst_dir.path().join("2024").join("May");
        let dest = copy_file(&source, &target).unwrap();

        assert_eq!(dest, target.join("photo.jpg"));
        assert_eq!(fs::read(&dest).unwrap(), b"pixels");
    }

    #[test]
    fn test_copy_preserves_mtime() {
        let src_dir = TempDir::new().unwrap();
        let dst_dir = TempDir::new().unwrap();

        let source = src_dir.path().join("old.jpg");
        File::create(&source).unwrap().write_all(b"vintage").unwrap();
        let past = FileTime::from_unix_time(1_000_000_000, 0);
        filetime::set_file_mtime(&source, past).unwrap();

        let dest = copy_file(&source, dst_dir.path()).unwrap();

        let dest_mtime = FileTime::from_last_modification_time(&fs::metadata(&dest).unwrap());
        assert_eq!(dest_mtime.unix_seconds(), past.unix_seconds());
    }

    #[test]
    fn test_copy_missing_source_is_vanished() {
        let dst_dir = TempDir::new().unwrap();

        let err = copy_file(Path::new("/nonexistent/gone.jpg"), dst_dir.path()).unwrap_err();
        assert!(matches!(err, TransferError::SourceVanished(_)));
    }

    #[test]
    fn test_failed_copy_leaves_no_partial() {
        let dst_dir = TempDir::new().unwrap();

        let _ = copy_file(Path::new("/nonexistent/gone.jpg"), dst_dir.path());

        let leftovers: Vec<_> = fs::read_dir(dst_dir.path()).unwrap().collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn test_copy_keeps_original_name() {
        let src_dir = TempDir::new().unwrap();
        let dst_dir = TempDir::new().unwrap();

        let source = src_dir.path().join("IMG_0042.HEIC");
        File::create(&source).unwrap().write_all(b"raw").unwrap();

        let dest = copy_file(&source, dst_dir.path()).unwrap();
        assert_eq!(dest.file_name().unwrap(), "IMG_0042.HEIC");
    }
}
