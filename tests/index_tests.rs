use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

use tempfile::TempDir;

use mediamirror::dedup::{DestinationIndex, IndexConfig};
use mediamirror::scanner::{Hasher, WalkerConfig};

fn write_file(path: &Path, content: &[u8]) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    File::create(path).unwrap().write_all(content).unwrap();
}

#[test]
fn test_index_covers_nested_tree() {
    let dest = TempDir::new().unwrap();
    write_file(&dest.path().join("2023/a.jpg"), b"A");
    write_file(&dest.path().join("2024/05/b.jpg"), b"BB");
    write_file(&dest.path().join("c.mov"), b"CCC");

    let (index, stats) =
        DestinationIndex::build(dest.path(), &Hasher::new(), &IndexConfig::default());

    assert_eq!(index.len(), 3);
    assert_eq!(stats.indexed_files, 3);
    assert!(index.has_size(1));
    assert!(index.has_size(2));
    assert!(index.has_size(3));
}

#[test]
fn test_index_collapses_identical_content() {
    let dest = TempDir::new().unwrap();
    write_file(&dest.path().join("one.jpg"), b"same");
    write_file(&dest.path().join("two.jpg"), b"same");
    write_file(&dest.path().join("three.jpg"), b"other");

    let (index, stats) =
        DestinationIndex::build(dest.path(), &Hasher::new(), &IndexConfig::default());

    // Two files share a digest: one mapping, both hashed.
    assert_eq!(index.len(), 2);
    assert_eq!(stats.indexed_files, 3);
}

#[test]
#[cfg(unix)]
fn test_index_excludes_symlinks() {
    use std::os::unix::fs::symlink;

    let dest = TempDir::new().unwrap();
    write_file(&dest.path().join("real.jpg"), b"real content");
    symlink(dest.path().join("real.jpg"), dest.path().join("alias.jpg")).unwrap();

    let (index, stats) =
        DestinationIndex::build(dest.path(), &Hasher::new(), &IndexConfig::default());

    assert_eq!(index.len(), 1);
    assert_eq!(stats.indexed_files, 1);
}

#[test]
fn test_index_respects_hidden_filter() {
    let dest = TempDir::new().unwrap();
    write_file(&dest.path().join("visible.jpg"), b"shown");
    write_file(&dest.path().join(".thumbnails/tiny.jpg"), b"hidden");

    let config = IndexConfig::default().with_walker_config(WalkerConfig {
        skip_hidden: true,
        ignore_patterns: Vec::new(),
    });
    let (index, _) = DestinationIndex::build(dest.path(), &Hasher::new(), &config);

    assert_eq!(index.len(), 1);
}

#[test]
fn test_index_single_threaded_build_matches_parallel() {
    let dest = TempDir::new().unwrap();
    for i in 0..20 {
        write_file(
            &dest.path().join(format!("photo_{i:02}.jpg")),
            format!("content {i}").as_bytes(),
        );
    }

    let hasher = Hasher::new();
    let (serial, _) =
        DestinationIndex::build(dest.path(), &hasher, &IndexConfig::default().with_io_threads(1));
    let (parallel, _) =
        DestinationIndex::build(dest.path(), &hasher, &IndexConfig::default().with_io_threads(8));

    assert_eq!(serial.len(), parallel.len());
    for i in 0..20 {
        let digest = *blake3::hash(format!("content {i}").as_bytes()).as_bytes();
        assert_eq!(serial.lookup(&digest), parallel.lookup(&digest));
    }
}
