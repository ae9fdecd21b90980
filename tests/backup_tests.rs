use std::fs::{self, File};
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use std::sync::Mutex;

use tempfile::TempDir;

use mediamirror::backup::{BackupEngine, BackupEvent, EventSink, RunStats};
use mediamirror::config::BackupConfig;

fn write_file(path: &Path, content: &[u8]) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    File::create(path).unwrap().write_all(content).unwrap();
}

fn run_backup(source: &Path, dest: &Path) -> RunStats {
    BackupEngine::new(BackupConfig::default())
        .run(source, dest)
        .unwrap()
}

fn count_files(root: &Path) -> usize {
    let mut count = 0;
    let mut stack = vec![root.to_path_buf()];
    while let Some(dir) = stack.pop() {
        for entry in fs::read_dir(&dir).unwrap() {
            let entry = entry.unwrap();
            if entry.file_type().unwrap().is_dir() {
                stack.push(entry.path());
            } else {
                count += 1;
            }
        }
    }
    count
}

#[test]
fn test_mixed_tree_scenario() {
    // a.jpg and b.jpg share content X; c.png is unique; d.txt is not media.
    let source = TempDir::new().unwrap();
    let dest = TempDir::new().unwrap();
    write_file(&source.path().join("a.jpg"), b"content X");
    write_file(&source.path().join("b.jpg"), b"content X");
    write_file(&source.path().join("c.png"), b"content Y");
    write_file(&source.path().join("d.txt"), b"content Z");

    let stats = run_backup(source.path(), dest.path());

    assert_eq!(stats.total_files, 4);
    assert_eq!(stats.copied_files, 2);
    assert_eq!(stats.skipped_files, 2);
    assert_eq!(stats.error_files, 0);
    assert_eq!(count_files(dest.path()), 2);
}

#[test]
fn test_idempotence() {
    let source = TempDir::new().unwrap();
    let dest = TempDir::new().unwrap();
    write_file(&source.path().join("a.jpg"), b"photo A");
    write_file(&source.path().join("sub/b.mov"), b"clip B");

    let first = run_backup(source.path(), dest.path());
    assert_eq!(first.copied_files, 2);

    let second = run_backup(source.path(), dest.path());
    assert_eq!(second.copied_files, 0);
    assert_eq!(second.skipped_files, 2);
    assert_eq!(count_files(dest.path()), 2);
}

#[test]
fn test_content_already_present_at_different_path() {
    // Destination already holds content X under an unrelated name/path.
    let source = TempDir::new().unwrap();
    let dest = TempDir::new().unwrap();
    write_file(&source.path().join("a.jpg"), b"content X");
    write_file(&dest.path().join("archive/2019/old_name.jpg"), b"content X");

    let stats = run_backup(source.path(), dest.path());

    assert_eq!(stats.copied_files, 0);
    assert_eq!(stats.skipped_files, 1);
    assert!(!dest.path().join("a.jpg").exists());
}

#[test]
fn test_content_equality_within_run_regardless_of_names() {
    // Identical bytes under two names; only one copy must ever land,
    // and later runs must not re-copy either.
    let source = TempDir::new().unwrap();
    let dest = TempDir::new().unwrap();
    write_file(&source.path().join("x/first.jpg"), b"same pixels");
    write_file(&source.path().join("y/second.jpg"), b"same pixels");

    let stats = run_backup(source.path(), dest.path());

    assert_eq!(stats.copied_files, 1);
    assert_eq!(stats.skipped_files, 1);
    assert_eq!(count_files(dest.path()), 1);

    let again = run_backup(source.path(), dest.path());
    assert_eq!(again.copied_files, 0);
}

#[test]
fn test_extension_filtering() {
    let source = TempDir::new().unwrap();
    let dest = TempDir::new().unwrap();
    write_file(&source.path().join("notes.txt"), b"not media");
    write_file(&source.path().join("photo.jpg"), b"media");

    let stats = run_backup(source.path(), dest.path());

    assert_eq!(stats.copied_files, 1);
    assert_eq!(stats.skipped_files, 1);
    assert!(!dest.path().join("notes.txt").exists());
}

#[test]
fn test_extension_filtering_case_insensitive() {
    let source = TempDir::new().unwrap();
    let dest = TempDir::new().unwrap();
    write_file(&source.path().join("IMG_0042.JPG"), b"upper case");

    let stats = run_backup(source.path(), dest.path());

    assert_eq!(stats.copied_files, 1);
    assert!(dest.path().join("IMG_0042.JPG").exists());
}

#[test]
fn test_relative_paths_mirrored() {
    let source = TempDir::new().unwrap();
    let dest = TempDir::new().unwrap();
    write_file(&source.path().join("2024/05/trip/beach.jpg"), b"sand");

    let stats = run_backup(source.path(), dest.path());

    assert_eq!(stats.copied_files, 1);
    let mirrored = dest.path().join("2024/05/trip/beach.jpg");
    assert!(mirrored.exists());
    assert_eq!(fs::read(&mirrored).unwrap(), b"sand");
}

#[test]
fn test_mtime_preserved_on_copy() {
    use filetime::FileTime;

    let source = TempDir::new().unwrap();
    let dest = TempDir::new().unwrap();
    let src_file = source.path().join("old.jpg");
    write_file(&src_file, b"vintage shot");
    let past = FileTime::from_unix_time(1_262_304_000, 0);
    filetime::set_file_mtime(&src_file, past).unwrap();

    run_backup(source.path(), dest.path());

    let copied = dest.path().join("old.jpg");
    let mtime = FileTime::from_last_modification_time(&fs::metadata(&copied).unwrap());
    assert_eq!(mtime.unix_seconds(), past.unix_seconds());
}

#[test]
#[cfg(unix)]
fn test_partial_failure_isolation() {
    use std::os::unix::fs::PermissionsExt;

    let source = TempDir::new().unwrap();
    let dest = TempDir::new().unwrap();
    write_file(&source.path().join("a.jpg"), b"file A");
    let locked = source.path().join("b.jpg");
    write_file(&locked, b"file B");
    write_file(&source.path().join("c.jpg"), b"file C");

    fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();
    if File::open(&locked).is_ok() {
        // Running as root: permission bits are not enforced, nothing to test.
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o644)).unwrap();
        return;
    }

    let stats = run_backup(source.path(), dest.path());
    fs::set_permissions(&locked, fs::Permissions::from_mode(0o644)).unwrap();

    assert_eq!(stats.total_files, 3);
    assert_eq!(stats.copied_files, 2);
    assert_eq!(stats.error_files, 1);
    assert_eq!(stats.skipped_files, 0);
    assert!(dest.path().join("a.jpg").exists());
    assert!(dest.path().join("c.jpg").exists());
    assert!(!dest.path().join("b.jpg").exists());
}

#[test]
#[cfg(unix)]
fn test_classification_failure_is_error_not_skip() {
    use std::os::unix::fs::PermissionsExt;

    // The destination holds a file with the same size as the unreadable
    // source file, so classification must hash the source, which fails.
    let source = TempDir::new().unwrap();
    let dest = TempDir::new().unwrap();
    let locked = source.path().join("cursed.jpg");
    write_file(&locked, b"12345678");
    write_file(&dest.path().join("same_size.jpg"), b"abcdefgh");

    fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();
    if File::open(&locked).is_ok() {
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o644)).unwrap();
        return;
    }

    let stats = run_backup(source.path(), dest.path());
    fs::set_permissions(&locked, fs::Permissions::from_mode(0o644)).unwrap();

    assert_eq!(stats.error_files, 1);
    assert_eq!(stats.copied_files, 0);
    assert_eq!(stats.skipped_files, 0);
    assert!(!dest.path().join("cursed.jpg").exists());
}

#[test]
fn test_custom_extension_allow_list() {
    let source = TempDir::new().unwrap();
    let dest = TempDir::new().unwrap();
    write_file(&source.path().join("shot.dng"), b"raw sensor data");
    write_file(&source.path().join("shot.jpg"), b"developed");

    let config = BackupConfig::default().with_extensions(["dng"]);
    let stats = BackupEngine::new(config)
        .run(source.path(), dest.path())
        .unwrap();

    assert_eq!(stats.copied_files, 1);
    assert!(dest.path().join("shot.dng").exists());
    assert!(!dest.path().join("shot.jpg").exists());
}

/// Event sink that records one tag per event for assertions.
struct CollectingSink(Mutex<Vec<String>>);

impl EventSink for CollectingSink {
    fn on_event(&self, event: &BackupEvent) {
        let tag = match event {
            BackupEvent::SkippedNonMedia { .. } => "non-media",
            BackupEvent::DuplicateFound { .. } => "duplicate",
            BackupEvent::CopySucceeded { .. } => "copied",
            BackupEvent::CopyFailed { .. } => "failed",
        };
        self.0.lock().unwrap().push(tag.to_string());
    }
}

#[test]
fn test_events_emitted_per_file() {
    let source = TempDir::new().unwrap();
    let dest = TempDir::new().unwrap();
    write_file(&source.path().join("a.jpg"), b"content X");
    write_file(&source.path().join("b.jpg"), b"content X");
    write_file(&source.path().join("d.txt"), b"notes");

    let sink = Arc::new(CollectingSink(Mutex::new(Vec::new())));
    let stats = BackupEngine::new(BackupConfig::default())
        .with_event_sink(sink.clone())
        .run(source.path(), dest.path())
        .unwrap();

    assert_eq!(stats.total_files, 3);

    let mut tags = sink.0.lock().unwrap().clone();
    tags.sort();
    assert_eq!(tags, vec!["copied", "duplicate", "non-media"]);
}

#[test]
fn test_empty_source_tree() {
    let source = TempDir::new().unwrap();
    let dest = TempDir::new().unwrap();

    let stats = run_backup(source.path(), dest.path());

    assert_eq!(stats.total_files, 0);
    assert_eq!(stats.copied_files, 0);
    assert_eq!(stats.skipped_files, 0);
}

#[test]
fn test_new_source_file_copied_on_rerun() {
    let source = TempDir::new().unwrap();
    let dest = TempDir::new().unwrap();
    write_file(&source.path().join("a.jpg"), b"first");

    run_backup(source.path(), dest.path());

    write_file(&source.path().join("b.jpg"), b"second");
    let stats = run_backup(source.path(), dest.path());

    assert_eq!(stats.copied_files, 1);
    assert_eq!(stats.skipped_files, 1);
    assert_eq!(count_files(dest.path()), 2);
}
