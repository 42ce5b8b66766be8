//! End-to-end sync command integration tests.
//!
//! First sync, idempotent re-runs, updates and deletes, dry-run safety,
//! excludes, and a failed run leaving the recorded state alone.

use filetime::{set_file_mtime, FileTime};
use replik::commands::sync::run_with_logger;
use replik::diff::compare_states;
use replik::scanner::scan_directory;
use replik::state::{StateStore, STATE_FILE_NAME};
use replik::{Config, MemoryLogger, SyncAction};
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

fn config_for(source: &Path, destination: &Path) -> Config {
    Config {
        source: source.to_path_buf(),
        destination: destination.to_path_buf(),
        ..Config::default()
    }
}

fn sync(config: &Config) -> replik::commands::sync::SyncSummary {
    run_with_logger(config, Arc::new(MemoryLogger::new())).expect("sync run should succeed")
}

fn push_mtime_forward(path: &Path, seconds: i64) {
    let current = FileTime::from_last_modification_time(&fs::metadata(path).unwrap());
    set_file_mtime(
        path,
        FileTime::from_unix_time(current.unix_seconds() + seconds, current.nanoseconds()),
    )
    .expect("set mtime");
}

#[test]
fn test_first_sync_creates_everything_and_records_state() {
    let src = TempDir::new().expect("create src tempdir");
    let dst = TempDir::new().expect("create dst tempdir");
    fs::write(src.path().join("a.txt"), [b'a'; 100]).expect("write a.txt");
    fs::create_dir(src.path().join("sub")).expect("create sub");

    let summary = sync(&config_for(src.path(), dst.path()));

    assert_eq!(summary.plan.stats.create_count, 2);
    assert_eq!(summary.plan.actions.len(), 2);
    assert!(summary.plan.actions.iter().all(SyncAction::is_create));
    assert_eq!(fs::read(dst.path().join("a.txt")).unwrap(), vec![b'a'; 100]);
    assert!(dst.path().join("sub").is_dir());

    let state = StateStore::new().load(dst.path()).expect("load state");
    let rescanned = scan_directory(src.path(), &[] as &[&str]).unwrap();
    assert_eq!(state.entries, rescanned);
}

#[test]
fn test_second_sync_is_noop_and_destination_matches_state() {
    let src = TempDir::new().expect("create src tempdir");
    let dst = TempDir::new().expect("create dst tempdir");
    fs::create_dir_all(src.path().join("nested/deeper")).unwrap();
    fs::write(src.path().join("root.txt"), b"root-content").unwrap();
    fs::write(src.path().join("nested/inner.txt"), b"inner-content").unwrap();
    fs::write(src.path().join("nested/deeper/leaf.txt"), b"leaf").unwrap();
    let config = config_for(src.path(), dst.path());

    sync(&config);
    let second = sync(&config);

    assert!(second.plan.is_noop());
    assert!(second.plan.actions.iter().all(SyncAction::is_skip));

    // The destination tree itself reads back as unchanged against the record.
    let state = StateStore::new().load(dst.path()).unwrap();
    let destination = scan_directory(dst.path(), &[] as &[&str]).unwrap();
    let actions = compare_states(&destination, &state.entries);
    assert!(
        actions.iter().all(SyncAction::is_skip),
        "destination drifted from state: {:?}",
        actions
    );
}

#[test]
fn test_sync_propagates_updates_and_deletes() {
    let src = TempDir::new().expect("create src tempdir");
    let dst = TempDir::new().expect("create dst tempdir");
    fs::create_dir(src.path().join("old")).unwrap();
    fs::write(src.path().join("old/gone.txt"), b"bye").unwrap();
    fs::write(src.path().join("edit.txt"), b"v1").unwrap();
    let config = config_for(src.path(), dst.path());
    sync(&config);

    fs::remove_dir_all(src.path().join("old")).unwrap();
    fs::write(src.path().join("edit.txt"), b"version two").unwrap();
    push_mtime_forward(&src.path().join("edit.txt"), 10);

    let summary = sync(&config);

    assert_eq!(summary.plan.stats.update_count, 1);
    assert_eq!(summary.plan.stats.delete_count, 2);
    assert_eq!(
        fs::read(dst.path().join("edit.txt")).unwrap(),
        b"version two"
    );
    assert!(!dst.path().join("old").exists());

    let state = StateStore::new().load(dst.path()).unwrap();
    assert!(!state.entries.contains("old/gone.txt"));
    assert_eq!(state.entries.get("edit.txt").map(|e| e.size), Some(11));
}

#[test]
fn test_directory_replaced_by_file_syncs_and_settles() {
    let src = TempDir::new().expect("create src tempdir");
    let dst = TempDir::new().expect("create dst tempdir");
    fs::create_dir(src.path().join("x")).unwrap();
    fs::write(src.path().join("x/f.txt"), b"inside").unwrap();
    let config = config_for(src.path(), dst.path());
    sync(&config);

    fs::remove_dir_all(src.path().join("x")).unwrap();
    fs::write(src.path().join("x"), b"now a file").unwrap();

    let summary = sync(&config);

    assert_eq!(summary.plan.stats.update_count, 1);
    assert_eq!(summary.plan.stats.delete_count, 1);
    assert_eq!(fs::read(dst.path().join("x")).unwrap(), b"now a file");
    let state = StateStore::new().load(dst.path()).unwrap();
    assert!(!state.entries.contains("x/f.txt"));
    assert!(sync(&config).plan.is_noop());
}

#[test]
fn test_file_replaced_by_directory_syncs() {
    let src = TempDir::new().expect("create src tempdir");
    let dst = TempDir::new().expect("create dst tempdir");
    fs::write(src.path().join("y"), b"plain file").unwrap();
    let config = config_for(src.path(), dst.path());
    sync(&config);

    fs::remove_file(src.path().join("y")).unwrap();
    fs::create_dir(src.path().join("y")).unwrap();
    fs::write(src.path().join("y/g.txt"), b"nested").unwrap();

    sync(&config);

    assert_eq!(fs::read(dst.path().join("y/g.txt")).unwrap(), b"nested");
    assert!(sync(&config).plan.is_noop());
}

#[test]
#[cfg(unix)]
fn test_read_only_file_can_be_updated() {
    use std::os::unix::fs::PermissionsExt;

    let src = TempDir::new().expect("create src tempdir");
    let dst = TempDir::new().expect("create dst tempdir");
    let ro = src.path().join("ro.txt");
    fs::write(&ro, b"v1").unwrap();
    fs::set_permissions(&ro, fs::Permissions::from_mode(0o444)).unwrap();
    let config = config_for(src.path(), dst.path());
    sync(&config);

    fs::set_permissions(&ro, fs::Permissions::from_mode(0o644)).unwrap();
    fs::write(&ro, b"version 2").unwrap();
    fs::set_permissions(&ro, fs::Permissions::from_mode(0o444)).unwrap();
    push_mtime_forward(&ro, 10);

    let summary = sync(&config);

    assert_eq!(summary.plan.stats.update_count, 1);
    assert_eq!(fs::read(dst.path().join("ro.txt")).unwrap(), b"version 2");
    let mode = fs::metadata(dst.path().join("ro.txt"))
        .unwrap()
        .permissions()
        .mode();
    assert_eq!(mode & 0o777, 0o444);
}

#[test]
fn test_sync_dry_run_makes_no_changes() {
    let src = TempDir::new().expect("create src tempdir");
    let dst = TempDir::new().expect("create dst tempdir");
    fs::write(src.path().join("plan.txt"), b"planned").unwrap();
    let config = Config {
        dry_run: true,
        ..config_for(src.path(), dst.path())
    };

    let summary = sync(&config);

    assert!(summary.execution.is_none());
    let report = summary.report.expect("dry run renders a report");
    assert!(report.contains("[CREATE] plan.txt"), "{}", report);
    assert!(!dst.path().join("plan.txt").exists());
    assert!(!dst.path().join(STATE_FILE_NAME).exists());
}

#[test]
fn test_dry_run_after_sync_reports_no_changes() {
    let src = TempDir::new().expect("create src tempdir");
    let dst = TempDir::new().expect("create dst tempdir");
    fs::write(src.path().join("a.txt"), b"a").unwrap();
    sync(&config_for(src.path(), dst.path()));

    let summary = sync(&Config {
        dry_run: true,
        ..config_for(src.path(), dst.path())
    });

    assert!(summary.plan.is_noop());
    assert!(summary.report.unwrap().contains("(no changes)"));
}

#[test]
fn test_sync_respects_exclude_patterns() {
    let src = TempDir::new().expect("create src tempdir");
    let dst = TempDir::new().expect("create dst tempdir");
    fs::create_dir(src.path().join("target")).unwrap();
    fs::write(src.path().join("target/app"), b"binary").unwrap();
    fs::write(src.path().join("scratch.tmp"), b"tmp").unwrap();
    fs::write(src.path().join("keep.txt"), b"keep").unwrap();
    fs::write(src.path().join(".DS_Store"), b"finder").unwrap();
    let config = Config {
        exclude_patterns: vec!["target/".to_string(), "*.tmp".to_string()],
        ..config_for(src.path(), dst.path())
    };

    sync(&config);

    assert!(dst.path().join("keep.txt").exists());
    assert!(!dst.path().join("target").exists());
    assert!(!dst.path().join("scratch.tmp").exists());
    assert!(!dst.path().join(".DS_Store").exists());
    let state = StateStore::new().load(dst.path()).unwrap();
    assert_eq!(state.entries.len(), 1);
}

#[test]
fn test_chunked_copy_through_sync() {
    let src = TempDir::new().expect("create src tempdir");
    let dst = TempDir::new().expect("create dst tempdir");
    let content: Vec<u8> = (0..10_000u32).map(|i| (i % 241) as u8).collect();
    fs::write(src.path().join("big.bin"), &content).unwrap();
    let config = Config {
        chunk_size: 1024,
        ..config_for(src.path(), dst.path())
    };

    let summary = sync(&config);

    assert_eq!(summary.execution.unwrap().bytes_copied, 10_000);
    assert_eq!(fs::read(dst.path().join("big.bin")).unwrap(), content);
    assert!(sync(&config).plan.is_noop());
}

#[test]
#[cfg(unix)]
fn test_failed_sync_keeps_previous_state() {
    use std::os::unix::fs::PermissionsExt;

    let src = TempDir::new().expect("create src tempdir");
    let dst = TempDir::new().expect("create dst tempdir");
    fs::create_dir(src.path().join("locked")).unwrap();
    fs::write(src.path().join("locked/first.txt"), b"first").unwrap();
    let config = config_for(src.path(), dst.path());
    sync(&config);

    let locked = dst.path().join("locked");
    fs::set_permissions(&locked, fs::Permissions::from_mode(0o555)).unwrap();
    let probe = locked.join("probe");
    if fs::write(&probe, b"").is_ok() {
        // Permission bits are not enforced for this user.
        let _ = fs::remove_file(&probe);
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();
        return;
    }

    fs::write(src.path().join("locked/second.txt"), b"second").unwrap();
    let result = run_with_logger(&config, Arc::new(MemoryLogger::new()));
    fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();

    assert!(result.is_err());
    let state = StateStore::new().load(dst.path()).unwrap();
    assert!(state.entries.contains("locked/first.txt"));
    assert!(!state.entries.contains("locked/second.txt"));
}
