use logmanager::checkpoint::{no_progress, CheckpointStore};
use logmanager::model::{ComponentLogConfiguration, LogFileGroup};
use regex::Regex;
use std::fs::{self, File};
use std::path::Path;
use std::time::{Duration, SystemTime};
use tempfile::TempDir;

const COMPONENT: &str = "app";

fn write_at(path: &Path, content: &str, modified: SystemTime) {
    fs::write(path, content).unwrap();
    File::options()
        .write(true)
        .open(path)
        .unwrap()
        .set_modified(modified)
        .unwrap();
}

fn config(dir: &Path) -> ComponentLogConfiguration {
    ComponentLogConfiguration::new(COMPONENT, dir, Regex::new(r"^app\.log(\.\d+)?$").unwrap())
}

fn base_time() -> SystemTime {
    SystemTime::UNIX_EPOCH + Duration::from_secs(1_650_000_000)
}

#[test]
fn test_fully_delivered_file_stays_processed_after_rotation() {
    let logs = TempDir::new().unwrap();
    let work = TempDir::new().unwrap();
    let store = CheckpointStore::new(work.path());
    let active = logs.path().join("app.log");
    write_at(&active, &"a".repeat(2048), base_time());

    let group = LogFileGroup::create_from_checkpoint(&config(logs.path()), work.path()).unwrap();
    assert_eq!(group.unprocessed_files().len(), 1);
    let file = group.unprocessed_files()[0].clone();
    store.record_progress(COMPONENT, &file, file.size()).unwrap();

    // Rotate: the delivered file is renamed and a new active file appears.
    fs::rename(&active, logs.path().join("app.log.1")).unwrap();
    write_at(&active, &"b".repeat(1500), base_time() + Duration::from_secs(60));

    let group = LogFileGroup::create_from_checkpoint(&config(logs.path()), work.path()).unwrap();
    let processed: Vec<&str> = group.processed_files().iter().map(|f| f.name()).collect();
    let unprocessed: Vec<&str> = group.unprocessed_files().iter().map(|f| f.name()).collect();
    assert_eq!(processed, vec!["app.log.1"]);
    assert_eq!(unprocessed, vec!["app.log"]);
    assert_eq!(group.start_offset(&group.unprocessed_files()[0]), 0);
    assert_eq!(group.pending_bytes(), 1500);
    assert_eq!(
        group.deletable_files().iter().map(|f| f.name()).collect::<Vec<_>>(),
        vec!["app.log.1"]
    );
}

#[cfg(unix)]
#[test]
fn test_partial_offset_follows_the_file_through_rename() {
    let logs = TempDir::new().unwrap();
    let work = TempDir::new().unwrap();
    let store = CheckpointStore::new(work.path());
    let active = logs.path().join("app.log");
    write_at(&active, &"a".repeat(4096), base_time());

    let group = LogFileGroup::create_from_checkpoint(&config(logs.path()), work.path()).unwrap();
    let file = group.unprocessed_files()[0].clone();
    store.record_progress(COMPONENT, &file, 1024).unwrap();

    fs::rename(&active, logs.path().join("app.log.1")).unwrap();
    write_at(&active, &"b".repeat(2048), base_time() + Duration::from_secs(60));

    let group = LogFileGroup::create_from_checkpoint(&config(logs.path()), work.path()).unwrap();
    assert_eq!(group.last_processed(), no_progress());

    let rotated = &group.unprocessed_files()[0];
    assert_eq!(rotated.name(), "app.log.1");
    assert_eq!(rotated.identity(), file.identity());
    assert_eq!(group.start_offset(rotated), 1024);
    assert!(!group.is_active_file(rotated));
    assert_eq!(group.pending_bytes(), (4096 - 1024) + 2048);
}

#[test]
fn test_reused_identity_with_new_content_starts_over() {
    let logs = TempDir::new().unwrap();
    let work = TempDir::new().unwrap();
    let store = CheckpointStore::new(work.path());
    let active = logs.path().join("app.log");
    write_at(&active, &"a".repeat(4096), base_time());

    let group = LogFileGroup::create_from_checkpoint(&config(logs.path()), work.path()).unwrap();
    let file = group.unprocessed_files()[0].clone();
    store.record_progress(COMPONENT, &file, 3000).unwrap();

    // Same path and inode, different leading bytes: the file was rewritten.
    write_at(&active, &"z".repeat(4096), base_time() + Duration::from_secs(5));

    let group = LogFileGroup::create_from_checkpoint(&config(logs.path()), work.path()).unwrap();
    assert_eq!(group.start_offset(&group.unprocessed_files()[0]), 0);
}

#[test]
fn test_truncated_file_starts_over() {
    let logs = TempDir::new().unwrap();
    let work = TempDir::new().unwrap();
    let store = CheckpointStore::new(work.path());
    let active = logs.path().join("app.log");
    write_at(&active, &"a".repeat(4096), base_time());

    let group = LogFileGroup::create_from_checkpoint(&config(logs.path()), work.path()).unwrap();
    let file = group.unprocessed_files()[0].clone();
    store.record_progress(COMPONENT, &file, 3000).unwrap();

    write_at(&active, &"a".repeat(2048), base_time() + Duration::from_secs(5));

    let group = LogFileGroup::create_from_checkpoint(&config(logs.path()), work.path()).unwrap();
    assert_eq!(group.start_offset(&group.unprocessed_files()[0]), 0);
}

#[test]
fn test_forget_missing_prunes_deleted_files() {
    let logs = TempDir::new().unwrap();
    let work = TempDir::new().unwrap();
    let store = CheckpointStore::new(work.path());
    write_at(&logs.path().join("app.log.1"), &"a".repeat(2048), base_time());
    write_at(
        &logs.path().join("app.log"),
        &"b".repeat(2048),
        base_time() + Duration::from_secs(1),
    );

    let group = LogFileGroup::create_from_checkpoint(&config(logs.path()), work.path()).unwrap();
    for file in group.unprocessed_files() {
        store.record_progress(COMPONENT, file, file.size()).unwrap();
    }
    assert_eq!(store.load(COMPONENT).unwrap().files.len(), 2);

    fs::remove_file(logs.path().join("app.log.1")).unwrap();
    let group = LogFileGroup::create_from_checkpoint(&config(logs.path()), work.path()).unwrap();
    assert_eq!(store.forget_missing(COMPONENT, &group).unwrap(), 1);

    let checkpoint = store.load(COMPONENT).unwrap();
    assert_eq!(checkpoint.files.len(), 1);
    assert_eq!(
        checkpoint.last_processed,
        chrono::DateTime::<chrono::Utc>::from(base_time() + Duration::from_secs(1))
    );
}

#[test]
fn test_unreadable_checkpoint_does_not_fail_the_scan() {
    let logs = TempDir::new().unwrap();
    let work = TempDir::new().unwrap();
    let store = CheckpointStore::new(work.path());
    write_at(&logs.path().join("app.log"), &"a".repeat(2048), base_time());

    let path = store.path_for(COMPONENT);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(&path, "garbage").unwrap();

    let group = LogFileGroup::create_from_checkpoint(&config(logs.path()), work.path()).unwrap();
    assert_eq!(group.last_processed(), no_progress());
    assert_eq!(group.unprocessed_files().len(), 1);
}

#[test]
fn test_finishing_newer_file_keeps_older_partial_file_unprocessed() {
    let logs = TempDir::new().unwrap();
    let work = TempDir::new().unwrap();
    let store = CheckpointStore::new(work.path());
    write_at(&logs.path().join("app.log.1"), &"a".repeat(4096), base_time());
    write_at(
        &logs.path().join("app.log"),
        &"b".repeat(2048),
        base_time() + Duration::from_secs(10),
    );

    let group = LogFileGroup::create_from_checkpoint(&config(logs.path()), work.path()).unwrap();
    let rotated = group.unprocessed_files()[0].clone();
    let active = group.unprocessed_files()[1].clone();
    store.record_progress(COMPONENT, &rotated, 1000).unwrap();
    store.record_progress(COMPONENT, &active, active.size()).unwrap();

    let group = LogFileGroup::create_from_checkpoint(&config(logs.path()), work.path()).unwrap();
    let unprocessed: Vec<&str> = group.unprocessed_files().iter().map(|f| f.name()).collect();
    assert_eq!(unprocessed, vec!["app.log.1", "app.log"]);
    assert!(group.processed_files().is_empty());
    assert_eq!(group.start_offset(&group.unprocessed_files()[0]), 1000);
    assert_eq!(group.pending_bytes(), 4096 - 1000);

    store.record_progress(COMPONENT, &rotated, rotated.size()).unwrap();
    let group = LogFileGroup::create_from_checkpoint(&config(logs.path()), work.path()).unwrap();
    let processed: Vec<&str> = group.processed_files().iter().map(|f| f.name()).collect();
    assert_eq!(processed, vec!["app.log.1", "app.log"]);
    assert_eq!(group.pending_bytes(), 0);
}
