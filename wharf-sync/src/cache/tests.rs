use super::*;
use crate::test_support::write_zip;
use chrono::TimeZone;
use rstest::{fixture, rstest};
use serde_json::json;
use std::fs;
use tempfile::TempDir;

struct Sandbox {
    _dir: TempDir,
    store: CacheStore,
    identity: DatasetIdentity,
}

#[fixture]
fn sandbox() -> Sandbox {
    let dir = TempDir::new().unwrap_or_else(|err| panic!("temp dir: {err}"));
    let root = Utf8PathBuf::from_path_buf(dir.path().join("cache"))
        .unwrap_or_else(|path| panic!("non-UTF-8 temp dir {path:?}"));
    let identity = DatasetIdentity::new("group", "dataset", 4)
        .unwrap_or_else(|err| panic!("identity: {err}"));
    Sandbox {
        _dir: dir,
        store: CacheStore::new(root),
        identity,
    }
}

fn metadata() -> CacheMetadata {
    CacheMetadata {
        info_timestamp: Utc
            .with_ymd_and_hms(2024, 5, 1, 12, 0, 0)
            .single()
            .expect("valid timestamp"),
        download_url: "https://exports.example/bin.zip".to_owned(),
        record: json!({ "id": 9 }),
    }
}

#[rstest]
fn layout_follows_identity(sandbox: Sandbox) {
    let paths = sandbox.store.paths(&sandbox.identity);
    let root = sandbox.store.root();
    assert_eq!(paths.dir, root.join("group/dataset/4"));
    assert_eq!(paths.metadata, root.join("group/dataset/4/info.json"));
    assert_eq!(paths.archive, root.join("group/dataset/4/bin.zip"));
    assert_eq!(paths.content, root.join("group/dataset/4/content"));
}

#[rstest]
fn entry_needs_metadata_and_content(sandbox: Sandbox) {
    let paths = sandbox.store.prepare(&sandbox.identity).expect("prepare");
    assert!(sandbox.store.load(&sandbox.identity).expect("load").is_none());

    sandbox.store.commit(&paths, &metadata()).expect("commit");
    assert!(
        sandbox.store.load(&sandbox.identity).expect("load").is_none(),
        "metadata without content is incomplete"
    );

    fs::create_dir(&paths.content).expect("mkdir");
    let entry = sandbox
        .store
        .load(&sandbox.identity)
        .expect("load")
        .expect("entry should be complete");
    assert_eq!(entry.info_timestamp, metadata().info_timestamp);
    assert_eq!(entry.content_path, paths.content);
}

#[rstest]
fn metadata_uses_documented_keys(sandbox: Sandbox) {
    let paths = sandbox.store.prepare(&sandbox.identity).expect("prepare");
    sandbox.store.commit(&paths, &metadata()).expect("commit");
    let raw: Value =
        serde_json::from_str(&fs::read_to_string(&paths.metadata).expect("read")).expect("json");
    assert_eq!(raw["download_url"], "https://exports.example/bin.zip");
    assert_eq!(raw["record"]["id"], 9);
    assert!(raw["info_timestamp"].is_string());
}

#[rstest]
fn unreadable_metadata_counts_as_missing(sandbox: Sandbox) {
    let paths = sandbox.store.prepare(&sandbox.identity).expect("prepare");
    fs::create_dir(&paths.content).expect("mkdir");
    fs::write(&paths.metadata, "{ truncated").expect("write");
    assert!(sandbox.store.load(&sandbox.identity).expect("load").is_none());
}

#[rstest]
fn install_replaces_previous_content(sandbox: Sandbox) {
    let paths = sandbox.store.prepare(&sandbox.identity).expect("prepare");
    fs::create_dir(&paths.content).expect("mkdir");
    fs::write(paths.content.join("stale.jsonl"), "old").expect("write");
    write_zip(&paths.archive, &[("fresh.jsonl", "new")]);

    sandbox.store.install_content(&paths).expect("install");

    assert!(!paths.content.join("stale.jsonl").exists());
    assert_eq!(
        fs::read_to_string(paths.content.join("fresh.jsonl")).expect("read"),
        "new"
    );
    let leftovers: Vec<_> = fs::read_dir(&paths.dir)
        .expect("list")
        .filter_map(Result::ok)
        .filter(|entry| entry.file_name().to_string_lossy().starts_with(STAGING_PREFIX))
        .collect();
    assert!(leftovers.is_empty(), "staging directory should be consumed");
}

#[rstest]
fn failed_install_keeps_previous_content(sandbox: Sandbox) {
    let paths = sandbox.store.prepare(&sandbox.identity).expect("prepare");
    fs::create_dir(&paths.content).expect("mkdir");
    fs::write(paths.content.join("kept.jsonl"), "old").expect("write");
    fs::write(&paths.archive, "not a zip").expect("write");

    assert!(matches!(
        sandbox.store.install_content(&paths),
        Err(DataSourceError::Archive { .. })
    ));
    assert!(paths.content.join("kept.jsonl").exists());
}
