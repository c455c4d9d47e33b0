//! Behavioural coverage for uploading and importing through a managed source.

use camino::Utf8PathBuf;
use chrono::Utc;
use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};
use std::{cell::RefCell, fs, path::PathBuf, sync::Arc};
use tempfile::TempDir;
use wharf_core::{
    Content, DataSource, DataSourceError, DatasetIdentity, DatasetTemplate, ImportSource,
    SaveOptions, StorageDescriptor,
    test_support::{MemoryObjectStore, StubPlatform, sample_dataset_info},
};
use wharf_sync::{
    ManagedDatasetSource, OpenOptions, SyncConfig, SyncContext, test_support::StubArchiveFetcher,
};

const BUCKET: &str = "user-bucket";

struct SaveWorld {
    _dir: TempDir,
    platform: Arc<StubPlatform>,
    store: MemoryObjectStore,
    source: ManagedDatasetSource,
}

type WorldCell = RefCell<Option<SaveWorld>>;
type SaveCell = RefCell<Option<Result<bool, DataSourceError>>>;

#[fixture]
fn world() -> WorldCell {
    RefCell::new(None)
}

#[fixture]
fn saved() -> SaveCell {
    RefCell::new(None)
}

fn build_world(storage: StorageDescriptor) -> SaveWorld {
    let dir = TempDir::new().unwrap_or_else(|err| panic!("failed to create temp dir: {err}"));
    let root = Utf8PathBuf::from_path_buf(dir.path().join("cache"))
        .unwrap_or_else(|path| panic!("non-UTF-8 temp dir {path:?}"));
    let identity = DatasetIdentity::new("catalogue", "queries", 1)
        .unwrap_or_else(|err| panic!("invalid identity: {err}"));
    let info = sample_dataset_info(identity, DatasetTemplate::QuerySet, storage, Utc::now());
    let platform = Arc::new(StubPlatform::new(info, "https://exports.example/q.zip"));
    let store = MemoryObjectStore::new();
    let context = SyncContext::new(
        platform.clone(),
        Arc::new(store.clone()),
        Arc::new(StubArchiveFetcher::new()),
        SyncConfig::with_cache_root(root),
    );
    let options = OpenOptions::default().credentials("ak", "sk");
    let source = ManagedDatasetSource::open_existing(context, "queries", &options)
        .unwrap_or_else(|err| panic!("failed to open dataset: {err}"));
    SaveWorld {
        _dir: dir,
        platform,
        store,
        source,
    }
}

fn with_world<R>(cell: &WorldCell, f: impl FnOnce(&mut SaveWorld) -> R) -> R {
    let mut slot = cell.borrow_mut();
    let current = slot
        .as_mut()
        .unwrap_or_else(|| panic!("dataset must be configured"));
    f(current)
}

fn two_records() -> Content {
    Content::Records(vec![r#"{"q":"a"}"#.to_owned(), r#"{"q":"b"}"#.to_owned()])
}

#[given("a managed dataset in user-owned storage")]
fn private_dataset(#[from(world)] world: &WorldCell) {
    let storage = StorageDescriptor::private(BUCKET, "incoming", "mine", "bj", "incoming")
        .unwrap_or_else(|err| panic!("invalid storage: {err}"));
    *world.borrow_mut() = Some(build_world(storage));
}

#[given("a managed dataset in platform-managed storage")]
fn public_dataset(#[from(world)] world: &WorldCell) {
    let storage = StorageDescriptor::public("platform-bucket", "datasets/queries", "platform");
    *world.borrow_mut() = Some(build_world(storage));
}

#[given("the platform rejects imports")]
fn rejects_imports(#[from(world)] world: &WorldCell) {
    with_world(world, |current| current.platform.fail_imports("malformed rows"));
}

fn save(world: &WorldCell, saved: &SaveCell, options: SaveOptions) {
    let result = with_world(world, |current| current.source.save(options));
    *saved.borrow_mut() = Some(result);
}

#[when("I save two records")]
fn save_records(#[from(world)] world: &WorldCell, #[from(saved)] saved: &SaveCell) {
    save(world, saved, SaveOptions::with_data(two_records()));
}

#[when("I save two records and ask for a release")]
fn save_and_release(#[from(world)] world: &WorldCell, #[from(saved)] saved: &SaveCell) {
    save(world, saved, SaveOptions::with_data(two_records()).release(true));
}

#[then("the save reports {expected}")]
fn save_reports(#[from(saved)] saved: &SaveCell, expected: bool) {
    match saved.borrow().as_ref() {
        Some(Ok(actual)) => assert_eq!(*actual, expected),
        Some(Err(err)) => panic!("save failed: {err}"),
        None => panic!("save must run first"),
    }
}

#[then("the save fails as unsupported")]
fn save_unsupported(#[from(saved)] saved: &SaveCell) {
    match saved.borrow().as_ref() {
        Some(Err(DataSourceError::Unsupported { .. })) => {}
        other => panic!("expected Unsupported, got {other:?}"),
    }
}

#[then("one object was uploaded below {prefix}")]
fn uploaded_below(#[from(world)] world: &WorldCell, prefix: String) {
    let expected = prefix.trim_matches('"');
    with_world(world, |current| {
        let keys = current.store.keys(BUCKET);
        assert_eq!(keys.len(), 1, "unexpected objects {keys:?}");
        assert!(keys.iter().all(|key| key.starts_with(expected)), "{keys:?}");
    });
}

#[then("the platform imported the uploaded object")]
fn imported_upload(#[from(world)] world: &WorldCell) {
    with_world(world, |current| {
        let keys = current.store.keys(BUCKET);
        let imports = current.platform.imports();
        let sources: Vec<ImportSource> = imports.into_iter().map(|import| import.source).collect();
        let expected: Vec<ImportSource> = keys
            .iter()
            .map(|key| ImportSource::ObjectStoreFile(format!("/{BUCKET}/{key}")))
            .collect();
        assert_eq!(sources, expected);
    });
}

#[then("{count} release jobs have run")]
fn release_jobs(#[from(world)] world: &WorldCell, count: usize) {
    with_world(world, |current| {
        assert_eq!(current.platform.release_calls(), count);
    });
}

#[then("nothing was uploaded")]
fn nothing_uploaded(#[from(world)] world: &WorldCell) {
    with_world(world, |current| {
        assert!(current.store.operations().is_empty());
        assert!(current.platform.imports().is_empty());
    });
}

#[test]
fn scenario_indices_follow_feature_order() {
    let feature_path =
        PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/features/managed_save.feature");
    let contents = match fs::read_to_string(&feature_path) {
        Ok(data) => data,
        Err(err) => panic!("failed to read feature file {feature_path:?}: {err}"),
    };
    let titles: Vec<&str> = contents
        .lines()
        .filter_map(|line| line.trim().strip_prefix("Scenario: "))
        .collect();
    assert_eq!(
        titles,
        [
            "importing inline records into user-owned storage",
            "releasing after a successful import",
            "reporting a failed import",
            "refusing platform-managed storage",
        ]
    );
}

macro_rules! register_scenario {
    ($name:ident, $index:literal) => {
        #[scenario(path = "tests/features/managed_save.feature", index = $index)]
        fn $name(world: WorldCell, saved: SaveCell) {
            let _ = (world, saved);
        }
    };
}

register_scenario!(importing_inline_records_into_user_owned_storage, 0);
register_scenario!(releasing_after_a_successful_import, 1);
register_scenario!(reporting_a_failed_import, 2);
register_scenario!(refusing_platform_managed_storage, 3);
