use super::*;
use crate::test_support::{StubArchiveFetcher, zip_bytes};
use camino::Utf8PathBuf;
use chrono::{TimeZone, Utc};
use rstest::{fixture, rstest};
use tempfile::TempDir;
use wharf_core::{
    DatasetTemplate, DestinationOverride, StorageDescriptor,
    test_support::{MemoryObjectStore, StubPlatform, sample_dataset_info},
};

const EXPORT_URL: &str = "https://exports.example/ds-1.zip";

struct Harness {
    _dir: TempDir,
    platform: Arc<StubPlatform>,
    store: MemoryObjectStore,
    context: SyncContext,
}

impl Harness {
    fn open(&self, options: &OpenOptions) -> ManagedDatasetSource {
        ManagedDatasetSource::open_existing(self.context.clone(), "ds-1", options)
            .expect("open dataset")
    }
}

fn harness_with(storage: StorageDescriptor) -> Harness {
    let dir = TempDir::new().unwrap_or_else(|err| panic!("temp dir: {err}"));
    let root = Utf8PathBuf::from_path_buf(dir.path().join("cache"))
        .unwrap_or_else(|path| panic!("non-UTF-8 temp dir {path:?}"));
    let identity =
        DatasetIdentity::new("g-1", "ds-1", 2).unwrap_or_else(|err| panic!("identity: {err}"));
    let modified = Utc
        .with_ymd_and_hms(2024, 6, 1, 0, 0, 0)
        .single()
        .expect("valid timestamp");
    let info = sample_dataset_info(identity, DatasetTemplate::QuerySet, storage, modified);
    let platform = Arc::new(StubPlatform::new(info, EXPORT_URL));
    let store = MemoryObjectStore::new();
    let fetcher = StubArchiveFetcher::new().with_archive(
        EXPORT_URL,
        zip_bytes(&[("b.jsonl", r#"{"q":2}"#), ("a.jsonl", r#"{"q":1}"#)]),
    );
    let mut config = SyncConfig::with_cache_root(root);
    config.access_key = Some("config-ak".to_owned());
    config.secret_key = Some("config-sk".to_owned());
    let context = SyncContext::new(
        platform.clone(),
        Arc::new(store.clone()),
        Arc::new(fetcher),
        config,
    );
    Harness {
        _dir: dir,
        platform,
        store,
        context,
    }
}

#[fixture]
fn private() -> Harness {
    harness_with(
        StorageDescriptor::private("user-bucket", "data", "mine", "bj", "data/raw")
            .expect("private storage"),
    )
}

#[fixture]
fn public() -> Harness {
    harness_with(StorageDescriptor::public("platform-bucket", "managed", "platform"))
}

#[rstest]
fn fetch_reads_cached_records_and_marks_download(private: Harness) {
    let mut source = private.open(&OpenOptions::default());
    assert!(!source.download_when_init());
    assert_eq!(source.format(), FormatType::Jsonl);

    let content = source.fetch(&FetchOptions::default()).expect("fetch");
    assert_eq!(
        content,
        Content::Records(vec![r#"{"q":1}"#.into(), r#"{"q":2}"#.into()])
    );
    assert!(source.download_when_init());
}

#[rstest]
fn download_to_local_fetches_on_open(private: Harness) {
    let source = private.open(&OpenOptions::default().download_to_local(true));
    assert!(source.download_when_init());
    assert_eq!(private.platform.export_calls(), 1);
}

#[rstest]
fn format_is_bound_to_template(private: Harness) {
    let mut source = private.open(&OpenOptions::default());
    assert!(matches!(
        source.set_format(FormatType::Text),
        Err(DataSourceError::Unsupported { .. })
    ));
}

#[rstest]
fn inline_save_uploads_then_imports(private: Harness) {
    let mut source = private.open(&OpenOptions::default());
    let saved = source
        .save(SaveOptions::with_data(vec![r#"{"q":3}"#.to_owned()]).annotated(true))
        .expect("save");
    assert!(saved);

    let keys = private.store.keys("user-bucket");
    let key = keys.first().expect("uploaded object");
    assert!(key.starts_with("data/raw/data_") && key.ends_with(".jsonl"), "{key}");
    let imports = private.platform.imports();
    let import = imports.first().expect("import job");
    assert!(import.annotated);
    assert_eq!(
        import.source,
        ImportSource::ObjectStoreFile(format!("/user-bucket/{key}"))
    );
    assert_eq!(
        private.store.connections(),
        vec![("bj".to_owned(), "config-ak".to_owned())]
    );
    assert_eq!(private.platform.release_calls(), 0);
}

#[rstest]
fn explicit_credentials_take_precedence(private: Harness) {
    let mut source = private.open(&OpenOptions::default().credentials("own-ak", "own-sk"));
    source.save(SaveOptions::with_data("text")).expect("save");
    assert_eq!(
        private.store.connections(),
        vec![("bj".to_owned(), "own-ak".to_owned())]
    );
}

#[rstest]
fn failed_import_returns_false_without_release(private: Harness) {
    private.platform.fail_imports("bad rows");
    let mut source = private.open(&OpenOptions::default());
    let saved = source
        .save(SaveOptions::with_data("x").release(true))
        .expect("save");
    assert!(!saved);
    assert_eq!(private.platform.release_calls(), 0);
}

#[rstest]
fn release_outcome_becomes_result(private: Harness) {
    private.platform.fail_releases("locked");
    let mut source = private.open(&OpenOptions::default());
    let saved = source
        .save(SaveOptions::with_data("x").release(true))
        .expect("save");
    assert!(!saved);
    assert_eq!(private.platform.release_calls(), 1);
}

#[rstest]
fn public_storage_needs_override(public: Harness) {
    let mut source = public.open(&OpenOptions::default());
    assert!(matches!(
        source.save(SaveOptions::with_data("x")),
        Err(DataSourceError::Unsupported { .. })
    ));
    assert!(public.store.operations().is_empty());

    let saved = source
        .save(SaveOptions::with_data("x").destination(DestinationOverride::new(
            "drop", "incoming", "gz",
        )))
        .expect("save with override");
    assert!(saved);
    assert_eq!(public.store.keys("drop").len(), 1);
}

#[rstest]
fn archive_save_imports_shared_url(private: Harness) {
    let dir = TempDir::new().expect("temp dir");
    let archive = dir.path().join("batch.zip");
    std::fs::write(&archive, zip_bytes(&[("a.jsonl", "{}")])).expect("write");
    let mut source = private.open(&OpenOptions::default());

    assert!(source.save(SaveOptions::with_zip_file(&archive)).expect("save"));
    let imports = private.platform.imports();
    assert_eq!(
        imports.first().map(|import| import.source.clone()),
        Some(ImportSource::SharedZipUrl(
            "memory://user-bucket/data/raw/batch.zip?ttl=3600".to_owned()
        ))
    );
}

#[rstest]
fn missing_credentials_fail_before_io() {
    let harness = harness_with(
        StorageDescriptor::private("user-bucket", "data", "mine", "bj", "data/raw")
            .expect("private storage"),
    );
    let mut context = harness.context.clone();
    context.config.access_key = None;
    let mut source = ManagedDatasetSource::open_existing(context, "ds-1", &OpenOptions::default())
        .expect("open");
    assert!(matches!(
        source.save(SaveOptions::with_data("x")),
        Err(DataSourceError::InvalidArgument { .. })
    ));
    assert!(harness.store.connections().is_empty());
}

#[rstest]
fn public_storage_without_credentials_is_unsupported(public: Harness) {
    let mut context = public.context.clone();
    context.config.access_key = None;
    context.config.secret_key = None;
    let mut source = ManagedDatasetSource::open_existing(context, "ds-1", &OpenOptions::default())
        .expect("open");
    assert!(matches!(
        source.save(SaveOptions::with_data("x")),
        Err(DataSourceError::Unsupported { .. })
    ));
    assert!(public.store.operations().is_empty());
}

#[rstest]
fn unknown_dataset_is_not_found(private: Harness) {
    let result =
        ManagedDatasetSource::open_existing(private.context.clone(), "nope", &OpenOptions::default());
    assert!(
        matches!(&result, Err(DataSourceError::NotFound { what }) if what.contains("nope")),
        "unexpected {result:?}"
    );
}

#[rstest]
fn create_from_object_store_file_imports_named_file(private: Harness) {
    let request = BareDatasetRequest::new("fresh", DatasetTemplate::GenericText)
        .with_private_storage("user-bucket", "/incoming");
    let source = ManagedDatasetSource::create_from_object_store_file(
        private.context.clone(),
        &request,
        "rows.jsonl",
        false,
        &OpenOptions::default(),
    )
    .expect("create");
    assert_eq!(source.info().name, "fresh");

    let imports = private.platform.imports();
    let import = imports.first().expect("import job");
    assert_eq!(
        import.source,
        ImportSource::ObjectStoreFile("/user-bucket/incoming/rows.jsonl".to_owned())
    );
}

#[rstest]
fn failed_creation_import_is_an_error(private: Harness) {
    private.platform.fail_imports("no such file");
    let request = BareDatasetRequest::new("fresh", DatasetTemplate::GenericText)
        .with_private_storage("user-bucket", "incoming/");
    let err = ManagedDatasetSource::create_from_object_store_file(
        private.context.clone(),
        &request,
        "rows.jsonl",
        true,
        &OpenOptions::default(),
    )
    .expect_err("import should fail");
    assert!(matches!(
        err,
        DataSourceError::RemoteOperationFailed {
            operation: RemoteOperation::Import,
            ..
        }
    ));
}

#[rstest]
fn bare_private_request_needs_bucket_and_path(private: Harness) {
    let request = BareDatasetRequest::new("fresh", DatasetTemplate::TextToImage)
        .with_private_storage("", "incoming");
    assert!(matches!(
        ManagedDatasetSource::create_bare(private.context.clone(), &request, &OpenOptions::default()),
        Err(DataSourceError::InvalidArgument { .. })
    ));

    let public_request = BareDatasetRequest::new("fresh", DatasetTemplate::TextToImage);
    let source = ManagedDatasetSource::create_bare(
        private.context.clone(),
        &public_request,
        &OpenOptions::default(),
    )
    .expect("create");
    assert_eq!(source.format(), FormatType::Json);
    assert_eq!(source.info().storage.bucket, "platform-bucket");
}
