//! In-memory collaborators used by unit and behaviour tests.
//!
//! [`StubPlatform`] scripts the remote dataset platform and records every job
//! it is asked to run. [`MemoryObjectStore`] keeps blobs in a shared map and
//! acts as both connector and client.

use std::{
    collections::HashMap,
    fs,
    path::Path,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::Duration,
};

use chrono::{DateTime, Utc};
use serde_json::{Value, json};

use crate::{
    BareDatasetRequest, CreatedDataset, Credentials, DatasetIdentity, DatasetInfo,
    DatasetTemplate, ExportRecord, ImportSource, JobOutcome, ObjectMeta, ObjectStore,
    ObjectStoreConnector, PlatformApi, StorageDescriptor, StorageRequest, TransportError,
};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Build a dataset view holding one entity and no exports.
///
/// # Examples
/// ```
/// use chrono::Utc;
/// use wharf_core::{DatasetIdentity, DatasetTemplate, StorageDescriptor};
/// use wharf_core::test_support::sample_dataset_info;
///
/// let identity = DatasetIdentity::new("g", "ds", 1)?;
/// let storage = StorageDescriptor::public("bucket", "prefix", "managed");
/// let info = sample_dataset_info(identity, DatasetTemplate::GenericText, storage, Utc::now());
/// assert_eq!(info.export_record_count, 0);
/// # Ok::<(), wharf_core::DataSourceError>(())
/// ```
#[must_use]
pub fn sample_dataset_info(
    identity: DatasetIdentity,
    template: DatasetTemplate,
    storage: StorageDescriptor,
    modify_time: DateTime<Utc>,
) -> DatasetInfo {
    DatasetInfo {
        name: format!("dataset {}", identity.dataset_id()),
        raw: json!({ "datasetId": identity.dataset_id() }),
        identity,
        template,
        storage,
        modify_time,
        export_record_count: 0,
        entity_count: 1,
    }
}

#[derive(Debug, Default)]
struct PlatformState {
    datasets: HashMap<String, DatasetInfo>,
    exports: HashMap<String, Vec<ExportRecord>>,
    export_url: String,
    export_failure: Option<String>,
    import_failure: Option<String>,
    release_failure: Option<String>,
    info_calls: usize,
    export_calls: usize,
    release_calls: usize,
    imports: Vec<RecordedImport>,
    created: usize,
}

/// An import job observed by [`StubPlatform`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedImport {
    /// Dataset the job targeted.
    pub dataset_id: String,
    /// Whether the import was tagged as annotated.
    pub annotated: bool,
    /// Where the platform was asked to read from.
    pub source: ImportSource,
}

/// Scripted [`PlatformApi`] holding datasets in memory.
///
/// Successful export jobs append a record stamped with the dataset's current
/// `modify_time` and pointing at the configured export URL.
#[derive(Debug, Default)]
pub struct StubPlatform {
    state: Mutex<PlatformState>,
}

impl StubPlatform {
    /// Create a platform serving `info`, exporting to `export_url`.
    pub fn new(info: DatasetInfo, export_url: impl Into<String>) -> Self {
        let platform = Self::default();
        {
            let mut state = lock(&platform.state);
            state.export_url = export_url.into();
            state
                .datasets
                .insert(info.identity.dataset_id().to_owned(), info);
        }
        platform
    }

    fn with_dataset<R>(&self, dataset_id: &str, f: impl FnOnce(&mut DatasetInfo) -> R) -> Option<R> {
        lock(&self.state).datasets.get_mut(dataset_id).map(f)
    }

    /// Move the dataset's modification time.
    pub fn set_modify_time(&self, dataset_id: &str, modify_time: DateTime<Utc>) {
        self.with_dataset(dataset_id, |info| info.modify_time = modify_time);
    }

    /// Change the number of entities reported for the dataset.
    pub fn set_entity_count(&self, dataset_id: &str, entity_count: u64) {
        self.with_dataset(dataset_id, |info| info.entity_count = entity_count);
    }

    /// Override the export count reported in the dataset view.
    pub fn set_export_record_count(&self, dataset_id: &str, count: u64) {
        self.with_dataset(dataset_id, |info| info.export_record_count = count);
    }

    /// Seed an existing export record.
    pub fn push_export_record(&self, dataset_id: &str, record: ExportRecord) {
        let mut state = lock(&self.state);
        if let Some(info) = state.datasets.get_mut(dataset_id) {
            info.export_record_count += 1;
        }
        state
            .exports
            .entry(dataset_id.to_owned())
            .or_default()
            .push(record);
    }

    /// Make subsequent export jobs fail with `message`.
    pub fn fail_exports(&self, message: impl Into<String>) {
        lock(&self.state).export_failure = Some(message.into());
    }

    /// Make subsequent import jobs fail with `message`.
    pub fn fail_imports(&self, message: impl Into<String>) {
        lock(&self.state).import_failure = Some(message.into());
    }

    /// Make subsequent release jobs fail with `message`.
    pub fn fail_releases(&self, message: impl Into<String>) {
        lock(&self.state).release_failure = Some(message.into());
    }

    /// Number of dataset info queries served.
    pub fn info_calls(&self) -> usize {
        lock(&self.state).info_calls
    }

    /// Number of export jobs started.
    pub fn export_calls(&self) -> usize {
        lock(&self.state).export_calls
    }

    /// Number of release jobs started.
    pub fn release_calls(&self) -> usize {
        lock(&self.state).release_calls
    }

    /// Import jobs started, oldest first.
    pub fn imports(&self) -> Vec<RecordedImport> {
        lock(&self.state).imports.clone()
    }

    fn outcome(failure: Option<&String>) -> JobOutcome {
        failure.map_or(JobOutcome::Succeeded, |message| JobOutcome::Failed {
            message: message.clone(),
        })
    }
}

fn missing(dataset_id: &str) -> TransportError {
    TransportError::NotFound {
        what: format!("dataset {dataset_id}"),
    }
}

impl PlatformApi for StubPlatform {
    fn dataset_info(&self, dataset_id: &str) -> Result<DatasetInfo, TransportError> {
        let mut state = lock(&self.state);
        state.info_calls += 1;
        state
            .datasets
            .get(dataset_id)
            .cloned()
            .ok_or_else(|| missing(dataset_id))
    }

    fn create_export_job(&self, dataset_id: &str) -> Result<JobOutcome, TransportError> {
        let mut state = lock(&self.state);
        state.export_calls += 1;
        if let Some(message) = state.export_failure.clone() {
            return Ok(JobOutcome::Failed { message });
        }
        let url = state.export_url.clone();
        let info = state
            .datasets
            .get_mut(dataset_id)
            .ok_or_else(|| missing(dataset_id))?;
        info.export_record_count += 1;
        let record = ExportRecord {
            download_url: url.clone(),
            produced_at: info.modify_time,
            raw: json!({ "downloadUrl": url, "finishTime": info.modify_time.to_rfc3339() }),
        };
        state
            .exports
            .entry(dataset_id.to_owned())
            .or_default()
            .push(record);
        Ok(JobOutcome::Succeeded)
    }

    fn list_export_records(&self, dataset_id: &str) -> Result<Vec<ExportRecord>, TransportError> {
        Ok(lock(&self.state)
            .exports
            .get(dataset_id)
            .cloned()
            .unwrap_or_default())
    }

    fn create_import_job(
        &self,
        dataset_id: &str,
        annotated: bool,
        source: &ImportSource,
    ) -> Result<JobOutcome, TransportError> {
        let mut state = lock(&self.state);
        state.imports.push(RecordedImport {
            dataset_id: dataset_id.to_owned(),
            annotated,
            source: source.clone(),
        });
        Ok(Self::outcome(state.import_failure.as_ref()))
    }

    fn create_release_job(&self, _dataset_id: &str) -> Result<JobOutcome, TransportError> {
        let mut state = lock(&self.state);
        state.release_calls += 1;
        Ok(Self::outcome(state.release_failure.as_ref()))
    }

    fn create_bare_dataset(
        &self,
        request: &BareDatasetRequest,
    ) -> Result<CreatedDataset, TransportError> {
        let mut state = lock(&self.state);
        state.created += 1;
        let ordinal = state.created;
        let reject = |err: crate::DataSourceError| TransportError::Service {
            operation: "create dataset".to_owned(),
            message: err.to_string(),
        };
        let identity = DatasetIdentity::new(format!("group-{ordinal}"), format!("ds-{ordinal}"), 1)
            .map_err(reject)?;
        let storage = match &request.storage {
            StorageRequest::PublicManaged => StorageDescriptor::public(
                "platform-bucket",
                &format!("datasets/{}", identity.dataset_id()),
                "platform",
            ),
            StorageRequest::PrivateUserOwned { bucket, path } => {
                StorageDescriptor::private(bucket.clone(), path, "user", "bj", path.clone())
                    .map_err(reject)?
            }
        };
        let mut raw = json!({
            "datasetId": identity.dataset_id(),
            "groupId": identity.group_id(),
            "versionId": identity.version(),
        });
        if let (Some(extra), Value::Object(map)) = (&request.extra_info, &mut raw) {
            map.extend(extra.clone());
        }
        let mut info = sample_dataset_info(identity.clone(), request.template, storage.clone(), Utc::now());
        info.name.clone_from(&request.name);
        info.entity_count = 0;
        info.raw = raw.clone();
        state
            .datasets
            .insert(identity.dataset_id().to_owned(), info);
        Ok(CreatedDataset {
            identity,
            storage,
            raw,
        })
    }
}

#[derive(Debug, Default)]
struct StoreState {
    objects: HashMap<(String, String), Vec<u8>>,
    operations: Vec<String>,
    connections: Vec<(String, String)>,
}

/// Blob store shared between every client it hands out.
///
/// Cloning yields another handle to the same blobs.
#[derive(Debug, Default, Clone)]
pub struct MemoryObjectStore {
    state: Arc<Mutex<StoreState>>,
}

impl MemoryObjectStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an object.
    pub fn insert(&self, bucket: &str, key: &str, bytes: impl Into<Vec<u8>>) {
        lock(&self.state)
            .objects
            .insert((bucket.to_owned(), key.to_owned()), bytes.into());
    }

    /// Copy of an object's bytes.
    pub fn object(&self, bucket: &str, key: &str) -> Option<Vec<u8>> {
        lock(&self.state)
            .objects
            .get(&(bucket.to_owned(), key.to_owned()))
            .cloned()
    }

    /// Keys stored in `bucket`, sorted.
    pub fn keys(&self, bucket: &str) -> Vec<String> {
        let mut keys: Vec<String> = lock(&self.state)
            .objects
            .keys()
            .filter(|(b, _)| b == bucket)
            .map(|(_, key)| key.clone())
            .collect();
        keys.sort();
        keys
    }

    /// Operations performed, oldest first, as `"<op> <bucket>/<key>"`.
    pub fn operations(&self) -> Vec<String> {
        lock(&self.state).operations.clone()
    }

    /// `(region, access key)` pairs used to connect.
    pub fn connections(&self) -> Vec<(String, String)> {
        lock(&self.state).connections.clone()
    }

    fn record(&self, operation: &str, bucket: &str, key: &str) {
        lock(&self.state)
            .operations
            .push(format!("{operation} {bucket}/{key}"));
    }

    fn io_failure(bucket: &str, key: &str, source: std::io::Error) -> TransportError {
        TransportError::Network {
            url: format!("memory://{bucket}/{key}"),
            source,
        }
    }

    fn read(&self, bucket: &str, key: &str) -> Result<Vec<u8>, TransportError> {
        self.object(bucket, key).ok_or_else(|| TransportError::NotFound {
            what: format!("object {bucket}/{key}"),
        })
    }
}

impl ObjectStoreConnector for MemoryObjectStore {
    fn connect(
        &self,
        region: &str,
        credentials: &Credentials,
    ) -> Result<Box<dyn ObjectStore>, TransportError> {
        lock(&self.state)
            .connections
            .push((region.to_owned(), credentials.access_key.clone()));
        Ok(Box::new(self.clone()))
    }
}

impl ObjectStore for MemoryObjectStore {
    fn put_object_from_string(
        &self,
        bucket: &str,
        key: &str,
        payload: &str,
    ) -> Result<(), TransportError> {
        self.record("put", bucket, key);
        self.insert(bucket, key, payload.as_bytes());
        Ok(())
    }

    fn put_object_from_file(
        &self,
        bucket: &str,
        key: &str,
        path: &Path,
    ) -> Result<(), TransportError> {
        self.record("put-file", bucket, key);
        let bytes = fs::read(path).map_err(|err| Self::io_failure(bucket, key, err))?;
        self.insert(bucket, key, bytes);
        Ok(())
    }

    fn get_object_as_bytes(&self, bucket: &str, key: &str) -> Result<Vec<u8>, TransportError> {
        self.record("get", bucket, key);
        self.read(bucket, key)
    }

    fn get_object_to_file(
        &self,
        bucket: &str,
        key: &str,
        path: &Path,
    ) -> Result<u64, TransportError> {
        self.record("get-file", bucket, key);
        let bytes = self.read(bucket, key)?;
        fs::write(path, &bytes).map_err(|err| Self::io_failure(bucket, key, err))?;
        Ok(bytes.len() as u64)
    }

    fn object_meta(&self, bucket: &str, key: &str) -> Result<ObjectMeta, TransportError> {
        self.record("meta", bucket, key);
        self.read(bucket, key).map(|bytes| ObjectMeta {
            size: bytes.len() as u64,
        })
    }

    fn delete_object(&self, bucket: &str, key: &str) -> Result<(), TransportError> {
        self.record("delete", bucket, key);
        lock(&self.state)
            .objects
            .remove(&(bucket.to_owned(), key.to_owned()));
        Ok(())
    }

    fn generate_shared_url(
        &self,
        bucket: &str,
        key: &str,
        ttl: Duration,
    ) -> Result<String, TransportError> {
        self.record("share", bucket, key);
        Ok(format!("memory://{bucket}/{key}?ttl={}", ttl.as_secs()))
    }
}
