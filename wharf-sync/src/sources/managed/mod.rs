//! Data source backed by a dataset revision on the remote platform.
//!
//! Reads go through the local cache kept current by [`SyncEngine`]. Writes
//! stage the content in object storage and ask the platform to import it,
//! optionally releasing the revision afterwards.

use std::{fmt, sync::Arc};

use camino::Utf8Path;
use log::{error, info, warn};
use wharf_core::{
    BareDatasetRequest, Content, Credentials, DataSource, DataSourceError, DatasetIdentity,
    DatasetInfo, FetchOptions, FormatType, ImportSource, JobOutcome, ObjectStoreConnector,
    PlatformApi, RemoteOperation, SaveOptions, StorageRequest, normalise_prefix,
};
use wharf_fs::PathKind;

use crate::{
    cache::CacheStore,
    config::SyncConfig,
    content,
    download::{ArchiveFetcher, FetcherBuildError, HttpArchiveFetcher},
    sync::{SyncEngine, SyncReport},
};

mod upload;

/// Collaborators and configuration shared by managed sources.
#[derive(Clone)]
pub struct SyncContext {
    /// Remote dataset platform.
    pub platform: Arc<dyn PlatformApi>,
    /// Object-storage connector used for uploads.
    pub object_store: Arc<dyn ObjectStoreConnector>,
    /// Downloader for export archives.
    pub fetcher: Arc<dyn ArchiveFetcher>,
    /// Resolved configuration.
    pub config: SyncConfig,
}

impl fmt::Debug for SyncContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyncContext")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl SyncContext {
    /// Bundle explicit collaborators.
    pub fn new(
        platform: Arc<dyn PlatformApi>,
        object_store: Arc<dyn ObjectStoreConnector>,
        fetcher: Arc<dyn ArchiveFetcher>,
        config: SyncConfig,
    ) -> Self {
        Self {
            platform,
            object_store,
            fetcher,
            config,
        }
    }

    /// Bundle collaborators, downloading archives over HTTP with the
    /// configured connect timeout.
    ///
    /// # Errors
    /// Returns [`FetcherBuildError`] when the HTTP client cannot be built.
    pub fn with_http_fetcher(
        platform: Arc<dyn PlatformApi>,
        object_store: Arc<dyn ObjectStoreConnector>,
        config: SyncConfig,
    ) -> Result<Self, FetcherBuildError> {
        let fetcher = HttpArchiveFetcher::with_connect_timeout(config.connect_timeout)?;
        Ok(Self::new(platform, object_store, Arc::new(fetcher), config))
    }

    fn cache(&self) -> CacheStore {
        CacheStore::new(self.config.cache_root.clone())
    }
}

/// Options for opening or creating a managed source.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OpenOptions {
    /// Access key overriding the configured one.
    pub access_key: Option<String>,
    /// Secret key overriding the configured one.
    pub secret_key: Option<String>,
    /// Synchronise the cache as soon as the source is built.
    pub download_to_local: bool,
}

impl OpenOptions {
    /// Use explicit credentials.
    #[must_use]
    pub fn credentials(mut self, access_key: impl Into<String>, secret_key: impl Into<String>) -> Self {
        self.access_key = Some(access_key.into());
        self.secret_key = Some(secret_key.into());
        self
    }

    /// Fetch immediately after construction.
    #[must_use]
    pub const fn download_to_local(mut self, download: bool) -> Self {
        self.download_to_local = download;
        self
    }
}

/// A dataset revision managed by the remote platform.
pub struct ManagedDatasetSource {
    context: SyncContext,
    info: DatasetInfo,
    credentials: Option<Credentials>,
    download_when_init: bool,
}

impl fmt::Debug for ManagedDatasetSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ManagedDatasetSource")
            .field("identity", &self.info.identity)
            .field("template", &self.info.template)
            .field("credentials", &self.credentials)
            .field("download_when_init", &self.download_when_init)
            .finish_non_exhaustive()
    }
}

impl ManagedDatasetSource {
    fn build(context: SyncContext, info: DatasetInfo, options: &OpenOptions) -> Self {
        let credentials = context
            .config
            .resolve_credentials(options.access_key.as_deref(), options.secret_key.as_deref());
        Self {
            context,
            info,
            credentials,
            download_when_init: false,
        }
    }

    fn finish_open(mut self, options: &OpenOptions) -> Result<Self, DataSourceError> {
        if options.download_to_local {
            info!("fetching {} because download to local is set", self.info.identity);
            self.fetch(&FetchOptions::default())?;
        }
        Ok(self)
    }

    /// Open an existing dataset.
    pub fn open_existing(
        context: SyncContext,
        dataset_id: &str,
        options: &OpenOptions,
    ) -> Result<Self, DataSourceError> {
        let info = context.platform.dataset_info(dataset_id)?;
        info!("opened dataset {} ({})", info.identity, info.name);
        Self::build(context, info, options).finish_open(options)
    }

    /// Create an empty dataset.
    pub fn create_bare(
        context: SyncContext,
        request: &BareDatasetRequest,
        options: &OpenOptions,
    ) -> Result<Self, DataSourceError> {
        request.validate()?;
        let created = context.platform.create_bare_dataset(request)?;
        info!("created dataset {} named {}", created.identity, request.name);
        let mut info = context.platform.dataset_info(created.identity.dataset_id())?;
        info.storage = created.storage;
        Ok(Self::build(context, info, options))
    }

    /// Create a dataset and import `file_name` from its own user-owned storage.
    ///
    /// # Errors
    /// Fails with [`DataSourceError::InvalidArgument`] unless the request asks
    /// for user-owned storage, and with
    /// [`DataSourceError::RemoteOperationFailed`] when the import job fails.
    pub fn create_from_object_store_file(
        context: SyncContext,
        request: &BareDatasetRequest,
        file_name: &str,
        annotated: bool,
        options: &OpenOptions,
    ) -> Result<Self, DataSourceError> {
        let StorageRequest::PrivateUserOwned { bucket, path } = &request.storage else {
            return Err(DataSourceError::invalid_argument(
                "importing from object storage requires user-owned storage",
            ));
        };
        let location = format!(
            "/{bucket}/{}{file_name}",
            normalise_prefix(path.trim_start_matches('/'))
        );
        let source = Self::create_bare(context, request, options)?;
        let dataset_id = source.info.identity.dataset_id().to_owned();
        info!("importing {location} into dataset {dataset_id}");
        let outcome = source.context.platform.create_import_job(
            &dataset_id,
            annotated,
            &ImportSource::ObjectStoreFile(location),
        )?;
        if let JobOutcome::Failed { message } = outcome {
            error!("failed to create dataset {dataset_id} from object storage: {message}");
            return Err(DataSourceError::RemoteOperationFailed {
                operation: RemoteOperation::Import,
                dataset_id,
                detail: message,
            });
        }
        source.finish_open(options)
    }

    /// Identity of the bound revision.
    #[must_use]
    pub const fn identity(&self) -> &DatasetIdentity {
        &self.info.identity
    }

    /// Dataset view captured when the source was built.
    #[must_use]
    pub const fn info(&self) -> &DatasetInfo {
        &self.info
    }

    /// Whether the content has been fetched into the local cache.
    #[must_use]
    pub const fn download_when_init(&self) -> bool {
        self.download_when_init
    }

    /// Bring the cache entry of this revision up to date.
    pub fn synchronise(&self) -> Result<SyncReport, DataSourceError> {
        let cache = self.context.cache();
        SyncEngine::new(
            self.context.platform.as_ref(),
            self.context.fetcher.as_ref(),
            &cache,
            self.context.config.export_size_limit,
        )
        .synchronise(&self.info.identity)
    }

    /// Release the revision, returning whether the release job succeeded.
    pub fn release(&self) -> Result<bool, DataSourceError> {
        let dataset_id = self.info.identity.dataset_id();
        match self.context.platform.create_release_job(dataset_id)? {
            JobOutcome::Succeeded => {
                info!("released dataset {dataset_id}");
                Ok(true)
            }
            JobOutcome::Failed { message } => {
                warn!("release of dataset {dataset_id} failed: {message}");
                Ok(false)
            }
        }
    }

    fn import(&self, source: &ImportSource, annotated: bool) -> Result<bool, DataSourceError> {
        let dataset_id = self.info.identity.dataset_id();
        match self
            .context
            .platform
            .create_import_job(dataset_id, annotated, source)?
        {
            JobOutcome::Succeeded => {
                info!("imported {} into dataset {dataset_id}", source.location());
                Ok(true)
            }
            JobOutcome::Failed { message } => {
                error!("import into dataset {dataset_id} failed: {message}");
                Ok(false)
            }
        }
    }
}

fn serve(path: &Utf8Path) -> Result<Content, DataSourceError> {
    match wharf_fs::path_kind(path).map_err(|err| DataSourceError::io(path.as_std_path(), err))? {
        PathKind::Missing => Err(DataSourceError::not_found(format!("cached content {path}"))),
        PathKind::File => content::read_text(path).map(Content::Document),
        PathKind::Directory => content::read_directory(path).map(Content::Records),
    }
}

impl DataSource for ManagedDatasetSource {
    fn fetch(&mut self, _options: &FetchOptions) -> Result<Content, DataSourceError> {
        let report = self.synchronise()?;
        let content = serve(&report.content_path)?;
        self.download_when_init = true;
        Ok(content)
    }

    fn save(&mut self, options: SaveOptions) -> Result<bool, DataSourceError> {
        options.check_exclusive()?;
        let destination =
            upload::resolve_destination(&self.info.storage, options.destination.as_ref())?;
        let credentials = self.credentials.as_ref().ok_or_else(|| {
            DataSourceError::invalid_argument("saving requires an access key and secret key")
        })?;
        let store = self
            .context
            .object_store
            .connect(&destination.region, credentials)?;
        let import_source = match (options.data, options.zip_file_path) {
            (Some(data), _) => {
                upload::upload_content(store.as_ref(), &destination, data, self.format())?
            }
            (None, Some(archive)) => upload::upload_archive(
                store.as_ref(),
                &destination,
                &archive,
                self.context.config.shared_url_ttl,
            )?,
            (None, None) => {
                return Err(DataSourceError::invalid_argument(
                    "one of data or zip_file_path is required",
                ));
            }
        };
        if !self.import(&import_source, options.annotated)? {
            return Ok(false);
        }
        if options.release {
            return self.release();
        }
        Ok(true)
    }

    fn format(&self) -> FormatType {
        self.info.template.format()
    }

    fn set_format(&mut self, _format: FormatType) -> Result<(), DataSourceError> {
        Err(DataSourceError::Unsupported {
            operation: "changing the format of a managed dataset",
            reason: "the format is bound to the dataset template".to_owned(),
        })
    }
}

#[cfg(test)]
mod tests;
