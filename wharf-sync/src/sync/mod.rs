//! Staleness detection and cache refresh for managed dataset revisions.
//!
//! [`SyncEngine::synchronise`] brings the cache entry of one revision up to
//! date with the platform:
//!
//! 1. A revision without entities is rejected outright.
//! 2. An incomplete entry (no metadata or no content) is refreshed.
//! 3. A complete entry is refreshed when the dataset's `modify_time` is later
//!    than the entry's `info_timestamp`, and served otherwise.
//!
//! A refresh exports the revision when no export covers its latest change,
//! downloads the newest export, rejects archives that expand beyond the size
//! limit, installs the extracted content, and finally commits the metadata.
//! Any failure aborts the fetch; stale content is never served as a fallback.

use camino::Utf8PathBuf;
use chrono::{DateTime, Utc};
use log::{debug, error, info};
use wharf_core::{
    DataSourceError, DatasetIdentity, DatasetInfo, JobOutcome, PlatformApi, RemoteOperation,
    latest_export,
};

use crate::{
    archive,
    cache::{CacheEntry, CacheMetadata, CacheStore},
    download::{ArchiveFetcher, download_archive},
};

/// Why a refresh was needed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshReason {
    /// No complete cache entry existed.
    MissingCache,
    /// The dataset changed after the cached export was produced.
    Stale,
}

/// What a synchronisation did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    /// The cached entry was already current.
    Served,
    /// The cached entry was rebuilt.
    Refreshed {
        /// Trigger for the refresh.
        reason: RefreshReason,
        /// Whether a new export job was run.
        exported: bool,
        /// Size of the downloaded archive.
        bytes_downloaded: u64,
        /// Uncompressed size of the archive entries.
        uncompressed_bytes: u64,
    },
}

/// Result of [`SyncEngine::synchronise`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncReport {
    /// What the engine did.
    pub outcome: SyncOutcome,
    /// Completion time of the export now cached.
    pub info_timestamp: DateTime<Utc>,
    /// Location of the cached content.
    pub content_path: Utf8PathBuf,
}

/// Keeps cache entries consistent with the platform.
pub struct SyncEngine<'a> {
    platform: &'a dyn PlatformApi,
    fetcher: &'a dyn ArchiveFetcher,
    cache: &'a CacheStore,
    size_limit: u64,
}

impl std::fmt::Debug for SyncEngine<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncEngine")
            .field("cache", &self.cache)
            .field("size_limit", &self.size_limit)
            .finish_non_exhaustive()
    }
}

impl<'a> SyncEngine<'a> {
    /// Wire an engine to its collaborators.
    pub fn new(
        platform: &'a dyn PlatformApi,
        fetcher: &'a dyn ArchiveFetcher,
        cache: &'a CacheStore,
        size_limit: u64,
    ) -> Self {
        Self {
            platform,
            fetcher,
            cache,
            size_limit,
        }
    }

    /// Ensure the cache entry for `identity` is current.
    pub fn synchronise(&self, identity: &DatasetIdentity) -> Result<SyncReport, DataSourceError> {
        let dataset_id = identity.dataset_id();
        let info = self.platform.dataset_info(dataset_id)?;
        if info.entity_count == 0 {
            error!("no data exists in dataset {identity}");
            return Err(DataSourceError::not_found(format!(
                "data in dataset {dataset_id}"
            )));
        }

        let reason = match self.cache.load(identity)? {
            None => {
                info!("no cache found for {identity}, downloading");
                RefreshReason::MissingCache
            }
            Some(entry) if is_stale(&info, &entry) => {
                info!(
                    "cache for {identity} is outdated (modified {} after export {})",
                    info.modify_time, entry.info_timestamp
                );
                RefreshReason::Stale
            }
            Some(entry) => {
                debug!("serving cached content for {identity}");
                return Ok(SyncReport {
                    outcome: SyncOutcome::Served,
                    info_timestamp: entry.info_timestamp,
                    content_path: entry.content_path,
                });
            }
        };
        self.refresh(identity, &info, reason)
    }

    fn refresh(
        &self,
        identity: &DatasetIdentity,
        info: &DatasetInfo,
        reason: RefreshReason,
    ) -> Result<SyncReport, DataSourceError> {
        let dataset_id = identity.dataset_id();
        let paths = self.cache.prepare(identity)?;

        let exported = self.export_if_needed(info)?;
        let record = latest_export(self.platform.list_export_records(dataset_id)?).ok_or_else(
            || DataSourceError::not_found(format!("export record for dataset {dataset_id}")),
        )?;

        let bytes_downloaded = download_archive(self.fetcher, &record.download_url, &paths.archive)?;
        let uncompressed_bytes = archive::check_size(&paths.archive, self.size_limit)
            .inspect_err(|err| error!("refusing to unpack {}: {err}", paths.archive))?;
        self.cache.install_content(&paths)?;
        self.cache.commit(&paths, &CacheMetadata::from(&record))?;

        Ok(SyncReport {
            outcome: SyncOutcome::Refreshed {
                reason,
                exported,
                bytes_downloaded,
                uncompressed_bytes,
            },
            info_timestamp: record.produced_at,
            content_path: paths.content,
        })
    }

    /// Run an export unless one already covers the dataset's latest change.
    fn export_if_needed(&self, info: &DatasetInfo) -> Result<bool, DataSourceError> {
        let dataset_id = info.identity.dataset_id();
        if !self.needs_export(info)? {
            return Ok(false);
        }
        info!("creating export job for dataset {dataset_id}");
        match self.platform.create_export_job(dataset_id)? {
            JobOutcome::Succeeded => Ok(true),
            JobOutcome::Failed { message } => {
                error!("export job for dataset {dataset_id} failed: {message}");
                Err(DataSourceError::RemoteOperationFailed {
                    operation: RemoteOperation::Export,
                    dataset_id: dataset_id.to_owned(),
                    detail: message,
                })
            }
        }
    }

    fn needs_export(&self, info: &DatasetInfo) -> Result<bool, DataSourceError> {
        if info.export_record_count == 0 {
            return Ok(true);
        }
        let records = self.platform.list_export_records(info.identity.dataset_id())?;
        Ok(latest_export(records).is_none_or(|latest| info.modify_time > latest.produced_at))
    }
}

fn is_stale(info: &DatasetInfo, entry: &CacheEntry) -> bool {
    info.modify_time > entry.info_timestamp
}
