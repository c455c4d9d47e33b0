//! On-disk cache of exported dataset revisions.
//!
//! Each [`DatasetIdentity`] owns one directory below the cache root:
//!
//! ```text
//! <root>/<group>/<dataset>/<version>/
//!     info.json   metadata of the export the content came from
//!     bin.zip     downloaded export archive
//!     content/    extracted archive entries
//! ```
//!
//! `info.json` is written last and atomically, so an entry counts as complete
//! only when both it and `content/` exist.

use camino::{Utf8Path, Utf8PathBuf};
use chrono::{DateTime, Utc};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use wharf_core::{DataSourceError, DatasetIdentity, ExportRecord};
use wharf_fs::PathKind;

use crate::archive;

const METADATA_FILE: &str = "info.json";
const ARCHIVE_FILE: &str = "bin.zip";
const CONTENT_DIR: &str = "content";
const STAGING_PREFIX: &str = ".content-staging-";

/// Persisted description of the export behind a cache entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheMetadata {
    /// Completion time of the export, by the server clock.
    pub info_timestamp: DateTime<Utc>,
    /// URL the archive was downloaded from.
    pub download_url: String,
    /// Export payload as returned by the platform.
    #[serde(default)]
    pub record: Value,
}

impl From<&ExportRecord> for CacheMetadata {
    fn from(record: &ExportRecord) -> Self {
        Self {
            info_timestamp: record.produced_at,
            download_url: record.download_url.clone(),
            record: record.raw.clone(),
        }
    }
}

/// A complete cache entry.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
    /// Revision the entry belongs to.
    pub identity: DatasetIdentity,
    /// Completion time of the export that produced the content.
    pub info_timestamp: DateTime<Utc>,
    /// Downloaded archive.
    pub archive_path: Utf8PathBuf,
    /// Extracted content tree.
    pub content_path: Utf8PathBuf,
}

/// Locations making up one cache entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachePaths {
    /// Entry directory.
    pub dir: Utf8PathBuf,
    /// Metadata file.
    pub metadata: Utf8PathBuf,
    /// Downloaded archive.
    pub archive: Utf8PathBuf,
    /// Extracted content.
    pub content: Utf8PathBuf,
}

/// Cache rooted at one directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheStore {
    root: Utf8PathBuf,
}

fn io_error(path: &Utf8Path) -> impl FnOnce(std::io::Error) -> DataSourceError + '_ {
    move |err| DataSourceError::io(path.as_std_path(), err)
}

impl CacheStore {
    /// Open a cache rooted at `root`. Nothing is created until first use.
    pub fn new(root: impl Into<Utf8PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Cache root directory.
    #[must_use]
    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    /// Locations of the entry for `identity`.
    #[must_use]
    pub fn paths(&self, identity: &DatasetIdentity) -> CachePaths {
        let dir = identity
            .cache_segments()
            .iter()
            .fold(self.root.clone(), |path, segment| path.join(segment));
        CachePaths {
            metadata: dir.join(METADATA_FILE),
            archive: dir.join(ARCHIVE_FILE),
            content: dir.join(CONTENT_DIR),
            dir,
        }
    }

    /// Create the entry directory for `identity` if needed.
    pub fn prepare(&self, identity: &DatasetIdentity) -> Result<CachePaths, DataSourceError> {
        let paths = self.paths(identity);
        wharf_fs::ensure_dir_all(&paths.dir).map_err(io_error(&paths.dir))?;
        Ok(paths)
    }

    /// Load the complete entry for `identity`, if any.
    ///
    /// Metadata that cannot be decoded is treated as absent so the entry is
    /// rebuilt on the next refresh.
    pub fn load(&self, identity: &DatasetIdentity) -> Result<Option<CacheEntry>, DataSourceError> {
        let paths = self.paths(identity);
        let metadata_kind = wharf_fs::path_kind(&paths.metadata).map_err(io_error(&paths.metadata))?;
        let content_kind = wharf_fs::path_kind(&paths.content).map_err(io_error(&paths.content))?;
        if metadata_kind != PathKind::File || content_kind == PathKind::Missing {
            return Ok(None);
        }
        let bytes = wharf_fs::read_file(&paths.metadata).map_err(io_error(&paths.metadata))?;
        let metadata: CacheMetadata = match serde_json::from_slice(&bytes) {
            Ok(metadata) => metadata,
            Err(err) => {
                warn!("ignoring unreadable cache metadata {}: {err}", paths.metadata);
                return Ok(None);
            }
        };
        Ok(Some(CacheEntry {
            identity: identity.clone(),
            info_timestamp: metadata.info_timestamp,
            archive_path: paths.archive,
            content_path: paths.content,
        }))
    }

    /// Extract `paths.archive` into a staging directory and swap it into
    /// `paths.content`, replacing previous content.
    pub fn install_content(&self, paths: &CachePaths) -> Result<(), DataSourceError> {
        let staging = tempfile::Builder::new()
            .prefix(STAGING_PREFIX)
            .tempdir_in(paths.dir.as_std_path())
            .map_err(io_error(&paths.dir))?;
        let staging_path = Utf8PathBuf::from_path_buf(staging.path().to_path_buf()).map_err(
            |path| DataSourceError::invalid_argument(format!("staging path {path:?} is not UTF-8")),
        )?;
        archive::extract_into(&paths.archive, &staging_path)?;
        // After a successful rename the guard finds nothing left to remove.
        wharf_fs::replace_dir(&staging_path, &paths.content).map_err(io_error(&paths.content))?;
        info!("installed dataset content at {}", paths.content);
        Ok(())
    }

    /// Atomically write the metadata file, completing the entry.
    pub fn commit(&self, paths: &CachePaths, metadata: &CacheMetadata) -> Result<(), DataSourceError> {
        let encoded =
            serde_json::to_vec_pretty(metadata).map_err(|source| DataSourceError::Metadata {
                path: paths.metadata.as_std_path().to_path_buf(),
                source,
            })?;
        wharf_fs::write_atomic(&paths.metadata, &encoded).map_err(io_error(&paths.metadata))?;
        info!("wrote cache metadata to {}", paths.metadata);
        Ok(())
    }
}

#[cfg(test)]
mod tests;
