//! Synchronisation of remote datasets with a local cache, and the concrete
//! data sources built on it.
//!
//! Responsibilities:
//! - Keep the on-disk cache of each managed dataset revision current.
//! - Read and write local files and object-storage objects.
//! - Stage uploads and drive the platform's import and release jobs.
//!
//! Boundaries:
//! - Platform and object-storage clients are supplied by the caller through
//!   the traits in `wharf-core`.
//! - Every operation is blocking; the HTTP downloader owns its runtime.
//!
//! Invariants:
//! - Cache metadata is written last, so a partial refresh is never served.
//! - No global mutable state.

pub mod archive;
pub mod cache;
pub mod config;
pub mod content;
pub mod download;
pub mod sources;
pub mod sync;
#[doc(hidden)]
pub mod test_support;

pub use cache::{CacheEntry, CacheMetadata, CachePaths, CacheStore};
pub use config::{
    ConfigError, DEFAULT_CONNECT_TIMEOUT, DEFAULT_EXPORT_SIZE_LIMIT, DEFAULT_SHARED_URL_TTL,
    SyncConfig, SyncSettings,
};
pub use download::{ArchiveFetcher, FetcherBuildError, HttpArchiveFetcher, download_archive};
pub use sources::{
    FileSource, ManagedDatasetSource, ObjectLocation, ObjectStoreSource, OpenOptions, SyncContext,
};
pub use sync::{RefreshReason, SyncEngine, SyncOutcome, SyncReport};
