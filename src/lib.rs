//! Facade crate for the wharf dataset toolkit.
//!
//! This crate re-exports the core data-source contract and, behind the `sync`
//! feature, the cache engine and concrete sources.

#![forbid(unsafe_code)]

pub use wharf_core::{
    BareDatasetRequest, Content, Credentials, DataSource, DataSourceError, DatasetIdentity,
    DatasetInfo, DatasetTemplate, DestinationOverride, FetchOptions, FormatType, ObjectStore,
    ObjectStoreConnector, PlatformApi, SaveOptions, StorageDescriptor, TransportError,
};

#[cfg(feature = "sync")]
pub use wharf_sync::{
    ArchiveFetcher, FileSource, HttpArchiveFetcher, ManagedDatasetSource, ObjectLocation,
    ObjectStoreSource, OpenOptions, SyncConfig, SyncContext, SyncReport, SyncSettings,
};
