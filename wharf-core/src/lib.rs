//! Core domain types for the Wharf dataset synchronisation engine.
//!
//! The crate defines the [`DataSource`] contract, the models shared by every
//! source (identities, storage descriptors, formats, and content), and the
//! collaborator traits a managed dataset source drives: [`PlatformApi`] for the
//! remote dataset platform and [`ObjectStoreConnector`]/[`ObjectStore`] for blob
//! storage. Constructors return `Result` to surface invalid input early.

#![cfg_attr(docsrs, feature(doc_cfg))]

mod content;
mod dataset;
mod error;
mod format;
mod identity;
mod object_store;
mod platform;
mod source;
mod storage;

#[cfg(any(test, feature = "test-support"))]
#[cfg_attr(docsrs, doc(cfg(feature = "test-support")))]
pub mod test_support;

pub use content::Content;
pub use dataset::{
    BareDatasetRequest, CreatedDataset, DatasetCategory, DatasetInfo, DatasetTemplate,
    ExportRecord, ImportSource, JobOutcome, RemoteOperation, StorageRequest, latest_export,
    parse_server_timestamp,
};
pub use error::{BoxedError, DataSourceError, TransportError};
pub use format::{FormatInference, FormatType, default_format, infer_format};
pub use identity::DatasetIdentity;
pub use object_store::{ObjectMeta, ObjectStore, ObjectStoreConnector};
pub use platform::PlatformApi;
pub use source::{DataSource, FetchOptions, SaveOptions};
pub use storage::{
    Credentials, DestinationOverride, StorageDescriptor, StorageKind, UploadDestination,
    normalise_prefix,
};
